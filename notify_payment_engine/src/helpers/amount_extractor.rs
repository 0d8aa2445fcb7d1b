use std::sync::OnceLock;

use log::trace;
use regex::Regex;

/// Integers longer than this are assumed to be phone numbers, card numbers or ids rather than amounts.
pub const MAX_INTEGER_DIGITS: usize = 7;

// Tried in order. The first pattern that matches anywhere in the text wins.
const DECIMAL_PATTERNS: [&str; 3] = [
    // "1 234,56" or "1234,56"
    r"\b[0-9]{1,3}(?:\s[0-9]{3})*,[0-9]{1,2}",
    // "1 234.56"
    r"\b[0-9]{1,3}(?:\s[0-9]{3})*\.[0-9]{1,2}",
    // "12345,6" or "12345.67"
    r"[0-9]+[,.][0-9]{1,2}",
];
// "1 234" or "10 000"
const GROUPED_INTEGER_PATTERN: &str = r"\b[0-9]{1,3}(?:\s[0-9]{3})+\b";
const PLAIN_INTEGER_PATTERN: &str = r"\b[0-9]{1,7}\b";

struct Patterns {
    decimals: Vec<Regex>,
    grouped_integer: Regex,
    plain_integer: Regex,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| Patterns {
        decimals: DECIMAL_PATTERNS.iter().map(|p| Regex::new(p).expect("decimal amount pattern is valid")).collect(),
        grouped_integer: Regex::new(GROUPED_INTEGER_PATTERN).expect("grouped integer pattern is valid"),
        plain_integer: Regex::new(PLAIN_INTEGER_PATTERN).expect("plain integer pattern is valid"),
    })
}

/// Extracts the payment amount from free-form notification text.
///
/// Decimal amounts take priority over integers. Whitespace used as a thousands separator is removed and the decimal
/// separator is always returned as a comma, e.g. `"Зачисление 1 234.56 ₽"` yields `"1234,56"`.
///
/// When there is no decimal amount, whitespace-grouped integers are considered first, and then every standalone
/// integer of up to [`MAX_INTEGER_DIGITS`] digits. In both cases the numerically largest candidate is returned, since
/// the transaction amount is usually the largest plain number in a notification.
///
/// Returns `None` if nothing that looks like an amount is present. This is never an error.
pub fn extract_amount(text: &str) -> Option<String> {
    let patterns = patterns();
    let decimal = patterns.decimals.iter().find_map(|re| re.find(text)).map(|m| normalize_separator(m.as_str()));
    if decimal.is_some() {
        trace!("💱️ Decimal amount {decimal:?} found in notification text");
        return decimal;
    }
    let integer = largest_integer(&patterns.grouped_integer, text)
        .or_else(|| largest_integer(&patterns.plain_integer, text));
    trace!("💱️ Integer amount {integer:?} found in notification text");
    integer
}

/// Normalizes an amount token for comparison: all whitespace is removed and `.` is replaced by `,`.
///
/// Returns `None` for blank input.
pub fn normalize_amount(amount: &str) -> Option<String> {
    let normalized = normalize_separator(amount);
    (!normalized.is_empty()).then_some(normalized)
}

fn normalize_separator(raw: &str) -> String {
    raw.chars().filter(|c| !c.is_whitespace()).map(|c| if c == '.' { ',' } else { c }).collect()
}

fn largest_integer(re: &Regex, text: &str) -> Option<String> {
    re.find_iter(text)
        .filter_map(|m| {
            let digits = m.as_str().chars().filter(|c| !c.is_whitespace()).collect::<String>();
            if digits.len() > MAX_INTEGER_DIGITS {
                return None;
            }
            let value = digits.parse::<u64>().ok().filter(|v| *v > 0)?;
            Some((digits, value))
        })
        .fold(None, |best: Option<(String, u64)>, candidate| match best {
            Some(b) if b.1 >= candidate.1 => Some(b),
            _ => Some(candidate),
        })
        .map(|(digits, _)| digits)
}
