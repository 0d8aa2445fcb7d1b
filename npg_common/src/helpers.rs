use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("'{0}' is not a valid boolean flag. Use one of 1/0, true/false, yes/no, on/off")]
pub struct InvalidFlagValue(pub String);

/// Parse a boolean flag from a string value, or return the given default value otherwise.
///
/// Unrecognised values are reported as an error so that the caller can log a configuration warning before falling back
/// to the default.
pub fn parse_boolean_flag(value: Option<String>, default: bool) -> Result<bool, InvalidFlagValue> {
    let value = match value {
        Some(v) => v,
        None => return Ok(default),
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        "" => Ok(default),
        _ => Err(InvalidFlagValue(value)),
    }
}

/// Returns `None` for absent or whitespace-only values, and the trimmed string otherwise.
pub fn parse_optional_string(value: Option<String>) -> Option<String> {
    value.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// Byte-wise equality whose running time depends only on the lengths of the inputs.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
