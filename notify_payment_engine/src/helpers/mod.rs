mod amount_extractor;

pub use amount_extractor::{extract_amount, normalize_amount, MAX_INTEGER_DIGITS};
