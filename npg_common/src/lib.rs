//! Shared helpers for the notify payment gateway crates.
mod helpers;
mod secret;

pub use helpers::{constant_time_eq, parse_boolean_flag, parse_optional_string, InvalidFlagValue};
pub use secret::Secret;
