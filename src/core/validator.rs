//! Turns raw operator input into a validated sales record.
//!
//! Validation is a single pure call so an interactive caller can loop
//! on it until the operator enters something usable.

use thiserror::Error;

use crate::domain::ProductRecord;

/// Why a line of input was rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("'{token}' is not a whole number")]
    NotANumber { token: String },

    #[error("exactly {expected} values required, you provided {actual}")]
    WrongCount { expected: usize, actual: usize },

    #[error("value {value} at position {position} is negative")]
    Negative { position: usize, value: i64 },
}

/// Split a comma-separated line into tokens
pub fn split_tokens(raw: &str) -> Vec<&str> {
    raw.trim().split(',').collect()
}

/// Validate tokens into a record of `expected_count` non-negative quantities.
///
/// Every token is parsed before the count is checked, so a malformed
/// token is reported even when the count is also wrong.
pub fn validate<S: AsRef<str>>(
    raw: &[S],
    expected_count: usize,
) -> Result<ProductRecord, ValidationError> {
    let values = raw
        .iter()
        .map(|token| {
            let token = token.as_ref().trim();
            token.parse::<i64>().map_err(|_| ValidationError::NotANumber {
                token: token.to_string(),
            })
        })
        .collect::<Result<Vec<i64>, _>>()?;

    if values.len() != expected_count {
        return Err(ValidationError::WrongCount {
            expected: expected_count,
            actual: values.len(),
        });
    }

    if let Some((position, &value)) = values.iter().enumerate().find(|(_, v)| **v < 0) {
        return Err(ValidationError::Negative {
            position: position + 1,
            value,
        });
    }

    Ok(ProductRecord::new(values))
}

/// Split and validate a comma-separated line
pub fn validate_line(raw: &str, expected_count: usize) -> Result<ProductRecord, ValidationError> {
    validate(&split_tokens(raw), expected_count)
}
