//! Hash value validation

use thiserror::Error;

/// Errors produced when validating a hashed subject
#[derive(Debug, Error, Clone, PartialEq)]
pub enum HashValidationError {
    #[error("hash_value must be exactly {expected} characters, got {actual}")]
    WrongLength { expected: usize, actual: usize },

    #[error("hash_value must be hexadecimal, found '{0}'")]
    NotHex(char),
}

/// Validate and normalize a hex digest to lowercase
///
/// Surrounding whitespace is ignored; the digest itself must be exactly
/// `expected_len` hexadecimal characters.
pub fn normalize_hash_value(raw: &str, expected_len: usize) -> Result<String, HashValidationError> {
    let value = raw.trim();

    if let Some(c) = value.chars().find(|c| !c.is_ascii_hexdigit()) {
        return Err(HashValidationError::NotHex(c));
    }

    if value.len() != expected_len {
        return Err(HashValidationError::WrongLength {
            expected: expected_len,
            actual: value.len(),
        });
    }

    Ok(value.to_ascii_lowercase())
}
