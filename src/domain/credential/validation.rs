//! Credential validation utilities

use thiserror::Error;

/// Errors that can occur during credential validation
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CredentialValidationError {
    #[error("API key cannot be empty")]
    EmptyKey,

    #[error("API key exceeds maximum length of {0} characters")]
    TooLong(usize),

    #[error("API key contains invalid character: '{0}'. Only alphanumeric characters, '-' and '_' are allowed")]
    InvalidCharacter(char),

    #[error("Secret must be at least {0} characters")]
    SecretTooShort(usize),
}

const MAX_API_KEY_LENGTH: usize = 64;
const MIN_SECRET_LENGTH: usize = 16;

/// Validate a public API key identifier
///
/// Rules:
/// - Cannot be empty
/// - Maximum 64 characters
/// - Only alphanumeric characters, hyphens and underscores
pub fn validate_api_key(key: &str) -> Result<(), CredentialValidationError> {
    if key.is_empty() {
        return Err(CredentialValidationError::EmptyKey);
    }

    if key.len() > MAX_API_KEY_LENGTH {
        return Err(CredentialValidationError::TooLong(MAX_API_KEY_LENGTH));
    }

    if let Some(c) = key
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
    {
        return Err(CredentialValidationError::InvalidCharacter(c));
    }

    Ok(())
}

/// Validate a signing secret
pub fn validate_secret(secret: &str) -> Result<(), CredentialValidationError> {
    if secret.len() < MIN_SECRET_LENGTH {
        return Err(CredentialValidationError::SecretTooShort(MIN_SECRET_LENGTH));
    }

    Ok(())
}
