//! Credential domain
//!
//! Types and traits for the machine-to-machine credentials that sign
//! blacklist verification requests.

mod entity;
mod repository;
mod validation;

pub use entity::{ApiKey, Credential, CredentialStatus};
pub use repository::CredentialDirectory;
pub use validation::{validate_api_key, validate_secret, CredentialValidationError};

#[cfg(test)]
pub use repository::MockCredentialDirectory;
