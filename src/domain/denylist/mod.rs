//! Denylist domain - canonical entries and hash validation

mod entity;
mod repository;
mod validation;

pub use entity::DenylistEntry;
pub use repository::DenylistRepository;
pub use validation::{normalize_hash_value, HashValidationError};

#[cfg(test)]
pub use repository::MockDenylistRepository;
