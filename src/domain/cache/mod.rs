//! Cache domain - shared store abstraction for the gateway hot path

mod keys;
mod repository;

pub use keys::CacheKeys;
pub use repository::{Cache, CacheExt};

#[cfg(test)]
pub use repository::mock::MockCache;
