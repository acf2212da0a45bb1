//! Credential directory implementations

mod cached;
mod in_memory;
mod postgres;

pub use cached::CachedCredentialDirectory;
pub use in_memory::InMemoryCredentialDirectory;
pub use postgres::PostgresCredentialDirectory;
