//! Denylist repository implementations

mod in_memory;
mod postgres;

pub use in_memory::InMemoryDenylistRepository;
pub use postgres::PostgresDenylistRepository;
