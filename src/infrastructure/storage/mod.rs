//! Storage infrastructure - PostgreSQL pooling, migrations and seed data

pub mod migrations;
mod postgres;
mod seed;

pub use migrations::{gateway_migrations, run_gateway_migrations, Migration, PostgresMigrator};
pub(crate) use postgres::map_write_error;
pub use postgres::{connect_pool, PostgresConfig};
pub use seed::SeedData;
