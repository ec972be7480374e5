//! PostgreSQL implementation of the identifier store.
mod id_mapping_repository;

pub use id_mapping_repository::PostgresIdMappingRepository;

/// Embedded schema migrations, applied at startup.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("src/postgres/migrations");
