//! # PropertEase Wrapper Repository
//! This crate provides the identifier store: the correspondence between internal ids
//! minted by PropertEase and the ids each booking service assigns, plus the per-kind
//! sequence counters used to mint new internal ids. It includes the error types, the
//! `IdMappingRepository` interface, and PostgreSQL and in-memory implementations.
pub mod errors;
pub mod interfaces;
pub mod memory;
pub mod postgres;

pub use errors::IdMappingError;
pub use interfaces::{IdMappingRepository, MergeOutcome};
pub use memory::InMemoryIdMappingRepository;
pub use postgres::{PostgresIdMappingRepository, MIGRATOR};
