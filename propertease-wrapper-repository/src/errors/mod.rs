//! Error types for the identifier store.
mod id_mapping;

pub use id_mapping::IdMappingError;
