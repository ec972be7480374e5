//! This module defines and re-exports the interfaces for the identifier store.
mod id_mapping;

pub use id_mapping::{IdMappingRepository, MergeOutcome};
