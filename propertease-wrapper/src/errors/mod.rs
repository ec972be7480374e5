//! Error types for the wrapper process.

use propertease_wrapper_pipeline::errors::{
    AdapterError, ConsumerError, OrchestratorError, PublisherError,
};
use propertease_wrapper_repository::IdMappingError;
use thiserror::Error;

/// Errors that can occur during wrapper initialization or execution.
#[derive(Error, Debug)]
pub enum WrapperError {
    /// Missing or invalid environment configuration.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Identifier store error: {0}")]
    IdMapping(#[from] IdMappingError),

    #[error("Booking API error: {0}")]
    BookingApi(#[from] AdapterError),

    #[error("Consumer error: {0}")]
    Consumer(#[from] ConsumerError),

    #[error("Publisher error: {0}")]
    Publisher(#[from] PublisherError),

    #[error("Orchestrator error: {0}")]
    Orchestrator(#[from] OrchestratorError),
}

impl WrapperError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }
}
