//! Error types for the orchestrator module.
use thiserror::Error;

use crate::errors::ConsumerError;

/// Represents errors that stop the orchestrator loop.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("Consumer error: {0}")]
    Consumer(#[from] ConsumerError),
}
