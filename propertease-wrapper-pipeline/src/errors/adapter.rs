//! Error types for the service adapter and the booking API transport.
use propertease_wrapper_repository::IdMappingError;
use thiserror::Error;

use crate::errors::ConversionError;

/// Represents errors that can occur while talking to a booking service.
///
/// Rejections the adapter can recover from locally (unmapped targets, non-success
/// responses to mutations) are not errors; they are reported as an `AdapterOutcome`.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// The request never produced a response: connection failure or timeout.
    #[error("Transport error: {0}")]
    Transport(String),

    /// A listing request answered with a non-success status.
    #[error("Unexpected status {status} from {path}")]
    UnexpectedStatus { status: u16, path: String },

    #[error("Identifier store error: {0}")]
    IdMapping(#[from] IdMappingError),

    #[error("Conversion error: {0}")]
    Conversion(#[from] ConversionError),
}

impl AdapterError {
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Whether retrying the same request later may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::IdMapping(_))
    }
}

impl From<reqwest::Error> for AdapterError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}
