//! Error types for the message handlers.
use propertease_wrapper_repository::IdMappingError;
use thiserror::Error;

use crate::errors::{AdapterError, PublisherError};

#[derive(Debug, Error)]
pub enum HandlerError {
    /// The message body could not be decoded into a known message.
    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Adapter error: {0}")]
    Adapter(#[from] AdapterError),

    #[error("Identifier store error: {0}")]
    IdMapping(#[from] IdMappingError),

    #[error("Publisher error: {0}")]
    Publisher(#[from] PublisherError),
}

impl HandlerError {
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Whether the message should be redelivered instead of skipped.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Decode(_) => false,
            Self::Adapter(e) => e.is_transient(),
            Self::IdMapping(_) | Self::Publisher(_) => true,
        }
    }
}
