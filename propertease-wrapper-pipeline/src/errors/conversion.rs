//! Error types for the vendor converters.
use thiserror::Error;

/// Errors raised while translating between a vendor schema and the canonical records.
#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("Malformed vendor payload: {0}")]
    Malformed(String),

    #[error("Failed to encode vendor payload: {0}")]
    Encode(String),
}

impl ConversionError {
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::Malformed(msg.into())
    }
}

impl From<serde_json::Error> for ConversionError {
    fn from(err: serde_json::Error) -> Self {
        Self::Encode(err.to_string())
    }
}
