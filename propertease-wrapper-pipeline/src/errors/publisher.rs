//! Error types for the queue publisher.
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PublisherError {
    #[error("Kafka error: {0}")]
    Kafka(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<rdkafka::error::KafkaError> for PublisherError {
    fn from(err: rdkafka::error::KafkaError) -> Self {
        Self::Kafka(err.to_string())
    }
}
