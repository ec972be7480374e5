//! Publication of wrapper responses to the queue.
mod kafka_publisher;
mod recording;

pub use kafka_publisher::{KafkaPublisher, ProducerConfig};
pub use recording::RecordingPublisher;

use async_trait::async_trait;
use propertease_wrapper_shared::OutboundMessage;

use crate::errors::PublisherError;

/// Sends outbound messages to a topic.
///
/// `publish` returns once the broker has accepted the message, so a handler that
/// publishes before acknowledging its input never loses a response.
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, topic: &str, message: &OutboundMessage) -> Result<(), PublisherError>;
}
