//! Consumer module for the wrapper pipeline.
//!
//! Delivers queue messages one at a time and turns acknowledgments into offset
//! commits or redeliveries.
mod kafka_consumer;
mod messages;

pub use kafka_consumer::KafkaConsumer;
pub use messages::{Delivery, StreamMessage};

use async_trait::async_trait;
use tokio::sync::{broadcast, mpsc};

use crate::errors::ConsumerError;

/// Source of inbound messages driven by the orchestrator.
///
/// `run` sends each message on `sender` and must not deliver the next one before
/// the matching acknowledgment arrives on `ack_receiver`.
#[async_trait]
pub trait Consumer: Send + Sync {
    fn subscribe(&self) -> Result<(), ConsumerError>;

    async fn run(
        &self,
        sender: mpsc::Sender<StreamMessage>,
        ack_receiver: mpsc::Receiver<StreamMessage>,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), ConsumerError>;
}
