use async_trait::async_trait;
use propertease_wrapper_shared::OutboundMessage;
use tokio::sync::Mutex;

use crate::errors::PublisherError;
use crate::publisher::Publisher;

/// Publisher that keeps every message in memory, for tests and dry runs.
#[derive(Default)]
pub struct RecordingPublisher {
    published: Mutex<Vec<(String, OutboundMessage)>>,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every `(topic, message)` pair published so far, oldest first.
    pub async fn published(&self) -> Vec<(String, OutboundMessage)> {
        self.published.lock().await.clone()
    }
}

#[async_trait]
impl Publisher for RecordingPublisher {
    async fn publish(&self, topic: &str, message: &OutboundMessage) -> Result<(), PublisherError> {
        self.published
            .lock()
            .await
            .push((topic.to_string(), message.clone()));
        Ok(())
    }
}
