//! Kafka consumer implementation for the wrapper pipeline.
//!
//! Reads the service topic and the broadcast topic with manual commits, keeping
//! a single message in flight.
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use propertease_wrapper_shared::Service;
use rdkafka::{
    config::ClientConfig,
    consumer::{CommitMode, Consumer as _, StreamConsumer},
    message::Message as _,
    Offset, TopicPartitionList,
};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, instrument, warn};

use crate::consumer::{Consumer, Delivery, StreamMessage};
use crate::errors::ConsumerError;
use crate::topics::{service_topic, BROADCAST_TOPIC};

/// Default pause before a failed message is read again.
const DEFAULT_REDELIVERY_BACKOFF: Duration = Duration::from_millis(1000);

const SEEK_TIMEOUT: Duration = Duration::from_secs(5);

pub struct KafkaConsumer {
    consumer: StreamConsumer,
    topics: Vec<String>,
    redelivery_backoff: Duration,
}

impl KafkaConsumer {
    /// Create a consumer for one service's wrappers.
    ///
    /// # Arguments
    ///
    /// * `brokers` - Kafka broker addresses (comma-separated)
    /// * `group_id` - Consumer group ID, one per service and role
    /// * `service` - The booking service whose topic is read alongside the broadcast topic
    pub fn new(brokers: &str, group_id: &str, service: Service) -> Result<Self, ConsumerError> {
        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("group.id", group_id)
            .set("enable.auto.commit", "false")
            .set("auto.offset.reset", "earliest")
            .set("session.timeout.ms", "6000")
            .create()?;

        info!(
            brokers = %brokers,
            group_id = %group_id,
            service = %service,
            "Created Kafka consumer"
        );

        Ok(Self {
            consumer,
            topics: vec![service_topic(service), BROADCAST_TOPIC.to_string()],
            redelivery_backoff: DEFAULT_REDELIVERY_BACKOFF,
        })
    }

    pub fn with_redelivery_backoff(mut self, backoff: Duration) -> Self {
        self.redelivery_backoff = backoff;
        self
    }

    fn commit(&self, delivery: &Delivery) -> Result<(), ConsumerError> {
        let mut tpl = TopicPartitionList::new();
        tpl.add_partition_offset(
            &delivery.topic,
            delivery.partition,
            Offset::Offset(delivery.offset + 1),
        )?;
        self.consumer.commit(&tpl, CommitMode::Async)?;
        Ok(())
    }

    /// Rewinds the partition so the failed message is read again.
    fn rewind(&self, delivery: &Delivery) -> Result<(), ConsumerError> {
        self.consumer.seek(
            &delivery.topic,
            delivery.partition,
            Offset::Offset(delivery.offset),
            SEEK_TIMEOUT,
        )?;
        Ok(())
    }
}

#[async_trait]
impl Consumer for KafkaConsumer {
    fn subscribe(&self) -> Result<(), ConsumerError> {
        let topics: Vec<&str> = self.topics.iter().map(String::as_str).collect();
        self.consumer.subscribe(&topics)?;
        info!(topics = ?self.topics, "Subscribed to Kafka topics");
        Ok(())
    }

    #[instrument(skip(self, sender, ack_receiver, shutdown))]
    async fn run(
        &self,
        sender: mpsc::Sender<StreamMessage>,
        mut ack_receiver: mpsc::Receiver<StreamMessage>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), ConsumerError> {
        let mut message_stream = self.consumer.stream();

        loop {
            let message = tokio::select! {
                _ = shutdown.recv() => {
                    info!("Consumer received shutdown signal");
                    let _ = sender.send(StreamMessage::End).await;
                    break;
                }
                message = message_stream.next() => message,
            };

            let (payload, delivery) = match message {
                Some(Ok(msg)) => {
                    let delivery = Delivery {
                        topic: msg.topic().to_string(),
                        partition: msg.partition(),
                        offset: msg.offset(),
                    };
                    (msg.payload().map(<[u8]>::to_vec), delivery)
                }
                Some(Err(e)) => {
                    error!(error = %e, "Kafka error");
                    let _ = sender.send(StreamMessage::Error(e.to_string())).await;
                    continue;
                }
                None => {
                    info!("Kafka stream ended");
                    let _ = sender.send(StreamMessage::End).await;
                    break;
                }
            };

            let Some(payload) = payload else {
                debug!(
                    topic = %delivery.topic,
                    partition = delivery.partition,
                    offset = delivery.offset,
                    "Committing message with empty payload"
                );
                self.commit(&delivery)?;
                continue;
            };

            debug!(
                topic = %delivery.topic,
                partition = delivery.partition,
                offset = delivery.offset,
                "Received message from Kafka"
            );
            sender
                .send(StreamMessage::Message { payload, delivery })
                .await
                .map_err(|e| ConsumerError::ChannelSend(e.to_string()))?;

            // Nothing else is read until this message is acknowledged.
            let ack = tokio::select! {
                _ = shutdown.recv() => {
                    info!("Consumer received shutdown signal while awaiting acknowledgment");
                    let _ = sender.send(StreamMessage::End).await;
                    break;
                }
                ack = ack_receiver.recv() => ack,
            };

            match ack {
                Some(StreamMessage::Acknowledgment {
                    delivery,
                    success: true,
                    ..
                }) => {
                    if let Err(e) = self.commit(&delivery) {
                        error!(error = %e, offset = delivery.offset, "Failed to commit offset");
                    }
                }
                Some(StreamMessage::Acknowledgment {
                    delivery,
                    success: false,
                    error,
                }) => {
                    warn!(
                        topic = %delivery.topic,
                        partition = delivery.partition,
                        offset = delivery.offset,
                        error = error.as_deref().unwrap_or("Unknown error"),
                        backoff_ms = self.redelivery_backoff.as_millis() as u64,
                        "Processing failed, message will be redelivered"
                    );
                    tokio::time::sleep(self.redelivery_backoff).await;
                    self.rewind(&delivery)?;
                }
                Some(StreamMessage::End) | None => {
                    info!("Acknowledgment channel closed");
                    break;
                }
                Some(_) => {
                    warn!("Unexpected message on the acknowledgment channel");
                }
            }
        }

        Ok(())
    }
}
