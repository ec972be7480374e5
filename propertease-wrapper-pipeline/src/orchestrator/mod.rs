//! Orchestrator module for the wrapper pipeline.
//!
//! Pulls messages from the consumer one at a time, hands them to the handler
//! and reports back whether the message may be committed.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, error, info, instrument, warn};

use crate::consumer::{Consumer, Delivery, StreamMessage};
use crate::errors::OrchestratorError;
use crate::handler::MessageHandler;

/// Configuration for the orchestrator.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Size of the message and acknowledgment channel buffers.
    pub channel_buffer_size: usize,
    /// How often running totals are logged.
    pub progress_interval: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            channel_buffer_size: 16,
            progress_interval: Duration::from_secs(60),
        }
    }
}

/// Running totals since startup.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct OrchestratorStats {
    pub processed: u64,
    /// Messages committed without effect because they could not be decoded.
    pub skipped: u64,
    /// Messages committed after a non-transient handler error.
    pub failed: u64,
    /// Messages handed back to the consumer for redelivery.
    pub redelivered: u64,
}

#[derive(Default)]
struct Counters {
    processed: AtomicU64,
    skipped: AtomicU64,
    failed: AtomicU64,
    redelivered: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> OrchestratorStats {
        OrchestratorStats {
            processed: self.processed.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            redelivered: self.redelivered.load(Ordering::Relaxed),
        }
    }
}

pub struct Orchestrator {
    consumer: Arc<dyn Consumer>,
    handler: Arc<MessageHandler>,
    config: OrchestratorConfig,
    shutdown_tx: broadcast::Sender<()>,
    counters: Arc<Counters>,
}

impl Orchestrator {
    pub fn new(consumer: Arc<dyn Consumer>, handler: Arc<MessageHandler>) -> Self {
        Self::with_config(consumer, handler, OrchestratorConfig::default())
    }

    pub fn with_config(
        consumer: Arc<dyn Consumer>,
        handler: Arc<MessageHandler>,
        config: OrchestratorConfig,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            consumer,
            handler,
            config,
            shutdown_tx,
            counters: Arc::new(Counters::default()),
        }
    }

    pub fn stats(&self) -> OrchestratorStats {
        self.counters.snapshot()
    }

    /// Runs until the consumer stream ends or a shutdown signal arrives.
    #[instrument(skip(self), fields(service = %self.handler.service(), role = %self.handler.role()))]
    pub async fn run(&mut self) -> Result<(), OrchestratorError> {
        info!("Starting wrapper orchestrator");

        self.consumer.subscribe()?;

        let (event_transmitter, mut event_receiver) =
            mpsc::channel::<StreamMessage>(self.config.channel_buffer_size);
        let (ack_transmitter, ack_receiver) =
            mpsc::channel::<StreamMessage>(self.config.channel_buffer_size);

        let consumer = self.consumer.clone();
        let shutdown_rx = self.shutdown_tx.subscribe();
        let consumer_handle = tokio::spawn(async move {
            if let Err(e) = consumer
                .run(event_transmitter, ack_receiver, shutdown_rx)
                .await
            {
                error!(error = %e, "Consumer error");
            }
        });

        let mut progress_timer = interval(self.config.progress_interval);
        progress_timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                msg = event_receiver.recv() => {
                    match msg {
                        Some(StreamMessage::Message { payload, delivery }) => {
                            let ack = self.process(&payload, delivery).await;
                            if ack_transmitter.send(ack).await.is_err() {
                                warn!("Consumer stopped listening for acknowledgments");
                                break;
                            }
                        }
                        Some(StreamMessage::Error(e)) => {
                            error!(error = %e, "Received error from consumer");
                        }
                        Some(StreamMessage::End) | None => {
                            info!("Consumer stream ended");
                            break;
                        }
                        Some(StreamMessage::Acknowledgment { .. }) => {
                            warn!("Received acknowledgment on event channel");
                        }
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("Received shutdown signal");
                    let _ = self.shutdown_tx.send(());
                    break;
                }
                _ = progress_timer.tick() => {
                    let stats = self.counters.snapshot();
                    info!(
                        processed = stats.processed,
                        skipped = stats.skipped,
                        failed = stats.failed,
                        redelivered = stats.redelivered,
                        "Processing progress"
                    );
                }
            }
        }

        // The consumer may be blocked waiting for an ack that will never come.
        let _ = self.shutdown_tx.send(());
        let _ = consumer_handle.await;

        let stats = self.counters.snapshot();
        info!(
            total_processed = stats.processed,
            total_skipped = stats.skipped,
            total_failed = stats.failed,
            total_redelivered = stats.redelivered,
            "Orchestrator shutdown complete"
        );
        Ok(())
    }

    /// Handles one delivery and builds the acknowledgment for it.
    async fn process(&self, payload: &[u8], delivery: Delivery) -> StreamMessage {
        let message = match MessageHandler::decode(payload) {
            Ok(message) => message,
            Err(e) => {
                warn!(
                    error = %e,
                    topic = %delivery.topic,
                    offset = delivery.offset,
                    "Skipping undecodable message"
                );
                self.counters.skipped.fetch_add(1, Ordering::Relaxed);
                return acknowledge(delivery, None);
            }
        };

        let message_type = message.message_type();
        match self.handler.handle(message).await {
            Ok(()) => {
                debug!(message_type, offset = delivery.offset, "Message processed");
                self.counters.processed.fetch_add(1, Ordering::Relaxed);
                acknowledge(delivery, None)
            }
            Err(e) if e.is_transient() => {
                warn!(
                    error = %e,
                    message_type,
                    offset = delivery.offset,
                    "Message failed, requesting redelivery"
                );
                self.counters.redelivered.fetch_add(1, Ordering::Relaxed);
                StreamMessage::Acknowledgment {
                    delivery,
                    success: false,
                    error: Some(e.to_string()),
                }
            }
            Err(e) => {
                error!(
                    error = %e,
                    message_type,
                    offset = delivery.offset,
                    "Message failed permanently, committing"
                );
                self.counters.failed.fetch_add(1, Ordering::Relaxed);
                acknowledge(delivery, Some(e.to_string()))
            }
        }
    }

    /// Trigger a graceful shutdown.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }
}

fn acknowledge(delivery: Delivery, error: Option<String>) -> StreamMessage {
    StreamMessage::Acknowledgment {
        delivery,
        success: true,
        error,
    }
}
