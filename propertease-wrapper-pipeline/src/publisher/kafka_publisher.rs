use std::env;
use std::time::Duration;

use async_trait::async_trait;
use propertease_wrapper_shared::OutboundMessage;
use rdkafka::config::ClientConfig;
use rdkafka::producer::{FutureProducer, FutureRecord};
use tracing::{debug, info};

use crate::errors::PublisherError;
use crate::publisher::Publisher;

const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(5);

/// Configuration for creating the Kafka producer.
#[derive(Debug, Clone)]
pub struct ProducerConfig {
    /// Kafka broker address (e.g., "localhost:9092")
    pub broker: String,
    pub client_id: String,
    /// SASL username (enables SASL/SSL if set)
    pub username: Option<String>,
    /// SASL password (required if username is set)
    pub password: Option<String>,
    /// Custom CA certificate in PEM format
    pub ssl_ca_pem: Option<String>,
}

impl ProducerConfig {
    pub fn new(broker: impl Into<String>, client_id: impl Into<String>) -> Self {
        Self {
            broker: broker.into(),
            client_id: client_id.into(),
            username: None,
            password: None,
            ssl_ca_pem: None,
        }
    }

    /// Reads the optional `KAFKA_USERNAME`, `KAFKA_PASSWORD` and `KAFKA_SSL_CA_PEM`
    /// credentials for `broker`.
    pub fn from_env(broker: impl Into<String>, client_id: impl Into<String>) -> Self {
        Self {
            username: env::var("KAFKA_USERNAME").ok(),
            password: env::var("KAFKA_PASSWORD").ok(),
            ssl_ca_pem: env::var("KAFKA_SSL_CA_PEM").ok(),
            ..Self::new(broker, client_id)
        }
    }

    fn client_config(&self) -> ClientConfig {
        let mut client_config = ClientConfig::new();
        client_config
            .set("bootstrap.servers", &self.broker)
            .set("client.id", &self.client_id)
            .set("compression.type", "zstd")
            .set("message.timeout.ms", "5000");

        // Managed brokers authenticate over SASL/SSL; local ones are plaintext.
        if let (Some(username), Some(password)) = (&self.username, &self.password) {
            client_config
                .set("security.protocol", "SASL_SSL")
                .set("sasl.mechanisms", "PLAIN")
                .set("sasl.username", username)
                .set("sasl.password", password);

            if let Some(ca_pem) = &self.ssl_ca_pem {
                client_config.set("ssl.ca.pem", ca_pem);
            }
        }
        client_config
    }
}

/// Publishes JSON envelopes keyed by the producing service.
pub struct KafkaPublisher {
    producer: FutureProducer,
    send_timeout: Duration,
}

impl KafkaPublisher {
    pub fn new(config: &ProducerConfig) -> Result<Self, PublisherError> {
        let producer: FutureProducer = config.client_config().create()?;
        info!(broker = %config.broker, client_id = %config.client_id, "Created Kafka producer");
        Ok(Self {
            producer,
            send_timeout: DEFAULT_SEND_TIMEOUT,
        })
    }
}

#[async_trait]
impl Publisher for KafkaPublisher {
    async fn publish(&self, topic: &str, message: &OutboundMessage) -> Result<(), PublisherError> {
        let payload = serde_json::to_vec(message)?;
        let key = message.service().as_str();
        let record = FutureRecord::to(topic).key(key).payload(&payload);

        let (partition, offset) = self
            .producer
            .send(record, self.send_timeout)
            .await
            .map_err(|(e, _)| PublisherError::from(e))?;

        debug!(
            topic = %topic,
            message_type = message.message_type(),
            partition,
            offset,
            "Published message"
        );
        Ok(())
    }
}
