//! Dependency initialization and wiring for a wrapper process.

use std::sync::Arc;
use std::time::Duration;

use propertease_wrapper_pipeline::adapter::{ServiceAdapter, VendorConfig};
use propertease_wrapper_pipeline::api::HttpBookingApi;
use propertease_wrapper_pipeline::consumer::KafkaConsumer;
use propertease_wrapper_pipeline::handler::MessageHandler;
use propertease_wrapper_pipeline::orchestrator::Orchestrator;
use propertease_wrapper_pipeline::publisher::{KafkaPublisher, ProducerConfig};
use propertease_wrapper_repository::PostgresIdMappingRepository;
use sqlx::postgres::{PgPool, PgPoolOptions};
use tokio::time::sleep;
use tracing::{info, warn};

use crate::config::{ConnectionMode, WrapperConfig};
use crate::WrapperError;

const MAX_DB_CONNECTIONS: u32 = 5;

/// Container for all initialized dependencies.
pub struct Dependencies {
    /// The configured orchestrator ready to run.
    pub orchestrator: Orchestrator,
}

impl Dependencies {
    /// Connects to the identifier store, applies migrations and wires the
    /// booking API, handler, Kafka consumer and publisher together.
    pub async fn new(config: &WrapperConfig) -> Result<Self, WrapperError> {
        info!(
            service = %config.service,
            role = %config.role,
            kafka_broker = %config.kafka_broker,
            kafka_group_id = %config.kafka_group_id,
            booking_api_url = %config.booking_api_url,
            connection_mode = ?config.connection_mode,
            "Initializing dependencies"
        );

        let pool = Self::connect_to_database(
            &config.database_url,
            config.connection_mode,
            config.retry_interval,
        )
        .await?;
        let repository = PostgresIdMappingRepository::new(pool).await?;
        repository.migrate().await?;
        info!("Identifier store ready");

        let api = HttpBookingApi::new(&config.booking_api_url, config.booking_api_timeout)?;
        let vendor = VendorConfig::for_service(config.service).with_base_url(api.base_url());
        let adapter = Arc::new(ServiceAdapter::new(
            vendor,
            Arc::new(api),
            Arc::new(repository),
        ));

        let client_id = format!("propertease-wrapper-{}-{}", config.service, config.role);
        let publisher = KafkaPublisher::new(&ProducerConfig::from_env(
            config.kafka_broker.as_str(),
            client_id,
        ))?;
        info!("Kafka publisher created");

        let consumer = KafkaConsumer::new(&config.kafka_broker, &config.kafka_group_id, config.service)?
            .with_redelivery_backoff(config.redelivery_backoff);
        info!("Kafka consumer created");

        let handler = Arc::new(MessageHandler::new(
            config.role,
            adapter,
            Arc::new(publisher),
        ));
        let orchestrator = Orchestrator::new(Arc::new(consumer), handler);

        Ok(Self { orchestrator })
    }

    /// Connect to the database with retry logic based on connection mode.
    async fn connect_to_database(
        url: &str,
        mode: ConnectionMode,
        retry_interval: Duration,
    ) -> Result<PgPool, WrapperError> {
        loop {
            let attempt = PgPoolOptions::new()
                .max_connections(MAX_DB_CONNECTIONS)
                .connect(url)
                .await;

            match attempt {
                Ok(pool) => return Ok(pool),
                Err(e) => match mode {
                    ConnectionMode::FailFast => return Err(e.into()),
                    ConnectionMode::Retry => {
                        warn!(
                            error = %e,
                            retry_interval_secs = retry_interval.as_secs(),
                            "Failed to connect to the database, retrying..."
                        );
                        sleep(retry_interval).await;
                    }
                },
            }
        }
    }
}
