//! Environment configuration for a wrapper process.

mod dependencies;

pub use dependencies::Dependencies;

use std::env;
use std::time::Duration;

use propertease_wrapper_pipeline::adapter::default_base_url;
use propertease_wrapper_pipeline::handler::HandlerRole;
use propertease_wrapper_shared::Service;
use tracing::warn;

use crate::WrapperError;

/// Default Kafka broker address.
const DEFAULT_KAFKA_BROKER: &str = "localhost:9092";

/// Default connection retry interval in seconds.
const DEFAULT_RETRY_INTERVAL_SECS: u64 = 15;

const DEFAULT_BOOKING_API_TIMEOUT_SECS: u64 = 10;

const DEFAULT_REDELIVERY_BACKOFF_MS: u64 = 1000;

/// Connection mode for the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionMode {
    /// Fail immediately if connection fails.
    FailFast,
    /// Retry the connection until it succeeds.
    Retry,
}

impl ConnectionMode {
    /// Valid values: "fail-fast" or "retry" (case-insensitive).
    /// Anything else falls back to "retry".
    fn parse(value: &str) -> Self {
        match value.to_lowercase().as_str() {
            "fail-fast" | "failfast" | "fail_fast" => Self::FailFast,
            "retry" => Self::Retry,
            other => {
                warn!(value = other, "Invalid DATABASE_CONNECTION_MODE, defaulting to 'retry'");
                Self::Retry
            }
        }
    }
}

/// Everything a wrapper process reads from its environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrapperConfig {
    pub service: Service,
    pub role: HandlerRole,
    pub database_url: String,
    pub connection_mode: ConnectionMode,
    pub retry_interval: Duration,
    pub kafka_broker: String,
    pub kafka_group_id: String,
    pub booking_api_url: String,
    pub booking_api_timeout: Duration,
    pub redelivery_backoff: Duration,
}

impl WrapperConfig {
    /// Reads the configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `WRAPPER_SERVICE`: booking service to wrap (required)
    /// - `WRAPPER_ROLE`: handler role (default: regular)
    /// - `DATABASE_URL`: identifier store connection string (required)
    /// - `DATABASE_CONNECTION_MODE`: "fail-fast" or "retry" (default: retry)
    /// - `DATABASE_RETRY_INTERVAL_SECS`: retry interval in seconds (default: 15)
    /// - `KAFKA_BROKER`: Kafka broker address (default: localhost:9092)
    /// - `KAFKA_GROUP_ID`: consumer group ID (default: `{service}_{role}`, with the
    ///   property role joining `{service}_regular`)
    /// - `BOOKING_API_URL`: booking service base URL (default: the service's local address)
    /// - `BOOKING_API_TIMEOUT_SECS`: per-request timeout (default: 10)
    /// - `REDELIVERY_BACKOFF_MS`: pause before a failed message is redelivered (default: 1000)
    pub fn from_env() -> Result<Self, WrapperError> {
        let service: Service = required("WRAPPER_SERVICE")?
            .parse()
            .map_err(|e| WrapperError::config(format!("WRAPPER_SERVICE: {e}")))?;
        let role: HandlerRole = env::var("WRAPPER_ROLE")
            .unwrap_or_else(|_| HandlerRole::Regular.to_string())
            .parse()
            .map_err(|e| WrapperError::config(format!("WRAPPER_ROLE: {e}")))?;
        let database_url = required("DATABASE_URL")?;

        let connection_mode = env::var("DATABASE_CONNECTION_MODE")
            .map(|value| ConnectionMode::parse(&value))
            .unwrap_or(ConnectionMode::Retry);
        let kafka_group_id =
            env::var("KAFKA_GROUP_ID").unwrap_or_else(|_| default_group_id(service, role));

        Ok(Self {
            service,
            role,
            database_url,
            connection_mode,
            retry_interval: Duration::from_secs(number_or(
                "DATABASE_RETRY_INTERVAL_SECS",
                DEFAULT_RETRY_INTERVAL_SECS,
            )),
            kafka_broker: env::var("KAFKA_BROKER")
                .unwrap_or_else(|_| DEFAULT_KAFKA_BROKER.to_string()),
            kafka_group_id,
            booking_api_url: env::var("BOOKING_API_URL")
                .unwrap_or_else(|_| default_base_url(service).to_string()),
            booking_api_timeout: Duration::from_secs(number_or(
                "BOOKING_API_TIMEOUT_SECS",
                DEFAULT_BOOKING_API_TIMEOUT_SECS,
            )),
            redelivery_backoff: Duration::from_millis(number_or(
                "REDELIVERY_BACKOFF_MS",
                DEFAULT_REDELIVERY_BACKOFF_MS,
            )),
        })
    }
}

/// Property handlers compete with regular handlers for the same messages.
fn default_group_id(service: Service, role: HandlerRole) -> String {
    let role = match role {
        HandlerRole::Property => HandlerRole::Regular,
        other => other,
    };
    format!("{service}_{role}")
}

fn required(name: &str) -> Result<String, WrapperError> {
    env::var(name).map_err(|_| WrapperError::config(format!("{name} must be set")))
}

fn number_or(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .unwrap_or(default)
}
