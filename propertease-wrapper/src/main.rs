//! PropertEase Wrapper Main Entry Point
//!
//! Runs one wrapper: a booking service and handler role chosen through the
//! environment, consuming from Kafka until the stream ends or the process is
//! interrupted.

use dotenv::dotenv;
use propertease_wrapper::{Dependencies, WrapperConfig, WrapperError};
use std::env;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize tracing/logging.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("propertease_wrapper=info,propertease_wrapper_pipeline=info")
    });

    let json = env::var("LOG_FORMAT")
        .map(|format| format.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(true),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_target(true).pretty())
            .init();
    }

    info!(
        service_name = "propertease-wrapper",
        service_version = env!("CARGO_PKG_VERSION"),
        json,
        "Tracing initialized"
    );
}

#[tokio::main]
async fn main() -> Result<(), WrapperError> {
    dotenv().ok();

    init_tracing();

    let config = WrapperConfig::from_env().inspect_err(|e| {
        error!(error = %e, "Invalid configuration");
    })?;

    info!(service = %config.service, role = %config.role, "Starting PropertEase wrapper");

    let mut deps = match Dependencies::new(&config).await {
        Ok(deps) => {
            info!("Dependencies initialized successfully");
            deps
        }
        Err(e) => {
            error!(error = %e, "Failed to initialize dependencies");
            return Err(e);
        }
    };

    match deps.orchestrator.run().await {
        Ok(()) => {
            info!("Wrapper stopped");
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Wrapper failed");
            Err(e.into())
        }
    }
}
