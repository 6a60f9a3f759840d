//! # Structured Logging
//!
//! Environment-aware tracing initialization. Development and test get
//! human-readable console output; production swaps to JSON lines for
//! log shipping. `RUST_LOG` overrides the per-environment default
//! filter. Initialization is idempotent, later calls are no-ops.

use std::sync::OnceLock;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize structured logging with environment-specific configuration
pub fn init_structured_logging() {
    LOGGER_INITIALIZED.get_or_init(|| {
        let environment = get_environment();
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_log_level(&environment)));

        let registry = tracing_subscriber::registry().with(filter);

        let init_result = if environment == "production" {
            registry
                .with(
                    fmt::layer()
                        .with_target(true)
                        .with_ansi(false)
                        .json(),
                )
                .try_init()
        } else {
            registry
                .with(
                    fmt::layer()
                        .with_target(true)
                        .with_level(true)
                        .with_ansi(true),
                )
                .try_init()
        };

        // A subscriber installed by the embedding application wins
        if init_result.is_err() {
            tracing::debug!(
                "Global tracing subscriber already initialized, continuing with existing one"
            );
        }

        tracing::info!(environment = %environment, "Structured logging initialized");
    });
}

fn get_environment() -> String {
    std::env::var("OFFERFLOW_ENV")
        .or_else(|_| std::env::var("APP_ENV"))
        .or_else(|_| std::env::var("RUST_ENV"))
        .unwrap_or_else(|_| "development".to_string())
        .to_lowercase()
}

/// Default filter directive for an environment
fn default_log_level(environment: &str) -> String {
    match environment {
        "production" => "info".to_string(),
        _ => "debug".to_string(),
    }
}
