//! Structured logging.
//!
//! `RUST_LOG` wins over the configured level. JSON output is meant for
//! production, the pretty format for development.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::schema::ObservabilityConfig;

/// Build the filter for `level`, applied to this crate and the HTTP layer.
pub fn filter_for(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("subscription_relayer={level},tower_http={level}"))
    })
}

/// Install the global subscriber. Calling this twice is an error from
/// `tracing_subscriber`, which is reported and otherwise ignored.
pub fn init(config: &ObservabilityConfig) {
    let filter = filter_for(&config.log_level);

    let result = if config.log_format.eq_ignore_ascii_case("json") {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .try_init()
    };

    if let Err(e) = result {
        eprintln!("logging already initialized: {e}");
    }
}
