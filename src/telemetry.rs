//! Log subscriber setup for hosts that do not install their own.
//!
//! Library code only emits `tracing` events; nothing is printed until a host
//! calls [`init_logging`] (or installs a subscriber of its own).

use anyhow::{Context, Result};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::config::{LogConfig, LogFormat};

/// Build the filter: `RUST_LOG` when set and valid, otherwise the configured level.
fn build_filter(config: &LogConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.level.as_str()))
        .unwrap_or_else(|e| {
            eprintln!(
                "Warning: invalid log level '{}' ({e}), falling back to info",
                config.level
            );
            EnvFilter::new("info")
        })
}

/// Install a global `tracing` subscriber.
///
/// Fails if a global subscriber is already set; callers that may race (tests)
/// can ignore the error.
///
/// ```rust,no_run
/// use conneg::config::NegotiatorConfig;
///
/// let config = NegotiatorConfig::from_env();
/// conneg::telemetry::init_logging(&config.log).expect("Failed to initialize logging");
/// ```
pub fn init_logging(config: &LogConfig) -> Result<()> {
    let fmt_layer = match config.format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(true)
            .with_target(true)
            .boxed(),
        LogFormat::Text => tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(build_filter(config))
        .with(fmt_layer)
        .try_init()
        .context("Failed to initialize logging")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_is_rejected() {
        let config = LogConfig {
            level: "not a [valid directive".to_string(),
            format: LogFormat::Json,
        };
        // Invalid level falls back to info; once installed, a second install fails.
        let _first = init_logging(&config);
        assert!(init_logging(&LogConfig::default()).is_err());
    }
}
