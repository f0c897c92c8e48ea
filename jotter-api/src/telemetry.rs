//! Tracing Subscriber Initialization
//!
//! One global subscriber per process: an `EnvFilter` taken from `RUST_LOG`
//! (with a crate-scoped default) feeding either a JSON or a human-readable
//! fmt layer.

use std::str::FromStr;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use jotter_core::ConfigError;

/// Filter used when `RUST_LOG` is unset or unparsable.
pub const DEFAULT_FILTER: &str = "jotter_api=debug,jotter_storage=debug,info";

/// Output format of the fmt layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "pretty" => Ok(LogFormat::Pretty),
            other => Err(ConfigError::InvalidValue {
                field: "JOTTER_LOG_FORMAT".to_string(),
                value: other.to_string(),
                reason: "expected `json` or `pretty`".to_string(),
            }),
        }
    }
}

/// Telemetry configuration from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryConfig {
    pub log_format: LogFormat,
    /// Directive string applied when `RUST_LOG` is absent
    pub default_filter: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_format: LogFormat::default(),
            default_filter: DEFAULT_FILTER.to_string(),
        }
    }
}

impl TelemetryConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let log_format = match std::env::var("JOTTER_LOG_FORMAT") {
            Ok(raw) if !raw.trim().is_empty() => raw.parse()?,
            _ => LogFormat::default(),
        };

        Ok(Self {
            log_format,
            ..Self::default()
        })
    }

    fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.default_filter))
    }
}

/// Install the global tracing subscriber.
///
/// Fails if a subscriber is already installed.
pub fn init_tracing(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let registry = tracing_subscriber::registry().with(config.env_filter());

    match config.log_format {
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_target(true),
            )
            .try_init(),
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().pretty().with_target(true))
            .try_init(),
    }
    .map_err(|e| TelemetryError(e.to_string()))?;

    tracing::info!(format = ?config.log_format, "tracing initialized");
    Ok(())
}

/// The global subscriber could not be installed.
#[derive(Debug, thiserror::Error)]
#[error("failed to install tracing subscriber: {0}")]
pub struct TelemetryError(String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_parsing() {
        assert_eq!("json".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!(" Pretty ".parse::<LogFormat>().unwrap(), LogFormat::Pretty);

        let err = "xml".parse::<LogFormat>().unwrap_err();
        assert!(err.to_string().contains("JOTTER_LOG_FORMAT"));
    }

    #[test]
    fn test_default_config() {
        let config = TelemetryConfig::default();
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.default_filter, DEFAULT_FILTER);
    }

    #[test]
    fn test_second_init_fails() {
        let config = TelemetryConfig {
            log_format: LogFormat::Pretty,
            ..TelemetryConfig::default()
        };
        let _ = init_tracing(&config);
        assert!(init_tracing(&config).is_err());
    }
}
