//! Service Configuration
//!
//! Everything the process needs is read from the environment once, in
//! `main`, and passed down explicitly.
//!
//! Environment variables:
//! - `JOTTER_GRPC_HOST`: bind host (default: 0.0.0.0)
//! - `JOTTER_GRPC_PORT`: bind port (default: 50051)
//! - `JOTTER_GRPC_REQUEST_TIMEOUT_SECS`: per-request deadline (default: 30)
//! - `JOTTER_GRPC_PING_TIMEOUT_SECS`: per-backend bound inside Ping (default: 5)
//! - `JOTTER_GRPC_REFLECTION`: serve gRPC reflection (default: true)
//! - `JOTTER_DB_*`, `JOTTER_REDIS_*`, `JOTTER_CACHE_TTL_SECS`: see `jotter-storage`
//! - `JOTTER_LOG_FORMAT`: `json` or `pretty` (default: json)

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use jotter_core::ConfigError;
use jotter_storage::{PgConfig, RedisConfig};

use crate::telemetry::TelemetryConfig;

// ============================================================================
// GRPC SERVER CONFIGURATION
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrpcConfig {
    pub host: String,
    pub port: u16,
    /// Deadline applied to every request when the client sends none
    pub request_timeout: Duration,
    /// Longest Ping waits on each backend before reporting it unavailable
    pub ping_timeout: Duration,
    /// Register the `grpc.reflection.v1` service
    pub reflection: bool,
}

impl Default for GrpcConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 50051,
            request_timeout: Duration::from_secs(30),
            ping_timeout: Duration::from_secs(5),
            reflection: true,
        }
    }
}

impl GrpcConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let port = match std::env::var("JOTTER_GRPC_PORT") {
            Ok(raw) => parse_port(&raw)?,
            Err(_) => defaults.port,
        };

        let request_timeout =
            positive_secs("JOTTER_GRPC_REQUEST_TIMEOUT_SECS", defaults.request_timeout)?;
        let ping_timeout = positive_secs("JOTTER_GRPC_PING_TIMEOUT_SECS", defaults.ping_timeout)?;

        Ok(Self {
            host: std::env::var("JOTTER_GRPC_HOST").unwrap_or(defaults.host),
            port,
            request_timeout,
            ping_timeout,
            reflection: std::env::var("JOTTER_GRPC_REFLECTION")
                .map(|s| s.to_lowercase() != "false" && s != "0")
                .unwrap_or(defaults.reflection),
        })
    }

    /// Socket address to bind.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip: IpAddr = self.host.parse().map_err(|_| ConfigError::InvalidValue {
            field: "JOTTER_GRPC_HOST".to_string(),
            value: self.host.clone(),
            reason: "expected an IP address".to_string(),
        })?;
        Ok(SocketAddr::new(ip, self.port))
    }
}

fn positive_secs(field: &str, default: Duration) -> Result<Duration, ConfigError> {
    match std::env::var(field) {
        Ok(raw) => raw
            .trim()
            .parse::<u64>()
            .ok()
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .ok_or_else(|| ConfigError::InvalidValue {
                field: field.to_string(),
                value: raw.clone(),
                reason: "expected a positive number of seconds".to_string(),
            }),
        Err(_) => Ok(default),
    }
}

fn parse_port(raw: &str) -> Result<u16, ConfigError> {
    raw.trim()
        .parse::<u16>()
        .ok()
        .filter(|port| *port != 0)
        .ok_or_else(|| ConfigError::InvalidValue {
            field: "JOTTER_GRPC_PORT".to_string(),
            value: raw.to_string(),
            reason: "expected a port between 1 and 65535".to_string(),
        })
}

// ============================================================================
// SERVICE CONFIGURATION
// ============================================================================

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub grpc: GrpcConfig,
    pub db: PgConfig,
    pub cache: RedisConfig,
    pub telemetry: TelemetryConfig,
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            grpc: GrpcConfig::from_env()?,
            db: PgConfig::from_env()?,
            cache: RedisConfig::from_env()?,
            telemetry: TelemetryConfig::from_env()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // The process environment is shared by every test thread.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    struct EnvVarGuard {
        key: &'static str,
        original: Option<String>,
    }

    impl EnvVarGuard {
        fn set(key: &'static str, value: Option<&str>) -> Self {
            let original = std::env::var(key).ok();
            match value {
                Some(v) => std::env::set_var(key, v),
                None => std::env::remove_var(key),
            }
            Self { key, original }
        }
    }

    impl Drop for EnvVarGuard {
        fn drop(&mut self) {
            match self.original.as_deref() {
                Some(v) => std::env::set_var(self.key, v),
                None => std::env::remove_var(self.key),
            }
        }
    }

    fn clear_grpc_env() -> Vec<EnvVarGuard> {
        [
            "JOTTER_GRPC_HOST",
            "JOTTER_GRPC_PORT",
            "JOTTER_GRPC_REQUEST_TIMEOUT_SECS",
            "JOTTER_GRPC_PING_TIMEOUT_SECS",
            "JOTTER_GRPC_REFLECTION",
            "JOTTER_LOG_FORMAT",
        ]
        .into_iter()
        .map(|key| EnvVarGuard::set(key, None))
        .collect()
    }

    #[test]
    fn test_defaults() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let _guards = clear_grpc_env();

        let config = GrpcConfig::from_env().unwrap();
        assert_eq!(config, GrpcConfig::default());
        assert_eq!(
            config.bind_addr().unwrap(),
            "0.0.0.0:50051".parse::<SocketAddr>().unwrap()
        );
    }

    #[test]
    fn test_overrides() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let _guards = clear_grpc_env();
        let _host = EnvVarGuard::set("JOTTER_GRPC_HOST", Some("127.0.0.1"));
        let _port = EnvVarGuard::set("JOTTER_GRPC_PORT", Some("6000"));
        let _timeout = EnvVarGuard::set("JOTTER_GRPC_REQUEST_TIMEOUT_SECS", Some("5"));
        let _ping = EnvVarGuard::set("JOTTER_GRPC_PING_TIMEOUT_SECS", Some("2"));
        let _reflection = EnvVarGuard::set("JOTTER_GRPC_REFLECTION", Some("false"));

        let config = GrpcConfig::from_env().unwrap();
        assert_eq!(config.port, 6000);
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert_eq!(config.ping_timeout, Duration::from_secs(2));
        assert!(!config.reflection);
        assert_eq!(
            config.bind_addr().unwrap(),
            "127.0.0.1:6000".parse::<SocketAddr>().unwrap()
        );
    }

    #[test]
    fn test_invalid_port_is_rejected() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let _guards = clear_grpc_env();

        for raw in ["not-a-port", "70000", "0"] {
            let _port = EnvVarGuard::set("JOTTER_GRPC_PORT", Some(raw));
            let err = GrpcConfig::from_env().unwrap_err();
            assert!(err.to_string().contains("JOTTER_GRPC_PORT"), "{raw}: {err}");
        }
    }

    #[test]
    fn test_invalid_timeout_is_rejected() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let _guards = clear_grpc_env();
        let _timeout = EnvVarGuard::set("JOTTER_GRPC_REQUEST_TIMEOUT_SECS", Some("soon"));

        assert!(GrpcConfig::from_env().is_err());
    }

    #[test]
    fn test_zero_ping_timeout_is_rejected() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let _guards = clear_grpc_env();
        let _ping = EnvVarGuard::set("JOTTER_GRPC_PING_TIMEOUT_SECS", Some("0"));

        let err = GrpcConfig::from_env().unwrap_err();
        assert!(err.to_string().contains("JOTTER_GRPC_PING_TIMEOUT_SECS"));
    }

    #[test]
    fn test_unparsable_host() {
        let config = GrpcConfig {
            host: "not an ip".to_string(),
            ..GrpcConfig::default()
        };
        assert!(config.bind_addr().is_err());
    }

    #[test]
    fn test_service_config_rejects_bad_log_format() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let _guards = clear_grpc_env();
        let _format = EnvVarGuard::set("JOTTER_LOG_FORMAT", Some("xml"));

        assert!(ServiceConfig::from_env().is_err());
    }

    #[test]
    fn test_service_config_rejects_bad_backend_values() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let _guards = clear_grpc_env();

        for (key, raw) in [
            ("JOTTER_CACHE_TTL_SECS", "0"),
            ("JOTTER_REDIS_PORT", "six-three-seven-nine"),
            ("JOTTER_DB_PORT", "not-a-port"),
        ] {
            let _bad = EnvVarGuard::set(key, Some(raw));
            let err = ServiceConfig::from_env().unwrap_err();
            assert!(err.to_string().contains(key), "{key}: {err}");
        }
    }
}
