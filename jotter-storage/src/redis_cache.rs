//! Redis note cache.
//!
//! Uses a `ConnectionManager`, which multiplexes commands over one
//! connection and reconnects on its own. The manager is created on first
//! use so the service can start while Redis is down.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::future::Future;
use std::time::Duration;
use tokio::sync::OnceCell;

use jotter_core::config::{env_or, env_secs, require_positive};
use jotter_core::{
    CacheError, CacheResult, ConfigError, DependencyUnavailable, LivenessProbe, NoteCache,
};

/// Default entry lifetime: 24 hours.
pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Redis connection configuration.
#[derive(Debug, Clone)]
pub struct RedisConfig {
    pub host: String,
    pub port: u16,
    pub password: Option<String>,
    pub db: i64,
    /// Fixed expiry applied to every `set`
    pub ttl: Duration,
    /// Upper bound on establishing the initial connection
    pub connect_timeout: Duration,
    /// Upper bound on every command once connected
    pub command_timeout: Duration,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 6379,
            password: None,
            db: 0,
            ttl: DEFAULT_TTL,
            connect_timeout: Duration::from_secs(5),
            command_timeout: Duration::from_secs(2),
        }
    }
}

impl RedisConfig {
    /// Create a new cache configuration from environment variables.
    ///
    /// Environment variables:
    /// - `JOTTER_REDIS_HOST`, `JOTTER_REDIS_PORT`, `JOTTER_REDIS_PASSWORD`, `JOTTER_REDIS_DB`
    /// - `JOTTER_CACHE_TTL_SECS`: entry lifetime (default: 86400)
    /// - `JOTTER_REDIS_CONNECT_TIMEOUT_SECS`: initial connect bound (default: 5)
    /// - `JOTTER_REDIS_COMMAND_TIMEOUT_SECS`: per-command bound (default: 2)
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let config = Self {
            host: std::env::var("JOTTER_REDIS_HOST").unwrap_or(defaults.host),
            port: env_or("JOTTER_REDIS_PORT", defaults.port)?,
            password: std::env::var("JOTTER_REDIS_PASSWORD")
                .ok()
                .filter(|s| !s.is_empty()),
            db: env_or("JOTTER_REDIS_DB", defaults.db)?,
            ttl: env_secs("JOTTER_CACHE_TTL_SECS", defaults.ttl)?,
            connect_timeout: env_secs(
                "JOTTER_REDIS_CONNECT_TIMEOUT_SECS",
                defaults.connect_timeout,
            )?,
            command_timeout: env_secs(
                "JOTTER_REDIS_COMMAND_TIMEOUT_SECS",
                defaults.command_timeout,
            )?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// Validates:
    /// - ttl > 0 (Redis rejects `SETEX key 0`)
    /// - db >= 0
    /// - both timeouts > 0
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_positive("JOTTER_CACHE_TTL_SECS", self.ttl)?;
        if self.db < 0 {
            return Err(ConfigError::InvalidValue {
                field: "JOTTER_REDIS_DB".to_string(),
                value: self.db.to_string(),
                reason: "database index must be non-negative".to_string(),
            });
        }
        require_positive("JOTTER_REDIS_CONNECT_TIMEOUT_SECS", self.connect_timeout)?;
        require_positive("JOTTER_REDIS_COMMAND_TIMEOUT_SECS", self.command_timeout)
    }

    /// Connection URL in `redis://[:password@]host:port/db` form.
    pub fn url(&self) -> String {
        match &self.password {
            Some(password) => format!(
                "redis://:{}@{}:{}/{}",
                password, self.host, self.port, self.db
            ),
            None => format!("redis://{}:{}/{}", self.host, self.port, self.db),
        }
    }
}

/// `NoteCache` backed by Redis.
pub struct RedisNoteCache {
    client: redis::Client,
    manager: OnceCell<ConnectionManager>,
    ttl: Duration,
    connect_timeout: Duration,
    command_timeout: Duration,
}

impl RedisNoteCache {
    /// Build the client. Only the URL is validated here; no I/O happens.
    pub fn from_config(config: &RedisConfig) -> CacheResult<Self> {
        let client =
            redis::Client::open(config.url()).map_err(|e| CacheError::backend("open client", e))?;

        Ok(Self {
            client,
            manager: OnceCell::new(),
            ttl: config.ttl,
            connect_timeout: config.connect_timeout,
            command_timeout: config.command_timeout,
        })
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    async fn connection(&self) -> CacheResult<ConnectionManager> {
        self.manager
            .get_or_try_init(|| async {
                let connect = ConnectionManager::new(self.client.clone());
                match tokio::time::timeout(self.connect_timeout, connect).await {
                    Ok(result) => result.map_err(|e| CacheError::backend("connect", e)),
                    Err(_) => Err(CacheError::backend(
                        "connect",
                        format!("timed out after {:?}", self.connect_timeout),
                    )),
                }
            })
            .await
            .cloned()
    }

    /// Run one command under `command_timeout`.
    async fn bounded<T, F>(&self, operation: &str, command: F) -> CacheResult<T>
    where
        F: Future<Output = redis::RedisResult<T>>,
    {
        match tokio::time::timeout(self.command_timeout, command).await {
            Ok(result) => result.map_err(|e| CacheError::backend(operation, e)),
            Err(_) => Err(CacheError::backend(
                operation,
                format!("timed out after {:?}", self.command_timeout),
            )),
        }
    }
}

#[async_trait]
impl NoteCache for RedisNoteCache {
    async fn set(&self, key: &str, value: &str) -> CacheResult<()> {
        let mut conn = self.connection().await?;
        let _: () = self
            .bounded("set", conn.set_ex(key, value, self.ttl.as_secs()))
            .await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let mut conn = self.connection().await?;
        let value: Option<String> = self.bounded("get", conn.get(key)).await?;
        Ok(value)
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        let mut conn = self.connection().await?;
        let _: () = self.bounded("delete", conn.del(key)).await?;
        Ok(())
    }
}

#[async_trait]
impl LivenessProbe for RedisNoteCache {
    fn name(&self) -> &str {
        "Redis"
    }

    async fn ping(&self) -> Result<(), DependencyUnavailable> {
        let mut conn = self.connection().await.map_err(DependencyUnavailable::new)?;
        let _: () = self
            .bounded("ping", redis::cmd("PING").query_async(&mut conn))
            .await
            .map_err(DependencyUnavailable::new)?;
        Ok(())
    }
}
