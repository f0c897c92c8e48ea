//! PostgreSQL Note Store
//!
//! Connection pooling via deadpool-postgres. The store owns the `notes`
//! table: ids come from a `BIGSERIAL` column and `created_at` defaults to
//! `now()`, so both are read back with `RETURNING` on insert.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use deadpool_postgres::{Config, ManagerConfig, Pool, PoolConfig, RecyclingMethod, Runtime};
use std::time::Duration;
use tokio_postgres::{NoTls, Row};

use jotter_core::config::{env_flag, env_or, env_secs, require_positive};
use jotter_core::{
    ConfigError, DependencyUnavailable, LivenessProbe, Note, NoteDraft, NoteId, NoteStore, StorageError,
    StorageResult,
};

const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS notes (
    id          BIGSERIAL PRIMARY KEY,
    title       TEXT        NOT NULL,
    content     TEXT        NOT NULL,
    created_at  TIMESTAMPTZ NOT NULL DEFAULT now()
)";

const INSERT_NOTE_SQL: &str =
    "INSERT INTO notes (title, content) VALUES ($1, $2) RETURNING id, created_at";

const SELECT_NOTE_SQL: &str = "SELECT id, title, content, created_at FROM notes WHERE id = $1";

// ============================================================================
// CONNECTION POOL CONFIGURATION
// ============================================================================

/// Database connection pool configuration.
#[derive(Debug, Clone)]
pub struct PgConfig {
    /// PostgreSQL host
    pub host: String,
    /// PostgreSQL port
    pub port: u16,
    /// Database name
    pub dbname: String,
    /// Database user
    pub user: String,
    /// Database password
    pub password: String,
    /// Maximum pool size
    pub max_size: usize,
    /// How long a caller waits for a pooled connection
    pub timeout: Duration,
    /// Create the `notes` table on startup if it is missing
    pub auto_migrate: bool,
}

impl Default for PgConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            dbname: "jotter".to_string(),
            user: "postgres".to_string(),
            password: "".to_string(),
            max_size: 25,
            timeout: Duration::from_secs(30),
            auto_migrate: true,
        }
    }
}

impl PgConfig {
    /// Create a new database configuration from environment variables.
    ///
    /// Environment variables:
    /// - `JOTTER_DB_HOST`, `JOTTER_DB_PORT`, `JOTTER_DB_NAME`, `JOTTER_DB_USER`, `JOTTER_DB_PASSWORD`
    /// - `JOTTER_DB_POOL_SIZE`: maximum pooled connections (default: 25)
    /// - `JOTTER_DB_TIMEOUT`: seconds allowed for pool checkout, connect and probe (default: 30)
    /// - `JOTTER_DB_AUTO_MIGRATE`: create the schema at startup (default: true)
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let config = Self {
            host: std::env::var("JOTTER_DB_HOST").unwrap_or(defaults.host),
            port: env_or("JOTTER_DB_PORT", defaults.port)?,
            dbname: std::env::var("JOTTER_DB_NAME").unwrap_or(defaults.dbname),
            user: std::env::var("JOTTER_DB_USER").unwrap_or(defaults.user),
            password: std::env::var("JOTTER_DB_PASSWORD").unwrap_or_default(),
            max_size: env_or("JOTTER_DB_POOL_SIZE", defaults.max_size)?,
            timeout: env_secs("JOTTER_DB_TIMEOUT", defaults.timeout)?,
            auto_migrate: env_flag("JOTTER_DB_AUTO_MIGRATE", defaults.auto_migrate)?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// Validates:
    /// - max_size > 0
    /// - timeout > 0
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "JOTTER_DB_POOL_SIZE".to_string(),
                value: self.max_size.to_string(),
                reason: "pool size must be greater than 0".to_string(),
            });
        }
        require_positive("JOTTER_DB_TIMEOUT", self.timeout)
    }

    /// Pool sizing and timeouts. Checkout, connection creation and recycling
    /// all share `timeout`.
    fn pool_config(&self) -> PoolConfig {
        let mut pool_cfg = PoolConfig::new(self.max_size);
        pool_cfg.timeouts.wait = Some(self.timeout);
        pool_cfg.timeouts.create = Some(self.timeout);
        pool_cfg.timeouts.recycle = Some(self.timeout);
        pool_cfg
    }

    /// Create a connection pool from this configuration.
    ///
    /// No connection is opened here; the first checkout does that.
    pub fn create_pool(&self) -> StorageResult<Pool> {
        let mut cfg = Config::new();
        cfg.host = Some(self.host.clone());
        cfg.port = Some(self.port);
        cfg.dbname = Some(self.dbname.clone());
        cfg.user = Some(self.user.clone());
        cfg.password = Some(self.password.clone());
        cfg.connect_timeout = Some(self.timeout);

        cfg.manager = Some(ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        });
        cfg.pool = Some(self.pool_config());

        cfg.create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| StorageError::backend("create pool", e))
    }
}

// ============================================================================
// NOTE STORE
// ============================================================================

/// `NoteStore` backed by a PostgreSQL connection pool.
#[derive(Clone)]
pub struct PgNoteStore {
    pool: Pool,
    ping_timeout: Duration,
}

impl PgNoteStore {
    pub fn new(pool: Pool, ping_timeout: Duration) -> Self {
        Self {
            pool,
            ping_timeout,
        }
    }

    pub fn from_config(config: &PgConfig) -> StorageResult<Self> {
        Ok(Self::new(config.create_pool()?, config.timeout))
    }

    /// Get the current pool size for observability.
    pub fn pool_size(&self) -> usize {
        self.pool.status().size
    }

    async fn get_conn(&self) -> StorageResult<deadpool_postgres::Object> {
        self.pool
            .get()
            .await
            .map_err(|e| StorageError::backend("acquire connection", e))
    }

    /// Create the `notes` table if it does not exist.
    pub async fn ensure_schema(&self) -> StorageResult<()> {
        let conn = self.get_conn().await?;
        conn.batch_execute(SCHEMA_SQL)
            .await
            .map_err(|e| StorageError::backend("create schema", e))?;
        tracing::info!("notes schema ready");
        Ok(())
    }
}

fn note_id_from_row(raw: i64) -> StorageResult<NoteId> {
    NoteId::new(raw)
        .ok_or_else(|| StorageError::backend("decode note", format!("non-positive id {}", raw)))
}

fn note_from_row(row: &Row) -> StorageResult<Note> {
    let decode = |e: tokio_postgres::Error| StorageError::backend("decode note", e);

    let id: i64 = row.try_get("id").map_err(decode)?;
    let created_at: DateTime<Utc> = row.try_get("created_at").map_err(decode)?;

    Ok(Note {
        id: note_id_from_row(id)?,
        title: row.try_get("title").map_err(decode)?,
        content: row.try_get("content").map_err(decode)?,
        created_at,
    })
}

#[async_trait]
impl NoteStore for PgNoteStore {
    async fn create(&self, draft: &NoteDraft) -> StorageResult<Note> {
        let conn = self.get_conn().await?;

        let row = conn
            .query_one(INSERT_NOTE_SQL, &[&draft.title(), &draft.content()])
            .await
            .map_err(|e| StorageError::backend("insert note", e))?;

        let id: i64 = row
            .try_get(0)
            .map_err(|e| StorageError::backend("read generated id", e))?;
        let created_at: DateTime<Utc> = row
            .try_get(1)
            .map_err(|e| StorageError::backend("read created_at", e))?;

        let note = draft.clone().into_note(note_id_from_row(id)?, created_at);
        tracing::debug!(note_id = %note.id, "note inserted");
        Ok(note)
    }

    async fn get_by_id(&self, id: NoteId) -> StorageResult<Note> {
        let conn = self.get_conn().await?;

        let row = conn
            .query_opt(SELECT_NOTE_SQL, &[&id.get()])
            .await
            .map_err(|e| StorageError::backend("select note", e))?;

        match row {
            Some(row) => note_from_row(&row),
            None => Err(StorageError::NotFound { id }),
        }
    }
}

#[async_trait]
impl LivenessProbe for PgNoteStore {
    fn name(&self) -> &str {
        "PostgreSQL"
    }

    async fn ping(&self) -> Result<(), DependencyUnavailable> {
        let check = async {
            let conn = self.pool.get().await.map_err(DependencyUnavailable::new)?;

            // Simple query to verify connectivity
            conn.query_one("SELECT 1", &[])
                .await
                .map_err(DependencyUnavailable::new)?;

            Ok::<(), DependencyUnavailable>(())
        };

        tokio::time::timeout(self.ping_timeout, check)
            .await
            .unwrap_or_else(|_| {
                Err(DependencyUnavailable::new(format!(
                    "timed out after {:?}",
                    self.ping_timeout
                )))
            })
    }
}
