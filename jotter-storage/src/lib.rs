//! Jotter Storage - Backend Adapters
//!
//! Production implementations of the `jotter-core` ports:
//! - `PgNoteStore`: authoritative note store and PostgreSQL liveness probe
//! - `RedisNoteCache`: best-effort note cache and Redis liveness probe

pub mod postgres;
pub mod redis_cache;

pub use postgres::{PgConfig, PgNoteStore};
pub use redis_cache::{RedisConfig, RedisNoteCache, DEFAULT_TTL};
