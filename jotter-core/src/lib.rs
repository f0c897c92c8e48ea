//! Jotter Core - Note Types and Backend Ports
//!
//! Pure data structures, the error taxonomy, and the narrow capability
//! traits the orchestrators depend on. Nothing in this crate talks to a
//! network; concrete adapters live in `jotter-storage`.

pub mod config;
pub mod entities;
pub mod error;
pub mod health;
pub mod identity;
pub mod ports;

pub use entities::{cache_key, Note, NoteDraft, CACHE_KEY_PREFIX};
pub use error::{
    CacheError, CacheResult, ConfigError, DependencyUnavailable, NoteError, NoteResult,
    StorageError, StorageResult, ValidationError,
};
pub use health::{HealthStatus, LivenessReport, ProbeOutcome};
pub use identity::{NoteId, Timestamp};
pub use ports::{LivenessProbe, NoteCache, NoteStore};
