//! Backend ports.
//!
//! Each external dependency is reached through one narrow async trait with
//! exactly the operations the orchestrators need. Production adapters live
//! in `jotter-storage`; test doubles live in `jotter-test-utils`.
//!
//! Implementations must be safe for concurrent use: the orchestrators share a
//! single instance across every in-flight request. Cancellation is by drop;
//! an implementation must not leave shared state inconsistent if its future
//! is dropped mid-call.

use async_trait::async_trait;

use crate::entities::{Note, NoteDraft};
use crate::error::{CacheResult, DependencyUnavailable, StorageResult};
use crate::identity::NoteId;

/// Authoritative note persistence.
#[async_trait]
pub trait NoteStore: Send + Sync {
    /// Insert a note and return it with its generated id and creation time.
    async fn create(&self, draft: &NoteDraft) -> StorageResult<Note>;

    /// Point lookup. Returns `StorageError::NotFound` when no row matches.
    async fn get_by_id(&self, id: NoteId) -> StorageResult<Note>;
}

/// Best-effort key-value cache of opaque string blobs.
///
/// Entries expire after a fixed TTL chosen by the implementation.
#[async_trait]
pub trait NoteCache: Send + Sync {
    async fn set(&self, key: &str, value: &str) -> CacheResult<()>;

    /// `Ok(None)` means the key is absent; `Err` is reserved for backend
    /// failures.
    async fn get(&self, key: &str) -> CacheResult<Option<String>>;

    async fn delete(&self, key: &str) -> CacheResult<()>;
}

/// Health probe for one backend.
#[async_trait]
pub trait LivenessProbe: Send + Sync {
    /// Human-readable backend name used in liveness messages.
    fn name(&self) -> &str;

    async fn ping(&self) -> Result<(), DependencyUnavailable>;
}
