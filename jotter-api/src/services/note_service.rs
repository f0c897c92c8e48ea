//! Note Service
//!
//! Create and read orchestration over the store and cache ports. The store
//! is authoritative. The cache is a best-effort side channel: its failures
//! are logged and counted, never returned.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use jotter_core::{
    cache_key, CacheError, CacheResult, Note, NoteCache, NoteDraft, NoteId, NoteResult, NoteStore,
};

/// Longest the orchestrator waits on any single cache call.
pub const DEFAULT_CACHE_TIMEOUT: Duration = Duration::from_secs(2);

/// Cache effectiveness counters.
#[derive(Debug, Default)]
struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
    read_failures: AtomicU64,
    write_failures: AtomicU64,
}

/// Point-in-time copy of the cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStatsSnapshot {
    /// Reads answered from the cache.
    pub hits: u64,
    /// Reads where the key was absent.
    pub misses: u64,
    /// Reads where the cache errored or held an undecodable entry.
    pub read_failures: u64,
    /// Writes that were dropped after creating a note.
    pub write_failures: u64,
}

impl CacheStatsSnapshot {
    /// Calculate the hit rate (0.0 to 1.0) over all cache reads.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses + self.read_failures;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Note orchestrator.
///
/// Stateless apart from atomic counters, so one instance serves every
/// request concurrently.
pub struct NoteInteractor {
    store: Arc<dyn NoteStore>,
    cache: Arc<dyn NoteCache>,
    cache_timeout: Duration,
    stats: CacheStats,
}

impl NoteInteractor {
    pub fn new(store: Arc<dyn NoteStore>, cache: Arc<dyn NoteCache>) -> Self {
        Self {
            store,
            cache,
            cache_timeout: DEFAULT_CACHE_TIMEOUT,
            stats: CacheStats::default(),
        }
    }

    /// Override the per-call cache bound. A slow cache then counts as a
    /// failed cache call instead of stalling the request.
    pub fn with_cache_timeout(mut self, cache_timeout: Duration) -> Self {
        self.cache_timeout = cache_timeout;
        self
    }

    /// Persist a note, then write it to the cache.
    ///
    /// A store failure aborts the call. A cache failure does not change the
    /// returned note.
    #[tracing::instrument(skip(self, draft), fields(title_len = draft.title().len()))]
    pub async fn create_note(&self, draft: NoteDraft) -> NoteResult<Note> {
        let note = self.store.create(&draft).await?;
        tracing::info!(note_id = %note.id, "note created");

        self.write_to_cache(&note).await;
        Ok(note)
    }

    /// Fetch a note, answering from the cache when it holds a valid entry.
    ///
    /// Misses, cache errors and undecodable entries fall through to the
    /// store, whose answer is final.
    #[tracing::instrument(skip(self), fields(note_id = %id))]
    pub async fn get_note(&self, id: NoteId) -> NoteResult<Note> {
        if let Some(note) = self.read_from_cache(id).await {
            return Ok(note);
        }

        let note = self.store.get_by_id(id).await?;
        Ok(note)
    }

    pub fn stats(&self) -> CacheStatsSnapshot {
        CacheStatsSnapshot {
            hits: self.stats.hits.load(Ordering::Relaxed),
            misses: self.stats.misses.load(Ordering::Relaxed),
            read_failures: self.stats.read_failures.load(Ordering::Relaxed),
            write_failures: self.stats.write_failures.load(Ordering::Relaxed),
        }
    }

    async fn bounded<T>(
        &self,
        operation: &str,
        call: impl Future<Output = CacheResult<T>>,
    ) -> CacheResult<T> {
        tokio::time::timeout(self.cache_timeout, call)
            .await
            .unwrap_or_else(|_| {
                Err(CacheError::backend(
                    operation,
                    format!("timed out after {:?}", self.cache_timeout),
                ))
            })
    }

    async fn write_to_cache(&self, note: &Note) {
        let key = note.cache_key();

        let written = match serde_json::to_string(note) {
            Ok(value) => self.bounded("set", self.cache.set(&key, &value)).await,
            Err(err) => Err(CacheError::from(err)),
        };

        if let Err(err) = written {
            self.stats.write_failures.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(%key, error = %err, "cache write dropped");
        }
    }

    async fn read_from_cache(&self, id: NoteId) -> Option<Note> {
        let key = cache_key(id);

        let raw = match self.bounded("get", self.cache.get(&key)).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                self.stats.misses.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(%key, "cache miss");
                return None;
            }
            Err(err) => {
                self.stats.read_failures.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(%key, error = %err, "cache read failed, using store");
                return None;
            }
        };

        match serde_json::from_str::<Note>(&raw).map_err(CacheError::from) {
            Ok(note) if note.id == id => {
                self.stats.hits.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(%key, "cache hit");
                Some(note)
            }
            Ok(note) => {
                self.stats.read_failures.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(%key, cached_id = %note.id, "cache entry holds another note, evicting");
                self.evict(&key).await;
                None
            }
            Err(err) => {
                self.stats.read_failures.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(%key, error = %err, "cache entry undecodable, evicting");
                self.evict(&key).await;
                None
            }
        }
    }

    async fn evict(&self, key: &str) {
        if let Err(err) = self.bounded("delete", self.cache.delete(key)).await {
            tracing::warn!(%key, error = %err, "cache eviction failed");
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
