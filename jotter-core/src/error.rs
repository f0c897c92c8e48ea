//! Error types for Jotter operations

use thiserror::Error;

use crate::identity::NoteId;

/// Bad caller input. Raised before any backend is contacted.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{field} is required")]
    RequiredFieldMissing { field: String },
}

/// Relational store errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("note with id {id} not found")]
    NotFound { id: NoteId },

    #[error("{operation} failed: {reason}")]
    Backend { operation: String, reason: String },
}

impl StorageError {
    pub fn backend(operation: impl Into<String>, reason: impl ToString) -> Self {
        Self::Backend {
            operation: operation.into(),
            reason: reason.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Key-value cache errors. A missing key is not an error; see
/// [`crate::NoteCache::get`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheError {
    #[error("cache {operation} failed: {reason}")]
    Backend { operation: String, reason: String },

    #[error("cache entry could not be (de)serialized: {reason}")]
    Serialization { reason: String },
}

impl CacheError {
    pub fn backend(operation: impl Into<String>, reason: impl ToString) -> Self {
        Self::Backend {
            operation: operation.into(),
            reason: reason.to_string(),
        }
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            reason: err.to_string(),
        }
    }
}

/// A liveness probe could not reach its backend.
///
/// This is reported as data by the liveness check and never surfaces as an
/// RPC failure.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{reason}")]
pub struct DependencyUnavailable {
    pub reason: String,
}

impl DependencyUnavailable {
    pub fn new(reason: impl ToString) -> Self {
        Self {
            reason: reason.to_string(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Master error type for note operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NoteError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Cache(#[from] CacheError),
}

impl NoteError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Storage(err) if err.is_not_found())
    }
}

/// Result type alias for note operations.
pub type NoteResult<T> = Result<T, NoteError>;

/// Result type alias for store port calls.
pub type StorageResult<T> = Result<T, StorageError>;

/// Result type alias for cache port calls.
pub type CacheResult<T> = Result<T, CacheError>;
