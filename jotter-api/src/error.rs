//! Error Types for the Jotter API
//!
//! This module defines error handling for the RPC layer:
//! - ApiError struct carried out of every facade method
//! - ErrorCode enum for categorizing errors
//! - Conversion into `tonic::Status`
//!
//! Validation failures surface as `INVALID_ARGUMENT`. Any failure raised
//! after orchestration starts collapses into `INTERNAL` with the underlying
//! message attached.

use std::fmt;
use tonic::{Code, Status};

use jotter_core::{NoteError, ValidationError};

// ============================================================================
// ERROR CODE ENUM
// ============================================================================

/// Error codes for RPC responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// Required field is empty or absent
    MissingField,

    /// Field is present but has an unacceptable value
    InvalidInput,

    /// Orchestration failed after validation passed
    InternalError,
}

impl ErrorCode {
    /// Get the gRPC status code for this error code.
    pub fn grpc_code(&self) -> Code {
        match self {
            ErrorCode::MissingField | ErrorCode::InvalidInput => Code::InvalidArgument,
            ErrorCode::InternalError => Code::Internal,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

// ============================================================================
// API ERROR STRUCT
// ============================================================================

/// Structured error for RPC operations.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiError {
    /// Error code categorizing the error
    pub code: ErrorCode,

    /// Human-readable error message
    pub message: String,
}

impl ApiError {
    /// Create a new API error with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Create a MissingField error.
    pub fn missing_field(field: &str) -> Self {
        Self::new(ErrorCode::MissingField, format!("{} is required", field))
    }

    /// Create an InvalidInput error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    /// Create an InternalError.
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    /// Wrap an orchestration failure as `"failed to <operation>: <cause>"`.
    ///
    /// The cause class is logged so a not-found can still be told apart from
    /// a backend outage in the logs.
    pub fn operation_failed(operation: &str, err: &NoteError) -> Self {
        if err.is_not_found() {
            tracing::info!(operation, error = %err, "note not found");
        } else {
            tracing::error!(operation, error = %err, "note operation failed");
        }
        Self::internal_error(format!("failed to {}: {}", operation, err))
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

// ============================================================================
// CONVERSIONS
// ============================================================================

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::RequiredFieldMissing { field } => ApiError::missing_field(&field),
        }
    }
}

/// Convert ApiError to tonic Status
impl From<ApiError> for Status {
    fn from(err: ApiError) -> Self {
        Status::new(err.code.grpc_code(), err.message)
    }
}

/// Result type alias for API operations.
pub type ApiResult<T> = Result<T, ApiError>;
