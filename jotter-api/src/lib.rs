//! Jotter API - gRPC Note Service
//!
//! Note and liveness orchestration over the `jotter-core` ports, exposed as
//! `jotter.v1.NoteService` with the standard health and reflection services
//! alongside.

pub mod config;
pub mod error;
pub mod grpc;
pub mod server;
pub mod services;
pub mod telemetry;

pub use config::{GrpcConfig, ServiceConfig};
pub use error::{ApiError, ApiResult, ErrorCode};
pub use grpc::{proto, NoteServiceImpl};
pub use server::{run, serve, shutdown_signal, ServerError};
pub use services::{CacheStatsSnapshot, LivenessInteractor, NoteInteractor};
pub use telemetry::{init_tracing, LogFormat, TelemetryConfig, TelemetryError};
