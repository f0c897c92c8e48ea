//! Server Bootstrap
//!
//! Builds the backend adapters from `ServiceConfig`, assembles the tonic
//! router (note service, health, optional reflection) and serves it until
//! the shutdown future resolves.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use thiserror::Error;
use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::transport::Server;

use jotter_core::{CacheError, ConfigError, LivenessProbe, StorageError};
use jotter_storage::{PgNoteStore, RedisNoteCache};

use crate::config::{GrpcConfig, ServiceConfig};
use crate::grpc::proto::note_service_server::NoteServiceServer;
use crate::grpc::proto::FILE_DESCRIPTOR_SET;
use crate::grpc::NoteServiceImpl;
use crate::telemetry::TelemetryError;

/// Startup and transport failures. Any of these ends the process.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Telemetry(#[from] TelemetryError),

    #[error("store setup failed: {0}")]
    Storage(#[from] StorageError),

    #[error("cache setup failed: {0}")]
    Cache(#[from] CacheError),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("reflection setup failed: {0}")]
    Reflection(#[from] tonic_reflection::server::Error),

    #[error("transport error: {0}")]
    Transport(#[from] tonic::transport::Error),
}

/// Build both backends and serve until `shutdown` resolves.
///
/// The store is mandatory: a pool or schema failure aborts startup. The
/// cache connects lazily, so an unreachable Redis is only reported.
pub async fn run<F>(config: ServiceConfig, shutdown: F) -> Result<(), ServerError>
where
    F: Future<Output = ()> + Send,
{
    let store = PgNoteStore::from_config(&config.db)?;
    if config.db.auto_migrate {
        store.ensure_schema().await?;
    }
    tracing::info!(
        host = %config.db.host,
        db = %config.db.dbname,
        max_size = config.db.max_size,
        "PostgreSQL store ready"
    );

    let cache = RedisNoteCache::from_config(&config.cache)?;
    match cache.ping().await {
        Ok(()) => tracing::info!(host = %config.cache.host, "connected to Redis"),
        Err(err) => tracing::warn!(
            host = %config.cache.host,
            error = %err,
            "Redis unavailable at startup, continuing without cache"
        ),
    }

    let service = NoteServiceImpl::from_ports(
        Arc::new(store),
        Arc::new(cache),
        config.cache.command_timeout,
        config.grpc.ping_timeout,
    );

    let addr = config.grpc.bind_addr()?;
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })?;

    serve(&config.grpc, service, listener, shutdown).await
}

/// Serve the assembled router on an already-bound listener.
pub async fn serve<F>(
    config: &GrpcConfig,
    service: NoteServiceImpl,
    listener: TcpListener,
    shutdown: F,
) -> Result<(), ServerError>
where
    F: Future<Output = ()> + Send,
{
    let (health_reporter, health_service) = tonic_health::server::health_reporter();
    health_reporter
        .set_serving::<NoteServiceServer<NoteServiceImpl>>()
        .await;
    health_reporter
        .set_service_status("", tonic_health::ServingStatus::Serving)
        .await;

    let reflection = if config.reflection {
        Some(
            tonic_reflection::server::Builder::configure()
                .register_encoded_file_descriptor_set(FILE_DESCRIPTOR_SET)
                .build_v1()?,
        )
    } else {
        None
    };

    let local_addr = listener.local_addr().ok();
    tracing::info!(
        addr = ?local_addr,
        request_timeout = ?config.request_timeout,
        reflection = config.reflection,
        "gRPC server listening"
    );

    Server::builder()
        .timeout(config.request_timeout)
        .add_service(health_service)
        .add_service(NoteServiceServer::new(service))
        .add_optional_service(reflection)
        .serve_with_incoming_shutdown(TcpListenerStream::new(listener), shutdown)
        .await?;

    tracing::info!("gRPC server stopped");
    Ok(())
}

/// Resolve on Ctrl-C, or SIGTERM on unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received");
}
