//! Jotter gRPC server binary.

use jotter_api::{init_tracing, run, shutdown_signal, ServerError, ServiceConfig};

#[tokio::main]
async fn main() -> Result<(), ServerError> {
    // A missing .env file is normal outside local development.
    let dotenv = dotenvy::dotenv();

    let config = ServiceConfig::from_env()?;
    init_tracing(&config.telemetry)?;

    match dotenv {
        Ok(path) => tracing::debug!(path = %path.display(), "loaded .env"),
        Err(err) if err.not_found() => {}
        Err(err) => tracing::warn!(error = %err, "ignoring unreadable .env"),
    }

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting jotter");

    if let Err(err) = run(config, shutdown_signal()).await {
        tracing::error!(error = %err, "server exited with error");
        return Err(err);
    }
    Ok(())
}
