mod config;

pub use config::{Config, ConfigError, LogLevel};

use crate::batch::Accumulator;
use crate::dispatch::{Dispatcher, HttpDispatcher, RetryPolicy};
use crate::error::RelayError;
use crate::intake::IntakeQueue;
use crate::server::{self, AppState};
use clap::Parser;
use std::sync::Arc;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Wires the pipeline together and runs it until a shutdown signal.
///
/// Startup order: resolve and validate config, construct the intake queue
/// (handed to both the server and the accumulator), start the accumulator,
/// then serve the intake routes. Shutdown order is the reverse: stop
/// accepting producers, let the accumulator drain and flush, then wait out
/// every in-flight delivery.
pub async fn main() -> Result<(), RelayError> {
    // Healthcheck subcommand for container liveness probes.
    if std::env::args().nth(1).as_deref() == Some("healthcheck") {
        let port = std::env::var("HTTP_PORT")
            .ok()
            .and_then(|p| p.parse().ok());
        let result = match port {
            Some(port) => crate::healthcheck::healthcheck_with_port(port).await,
            None => crate::healthcheck::healthcheck().await,
        };
        match result {
            Ok(()) => std::process::exit(0),
            Err(e) => {
                eprintln!("{e}");
                std::process::exit(1);
            }
        }
    }

    let config = Config::parse();
    config.validate()?;

    init_tracing(config.log_level);

    info!(
        batch_size = config.batch_size,
        flush_interval_secs = config.flush_interval_secs,
        endpoint = %config.endpoint,
        "server starting"
    );

    let (intake_tx, intake_rx) = IntakeQueue::bounded(config.queue_capacity)?;

    let dispatcher = Dispatcher::new(
        &config.endpoint,
        RetryPolicy {
            max_attempts: config.max_attempts,
            delay: config.retry_delay(),
        },
        config.request_timeout(),
    )?;
    let sink = Arc::new(HttpDispatcher::new(dispatcher));

    let shutdown = CancellationToken::new();
    let accumulator = Accumulator::new(
        intake_rx,
        sink.clone(),
        config.batch_size,
        config.flush_interval(),
    );
    let accumulator_handle = tokio::spawn(accumulator.run(shutdown.clone()));

    let app = server::router(AppState { intake: intake_tx });

    let bind_addr = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|e| RelayError::Bind {
            address: bind_addr.clone(),
            source: e,
        })?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Producers are gone once the server stops. Flush whatever is open,
    // then wait for in-flight deliveries before exiting.
    shutdown.cancel();
    if let Err(e) = accumulator_handle.await {
        error!("Accumulator task failed: {e}");
    }
    sink.shutdown().await;

    info!("Server shutdown complete");
    Ok(())
}

fn init_tracing(level: LogLevel) {
    // JSON format for production unless RUST_LOG_FORMAT says otherwise.
    let use_json = std::env::var("RUST_LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(true);

    let filter = EnvFilter::from_default_env().add_directive(tracing::Level::from(level).into());

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json().flatten_event(true).with_current_span(true))
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry().with(fmt::layer()).with(filter).init();
    }
}

/// Wait for SIGTERM or SIGINT (Ctrl+C) for graceful shutdown
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT, initiating graceful shutdown"),
        _ = terminate => info!("Received SIGTERM, initiating graceful shutdown"),
    }
}
