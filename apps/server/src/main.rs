//! Airwave Server - standalone headless radio broadcast server.
//!
//! Plays the files of a media directory in rotation and streams them to every
//! connected HTTP listener at a fixed cadence.

mod config;

use std::future::Future;
use std::path::PathBuf;

use airwave_core::{bootstrap_services, start_server, AppState, ServerError};
use anyhow::{bail, Context, Result};
use clap::Parser;
use tokio::signal;
use tokio::task::JoinHandle;

use crate::config::ServerConfig;

/// Airwave Server - shared-playback HTTP radio station.
#[derive(Parser, Debug)]
#[command(name = "airwave-server")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file (YAML).
    #[arg(short, long, value_name = "FILE", env = "AIRWAVE_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(short, long, default_value = "info", env = "AIRWAVE_LOG_LEVEL")]
    log_level: log::LevelFilter,

    /// Bind port (overrides config file).
    #[arg(short = 'p', long, env = "AIRWAVE_PORT")]
    port: Option<u16>,

    /// Media directory (overrides config file).
    #[arg(short = 'm', long, env = "AIRWAVE_MEDIA_DIR")]
    media_dir: Option<PathBuf>,

    /// Bytes per broadcast chunk (overrides config file).
    #[arg(long, env = "AIRWAVE_CHUNK_SIZE")]
    chunk_size: Option<usize>,

    /// Milliseconds between chunks (overrides config file).
    #[arg(long, env = "AIRWAVE_PACING_MS")]
    pacing_ms: Option<u64>,

    /// Milliseconds to wait after a media library failure (overrides config file).
    #[arg(long, env = "AIRWAVE_RETRY_BACKOFF_MS")]
    retry_backoff_ms: Option<u64>,
}

impl Args {
    /// Applies CLI/env overrides on top of the file configuration.
    fn apply_to(&self, config: &mut ServerConfig) {
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(ref media_dir) = self.media_dir {
            config.media_dir = media_dir.clone();
        }
        if let Some(chunk_size) = self.chunk_size {
            config.chunk_size = chunk_size;
        }
        if let Some(pacing_ms) = self.pacing_ms {
            config.pacing_interval_ms = pacing_ms;
        }
        if let Some(backoff_ms) = self.retry_backoff_ms {
            config.retry_backoff_ms = backoff_ms;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    env_logger::Builder::new()
        .filter_level(args.log_level)
        .format_timestamp_millis()
        .init();

    log::info!("Airwave Server v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let mut config =
        ServerConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    args.apply_to(&mut config);

    log::info!(
        "Configuration: port={}, media_dir={}, chunk_size={}, pacing={}ms",
        config.port,
        config.media_dir.display(),
        config.chunk_size,
        config.pacing_interval_ms
    );

    let core_config = config.to_core_config()?;
    let handle = tokio::runtime::Handle::current();
    let services =
        bootstrap_services(core_config, handle).context("Failed to bootstrap services")?;

    services.start_background_tasks();
    log::info!("Playback scheduler started");

    let app_state = AppState::new(&services);
    let server_handle = tokio::spawn(start_server(app_state));

    let result = serve_until_shutdown(server_handle, shutdown_signal()).await;
    services.shutdown();

    match &result {
        Ok(()) => log::info!("Shutdown complete"),
        Err(e) => log::error!("Server stopped unexpectedly: {:#}", e),
    }
    result
}

/// Drives the HTTP server until `shutdown` resolves.
///
/// A server that ends before the signal (e.g. the port is taken) is an error.
/// On a signal the server task is aborted, since listener responses never
/// end on their own.
async fn serve_until_shutdown<F>(
    mut server: JoinHandle<Result<(), ServerError>>,
    shutdown: F,
) -> Result<()>
where
    F: Future<Output = ()>,
{
    tokio::select! {
        () = shutdown => {
            log::info!("Shutdown signal received, cleaning up...");
            server.abort();
            Ok(())
        }
        joined = &mut server => match joined {
            Ok(Ok(())) => bail!("HTTP server exited"),
            Ok(Err(e)) => Err(e).context("HTTP server failed"),
            Err(e) => Err(e).context("HTTP server task panicked"),
        },
    }
}

/// Waits for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            log::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                log::error!("Failed to install SIGTERM handler: {}", e);
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
}
