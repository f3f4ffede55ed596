//! HTTP API layer.
//!
//! This module contains thin handlers that delegate to the registry and the
//! playback status. It provides the router construction and server startup.

use std::net::SocketAddr;
use std::sync::Arc;

use thiserror::Error;

use crate::bootstrap::BootstrappedServices;
use crate::state::Config;
use crate::stream::{ConnectionRegistry, NowPlaying};

pub mod http;
mod stream;

/// Errors that can occur when starting or running the server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Failed to bind to the TCP port, or the accept loop failed.
    #[error("Failed to bind to port: {0}")]
    Bind(#[from] std::io::Error),
}

/// Shared application state for the API layer.
///
/// This is a thin wrapper that holds references to services.
#[derive(Clone)]
pub struct AppState {
    /// Listeners receiving the broadcast.
    pub registry: Arc<ConnectionRegistry>,
    /// Playback status published by the scheduler.
    pub now_playing: Arc<NowPlaying>,
    /// Application configuration.
    pub config: Arc<Config>,
}

impl AppState {
    /// Builds the API state from bootstrapped services.
    pub fn new(services: &BootstrappedServices) -> Self {
        Self {
            registry: Arc::clone(&services.registry),
            now_playing: Arc::clone(&services.now_playing),
            config: Arc::clone(&services.config),
        }
    }
}

/// Starts the HTTP server on the configured port.
pub async fn start_server(state: AppState) -> Result<(), ServerError> {
    let addr = SocketAddr::from(([0, 0, 0, 0], state.config.port));
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    log::info!("[Server] Listening on http://{}", addr);
    let app = http::create_router(state);

    // ConnectInfo<SocketAddr> identifies listeners in logs
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}
