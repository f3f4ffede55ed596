//! Application bootstrap and dependency wiring.
//!
//! This module contains the composition root: the single place where the
//! registry, the media library and the playback scheduler are instantiated
//! and wired together.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::error::AirwaveResult;
use crate::library::{DirectoryLibrary, MediaLibrary};
use crate::state::Config;
use crate::stream::{ConnectionRegistry, NowPlaying, PlaybackScheduler};

/// Container for all bootstrapped services.
///
/// Consumed by [`AppState`](crate::api::AppState) to build the API state.
#[derive(Clone)]
pub struct BootstrappedServices {
    /// Shared set of connected listeners.
    pub registry: Arc<ConnectionRegistry>,
    /// Playback status published by the scheduler.
    pub now_playing: Arc<NowPlaying>,
    /// Where tracks are listed and read from.
    pub library: Arc<dyn MediaLibrary>,
    /// Immutable startup configuration.
    pub config: Arc<Config>,
    /// Runtime the scheduler is spawned on.
    handle: tokio::runtime::Handle,
    /// Cancellation token for graceful shutdown.
    pub cancel_token: CancellationToken,
    started: Arc<AtomicBool>,
}

impl BootstrappedServices {
    /// Spawns the playback scheduler.
    ///
    /// Returns `false` (and spawns nothing) if it was already started.
    pub fn start_background_tasks(&self) -> bool {
        if self
            .started
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            log::debug!("[Bootstrap] Background tasks already running");
            return false;
        }

        let scheduler = PlaybackScheduler::new(
            Arc::clone(&self.library),
            Arc::clone(&self.registry),
            self.config.streaming.clone(),
            Arc::clone(&self.now_playing),
        );
        self.handle
            .spawn(scheduler.run(self.cancel_token.child_token()));
        true
    }

    /// Initiates graceful shutdown: stops the scheduler.
    ///
    /// Connected listeners are not drained; they simply stop receiving chunks.
    pub fn shutdown(&self) {
        log::info!(
            "[Bootstrap] Shutting down with {} listener(s) connected",
            self.registry.member_count()
        );
        self.cancel_token.cancel();
    }
}

/// Wires services around a directory-backed media library.
///
/// # Errors
///
/// Returns a configuration error if `config` fails validation.
pub fn bootstrap_services(
    config: Config,
    handle: tokio::runtime::Handle,
) -> AirwaveResult<BootstrappedServices> {
    let library = Arc::new(DirectoryLibrary::new(config.media_dir.clone()));
    bootstrap_services_with_library(config, library, handle)
}

/// Wires services around an arbitrary media library.
///
/// # Errors
///
/// Returns a configuration error if `config` fails validation.
pub fn bootstrap_services_with_library(
    config: Config,
    library: Arc<dyn MediaLibrary>,
    handle: tokio::runtime::Handle,
) -> AirwaveResult<BootstrappedServices> {
    config.validate()?;

    log::info!(
        "[Bootstrap] media_dir={}, chunk_size={}, pacing={}ms",
        config.media_dir.display(),
        config.streaming.chunk_size,
        config.streaming.pacing_interval_ms
    );

    Ok(BootstrappedServices {
        registry: Arc::new(ConnectionRegistry::new(config.streaming.chunk_size)),
        now_playing: Arc::new(NowPlaying::new()),
        library,
        config: Arc::new(config),
        handle,
        cancel_token: CancellationToken::new(),
        started: Arc::new(AtomicBool::new(false)),
    })
}
