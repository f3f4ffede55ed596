//! Airwave Core - shared-playback radio broadcast over HTTP.
//!
//! A single playback loop reads tracks from a media library and paces them
//! out as fixed-size chunks; every connected HTTP listener receives the same
//! chunk at the same tick, like tuning into a radio station.
//!
//! # Architecture
//!
//! - [`stream`]: connection registry, per-listener delivery, paced scheduler
//! - [`library`]: media library abstraction and track rotation
//! - [`api`]: axum router and streaming handler
//! - [`bootstrap`]: composition root wiring the services together
//! - [`state`]: configuration types
//! - [`error`]: centralized error types
//!
//! # Abstraction Traits
//!
//! - [`MediaLibrary`](library::MediaLibrary): listing and reading tracks
//! - [`ChunkSink`](stream::ChunkSink): the transport a listener writes to

#![warn(clippy::all)]

pub mod api;
pub mod bootstrap;
pub mod error;
pub mod library;
pub mod protocol_constants;
pub mod state;
pub mod stream;

// Re-export commonly used types at the crate root
pub use api::{start_server, AppState, ServerError};
pub use bootstrap::{bootstrap_services, bootstrap_services_with_library, BootstrappedServices};
pub use error::{AirwaveError, AirwaveResult, ConfigError, ErrorCode, LibraryError, SelectionError};
pub use library::{choose_track, DirectoryLibrary, MediaLibrary, TrackId, TrackSelector};
pub use state::{Config, StreamingConfig};
pub use stream::{
    BroadcastReport, ChunkReader, ChunkSink, ClientConnection, ConnectionId, ConnectionRegistry,
    DeliveryReport, NowPlaying, PlaybackScheduler, TrackOutcome,
};
