//! Broadcast fan-out and paced playback.
//!
//! - [`registry`]: the shared set of listeners and the drop-on-full broadcast
//! - [`connection`]: one listener's hand-off slot and delivery loop
//! - [`scheduler`]: the playback loop feeding the registry at a fixed cadence

pub mod connection;
pub mod registry;
pub mod scheduler;

pub use connection::{ChunkSink, ClientConnection, DeliveryReport};
pub use registry::{BroadcastReport, ConnectionId, ConnectionRegistry};
pub use scheduler::{ChunkReader, NowPlaying, PlaybackScheduler, TrackOutcome};
