//! Fixed protocol and policy constants.
//!
//! Tunable values (chunk size, pacing, ports) live in [`crate::state`]; the
//! values here describe the wire contract and built-in policies.

// ─────────────────────────────────────────────────────────────────────────────
// Service Identity
// ─────────────────────────────────────────────────────────────────────────────

/// Human-readable application name, sent as the `icy-name` stream header.
pub const APP_NAME: &str = "Airwave";

/// Service identifier reported by the health endpoint.
pub const SERVICE_ID: &str = "airwave";

// ─────────────────────────────────────────────────────────────────────────────
// Wire Contract
// ─────────────────────────────────────────────────────────────────────────────

/// Content type declared for every stream response.
///
/// Chunks are raw slices of the media files with no container framing, so
/// the library is expected to hold MPEG audio.
pub const STREAM_CONTENT_TYPE: &str = "audio/mpeg";

/// Capacity of a client's hand-off slot.
///
/// A single pending chunk per client: a slow client drops chunks instead of
/// building a backlog.
pub const HANDOFF_SLOT_CAPACITY: usize = 1;

// ─────────────────────────────────────────────────────────────────────────────
// Track Rotation
// ─────────────────────────────────────────────────────────────────────────────

/// Number of redraws attempted when the random pick repeats the previous
/// track. After this many redraws the repeat is accepted.
pub const MAX_REPEAT_RETRIES: usize = 5;

// ─────────────────────────────────────────────────────────────────────────────
// Defaults
// ─────────────────────────────────────────────────────────────────────────────

/// Default chunk size in bytes.
pub const DEFAULT_CHUNK_SIZE: usize = 4096;

/// Default pacing interval between broadcasts (milliseconds).
pub const DEFAULT_PACING_INTERVAL_MS: u64 = 150;

/// Default delay before retrying after a media library failure (milliseconds).
pub const DEFAULT_RETRY_BACKOFF_MS: u64 = 1000;

/// Default media directory, relative to the working directory.
pub const DEFAULT_MEDIA_DIR: &str = "media";

/// Default HTTP port.
pub const DEFAULT_PORT: u16 = 8080;
