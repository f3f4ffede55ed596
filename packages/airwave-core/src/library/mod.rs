//! Media library access.
//!
//! The scheduler only needs two capabilities from wherever tracks live:
//! listing track identifiers and reading one track fully into memory. Both are
//! behind the [`MediaLibrary`] trait so tests can inject an in-memory library.

mod selector;

pub use selector::{choose_track, TrackSelector};

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::LibraryError;

/// Identifier of one track in the library.
pub type TrackId = PathBuf;

/// Trait for media library operations.
///
/// Used by `PlaybackScheduler` to pick and load tracks. Every failure is
/// recoverable from the scheduler's point of view.
#[async_trait]
pub trait MediaLibrary: Send + Sync {
    /// Lists the tracks currently in the library.
    async fn list(&self) -> Result<Vec<TrackId>, LibraryError>;

    /// Reads a track fully into memory.
    async fn read(&self, track: &TrackId) -> Result<Bytes, LibraryError>;
}

/// Media library backed by a filesystem directory.
///
/// Every regular file directly inside `root` is a track. Sub-directories are
/// not descended into.
#[derive(Debug, Clone)]
pub struct DirectoryLibrary {
    root: PathBuf,
}

impl DirectoryLibrary {
    /// Creates a library rooted at `root`. The directory is not touched until
    /// the first listing.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the library root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl MediaLibrary for DirectoryLibrary {
    async fn list(&self) -> Result<Vec<TrackId>, LibraryError> {
        let list_failed = |source| LibraryError::ListFailed {
            path: self.root.clone(),
            source,
        };

        let mut entries = tokio::fs::read_dir(&self.root).await.map_err(list_failed)?;
        let mut tracks = Vec::new();

        while let Some(entry) = entries.next_entry().await.map_err(list_failed)? {
            let path = entry.path();
            // Follows symlinks so linked tracks are playable
            match tokio::fs::metadata(&path).await {
                Ok(meta) if meta.is_file() => tracks.push(path),
                Ok(_) => log::trace!("[Library] Skipping non-file entry {}", path.display()),
                Err(e) => log::debug!("[Library] Cannot stat {}: {}", path.display(), e),
            }
        }

        tracks.sort();
        Ok(tracks)
    }

    async fn read(&self, track: &TrackId) -> Result<Bytes, LibraryError> {
        let content = tokio::fs::read(track)
            .await
            .map_err(|source| LibraryError::ReadFailed {
                path: track.clone(),
                source,
            })?;
        Ok(Bytes::from(content))
    }
}
