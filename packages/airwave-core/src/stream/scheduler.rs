//! Paced playback: turns whole tracks into a steady chunk cadence.
//!
//! The scheduler owns all playback state. It loops over
//! select → load → pace, and every failure on the media side only costs one
//! iteration (plus a backoff) so the station keeps running.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::RwLock;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::error::{ErrorCode, LibraryError};
use crate::library::{MediaLibrary, TrackId, TrackSelector};
use crate::state::StreamingConfig;
use crate::stream::ConnectionRegistry;

/// Splits an in-memory track into chunks of at most `chunk_size` bytes.
///
/// Slicing is zero-copy; the final chunk may be shorter than `chunk_size`.
#[derive(Debug)]
pub struct ChunkReader {
    remaining: Bytes,
    chunk_size: usize,
}

impl ChunkReader {
    /// Creates a reader over `track`.
    ///
    /// # Panics
    ///
    /// Panics if `chunk_size` is zero; [`StreamingConfig::validate`] rejects
    /// such configurations before a reader is ever built.
    pub fn new(track: Bytes, chunk_size: usize) -> Self {
        assert!(chunk_size > 0, "chunk_size must be >= 1");
        Self {
            remaining: track,
            chunk_size,
        }
    }

    /// Returns the number of unread bytes.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.remaining.len()
    }
}

impl Iterator for ChunkReader {
    type Item = Bytes;

    fn next(&mut self) -> Option<Bytes> {
        if self.remaining.is_empty() {
            return None;
        }
        let len = self.chunk_size.min(self.remaining.len());
        Some(self.remaining.split_to(len))
    }
}

/// Read-only view of what the scheduler is doing, for status reporting.
#[derive(Debug, Default)]
pub struct NowPlaying {
    track: RwLock<Option<TrackId>>,
    tracks_started: AtomicU64,
    chunks_broadcast: AtomicU64,
}

impl NowPlaying {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the track currently being paced, if any.
    pub fn track(&self) -> Option<TrackId> {
        self.track.read().clone()
    }

    pub fn tracks_started(&self) -> u64 {
        self.tracks_started.load(Ordering::Relaxed)
    }

    pub fn chunks_broadcast(&self) -> u64 {
        self.chunks_broadcast.load(Ordering::Relaxed)
    }

    fn start_track(&self, track: TrackId) {
        *self.track.write() = Some(track);
        self.tracks_started.fetch_add(1, Ordering::Relaxed);
    }

    fn record_chunk(&self) {
        self.chunks_broadcast.fetch_add(1, Ordering::Relaxed);
    }

    fn clear(&self) {
        *self.track.write() = None;
    }
}

/// Result of pacing one track to the end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackOutcome {
    pub track: TrackId,
    pub chunks: u64,
    pub bytes: u64,
}

/// The single playback loop of the station.
pub struct PlaybackScheduler {
    library: Arc<dyn MediaLibrary>,
    registry: Arc<ConnectionRegistry>,
    selector: TrackSelector,
    config: StreamingConfig,
    now_playing: Arc<NowPlaying>,
}

impl PlaybackScheduler {
    /// Creates a scheduler with an entropy-seeded track selector.
    pub fn new(
        library: Arc<dyn MediaLibrary>,
        registry: Arc<ConnectionRegistry>,
        config: StreamingConfig,
        now_playing: Arc<NowPlaying>,
    ) -> Self {
        Self {
            library,
            registry,
            selector: TrackSelector::new(),
            config,
            now_playing,
        }
    }

    /// Replaces the track selector (e.g. with a seeded one).
    #[must_use]
    pub fn with_selector(mut self, selector: TrackSelector) -> Self {
        self.selector = selector;
        self
    }

    /// Plays tracks back to back until `cancel` fires.
    ///
    /// Media failures are logged and retried after the configured backoff;
    /// they never end the loop.
    pub async fn run(mut self, cancel: CancellationToken) {
        log::info!(
            "[Scheduler] Starting playback: chunk_size={}, pacing={}ms",
            self.config.chunk_size,
            self.config.pacing_interval_ms
        );

        while !cancel.is_cancelled() {
            match self.play_next_track(&cancel).await {
                Ok(Some(outcome)) => {
                    log::debug!(
                        "[Scheduler] Finished {}: chunks={}, bytes={}",
                        outcome.track.display(),
                        outcome.chunks,
                        outcome.bytes
                    );
                }
                Ok(None) => break,
                Err(e) => {
                    let backoff = self.config.retry_backoff();
                    log::warn!(
                        "[Scheduler] {} ({}), retrying in {:?}",
                        e,
                        e.code(),
                        backoff
                    );
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = tokio::time::sleep(backoff) => {}
                    }
                }
            }
        }

        self.now_playing.clear();
        log::info!("[Scheduler] Playback stopped");
    }

    /// Runs one select → load → pace iteration.
    ///
    /// Returns `Ok(None)` if `cancel` fired while the track was playing.
    pub async fn play_next_track(
        &mut self,
        cancel: &CancellationToken,
    ) -> Result<Option<TrackOutcome>, LibraryError> {
        let entries = self.library.list().await?;
        let track = self.selector.next(&entries)?;
        let content = self.library.read(&track).await?;

        log::info!(
            "[Scheduler] Now playing {} ({} bytes)",
            track.display(),
            content.len()
        );
        self.now_playing.start_track(track.clone());

        Ok(self.pace(track, content, cancel).await)
    }

    async fn pace(
        &self,
        track: TrackId,
        content: Bytes,
        cancel: &CancellationToken,
    ) -> Option<TrackOutcome> {
        let period = self.config.pacing_interval();
        let mut metronome = interval_at(Instant::now() + period, period);
        metronome.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut reader = ChunkReader::new(content, self.config.chunk_size);
        let mut outcome = TrackOutcome {
            track,
            chunks: 0,
            bytes: 0,
        };

        loop {
            tokio::select! {
                _ = cancel.cancelled() => return None,
                _ = metronome.tick() => {
                    let Some(chunk) = reader.next() else {
                        return Some(outcome);
                    };

                    let report = self.registry.broadcast(&chunk);
                    log::trace!(
                        "[Scheduler] Broadcast {} bytes: delivered={}, dropped={}",
                        chunk.len(),
                        report.delivered,
                        report.dropped
                    );

                    outcome.chunks += 1;
                    outcome.bytes += chunk.len() as u64;
                    self.now_playing.record_chunk();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::path::PathBuf;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    use async_trait::async_trait;

    /// In-memory library; `list_failures` makes the first N listings fail.
    #[derive(Default)]
    struct MemoryLibrary {
        tracks: BTreeMap<TrackId, Bytes>,
        list_failures: AtomicUsize,
        list_calls: AtomicUsize,
    }

    impl MemoryLibrary {
        fn with_tracks(tracks: Vec<(&str, Vec<u8>)>) -> Self {
            Self {
                tracks: tracks
                    .into_iter()
                    .map(|(name, data)| (PathBuf::from(name), Bytes::from(data)))
                    .collect(),
                ..Self::default()
            }
        }
    }

    #[async_trait]
    impl MediaLibrary for MemoryLibrary {
        async fn list(&self) -> Result<Vec<TrackId>, LibraryError> {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            let fail = self
                .list_failures
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if fail {
                return Err(LibraryError::ListFailed {
                    path: PathBuf::from("media"),
                    source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
                });
            }
            Ok(self.tracks.keys().cloned().collect())
        }

        async fn read(&self, track: &TrackId) -> Result<Bytes, LibraryError> {
            self.tracks
                .get(track)
                .cloned()
                .ok_or_else(|| LibraryError::ReadFailed {
                    path: track.clone(),
                    source: std::io::Error::from(std::io::ErrorKind::NotFound),
                })
        }
    }

    fn pattern(seed: u8, len: usize) -> Vec<u8> {
        (0..len).map(|i| seed.wrapping_add((i % 251) as u8)).collect()
    }

    fn config(chunk_size: usize) -> StreamingConfig {
        StreamingConfig::new(chunk_size, 150, 1000).unwrap()
    }

    fn scheduler(
        library: MemoryLibrary,
        registry: &Arc<ConnectionRegistry>,
        chunk_size: usize,
    ) -> (PlaybackScheduler, Arc<NowPlaying>) {
        let now_playing = Arc::new(NowPlaying::new());
        let scheduler = PlaybackScheduler::new(
            Arc::new(library),
            Arc::clone(registry),
            config(chunk_size),
            Arc::clone(&now_playing),
        )
        .with_selector(TrackSelector::with_seed(11));
        (scheduler, now_playing)
    }

    #[test]
    fn chunk_reader_splits_with_short_tail() {
        let reader = ChunkReader::new(Bytes::from(vec![0u8; 10_000]), 4096);
        let sizes: Vec<usize> = reader.map(|c| c.len()).collect();
        assert_eq!(sizes, vec![4096, 4096, 1808]);
    }

    #[test]
    fn chunk_reader_on_empty_track_yields_nothing() {
        let mut reader = ChunkReader::new(Bytes::new(), 4096);
        assert_eq!(reader.remaining(), 0);
        assert!(reader.next().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn single_listener_receives_track_bytes_exactly() {
        let file_a = pattern(1, 10_000);
        let file_b = pattern(100, 10_000);
        let library = MemoryLibrary::with_tracks(vec![
            ("media/a.mp3", file_a.clone()),
            ("media/b.mp3", file_b.clone()),
        ]);
        let registry = Arc::new(ConnectionRegistry::new(4096));
        let mut listener = registry.connect("listener");
        let (mut scheduler, now_playing) = scheduler(library, &registry, 4096);
        let cancel = CancellationToken::new();

        let collect = async {
            let mut chunks = Vec::new();
            for _ in 0..3 {
                chunks.push(listener.next_chunk().await.expect("chunk"));
            }
            chunks
        };
        let (outcome, chunks) = tokio::join!(scheduler.play_next_track(&cancel), collect);

        let outcome = outcome.unwrap().expect("track played to the end");
        assert_eq!(outcome.chunks, 3);
        assert_eq!(outcome.bytes, 10_000);

        let sizes: Vec<usize> = chunks.iter().map(|c| c.len()).collect();
        assert_eq!(sizes, vec![4096, 4096, 1808]);

        let received: Vec<u8> = chunks.iter().flat_map(|c| c.iter().copied()).collect();
        let expected = if outcome.track == PathBuf::from("media/a.mp3") {
            &file_a
        } else {
            &file_b
        };
        assert_eq!(&received, expected);
        assert_eq!(now_playing.track(), Some(outcome.track));
        assert_eq!(now_playing.chunks_broadcast(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn chunks_are_paced_at_the_configured_interval() {
        let library = MemoryLibrary::with_tracks(vec![("media/a.mp3", pattern(0, 300))]);
        let registry = Arc::new(ConnectionRegistry::new(100));
        let mut listener = registry.connect("listener");
        let (mut scheduler, _) = scheduler(library, &registry, 100);
        let cancel = CancellationToken::new();

        let start = Instant::now();
        let collect = async {
            let mut arrivals = Vec::new();
            for _ in 0..3 {
                listener.next_chunk().await.expect("chunk");
                arrivals.push(start.elapsed());
            }
            arrivals
        };
        let (_, arrivals) = tokio::join!(scheduler.play_next_track(&cancel), collect);

        assert_eq!(
            arrivals,
            vec![
                Duration::from_millis(150),
                Duration::from_millis(300),
                Duration::from_millis(450),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_listener_does_not_slow_healthy_listener() {
        let track = pattern(3, 96);
        let library = MemoryLibrary::with_tracks(vec![("media/a.mp3", track.clone())]);
        let registry = Arc::new(ConnectionRegistry::new(16));
        let mut healthy = registry.connect("healthy");
        let mut stalled = registry.connect("stalled");
        let (mut scheduler, now_playing) = scheduler(library, &registry, 16);
        let cancel = CancellationToken::new();

        let start = Instant::now();
        let collect = async {
            let mut chunks = Vec::new();
            for _ in 0..6 {
                chunks.push(healthy.next_chunk().await.expect("chunk"));
            }
            (chunks, start.elapsed())
        };
        let (outcome, (chunks, elapsed)) =
            tokio::join!(scheduler.play_next_track(&cancel), collect);

        assert_eq!(outcome.unwrap().expect("track played").chunks, 6);
        // Healthy listener kept the cadence: six ticks, no extra delay
        assert_eq!(elapsed, Duration::from_millis(900));
        let received: Vec<u8> = chunks.iter().flat_map(|c| c.iter().copied()).collect();
        assert_eq!(received, track);
        assert_eq!(now_playing.chunks_broadcast(), 6);

        // Stalled listener holds only the first chunk; the other five were dropped
        assert_eq!(stalled.try_next_chunk().unwrap().as_ref(), &track[..16]);
        assert!(stalled.try_next_chunk().is_none());
        assert_eq!(registry.member_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_library_reports_recoverable_error() {
        let registry = Arc::new(ConnectionRegistry::new(64));
        let (mut scheduler, _) = scheduler(MemoryLibrary::default(), &registry, 64);

        let err = scheduler
            .play_next_track(&CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, LibraryError::Empty));
    }

    #[tokio::test(start_paused = true)]
    async fn run_backs_off_and_recovers_from_list_failures() {
        let library = MemoryLibrary::with_tracks(vec![("media/a.mp3", pattern(0, 64))]);
        library.list_failures.store(2, Ordering::SeqCst);
        let library = Arc::new(library);

        let registry = Arc::new(ConnectionRegistry::new(64));
        let mut listener = registry.connect("listener");
        let now_playing = Arc::new(NowPlaying::new());
        let scheduler = PlaybackScheduler::new(
            Arc::clone(&library) as Arc<dyn MediaLibrary>,
            Arc::clone(&registry),
            config(64),
            Arc::clone(&now_playing),
        );

        let cancel = CancellationToken::new();
        let start = Instant::now();
        let task = tokio::spawn(scheduler.run(cancel.clone()));

        let chunk = listener.next_chunk().await.expect("chunk after recovery");
        assert_eq!(chunk.len(), 64);
        // Two failed listings, one second of backoff each, then one tick
        assert_eq!(start.elapsed(), Duration::from_millis(2150));
        assert_eq!(library.list_calls.load(Ordering::SeqCst), 3);

        cancel.cancel();
        task.await.unwrap();
        assert!(now_playing.track().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn run_rotates_to_next_track_after_end_of_data() {
        let library = MemoryLibrary::with_tracks(vec![
            ("media/a.mp3", pattern(1, 10)),
            ("media/b.mp3", pattern(2, 10)),
        ]);
        let registry = Arc::new(ConnectionRegistry::new(64));
        let mut listener = registry.connect("listener");
        let (scheduler, now_playing) = scheduler(library, &registry, 64);

        let cancel = CancellationToken::new();
        let task = tokio::spawn(scheduler.run(cancel.clone()));

        for _ in 0..4 {
            listener.next_chunk().await.expect("chunk");
        }
        assert!(now_playing.tracks_started() >= 4);

        cancel.cancel();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_stops_mid_track() {
        let library = MemoryLibrary::with_tracks(vec![("media/a.mp3", pattern(0, 1000))]);
        let registry = Arc::new(ConnectionRegistry::new(10));
        let (mut scheduler, _) = scheduler(library, &registry, 10);

        let cancel = CancellationToken::new();
        cancel.cancel();
        let outcome = scheduler.play_next_track(&cancel).await.unwrap();
        assert!(outcome.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn broadcasting_without_listeners_is_fine() {
        let library = MemoryLibrary::with_tracks(vec![("media/a.mp3", pattern(0, 25))]);
        let registry = Arc::new(ConnectionRegistry::new(10));
        let (mut scheduler, _) = scheduler(library, &registry, 10);

        let outcome = scheduler
            .play_next_track(&CancellationToken::new())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(outcome.chunks, 3);
        assert_eq!(outcome.bytes, 25);
    }
}
