//! Track rotation with a no-immediate-repeat policy.

use std::path::Path;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::TrackId;
use crate::error::SelectionError;
use crate::protocol_constants::MAX_REPEAT_RETRIES;

/// Picks a track uniformly at random, avoiding `previous` when possible.
///
/// A draw that repeats `previous` is redrawn at most [`MAX_REPEAT_RETRIES`]
/// times; after that the repeat is accepted. A single-entry library therefore
/// always returns its only entry.
///
/// # Errors
///
/// Returns [`SelectionError::EmptyLibrary`] if `entries` is empty.
pub fn choose_track<'a, R>(
    entries: &'a [TrackId],
    previous: Option<&Path>,
    rng: &mut R,
) -> Result<&'a TrackId, SelectionError>
where
    R: Rng,
{
    if entries.is_empty() {
        return Err(SelectionError::EmptyLibrary);
    }

    let mut choice = &entries[rng.gen_range(0..entries.len())];
    for _ in 0..MAX_REPEAT_RETRIES {
        if Some(choice.as_path()) != previous {
            break;
        }
        choice = &entries[rng.gen_range(0..entries.len())];
    }

    Ok(choice)
}

/// Stateful selector: remembers the last pick so the next one avoids it.
pub struct TrackSelector {
    previous: Option<TrackId>,
    rng: StdRng,
}

impl TrackSelector {
    /// Creates a selector seeded from OS entropy.
    pub fn new() -> Self {
        Self {
            previous: None,
            rng: StdRng::from_entropy(),
        }
    }

    /// Creates a selector with a fixed seed (reproducible rotation).
    pub fn with_seed(seed: u64) -> Self {
        Self {
            previous: None,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Chooses the next track from `entries` and records it as the previous
    /// selection.
    pub fn next(&mut self, entries: &[TrackId]) -> Result<TrackId, SelectionError> {
        let choice = choose_track(entries, self.previous.as_deref(), &mut self.rng)?.clone();
        self.previous = Some(choice.clone());
        Ok(choice)
    }

    /// Returns the most recent selection.
    #[must_use]
    pub fn previous(&self) -> Option<&Path> {
        self.previous.as_deref()
    }
}

impl Default for TrackSelector {
    fn default() -> Self {
        Self::new()
    }
}
