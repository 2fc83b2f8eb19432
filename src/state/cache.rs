//! Single-entry game list cache with a time-to-live.
//!
//! The snapshot is shared as `Arc<Vec<Game>>`, so repeated hits hand out
//! the very same list. An expired snapshot is kept around (not served by
//! `get`) until it is replaced or explicitly cleared, so the service can
//! fall back to it when every source is down.

use chrono::{DateTime, Duration, Utc};
use std::sync::{Arc, PoisonError, RwLock};

use crate::data::clock::Clock;
use crate::data::models::Game;

pub type GameList = Arc<Vec<Game>>;

#[derive(Debug, Clone)]
struct Snapshot {
    games: GameList,
    captured_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct GameCache {
    ttl: Duration,
    clock: Arc<dyn Clock>,
    inner: Arc<RwLock<Option<Snapshot>>>,
}

impl GameCache {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            ttl,
            clock,
            inner: Arc::new(RwLock::new(None)),
        }
    }

    /// The cached list, if it was captured less than `ttl` ago.
    pub fn get(&self) -> Option<GameList> {
        let now = self.clock.now();
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner
            .as_ref()
            .filter(|s| now - s.captured_at < self.ttl)
            .map(|s| Arc::clone(&s.games))
    }

    /// The cached list regardless of age. `None` after `clear`.
    pub fn get_stale(&self) -> Option<GameList> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.as_ref().map(|s| Arc::clone(&s.games))
    }

    /// Replace the snapshot, stamped with the current time.
    pub fn set(&self, games: Vec<Game>) -> GameList {
        let games = Arc::new(games);
        let snapshot = Snapshot {
            games: Arc::clone(&games),
            captured_at: self.clock.now(),
        };
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = Some(snapshot);
        games
    }

    pub fn clear(&self) {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = None;
    }
}
