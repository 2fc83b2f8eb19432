//! Games service facade.
//!
//! The only entry point the presentation layer talks to. A call either
//! serves the cached list or runs one refresh through the fallback chain:
//! primary strategies, then the stale snapshot, then synthetic data.
//! Nothing here returns an error; the outcome of each refresh is recorded
//! as a `RefreshReport` for diagnostics.
//!
//! Refreshes never overlap: a single async slot serializes them, and the
//! poll path (`try_get_games`) skips its tick instead of queueing when the
//! slot is taken.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::{Arc, Mutex, PoisonError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::acquisition::acquirer::{DataAcquirer, StrategyFailure};
use crate::data::clock::Clock;
use crate::data::models::{Game, ParseFailure};
use crate::data::parser::MatchRecordParser;
use crate::state::cache::{GameCache, GameList};

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Serve an expired snapshot before falling back to synthetic data.
    pub serve_stale_cache: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            serve_stale_cache: true,
        }
    }
}

/// Where the list returned by a call came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RefreshOutcome {
    Cache,
    Fresh { source: String },
    StaleCache,
    Synthetic,
    /// No real, cached or synthetic data; the caller got an empty list.
    Exhausted,
    Cancelled,
}

#[derive(Debug, Clone)]
pub struct RefreshReport {
    pub outcome: RefreshOutcome,
    pub parse_failures: Vec<ParseFailure>,
    pub failed_strategies: Vec<StrategyFailure>,
    pub at: DateTime<Utc>,
}

impl RefreshReport {
    fn new(outcome: RefreshOutcome, at: DateTime<Utc>) -> Self {
        Self {
            outcome,
            parse_failures: Vec::new(),
            failed_strategies: Vec::new(),
            at,
        }
    }
}

pub struct GamesService {
    cache: GameCache,
    acquirer: DataAcquirer,
    parser: MatchRecordParser,
    clock: Arc<dyn Clock>,
    config: ServiceConfig,

    refresh_slot: tokio::sync::Mutex<()>,
    shutdown: CancellationToken,
    in_flight: Mutex<CancellationToken>,
    last_update: Mutex<Option<DateTime<Utc>>>,
    last_report: Mutex<Option<RefreshReport>>,
}

impl GamesService {
    pub fn new(
        cache: GameCache,
        acquirer: DataAcquirer,
        parser: MatchRecordParser,
        clock: Arc<dyn Clock>,
        config: ServiceConfig,
    ) -> Self {
        let shutdown = CancellationToken::new();
        let in_flight = Mutex::new(shutdown.child_token());
        Self {
            cache,
            acquirer,
            parser,
            clock,
            config,
            refresh_slot: tokio::sync::Mutex::new(()),
            shutdown,
            in_flight,
            last_update: Mutex::new(None),
            last_report: Mutex::new(None),
        }
    }

    // =========================================================================
    // Public contract
    // =========================================================================

    /// Cached list if fresh, otherwise a refresh. Waits for any refresh
    /// already in flight and then re-checks the cache.
    pub async fn get_games(&self) -> GameList {
        let _slot = self.refresh_slot.lock().await;
        self.serve_locked().await
    }

    /// Like `get_games`, but returns `None` immediately when a refresh is
    /// already running.
    pub async fn try_get_games(&self) -> Option<GameList> {
        let Ok(_slot) = self.refresh_slot.try_lock() else {
            debug!("Refresh already in flight, skipping");
            return None;
        };
        Some(self.serve_locked().await)
    }

    /// Abandon any in-flight refresh, drop the cache and refresh now.
    pub async fn force_update(&self) -> GameList {
        self.cancel_in_flight();
        let _slot = self.refresh_slot.lock().await;
        self.cache.clear();
        self.refresh_locked().await
    }

    /// Time of the last refresh that stored a new list.
    pub fn last_update(&self) -> Option<DateTime<Utc>> {
        *self.last_update.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn last_report(&self) -> Option<RefreshReport> {
        self.last_report
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn cancel_in_flight(&self) {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .cancel();
    }

    /// Cancel the current refresh and every later one.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    // =========================================================================
    // Refresh
    // =========================================================================

    async fn serve_locked(&self) -> GameList {
        if let Some(games) = self.cache.get() {
            debug!(count = games.len(), "Serving cached games");
            self.record(RefreshReport::new(RefreshOutcome::Cache, self.clock.now()));
            return games;
        }
        self.refresh_locked().await
    }

    /// Caller must hold `refresh_slot`.
    async fn refresh_locked(&self) -> GameList {
        let token = self.begin_refresh();
        let mut report = RefreshReport::new(RefreshOutcome::Exhausted, self.clock.now());

        let acquisition = self.acquirer.acquire(&token).await;
        report.failed_strategies = acquisition.failures;

        if acquisition.cancelled {
            return self.finish_cancelled(report);
        }

        if let Some(source) = acquisition.source {
            let batch = self.parser.parse_batch(&acquisition.records, &source);
            report.parse_failures = batch.failures;

            if !batch.games.is_empty() {
                let games = self.store(batch.games);
                info!(source = %source, count = games.len(), "Refreshed games");
                report.outcome = RefreshOutcome::Fresh { source };
                self.record(report);
                return games;
            }
            warn!(source = %source, "No record from source could be parsed");
        }

        if self.config.serve_stale_cache {
            if let Some(stale) = self.cache.get_stale() {
                info!(count = stale.len(), "All sources failed, serving stale cache");
                report.outcome = RefreshOutcome::StaleCache;
                self.record(report);
                return stale;
            }
        }

        let fallback = self.acquirer.acquire_last_resort(&token).await;
        report.failed_strategies.extend(fallback.failures);

        if fallback.cancelled {
            return self.finish_cancelled(report);
        }

        if let Some(source) = fallback.source {
            let batch = self.parser.parse_batch(&fallback.records, &source);
            report.parse_failures.extend(batch.failures);

            if !batch.games.is_empty() {
                let games = self.store(batch.games);
                info!(source = %source, count = games.len(), "All sources failed, serving synthetic games");
                report.outcome = RefreshOutcome::Synthetic;
                self.record(report);
                return games;
            }
        }

        warn!(
            failed_strategies = report.failed_strategies.len(),
            parse_failures = report.parse_failures.len(),
            "All sources exhausted, no games available"
        );
        self.record(report);
        Arc::new(Vec::new())
    }

    fn finish_cancelled(&self, mut report: RefreshReport) -> GameList {
        info!("Refresh cancelled");
        report.outcome = RefreshOutcome::Cancelled;
        self.record(report);
        self.cache.get_stale().unwrap_or_default()
    }

    fn begin_refresh(&self) -> CancellationToken {
        let token = self.shutdown.child_token();
        *self.in_flight.lock().unwrap_or_else(PoisonError::into_inner) = token.clone();
        token
    }

    fn store(&self, games: Vec<Game>) -> GameList {
        let games = self.cache.set(games);
        *self.last_update.lock().unwrap_or_else(PoisonError::into_inner) = Some(self.clock.now());
        games
    }

    fn record(&self, report: RefreshReport) {
        *self.last_report.lock().unwrap_or_else(PoisonError::into_inner) = Some(report);
    }
}

// =============================================================================
// Tests
// =============================================================================
