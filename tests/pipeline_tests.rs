//! End-to-end tests for the games pipeline.
//!
//! Drives `GamesService` through in-process strategies and a manual clock:
//! raw records in, canonical games out, with the cache and fallback chain
//! in between.
//!
//! Covered:
//!   1. Record normalization        (live record, missing scores)
//!   2. Fallback chain              (synthetic when every source fails)
//!   3. High-interest detection     (live vs scheduled)
//!   4. Cache behaviour             (idempotence, TTL expiry, forced refresh)
//!   5. Concurrency                 (skipped ticks, cancelled refresh)

use chrono::{Duration, TimeZone, Utc};
use futures::future::BoxFuture;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use courtside::acquisition::acquirer::{AcquirerConfig, DataAcquirer};
use courtside::acquisition::strategy::{AcquisitionStrategy, SyntheticStrategy};
use courtside::analysis::betting::{BettingConfig, BettingHeuristic};
use courtside::api::errors::AcquireError;
use courtside::data::clock::{Clock, ManualClock};
use courtside::data::models::{Game, GameStatus, RawRecord};
use courtside::data::parser::MatchRecordParser;
use courtside::data::synthetic::SyntheticGenerator;
use courtside::data::time_estimator::{TimeEstimator, TimeEstimatorConfig};
use courtside::service::{GamesService, RefreshOutcome, ServiceConfig};
use courtside::state::cache::GameCache;

// =============================================================================
// Helpers
// =============================================================================

enum Script {
    Records(Vec<RawRecord>),
    Fail,
    /// Hang on the first call (until cancelled), then return records.
    HangOnce(Vec<RawRecord>),
    /// Wait for the gate to open, then return records.
    Gated(Arc<Notify>, Vec<RawRecord>),
}

struct ScriptedStrategy {
    script: Script,
    calls: AtomicUsize,
}

impl ScriptedStrategy {
    fn new(script: Script) -> Arc<Self> {
        Arc::new(Self {
            script,
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl AcquisitionStrategy for ScriptedStrategy {
    fn name(&self) -> &str {
        "scripted"
    }

    fn try_acquire<'a>(
        &'a self,
        _cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<Vec<RawRecord>, AcquireError>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        Box::pin(async move {
            match &self.script {
                Script::Records(r) => Ok(r.clone()),
                Script::Fail => Err(AcquireError::Network("connection refused".into())),
                Script::HangOnce(r) => {
                    if call == 0 {
                        futures::future::pending::<()>().await;
                    }
                    Ok(r.clone())
                }
                Script::Gated(gate, r) => {
                    gate.notified().await;
                    Ok(r.clone())
                }
            }
        })
    }
}

struct Harness {
    clock: ManualClock,
    service: Arc<GamesService>,
    estimator: TimeEstimator,
}

fn start() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 7, 6, 18, 0, 0).unwrap()
}

fn harness(primary: Vec<Arc<ScriptedStrategy>>, synthetic: bool, timeout_ms: u64) -> Harness {
    let clock = ManualClock::new(start());
    let shared: Arc<dyn Clock> = Arc::new(clock.clone());
    let estimator = TimeEstimator::new(TimeEstimatorConfig::default(), shared.clone());

    let mut acquirer = DataAcquirer::new(AcquirerConfig {
        strategy_timeout: std::time::Duration::from_millis(timeout_ms),
    });
    for strategy in primary {
        acquirer = acquirer.with_strategy(strategy);
    }
    if synthetic {
        let generator = SyntheticGenerator::new(Some(7), shared.clone());
        acquirer = acquirer.with_last_resort(Arc::new(SyntheticStrategy::new(generator)));
    }

    let service = GamesService::new(
        GameCache::new(Duration::seconds(15), shared.clone()),
        acquirer,
        MatchRecordParser::new(estimator.clone(), shared.clone()),
        shared,
        ServiceConfig::default(),
    );

    Harness {
        clock,
        service: Arc::new(service),
        estimator,
    }
}

fn lakers_celtics() -> RawRecord {
    json!({
        "id": "g-1",
        "home_team": "Lakers",
        "away_team": "Celtics",
        "home_score": 75,
        "away_score": 68,
        "status": "live"
    })
}

/// Invariants every emitted game must hold, real or synthetic.
fn assert_game_invariants(game: &Game) {
    for team in [&game.home_team, &game.away_team] {
        assert!(!team.name.is_empty());
        assert!(team.abbreviation.len() <= 3);
        assert!(team.abbreviation.chars().all(|c| c.is_ascii_uppercase()));
        assert!(team
            .id
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_'));
    }
    assert!(!game.display_time.is_empty());
    if game.status == GameStatus::Live {
        assert!((1..=4).contains(&game.period));
    } else {
        assert_eq!(game.period, 0);
        assert!(game.time_remaining.is_empty());
    }
}

// =============================================================================
// 1. Record normalization
// =============================================================================

#[tokio::test]
async fn test_live_record_parses_to_canonical_game() {
    let h = harness(
        vec![ScriptedStrategy::new(Script::Records(vec![lakers_celtics()]))],
        false,
        1_000,
    );

    let games = h.service.get_games().await;
    assert_eq!(games.len(), 1);

    let game = &games[0];
    // 75 + 68 = 143 points / 25 per quarter, clamped to the 4th.
    assert_eq!(game.status, GameStatus::Live);
    assert_eq!((game.home_score, game.away_score), (75, 68));
    assert_eq!(game.period, 4);
    assert_eq!(game.display_time, "EN VIVO");
    assert_eq!(game.home_team.abbreviation, "L");
    assert_eq!(game.source_tag, "scripted");
    assert_game_invariants(game);
}

#[tokio::test]
async fn test_missing_scores_parse_as_zero() {
    let record = json!({ "homeTeam": "Miami Heat", "awayTeam": "Chicago Bulls", "status": "scheduled" });
    let h = harness(vec![ScriptedStrategy::new(Script::Records(vec![record]))], false, 1_000);

    let games = h.service.get_games().await;
    assert_eq!((games[0].home_score, games[0].away_score), (0, 0));
    assert!(!games[0].home_score_known && !games[0].away_score_known);
    assert_game_invariants(&games[0]);
}

#[tokio::test]
async fn test_bad_records_are_dropped_and_reported() {
    let records = vec![
        lakers_celtics(),
        json!(42),
        json!({ "home_team": "A", "away_team": "B", "home_score": "lots" }),
    ];
    let h = harness(vec![ScriptedStrategy::new(Script::Records(records))], false, 1_000);

    let games = h.service.get_games().await;
    assert_eq!(games.len(), 1);

    let report = h.service.last_report().unwrap();
    assert_eq!(
        report.outcome,
        RefreshOutcome::Fresh {
            source: "scripted".to_string()
        }
    );
    let indices: Vec<usize> = report.parse_failures.iter().map(|f| f.index).collect();
    assert_eq!(indices, vec![1, 2]);
}

// =============================================================================
// 2. Fallback chain
// =============================================================================

#[tokio::test]
async fn test_all_sources_failing_falls_back_to_synthetic() {
    let failing = ScriptedStrategy::new(Script::Fail);
    let hanging = ScriptedStrategy::new(Script::HangOnce(vec![lakers_celtics()]));
    let h = harness(vec![failing.clone(), hanging.clone()], true, 50);

    let games = h.service.get_games().await;
    assert_eq!(games.len(), 6);
    for game in games.iter() {
        assert_eq!(game.source_tag, "synthetic");
        assert_game_invariants(game);
    }

    let report = h.service.last_report().unwrap();
    assert_eq!(report.outcome, RefreshOutcome::Synthetic);
    assert_eq!(report.failed_strategies.len(), 2);
    assert!(report.failed_strategies[1].error.is_timeout());
    assert_eq!((failing.calls(), hanging.calls()), (1, 1));
}

#[tokio::test]
async fn test_exhausted_without_synthetic_returns_empty_and_retries() {
    let failing = ScriptedStrategy::new(Script::Fail);
    let h = harness(vec![failing.clone()], false, 50);

    assert!(h.service.get_games().await.is_empty());
    assert_eq!(h.service.last_report().unwrap().outcome, RefreshOutcome::Exhausted);

    // Empty lists are never cached.
    assert!(h.service.get_games().await.is_empty());
    assert_eq!(failing.calls(), 2);
}

// =============================================================================
// 3. High-interest detection
// =============================================================================

#[tokio::test]
async fn test_high_interest_live_vs_scheduled() {
    let records = vec![
        json!({ "id": "a", "home_team": "Miami Heat", "away_team": "Chicago Bulls", "home_score": 70, "away_score": 55, "status": "live" }),
        json!({ "id": "b", "home_team": "Miami Heat", "away_team": "Chicago Bulls", "home_score": 70, "away_score": 55, "status": "scheduled" }),
    ];
    let h = harness(vec![ScriptedStrategy::new(Script::Records(records))], false, 1_000);
    let heuristic = BettingHeuristic::new(BettingConfig::default(), h.estimator.clone());

    let games = h.service.get_games().await;
    assert!(heuristic.is_high_interest(&games[0]));
    assert!(!heuristic.is_high_interest(&games[1]));
}

#[tokio::test]
async fn test_early_blowout_is_flagged_in_second_quarter() {
    let records = vec![
        json!({ "id": "a", "home_team": "Miami Heat", "away_team": "Chicago Bulls", "home_score": 30, "away_score": 15, "status": "live" }),
        json!({ "id": "b", "home_team": "Boston Celtics", "away_team": "New York Knicks", "home_score": 20, "away_score": 3, "status": "live" }),
    ];
    let h = harness(vec![ScriptedStrategy::new(Script::Records(records))], false, 1_000);
    let heuristic = BettingHeuristic::new(BettingConfig::default(), h.estimator.clone());

    let games = h.service.get_games().await;
    assert_eq!(games[0].period, 2);
    assert!(heuristic.is_high_interest(&games[0]));
    // 23 points is still the first quarter.
    assert_eq!(games[1].period, 1);
    assert!(!heuristic.is_high_interest(&games[1]));
}

// =============================================================================
// 4. Cache behaviour
// =============================================================================

#[tokio::test]
async fn test_repeat_calls_within_ttl_share_one_acquisition() {
    let primary = ScriptedStrategy::new(Script::Records(vec![lakers_celtics()]));
    let h = harness(vec![primary.clone()], false, 1_000);

    let first = h.service.get_games().await;
    h.clock.advance(Duration::seconds(14));
    let second = h.service.get_games().await;

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(primary.calls(), 1);
}

#[tokio::test]
async fn test_expired_cache_triggers_new_acquisition() {
    let primary = ScriptedStrategy::new(Script::Records(vec![lakers_celtics()]));
    let h = harness(vec![primary.clone()], false, 1_000);

    let first = h.service.get_games().await;
    h.clock.advance(Duration::seconds(16));
    let second = h.service.get_games().await;

    assert_eq!(primary.calls(), 2);
    assert!(!Arc::ptr_eq(&first, &second));
    assert_eq!(first[0].id, second[0].id);
    assert_eq!(second[0].fetched_at, start() + Duration::seconds(16));
}

#[tokio::test]
async fn test_force_update_always_acquires() {
    let primary = ScriptedStrategy::new(Script::Records(vec![lakers_celtics()]));
    let h = harness(vec![primary.clone()], false, 1_000);

    let cached = h.service.get_games().await;
    let forced = h.service.force_update().await;

    assert_eq!(primary.calls(), 2);
    assert!(!Arc::ptr_eq(&cached, &forced));
    assert!(h.service.last_update().is_some());
}

#[tokio::test]
async fn test_force_update_skips_stale_snapshot() {
    let primary = ScriptedStrategy::new(Script::Fail);
    let h = harness(vec![primary], true, 50);

    let first = h.service.get_games().await;
    h.clock.advance(Duration::seconds(30));

    // Plain refresh serves the expired snapshot; a forced one cleared it.
    let stale = h.service.get_games().await;
    assert!(Arc::ptr_eq(&first, &stale));
    assert_eq!(h.service.last_report().unwrap().outcome, RefreshOutcome::StaleCache);

    let forced = h.service.force_update().await;
    assert!(!Arc::ptr_eq(&first, &forced));
    assert_eq!(h.service.last_report().unwrap().outcome, RefreshOutcome::Synthetic);
}

// =============================================================================
// 5. Concurrency
// =============================================================================

#[tokio::test]
async fn test_poll_tick_skipped_while_refresh_in_flight() {
    let gate = Arc::new(Notify::new());
    let primary = ScriptedStrategy::new(Script::Gated(gate.clone(), vec![lakers_celtics()]));
    let h = harness(vec![primary.clone()], false, 5_000);

    let service = h.service.clone();
    let running = tokio::spawn(async move { service.get_games().await });

    while primary.calls() == 0 {
        tokio::task::yield_now().await;
    }
    assert!(h.service.try_get_games().await.is_none());

    gate.notify_one();
    let games = running.await.unwrap();
    assert_eq!(games.len(), 1);

    // Slot free again: the tick is served from cache.
    let polled = h.service.try_get_games().await.unwrap();
    assert!(Arc::ptr_eq(&games, &polled));
    assert_eq!(primary.calls(), 1);
}

#[tokio::test]
async fn test_force_update_cancels_in_flight_refresh() {
    let primary = ScriptedStrategy::new(Script::HangOnce(vec![lakers_celtics()]));
    let h = harness(vec![primary.clone()], false, 60_000);

    let service = h.service.clone();
    let stuck = tokio::spawn(async move { service.get_games().await });

    while primary.calls() == 0 {
        tokio::task::yield_now().await;
    }

    let forced = h.service.force_update().await;
    assert_eq!(forced.len(), 1);
    assert_eq!(
        h.service.last_report().unwrap().outcome,
        RefreshOutcome::Fresh {
            source: "scripted".to_string()
        }
    );

    let abandoned = stuck.await.unwrap();
    assert!(abandoned.is_empty());
    assert_eq!(primary.calls(), 2);
}
