//! Courtside live basketball scores
//!
//! Headless dashboard that polls H2H e-basketball match feeds and logs the
//! current board.
//!
//! Architecture:
//! - Tokio async runtime, one polling task per refresh tick
//! - Ordered acquisition chain: direct API + mirrors, CORS proxies,
//!   then synthetic data as the last resort
//! - TTL cache shared by all ticks, stale snapshot served when sources fail
//! - High-interest (betting) detection recomputed on every refresh

use std::sync::Arc;
use tokio::signal;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use courtside::acquisition::acquirer::DataAcquirer;
use courtside::acquisition::strategy::{DirectStrategy, ProxyStrategy, SyntheticStrategy};
use courtside::analysis::betting::BettingHeuristic;
use courtside::api::client::{HttpFetcher, RecordFetcher};
use courtside::config::Settings;
use courtside::data::clock::{Clock, SystemClock};
use courtside::data::parser::MatchRecordParser;
use courtside::data::synthetic::SyntheticGenerator;
use courtside::data::time_estimator::TimeEstimator;
use courtside::service::GamesService;
use courtside::state::cache::{GameCache, GameList};
use courtside::state::dashboard::DashboardState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration.
    let settings = Settings::from_env();

    // Initialize logging.
    init_logging(&settings);

    info!("=== Courtside live scores ===");
    let proxies = if settings.enable_proxy_fetch {
        settings.cors_proxies.len()
    } else {
        0
    };
    info!(
        api_url = %settings.api_url,
        mirrors = settings.api_mirrors.len(),
        proxies,
        synthetic = settings.enable_synthetic,
        cache_ttl_secs = settings.cache_ttl_seconds,
        "Configuration loaded"
    );

    // Validate settings.
    if let Err(errors) = settings.validate() {
        for e in &errors {
            error!(error = %e, "Configuration error");
        }
        anyhow::bail!("Configuration validation failed");
    }

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let fetcher: Arc<dyn RecordFetcher> = Arc::new(HttpFetcher::new(settings.http_fetcher_config())?);

    // =========================================================================
    // Acquisition chain
    // =========================================================================
    let mut acquirer = DataAcquirer::new(settings.acquirer_config()).with_strategy(Arc::new(DirectStrategy::new(
        &settings.api_url,
        &settings.api_mirrors,
        fetcher.clone(),
        settings.fetch_options(),
    )));

    if settings.enable_proxy_fetch {
        acquirer = acquirer.with_strategy(Arc::new(ProxyStrategy::new(
            &settings.api_url,
            &settings.cors_proxies,
            fetcher.clone(),
            settings.fetch_options(),
        )));
    }

    if settings.enable_synthetic {
        let generator = SyntheticGenerator::new(settings.synthetic_seed, clock.clone());
        acquirer = acquirer.with_last_resort(Arc::new(SyntheticStrategy::new(generator)));
    }

    info!(strategies = ?acquirer.strategy_names(), last_resort = acquirer.has_last_resort(), "Acquisition chain ready");

    // =========================================================================
    // Service
    // =========================================================================
    let estimator = TimeEstimator::new(settings.time_estimator_config(), clock.clone());
    let heuristic = BettingHeuristic::new(settings.betting_config(), estimator.clone());
    let service = Arc::new(GamesService::new(
        GameCache::new(settings.cache_ttl(), clock.clone()),
        acquirer,
        MatchRecordParser::new(estimator, clock.clone()),
        clock.clone(),
        settings.service_config(),
    ));

    let mut dashboard = DashboardState::new(settings.game_filter, settings.game_search.clone());

    // Shutdown signal.
    let shutdown = CancellationToken::new();
    let shutdown_clone = shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for ctrl+c");
        }
        info!("Shutdown signal received");
        shutdown_clone.cancel();
    });

    // Main polling loop.
    info!(
        refresh_interval_secs = settings.refresh_interval_seconds,
        filter = %dashboard.filter(),
        search = %dashboard.search(),
        "Starting polling loop"
    );

    let (games_tx, mut games_rx) = mpsc::channel::<GameList>(4);
    let mut ticker = tokio::time::interval(settings.refresh_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                info!("Stopping polling loop...");
                service.shutdown();
                break;
            }
            _ = ticker.tick() => {
                let service = service.clone();
                let tx = games_tx.clone();
                tokio::spawn(async move {
                    if let Some(games) = service.try_get_games().await {
                        let _ = tx.send(games).await;
                    }
                });
            }
            Some(games) = games_rx.recv() => {
                render(&mut dashboard, games, &heuristic, &service, clock.as_ref());
            }
        }
    }

    info!("Shutdown complete.");
    Ok(())
}

/// Install a refresh into the dashboard and log what a viewer would see.
fn render(
    dashboard: &mut DashboardState,
    games: GameList,
    heuristic: &BettingHeuristic,
    service: &GamesService,
    clock: &dyn Clock,
) {
    let newly_flagged = dashboard.apply_refresh(games, heuristic, clock.now());

    if let Some(report) = service.last_report() {
        if !report.parse_failures.is_empty() || !report.failed_strategies.is_empty() {
            warn!(
                outcome = ?report.outcome,
                parse_failures = report.parse_failures.len(),
                failed_strategies = report.failed_strategies.len(),
                "Refresh degraded"
            );
        }
    }

    for game in dashboard.visible(heuristic) {
        info!(
            id = %game.id,
            stream = %game.stream_name,
            home = %game.home_team.abbreviation,
            away = %game.away_team.abbreviation,
            score = %format!("{}-{}", game.home_score, game.away_score),
            status = game.status.badge(),
            time = %game.display_time,
            remaining = %game.time_remaining,
            high_interest = dashboard.is_flagged(&game.id),
            "Game"
        );
    }

    for id in &newly_flagged {
        if let Some(game) = dashboard.games().iter().find(|g| &g.id == id) {
            let detail = heuristic.info(game);
            info!(
                id = %id,
                home = %game.home_team.name,
                away = %game.away_team.name,
                diff = detail.score_diff,
                period = ?detail.period_label,
                "New high-interest game"
            );
        }
    }

    let stats = dashboard.stats();
    info!(
        total = stats.total,
        live = stats.live,
        scheduled = stats.scheduled,
        finished = stats.finished,
        streams = stats.streams,
        high_interest = stats.high_interest,
        last_update = ?service.last_update(),
        "Dashboard updated"
    );
}

fn init_logging(settings: &Settings) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.log_level));

    if settings.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init();
    }
}
