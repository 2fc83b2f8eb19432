//! High-interest ("good for betting") game detection.
//!
//! A live game past the first quarter with a wide score gap. Recomputed on
//! every read; never stored on the `Game`.

use serde::Serialize;

use crate::data::models::Game;
use crate::data::time_estimator::{TimeEstimator, MAX_PERIOD};

#[derive(Debug, Clone)]
pub struct BettingConfig {
    /// Minimum estimated quarter (inclusive).
    pub min_period: u8,
    /// Minimum absolute score difference (inclusive).
    pub min_score_diff: u32,
}

impl Default for BettingConfig {
    fn default() -> Self {
        Self {
            min_period: 2,
            min_score_diff: 10,
        }
    }
}

/// Detail shown when a game card is opened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BettingInfo {
    pub high_interest: bool,
    pub period: u8,
    pub score_diff: u32,
    /// Name of the leading team; `None` on a tie.
    pub leader: Option<String>,
    pub leading_score: u32,
    pub trailing_score: u32,
    /// `None` before any points are scored.
    pub period_label: Option<String>,
}

#[derive(Clone)]
pub struct BettingHeuristic {
    config: BettingConfig,
    estimator: TimeEstimator,
}

impl BettingHeuristic {
    pub fn new(config: BettingConfig, estimator: TimeEstimator) -> Self {
        Self { config, estimator }
    }

    pub fn is_high_interest(&self, game: &Game) -> bool {
        game.is_live()
            && self.period(game) >= self.config.min_period
            && game.score_diff() >= self.config.min_score_diff
    }

    pub fn info(&self, game: &Game) -> BettingInfo {
        let leader = match game.home_score.cmp(&game.away_score) {
            std::cmp::Ordering::Greater => Some(game.home_team.name.clone()),
            std::cmp::Ordering::Less => Some(game.away_team.name.clone()),
            std::cmp::Ordering::Equal => None,
        };

        BettingInfo {
            high_interest: self.is_high_interest(game),
            period: self.period(game),
            score_diff: game.score_diff(),
            leader,
            leading_score: game.home_score.max(game.away_score),
            trailing_score: game.home_score.min(game.away_score),
            period_label: self.period_label(game.total_score()),
        }
    }

    fn period(&self, game: &Game) -> u8 {
        self.estimator
            .estimate_period(game.home_score, game.away_score, game.status)
    }

    fn period_label(&self, total_score: u32) -> Option<String> {
        if total_score == 0 {
            return None;
        }
        let raw = self.estimator.raw_period(total_score);
        if raw > u32::from(MAX_PERIOD) {
            Some("Tiempo Extra".to_string())
        } else {
            Some(format!("{raw}° Período"))
        }
    }
}
