//! Time and period estimation.
//!
//! The feeds this crate reads rarely carry a live game clock or the current
//! quarter, so both are estimated: the quarter from the combined score and
//! the remaining time from wall-clock minutes since tip-off. These are
//! approximations, not authoritative game state.

use chrono::{DateTime, FixedOffset, Offset, Utc};
use std::sync::Arc;

use super::clock::Clock;
use super::models::GameStatus;

pub const LIVE_LABEL: &str = "EN VIVO";
pub const FINAL_LABEL: &str = "FINAL";
pub const STARTING_LABEL: &str = "INICIANDO...";

/// Regulation has four quarters; overtime is not modelled separately.
pub const MAX_PERIOD: u8 = 4;

#[derive(Debug, Clone)]
pub struct TimeEstimatorConfig {
    /// Average combined points (both teams) scored per period.
    pub avg_points_per_period: u32,
    pub total_game_minutes: i64,
    /// Scheduled games starting within this many minutes get a countdown.
    pub countdown_window_minutes: i64,
    /// Offset used when rendering a clock-time label.
    pub display_offset: FixedOffset,
}

impl Default for TimeEstimatorConfig {
    fn default() -> Self {
        Self {
            avg_points_per_period: 25,
            total_game_minutes: 48,
            countdown_window_minutes: 60,
            display_offset: Utc.fix(),
        }
    }
}

#[derive(Clone)]
pub struct TimeEstimator {
    config: TimeEstimatorConfig,
    clock: Arc<dyn Clock>,
}

impl TimeEstimator {
    pub fn new(config: TimeEstimatorConfig, clock: Arc<dyn Clock>) -> Self {
        Self { config, clock }
    }

    /// Label shown in place of a game clock.
    pub fn display_time(&self, started_at: DateTime<Utc>, status: GameStatus) -> String {
        match status {
            GameStatus::Live => LIVE_LABEL.to_string(),
            GameStatus::Finished => FINAL_LABEL.to_string(),
            GameStatus::Scheduled => {
                let minutes_until = floor_minutes(started_at - self.clock.now());
                if minutes_until < 0 {
                    STARTING_LABEL.to_string()
                } else if minutes_until < self.config.countdown_window_minutes {
                    format!("en {minutes_until}min")
                } else {
                    self.clock_label(started_at)
                }
            }
            GameStatus::Unknown => self.clock_label(started_at),
        }
    }

    /// Estimated quarter in `[1, MAX_PERIOD]` for live games, 0 otherwise.
    pub fn estimate_period(&self, home_score: u32, away_score: u32, status: GameStatus) -> u8 {
        if status != GameStatus::Live {
            return 0;
        }
        let raw = self.raw_period(home_score.saturating_add(away_score));
        raw.min(u32::from(MAX_PERIOD)) as u8
    }

    /// Unclamped estimate; values above `MAX_PERIOD` suggest overtime.
    pub fn raw_period(&self, total_score: u32) -> u32 {
        let per_period = self.config.avg_points_per_period.max(1);
        total_score.div_ceil(per_period).max(1)
    }

    /// Coarse remaining-time string for live games, empty otherwise.
    pub fn estimate_remaining(&self, started_at: DateTime<Utc>, status: GameStatus) -> String {
        if status != GameStatus::Live {
            return String::new();
        }

        let elapsed = floor_minutes(self.clock.now() - started_at).max(0);
        let remaining = (self.config.total_game_minutes - elapsed).max(0);
        let (hours, minutes) = (remaining / 60, remaining % 60);

        if hours > 0 {
            format!("{hours}h {minutes}m")
        } else {
            format!("{minutes}m")
        }
    }

    fn clock_label(&self, at: DateTime<Utc>) -> String {
        at.with_timezone(&self.config.display_offset)
            .format("%H:%M")
            .to_string()
    }
}

/// Whole minutes rounded toward negative infinity.
fn floor_minutes(d: chrono::Duration) -> i64 {
    d.num_seconds().div_euclid(60)
}
