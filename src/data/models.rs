//! Canonical data models.
//!
//! Upstream feeds disagree on nearly every field name, so raw records stay
//! untyped (`serde_json::Value`) until the parser maps them onto `Game`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

/// One upstream match entry, shape unknown until parsed.
pub type RawRecord = serde_json::Value;

// =============================================================================
// Enums
// =============================================================================

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameStatus {
    #[default]
    Scheduled,
    Live,
    Finished,
    Unknown,
}

impl GameStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Live => "live",
            Self::Finished => "finished",
            Self::Unknown => "unknown",
        }
    }

    /// Short badge text shown on a game card.
    pub fn badge(&self) -> &'static str {
        match self {
            Self::Live => "EN VIVO",
            Self::Finished => "FINALIZADO",
            Self::Scheduled | Self::Unknown => "PROGRAMADO",
        }
    }
}

impl fmt::Display for GameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Team / Game
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub id: String,
    pub name: String,
    pub city: String,
    pub abbreviation: String,
    pub logo_ref: String,
}

/// Normalized game. Built once per parsed record and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Game {
    pub id: String,
    pub home_team: Team,
    pub away_team: Team,
    pub home_score: u32,
    pub away_score: u32,
    /// False when upstream omitted the score (rendered as 0 regardless).
    pub home_score_known: bool,
    pub away_score_known: bool,
    pub status: GameStatus,
    pub display_time: String,
    /// Estimated quarter; 0 when not applicable.
    pub period: u8,
    pub time_remaining: String,
    pub started_at: DateTime<Utc>,
    pub source_tag: String,
    pub fetched_at: DateTime<Utc>,
    pub stream_name: String,
    pub home_player: Option<String>,
    pub away_player: Option<String>,
}

impl Game {
    pub fn is_live(&self) -> bool {
        self.status == GameStatus::Live
    }

    pub fn total_score(&self) -> u32 {
        self.home_score.saturating_add(self.away_score)
    }

    pub fn score_diff(&self) -> u32 {
        self.home_score.abs_diff(self.away_score)
    }

    /// Case-insensitive match against team, player and stream names.
    /// An empty term matches everything.
    pub fn matches_search(&self, term: &str) -> bool {
        let term = term.trim().to_lowercase();
        if term.is_empty() {
            return true;
        }

        let team_fields = |t: &Team| {
            [
                t.name.to_lowercase(),
                t.city.to_lowercase(),
                t.abbreviation.to_lowercase(),
            ]
        };

        team_fields(&self.home_team)
            .into_iter()
            .chain(team_fields(&self.away_team))
            .any(|field| field.contains(&term))
            || self.stream_name.to_lowercase().contains(&term)
            || [&self.home_player, &self.away_player]
                .into_iter()
                .flatten()
                .any(|p| p.to_lowercase().contains(&term))
    }
}

// =============================================================================
// Parse failures
// =============================================================================

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseFailureCause {
    #[error("record is not a JSON object")]
    NotAnObject,

    #[error("invalid score in field '{field}': {value}")]
    InvalidScore { field: String, value: String },

    #[error("unsupported team name in field '{field}'")]
    InvalidTeamName { field: String },

    #[error("invalid start time in field '{field}': {value}")]
    InvalidTimestamp { field: String, value: String },
}

/// A single record that could not be normalized. Never aborts a batch.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("record {index} from {source_tag}: {cause}")]
pub struct ParseFailure {
    pub index: usize,
    pub source_tag: String,
    pub cause: ParseFailureCause,
}

// =============================================================================
// Stats
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GameStats {
    pub total: usize,
    pub live: usize,
    pub scheduled: usize,
    pub finished: usize,
    pub unknown: usize,
    pub streams: usize,
    pub high_interest: usize,
}

impl GameStats {
    pub fn from_games(games: &[Game]) -> Self {
        let mut stats = Self {
            total: games.len(),
            ..Self::default()
        };
        let mut streams = HashSet::new();

        for game in games {
            match game.status {
                GameStatus::Live => stats.live += 1,
                GameStatus::Scheduled => stats.scheduled += 1,
                GameStatus::Finished => stats.finished += 1,
                GameStatus::Unknown => stats.unknown += 1,
            }
            streams.insert(game.stream_name.as_str());
        }

        stats.streams = streams.len();
        stats
    }

    pub fn with_high_interest(mut self, count: usize) -> Self {
        self.high_interest = count;
        self
    }
}

// =============================================================================
// Tests
// =============================================================================
