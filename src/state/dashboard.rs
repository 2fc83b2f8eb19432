//! Presentation state for the dashboard view.
//!
//! Holds the current game list plus the viewer's filter and search term,
//! and remembers which games were flagged high-interest on the previous
//! refresh so newly flagged ones can be highlighted.

use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::analysis::betting::BettingHeuristic;
use crate::data::models::{Game, GameStats, GameStatus};

use super::cache::GameList;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum GameFilter {
    #[default]
    All,
    Live,
    Scheduled,
    Finished,
    HighInterest,
}

impl GameFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Live => "live",
            Self::Scheduled => "scheduled",
            Self::Finished => "finished",
            Self::HighInterest => "betting",
        }
    }

    fn admits(&self, game: &Game, heuristic: &BettingHeuristic) -> bool {
        match self {
            Self::All => true,
            Self::Live => game.status == GameStatus::Live,
            Self::Scheduled => game.status == GameStatus::Scheduled,
            Self::Finished => game.status == GameStatus::Finished,
            Self::HighInterest => heuristic.is_high_interest(game),
        }
    }
}

impl FromStr for GameFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all" | "" => Ok(Self::All),
            "live" => Ok(Self::Live),
            "scheduled" => Ok(Self::Scheduled),
            "finished" => Ok(Self::Finished),
            "betting" | "high_interest" => Ok(Self::HighInterest),
            _ => Err(format!("Invalid game filter: {s}")),
        }
    }
}

impl fmt::Display for GameFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default)]
pub struct DashboardState {
    games: GameList,
    filter: GameFilter,
    search: String,
    last_update: Option<DateTime<Utc>>,
    flagged: HashSet<String>,
}

impl DashboardState {
    pub fn new(filter: GameFilter, search: impl Into<String>) -> Self {
        Self {
            games: Arc::new(Vec::new()),
            filter,
            search: search.into(),
            last_update: None,
            flagged: HashSet::new(),
        }
    }

    /// Install a refreshed list. Returns ids that are high-interest now but
    /// were not on the previous refresh, in list order.
    pub fn apply_refresh(&mut self, games: GameList, heuristic: &BettingHeuristic, at: DateTime<Utc>) -> Vec<String> {
        let flagged: HashSet<String> = games
            .iter()
            .filter(|g| heuristic.is_high_interest(g))
            .map(|g| g.id.clone())
            .collect();

        let newly_flagged = games
            .iter()
            .filter(|g| flagged.contains(&g.id) && !self.flagged.contains(&g.id))
            .map(|g| g.id.clone())
            .collect();

        self.games = games;
        self.flagged = flagged;
        self.last_update = Some(at);
        newly_flagged
    }

    pub fn games(&self) -> &[Game] {
        &self.games
    }

    pub fn filter(&self) -> GameFilter {
        self.filter
    }

    pub fn set_filter(&mut self, filter: GameFilter) {
        self.filter = filter;
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn set_search(&mut self, term: impl Into<String>) {
        self.search = term.into();
    }

    pub fn last_update(&self) -> Option<DateTime<Utc>> {
        self.last_update
    }

    pub fn is_flagged(&self, game_id: &str) -> bool {
        self.flagged.contains(game_id)
    }

    /// Games passing both the filter and the search term.
    pub fn visible<'a>(&'a self, heuristic: &BettingHeuristic) -> Vec<&'a Game> {
        self.games
            .iter()
            .filter(|g| self.filter.admits(g, heuristic))
            .filter(|g| g.matches_search(&self.search))
            .collect()
    }

    pub fn stats(&self) -> GameStats {
        GameStats::from_games(&self.games).with_high_interest(self.flagged.len())
    }
}
