//! Raw match record parsing.
//!
//! Every source names its fields differently (`home_team`, `homeTeam`,
//! `team1`, `teamAName`, ...). Each logical field has an ordered alias list;
//! the first alias present with a non-null value wins, otherwise a default
//! applies. A value that is present but unusable (negative score, array
//! where a name should be) fails that one record only.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

use super::clock::Clock;
use super::models::{Game, ParseFailure, ParseFailureCause, RawRecord};
use super::status::classify;
use super::team::normalize;
use super::time_estimator::TimeEstimator;

// =============================================================================
// Field aliases
// =============================================================================

const ID_FIELDS: &[&str] = &["externalId", "external_id", "id", "gameId", "game_id", "matchId", "match_id"];

const HOME_TEAM_FIELDS: &[&str] = &[
    "teamAName",
    "home_team",
    "homeTeam",
    "team1",
    "home",
    "homeTeamName",
    "home_team_name",
    "teamA",
];

const AWAY_TEAM_FIELDS: &[&str] = &[
    "teamBName",
    "away_team",
    "awayTeam",
    "team2",
    "away",
    "awayTeamName",
    "away_team_name",
    "teamB",
];

const HOME_SCORE_FIELDS: &[&str] = &["teamAScore", "home_score", "homeScore", "score1", "team1Score", "team1_score", "scoreA"];

const AWAY_SCORE_FIELDS: &[&str] = &["teamBScore", "away_score", "awayScore", "score2", "team2Score", "team2_score", "scoreB"];

const STATUS_FIELDS: &[&str] = &["status", "state", "gameStatus", "game_status", "matchStatus", "match_status"];

const START_FIELDS: &[&str] = &["startDate", "start_date", "startTime", "start_time", "commence_time", "date", "scheduled"];

const STREAM_FIELDS: &[&str] = &["streamName", "stream_name", "stream", "league"];

const HOME_PLAYER_FIELDS: &[&str] = &["participantAName", "participant_a_name", "homePlayer", "home_player", "player1"];

const AWAY_PLAYER_FIELDS: &[&str] = &["participantBName", "participant_b_name", "awayPlayer", "away_player", "player2"];

/// Keys tried, in order, when a team or status arrives as a nested object.
const NESTED_NAME_FIELDS: &[&str] = &["name", "displayName", "teamName", "type"];

pub const HOME_FALLBACK_NAME: &str = "Equipo Local";
pub const AWAY_FALLBACK_NAME: &str = "Equipo Visitante";
pub const DEFAULT_STREAM: &str = "H2H GG League";

/// Epoch values above this are taken as milliseconds.
const EPOCH_MILLIS_THRESHOLD: i64 = 100_000_000_000;

// =============================================================================
// Parser
// =============================================================================

/// Outcome of parsing one batch: successes in input order plus failures.
#[derive(Debug, Clone, Default)]
pub struct ParsedBatch {
    pub games: Vec<Game>,
    pub failures: Vec<ParseFailure>,
}

#[derive(Clone)]
pub struct MatchRecordParser {
    estimator: TimeEstimator,
    clock: Arc<dyn Clock>,
}

impl MatchRecordParser {
    pub fn new(estimator: TimeEstimator, clock: Arc<dyn Clock>) -> Self {
        Self { estimator, clock }
    }

    /// Parse a single record.
    pub fn parse(&self, raw: &RawRecord, index: usize, source_tag: &str) -> Result<Game, ParseFailure> {
        self.parse_at(raw, index, source_tag, self.clock.now())
    }

    /// Parse a whole batch against one timestamp so synthesized ids stay
    /// unique within it. Failed records are logged and skipped. A repeated
    /// upstream id gets the record index appended.
    pub fn parse_batch(&self, records: &[RawRecord], source_tag: &str) -> ParsedBatch {
        let fetched_at = self.clock.now();
        let mut batch = ParsedBatch::default();
        let mut seen_ids = HashSet::new();

        for (index, raw) in records.iter().enumerate() {
            match self.parse_at(raw, index, source_tag, fetched_at) {
                Ok(mut game) => {
                    if !seen_ids.insert(game.id.clone()) {
                        let id = format!("{}_{index}", game.id);
                        debug!(source = source_tag, index, duplicate = %game.id, id = %id, "Renaming duplicate game id");
                        game.id = id;
                        seen_ids.insert(game.id.clone());
                    }
                    batch.games.push(game);
                }
                Err(failure) => {
                    warn!(
                        source = source_tag,
                        index,
                        error = %failure.cause,
                        "Skipping unparseable record"
                    );
                    batch.failures.push(failure);
                }
            }
        }

        batch
    }

    fn parse_at(
        &self,
        raw: &RawRecord,
        index: usize,
        source_tag: &str,
        fetched_at: DateTime<Utc>,
    ) -> Result<Game, ParseFailure> {
        let fail = |cause| ParseFailure {
            index,
            source_tag: source_tag.to_string(),
            cause,
        };

        let obj = raw.as_object().ok_or_else(|| fail(ParseFailureCause::NotAnObject))?;

        let home_name = team_name(obj, HOME_TEAM_FIELDS).map_err(fail)?;
        let away_name = team_name(obj, AWAY_TEAM_FIELDS).map_err(fail)?;
        let home_score = score(obj, HOME_SCORE_FIELDS).map_err(fail)?;
        let away_score = score(obj, AWAY_SCORE_FIELDS).map_err(fail)?;
        let started_at = start_time(obj).map_err(fail)?.unwrap_or(fetched_at);

        let status = classify(text(obj, STATUS_FIELDS).as_deref());
        let (home_score, home_score_known) = (home_score.unwrap_or(0), home_score.is_some());
        let (away_score, away_score_known) = (away_score.unwrap_or(0), away_score.is_some());

        let id = external_id(obj).unwrap_or_else(|| {
            format!("{source_tag}_{}_{index}", fetched_at.timestamp_millis())
        });

        Ok(Game {
            id,
            home_team: normalize(home_name.as_deref(), HOME_FALLBACK_NAME),
            away_team: normalize(away_name.as_deref(), AWAY_FALLBACK_NAME),
            home_score,
            away_score,
            home_score_known,
            away_score_known,
            status,
            display_time: self.estimator.display_time(started_at, status),
            period: self.estimator.estimate_period(home_score, away_score, status),
            time_remaining: self.estimator.estimate_remaining(started_at, status),
            started_at,
            source_tag: source_tag.to_string(),
            fetched_at,
            stream_name: text(obj, STREAM_FIELDS).unwrap_or_else(|| DEFAULT_STREAM.to_string()),
            home_player: text(obj, HOME_PLAYER_FIELDS),
            away_player: text(obj, AWAY_PLAYER_FIELDS),
        })
    }
}

// =============================================================================
// Field helpers
// =============================================================================

/// First alias present with a non-null value.
fn first_present<'a>(obj: &'a Map<String, Value>, fields: &[&'static str]) -> Option<(&'static str, &'a Value)> {
    fields
        .iter()
        .find_map(|f| obj.get(*f).filter(|v| !v.is_null()).map(|v| (*f, v)))
}

fn nested_name(obj: &Map<String, Value>) -> Option<String> {
    NESTED_NAME_FIELDS
        .iter()
        .find_map(|f| obj.get(*f).and_then(Value::as_str))
        .map(str::to_string)
}

/// Non-empty trimmed string from a string, number, or `{name: ...}` object.
fn text(obj: &Map<String, Value>, fields: &[&'static str]) -> Option<String> {
    let (_, value) = first_present(obj, fields)?;
    let s = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Object(inner) => nested_name(inner)?,
        _ => return None,
    };
    (!s.is_empty()).then_some(s)
}

fn external_id(obj: &Map<String, Value>) -> Option<String> {
    text(obj, ID_FIELDS)
}

fn team_name(obj: &Map<String, Value>, fields: &[&'static str]) -> Result<Option<String>, ParseFailureCause> {
    let Some((field, value)) = first_present(obj, fields) else {
        return Ok(None);
    };

    match value {
        Value::String(s) => Ok(Some(s.clone())),
        Value::Object(inner) => Ok(nested_name(inner)),
        _ => Err(ParseFailureCause::InvalidTeamName {
            field: field.to_string(),
        }),
    }
}

/// `Ok(None)` when absent or blank; error when present but not a
/// non-negative integer.
fn score(obj: &Map<String, Value>, fields: &[&'static str]) -> Result<Option<u32>, ParseFailureCause> {
    let Some((field, value)) = first_present(obj, fields) else {
        return Ok(None);
    };

    let invalid = || ParseFailureCause::InvalidScore {
        field: field.to_string(),
        value: value.to_string(),
    };

    match value {
        Value::Number(n) => {
            if let Some(u) = n.as_u64() {
                u32::try_from(u).map(Some).map_err(|_| invalid())
            } else if let Some(f) = n.as_f64().filter(|f| f.is_finite() && *f >= 0.0) {
                u32::try_from(f.floor() as u64).map(Some).map_err(|_| invalid())
            } else {
                Err(invalid())
            }
        }
        Value::String(s) if s.trim().is_empty() => Ok(None),
        Value::String(s) => s.trim().parse::<u32>().map(Some).map_err(|_| invalid()),
        _ => Err(invalid()),
    }
}

fn start_time(obj: &Map<String, Value>) -> Result<Option<DateTime<Utc>>, ParseFailureCause> {
    let Some((field, value)) = first_present(obj, START_FIELDS) else {
        return Ok(None);
    };

    let invalid = || ParseFailureCause::InvalidTimestamp {
        field: field.to_string(),
        value: value.to_string(),
    };

    match value {
        Value::String(s) if s.trim().is_empty() => Ok(None),
        Value::String(s) => parse_datetime(s.trim()).map(Some).ok_or_else(invalid),
        Value::Number(n) => n
            .as_i64()
            .and_then(from_epoch)
            .map(Some)
            .ok_or_else(invalid),
        _ => Err(invalid()),
    }
}

fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|naive| Utc.from_utc_datetime(&naive))
        .or_else(|| s.parse::<i64>().ok().and_then(from_epoch))
}

fn from_epoch(value: i64) -> Option<DateTime<Utc>> {
    if value.abs() >= EPOCH_MILLIS_THRESHOLD {
        DateTime::from_timestamp_millis(value)
    } else {
        DateTime::from_timestamp(value, 0)
    }
}

// =============================================================================
// Tests
// =============================================================================
