//! Synthetic match data.
//!
//! Produces records in the upstream API shape so they flow through the same
//! parser as real data. The shape is fixed (four live games, two scheduled);
//! teams, players and scores are random. Used only when every real source
//! is unreachable, so the dashboard never goes blank.

use chrono::Duration;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde_json::json;
use std::sync::{Arc, Mutex};

use super::clock::Clock;
use super::models::RawRecord;

const TEAMS: &[&str] = &[
    "Oklahoma City Thunder",
    "Los Angeles Lakers",
    "Toronto Raptors",
    "Chicago Bulls",
    "Cleveland Cavaliers",
    "Milwaukee Bucks",
    "Boston Celtics",
    "New York Knicks",
    "Brooklyn Nets",
    "Golden State Warriors",
    "Miami Heat",
    "Dallas Mavericks",
    "Charlotte Hornets",
];

const PLAYERS: &[&str] = &[
    "LANES", "CHIEF", "OREZ", "HUNCHO", "SAINT JR", "PRODIGY", "EQUALIZER", "ARACHNE", "TAAPZ", "CRUCIAL",
];

const LIVE_GAMES: usize = 4;
const SCHEDULED_OFFSETS_MINUTES: &[i64] = &[15, 30];
const STREAMS: usize = 4;

pub struct SyntheticGenerator {
    rng: Mutex<StdRng>,
    clock: Arc<dyn Clock>,
}

impl SyntheticGenerator {
    /// `seed` makes the output reproducible; `None` seeds from entropy.
    pub fn new(seed: Option<u64>, clock: Arc<dyn Clock>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            rng: Mutex::new(rng),
            clock,
        }
    }

    pub fn generate(&self) -> Vec<RawRecord> {
        let now = self.clock.now();
        let date_code = now.format("%d%m%y");
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());

        let scheduled = SCHEDULED_OFFSETS_MINUTES.iter().map(|m| Some(*m));
        let slots = std::iter::repeat(None).take(LIVE_GAMES).chain(scheduled);

        slots
            .enumerate()
            .map(|(i, starts_in)| {
                let pair: Vec<&&str> = TEAMS.choose_multiple(&mut *rng, 2).collect();
                let players: Vec<&&str> = PLAYERS.choose_multiple(&mut *rng, 2).collect();
                let stream = format!("Ebasketball {}", i % STREAMS + 1);
                let external_id = format!("NB{}{date_code}", 161 + i);

                match starts_in {
                    None => {
                        let started_ago = Duration::minutes(rng.gen_range(0..=40));
                        json!({
                            "externalId": external_id,
                            "streamName": stream,
                            "teamAName": pair[0],
                            "teamBName": pair[1],
                            "participantAName": players[0],
                            "participantBName": players[1],
                            "startDate": (now - started_ago).to_rfc3339(),
                            "status": "live",
                            "teamAScore": rng.gen_range(5..=60),
                            "teamBScore": rng.gen_range(5..=60),
                        })
                    }
                    Some(minutes) => json!({
                        "externalId": external_id,
                        "streamName": stream,
                        "teamAName": pair[0],
                        "teamBName": pair[1],
                        "participantAName": players[0],
                        "participantBName": players[1],
                        "startDate": (now + Duration::minutes(minutes)).to_rfc3339(),
                        "status": "scheduled",
                        "teamAScore": null,
                        "teamBScore": null,
                    }),
                }
            })
            .collect()
    }
}
