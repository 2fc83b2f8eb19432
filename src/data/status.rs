//! Status classification.
//!
//! Upstream status tokens are inconsistently spelled ("LIVE", "En Vivo",
//! "STATUS_IN_PROGRESS", "Finalizado", ...). The status is lowercased and
//! split into words on any non-alphanumeric character; a vocabulary entry
//! matches when its words appear consecutively, so "ended" does not match
//! "suspended". Vocabularies are checked in the fixed order
//! live -> finished -> scheduled; the first hit wins.
//!
//! A missing or blank status means the feed has not reported the game as
//! started and classifies as `Scheduled`. A present status that matches no
//! vocabulary is `Unknown`.

use super::models::GameStatus;

const LIVE_TOKENS: &[&str] = &[
    "live",
    "playing",
    "en vivo",
    "jugando",
    "in progress",
    "inprogress",
    "halftime",
];

const FINISHED_TOKENS: &[&str] = &[
    "final",
    "finalizado",
    "finished",
    "ended",
    "terminado",
    "complete",
    "completed",
];

const SCHEDULED_TOKENS: &[&str] = &[
    "scheduled",
    "upcoming",
    "programado",
    "próximo",
    "not started",
    "pre",
    "pregame",
];

const CHECK_ORDER: &[(GameStatus, &[&str])] = &[
    (GameStatus::Live, LIVE_TOKENS),
    (GameStatus::Finished, FINISHED_TOKENS),
    (GameStatus::Scheduled, SCHEDULED_TOKENS),
];

pub fn classify(raw_status: Option<&str>) -> GameStatus {
    let status = match raw_status.map(str::trim) {
        None | Some("") => return GameStatus::Scheduled,
        Some(s) => s.to_lowercase(),
    };
    let words: Vec<&str> = status
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();

    CHECK_ORDER
        .iter()
        .find(|(_, tokens)| tokens.iter().any(|t| contains_phrase(&words, t)))
        .map(|(state, _)| *state)
        .unwrap_or(GameStatus::Unknown)
}

fn contains_phrase(words: &[&str], phrase: &str) -> bool {
    let phrase: Vec<&str> = phrase.split(' ').collect();
    words.windows(phrase.len()).any(|window| window == phrase.as_slice())
}
