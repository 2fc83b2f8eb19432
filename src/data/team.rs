//! Team name normalization.
//!
//! Derives a stable id, city, abbreviation and placeholder logo from a
//! free-text team name. All helpers are pure functions of the name.

use super::models::Team;

const LOGO_PLACEHOLDER_BASE: &str = "https://via.placeholder.com/40";

/// Background / foreground colours keyed by team nickname.
const TEAM_COLORS: &[(&str, &str, &str)] = &[
    ("Lakers", "552583", "FDB927"),
    ("Celtics", "007A33", "FFFFFF"),
    ("Warriors", "1D428A", "FFC72C"),
    ("Heat", "98002E", "FFFFFF"),
    ("Bulls", "CE1141", "FFFFFF"),
    ("Knicks", "006BB6", "F58426"),
    ("Raptors", "CE1141", "FFFFFF"),
    ("Mavericks", "00538C", "FFFFFF"),
    ("Thunder", "007AC1", "EF3B24"),
    ("Cavaliers", "860038", "FDBB30"),
    ("Bucks", "00471B", "EEE1C6"),
    ("Hornets", "1D1160", "00788C"),
];

const DEFAULT_COLORS: (&str, &str) = ("000000", "FFFFFF");

/// Build a `Team` from a raw name. Missing or blank names become `fallback`.
pub fn normalize(raw_name: Option<&str>, fallback: &str) -> Team {
    let name = raw_name
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or(fallback)
        .to_string();

    Team {
        id: slug(&name),
        city: city(&name),
        abbreviation: abbreviate(&name),
        logo_ref: logo_ref(&name),
        name,
    }
}

/// Lowercase, whitespace runs to `_`, everything outside `[a-z0-9_]` dropped.
pub fn slug(name: &str) -> String {
    name.to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '_')
        .collect()
}

/// First letter of each word, uppercased, at most three characters.
///
/// Single-word names give a one-letter abbreviation. Words without any
/// letter (e.g. "76") contribute nothing.
pub fn abbreviate(name: &str) -> String {
    name.split_whitespace()
        .filter_map(|word| word.chars().find(|c| c.is_alphabetic()))
        .filter_map(|c| c.to_uppercase().next())
        .filter(|c| c.is_uppercase())
        .take(3)
        .collect()
}

/// Everything but the last word; single-word names are their own city.
///
/// Wrong for names like "Golden State Warriors" vs "Portland Trail Blazers"
/// but there is no upstream city field to do better.
pub fn city(name: &str) -> String {
    let words: Vec<&str> = name.split_whitespace().collect();
    match words.split_last() {
        Some((_, rest)) if !rest.is_empty() => rest.join(" "),
        _ => name.trim().to_string(),
    }
}

pub fn team_colors(name: &str) -> (&'static str, &'static str) {
    TEAM_COLORS
        .iter()
        .find(|(nickname, _, _)| name.contains(nickname))
        .map(|(_, bg, fg)| (*bg, *fg))
        .unwrap_or(DEFAULT_COLORS)
}

/// Opaque placeholder image reference for the team badge.
pub fn logo_ref(name: &str) -> String {
    let (bg, fg) = team_colors(name);
    format!("{LOGO_PLACEHOLDER_BASE}/{bg}/{fg}?text={}", abbreviate(name))
}
