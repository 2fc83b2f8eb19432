//! Configuration management.
//!
//! Loads settings from environment variables and .env file, and hands each
//! component its own config struct.

use chrono::{Duration as ChronoDuration, FixedOffset, Offset, Utc};
use std::time::Duration;

use crate::acquisition::acquirer::AcquirerConfig;
use crate::analysis::betting::BettingConfig;
use crate::api::client::{FetchOptions, HttpFetcherConfig};
use crate::data::time_estimator::TimeEstimatorConfig;
use crate::service::ServiceConfig;
use crate::state::dashboard::GameFilter;

const DEFAULT_API_URL: &str = "https://api-h2h.hudstats.com/v1/live/nba";
const DEFAULT_MIRRORS: &str = "https://h2h.cdn-hudstats.com/api/live,https://h2h.cdn-hudstats.com/api/matches";
const DEFAULT_PROXIES: &str =
    "https://api.allorigins.win/raw?url=,https://corsproxy.io/?,https://api.codetabs.com/v1/proxy?quest=";

/// Application configuration loaded from environment.
#[derive(Debug, Clone)]
pub struct Settings {
    // Sources
    pub api_url: String,
    pub api_mirrors: Vec<String>,
    pub cors_proxies: Vec<String>,
    pub enable_proxy_fetch: bool,
    pub enable_synthetic: bool,
    pub synthetic_seed: Option<u64>,

    // Cache / acquisition
    pub serve_stale_cache: bool,
    pub cache_ttl_seconds: i64,
    pub strategy_timeout_seconds: f64,
    pub request_timeout_seconds: f64,
    pub rate_limit_per_second: u32,
    pub refresh_interval_seconds: f64,

    // Estimation
    pub avg_points_per_period: u32,
    pub total_game_minutes: i64,
    pub display_utc_offset_minutes: i32,

    // Betting
    pub betting_min_period: u8,
    pub betting_min_score_diff: u32,

    // Dashboard
    pub game_filter: GameFilter,
    pub game_search: String,

    // Logging
    pub log_level: String,
    pub log_json: bool,
}

impl Settings {
    /// Load settings from environment variables (and .env file).
    pub fn from_env() -> Self {
        // Try to load .env file (ignore if not found).
        let _ = dotenvy::dotenv();
        Self::from_source(&|key| std::env::var(key).ok())
    }

    /// Build settings from any key lookup. Absent or unparseable values
    /// fall back to defaults.
    pub fn from_source(vars: &dyn Fn(&str) -> Option<String>) -> Self {
        let env = Env(vars);

        Self {
            api_url: env.str("API_URL", DEFAULT_API_URL),
            api_mirrors: env.csv("API_MIRRORS", DEFAULT_MIRRORS),
            cors_proxies: env.csv("CORS_PROXIES", DEFAULT_PROXIES),
            enable_proxy_fetch: env.bool("ENABLE_PROXY_FETCH", true),
            enable_synthetic: env.bool("ENABLE_SYNTHETIC", true),
            synthetic_seed: env.parse_opt("SYNTHETIC_SEED"),

            serve_stale_cache: env.bool("SERVE_STALE_CACHE", true),
            cache_ttl_seconds: env.parse("CACHE_TTL_SECONDS", 15),
            strategy_timeout_seconds: env.parse("STRATEGY_TIMEOUT_SECONDS", 20.0),
            request_timeout_seconds: env.parse("REQUEST_TIMEOUT_SECONDS", 8.0),
            rate_limit_per_second: env.parse("RATE_LIMIT_PER_SECOND", 5),
            refresh_interval_seconds: env.parse("REFRESH_INTERVAL_SECONDS", 15.0),

            avg_points_per_period: env.parse("AVG_POINTS_PER_PERIOD", 25),
            total_game_minutes: env.parse("TOTAL_GAME_MINUTES", 48),
            display_utc_offset_minutes: env.parse("DISPLAY_UTC_OFFSET_MINUTES", 0),

            betting_min_period: env.parse("BETTING_MIN_PERIOD", 2),
            betting_min_score_diff: env.parse("BETTING_MIN_SCORE_DIFF", 10),

            game_filter: env.str("GAME_FILTER", "all").parse().unwrap_or_default(),
            game_search: env.str("GAME_SEARCH", ""),

            log_level: env.str("LOG_LEVEL", "info"),
            log_json: env.bool("LOG_JSON", false),
        }
    }

    /// Validate configuration for critical requirements.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if reqwest::Url::parse(&self.api_url).is_err() {
            errors.push(format!("API_URL is not a valid URL: {}", self.api_url));
        }

        if self.cache_ttl_seconds <= 0 {
            errors.push("CACHE_TTL_SECONDS must be > 0".to_string());
        }

        for (key, secs) in [
            ("STRATEGY_TIMEOUT_SECONDS", self.strategy_timeout_seconds),
            ("REQUEST_TIMEOUT_SECONDS", self.request_timeout_seconds),
            ("REFRESH_INTERVAL_SECONDS", self.refresh_interval_seconds),
        ] {
            if !(secs.is_finite() && secs > 0.0) {
                errors.push(format!("{key} must be a positive number of seconds"));
            }
        }

        if self.rate_limit_per_second == 0 {
            errors.push("RATE_LIMIT_PER_SECOND must be > 0".to_string());
        }

        if self.avg_points_per_period == 0 {
            errors.push("AVG_POINTS_PER_PERIOD must be > 0".to_string());
        }

        if self.total_game_minutes <= 0 {
            errors.push("TOTAL_GAME_MINUTES must be > 0".to_string());
        }

        if self.display_offset().is_none() {
            errors.push("DISPLAY_UTC_OFFSET_MINUTES must be within +/- 24h".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    // =========================================================================
    // Component configs
    // =========================================================================

    pub fn cache_ttl(&self) -> ChronoDuration {
        ChronoDuration::seconds(self.cache_ttl_seconds.max(1))
    }

    pub fn refresh_interval(&self) -> Duration {
        secs_or(self.refresh_interval_seconds, 15.0)
    }

    pub fn fetch_options(&self) -> FetchOptions {
        FetchOptions {
            timeout: secs_or(self.request_timeout_seconds, 8.0),
        }
    }

    pub fn http_fetcher_config(&self) -> HttpFetcherConfig {
        HttpFetcherConfig {
            rate_limit_per_second: self.rate_limit_per_second,
            ..HttpFetcherConfig::default()
        }
    }

    pub fn acquirer_config(&self) -> AcquirerConfig {
        AcquirerConfig {
            strategy_timeout: secs_or(self.strategy_timeout_seconds, 20.0),
        }
    }

    pub fn time_estimator_config(&self) -> TimeEstimatorConfig {
        TimeEstimatorConfig {
            avg_points_per_period: self.avg_points_per_period,
            total_game_minutes: self.total_game_minutes,
            display_offset: self.display_offset().unwrap_or_else(|| Utc.fix()),
            ..TimeEstimatorConfig::default()
        }
    }

    pub fn betting_config(&self) -> BettingConfig {
        BettingConfig {
            min_period: self.betting_min_period,
            min_score_diff: self.betting_min_score_diff,
        }
    }

    pub fn service_config(&self) -> ServiceConfig {
        ServiceConfig {
            serve_stale_cache: self.serve_stale_cache,
        }
    }

    fn display_offset(&self) -> Option<FixedOffset> {
        self.display_utc_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::from_source(&|_| None)
    }
}

fn secs_or(secs: f64, default: f64) -> Duration {
    Duration::try_from_secs_f64(secs)
        .ok()
        .filter(|d| !d.is_zero())
        .unwrap_or_else(|| Duration::from_secs_f64(default))
}

// =============================================================================
// Environment helpers
// =============================================================================

struct Env<'a>(&'a dyn Fn(&str) -> Option<String>);

impl Env<'_> {
    fn str(&self, key: &str, default: &str) -> String {
        (self.0)(key).unwrap_or_else(|| default.to_string())
    }

    fn bool(&self, key: &str, default: bool) -> bool {
        (self.0)(key)
            .map(|v| matches!(v.trim().to_lowercase().as_str(), "true" | "1" | "yes"))
            .unwrap_or(default)
    }

    fn parse<T: std::str::FromStr>(&self, key: &str, default: T) -> T {
        self.parse_opt(key).unwrap_or(default)
    }

    fn parse_opt<T: std::str::FromStr>(&self, key: &str) -> Option<T> {
        (self.0)(key).and_then(|v| v.trim().parse().ok())
    }

    fn csv(&self, key: &str, default: &str) -> Vec<String> {
        let raw = self.str(key, default);
        raw.split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(pairs: &[(&str, &str)]) -> Settings {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_source(&|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let s = Settings::default();
        assert_eq!(s.api_url, DEFAULT_API_URL);
        assert_eq!(s.api_mirrors.len(), 2);
        assert_eq!(s.cors_proxies.len(), 3);
        assert_eq!(s.cache_ttl(), ChronoDuration::seconds(15));
        assert_eq!(s.acquirer_config().strategy_timeout, Duration::from_secs(20));
        assert_eq!(s.fetch_options().timeout, Duration::from_secs(8));
        assert_eq!(s.game_filter, GameFilter::All);
        assert!(s.synthetic_seed.is_none());
        assert!(s.validate().is_ok());
    }

    #[test]
    fn test_overrides_and_fallbacks() {
        let s = settings(&[
            ("CACHE_TTL_SECONDS", "30"),
            ("ENABLE_SYNTHETIC", "no"),
            ("SYNTHETIC_SEED", "42"),
            ("GAME_FILTER", "betting"),
            ("BETTING_MIN_SCORE_DIFF", "not a number"),
            ("API_MIRRORS", " https://m1.test , ,https://m2.test "),
            ("DISPLAY_UTC_OFFSET_MINUTES", "-300"),
        ]);
        assert_eq!(s.cache_ttl_seconds, 30);
        assert!(!s.enable_synthetic);
        assert_eq!(s.synthetic_seed, Some(42));
        assert_eq!(s.game_filter, GameFilter::HighInterest);
        assert_eq!(s.betting_min_score_diff, 10);
        assert_eq!(s.api_mirrors, vec!["https://m1.test", "https://m2.test"]);
        assert_eq!(
            s.time_estimator_config().display_offset,
            FixedOffset::west_opt(5 * 3600).unwrap()
        );
    }

    #[test]
    fn test_validate_collects_every_error() {
        let s = settings(&[
            ("API_URL", "nope"),
            ("CACHE_TTL_SECONDS", "0"),
            ("REQUEST_TIMEOUT_SECONDS", "-1"),
            ("RATE_LIMIT_PER_SECOND", "0"),
            ("DISPLAY_UTC_OFFSET_MINUTES", "2000"),
        ]);
        let errors = s.validate().unwrap_err();
        assert_eq!(errors.len(), 5);
        assert!(errors[0].starts_with("API_URL"));
    }
}
