//! HTTP record fetching.
//!
//! `RecordFetcher` is the network capability the acquisition strategies
//! depend on; `HttpFetcher` is the reqwest-backed implementation with a
//! shared outbound rate limit.

use futures::future::BoxFuture;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use reqwest::header::ACCEPT;
use reqwest::Client;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::data::models::RawRecord;

use super::errors::AcquireError;

/// Object keys searched, in order, when a feed wraps its list.
const ENVELOPE_KEYS: &[&str] = &["data", "games", "matches", "events", "results"];

#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub timeout: Duration,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(8),
        }
    }
}

/// Fetches one endpoint and returns its raw records.
pub trait RecordFetcher: Send + Sync {
    fn fetch<'a>(
        &'a self,
        endpoint: &'a str,
        options: &'a FetchOptions,
    ) -> BoxFuture<'a, Result<Vec<RawRecord>, AcquireError>>;
}

#[derive(Debug, Clone)]
pub struct HttpFetcherConfig {
    pub user_agent: String,
    pub rate_limit_per_second: u32,
}

impl Default for HttpFetcherConfig {
    fn default() -> Self {
        Self {
            user_agent: concat!("courtside/", env!("CARGO_PKG_VERSION")).to_string(),
            rate_limit_per_second: 5,
        }
    }
}

pub struct HttpFetcher {
    client: Client,
    rate_limiter: Arc<DefaultDirectRateLimiter>,
}

impl HttpFetcher {
    pub fn new(config: HttpFetcherConfig) -> Result<Self, AcquireError> {
        let client = Client::builder()
            .user_agent(config.user_agent)
            .pool_max_idle_per_host(4)
            .build()
            .map_err(|e| AcquireError::Network(e.to_string()))?;

        let per_second = NonZeroU32::new(config.rate_limit_per_second).unwrap_or(NonZeroU32::MIN);
        let rate_limiter = Arc::new(RateLimiter::direct(Quota::per_second(per_second)));

        Ok(Self { client, rate_limiter })
    }

    pub fn with_defaults() -> Result<Self, AcquireError> {
        Self::new(HttpFetcherConfig::default())
    }

    async fn get_records(&self, endpoint: &str, options: &FetchOptions) -> Result<Vec<RawRecord>, AcquireError> {
        self.rate_limiter.until_ready().await;
        debug!(endpoint, timeout_ms = options.timeout.as_millis() as u64, "GET");

        let response = self
            .client
            .get(endpoint)
            .header(ACCEPT, "application/json")
            .timeout(options.timeout)
            .send()
            .await
            .map_err(|e| AcquireError::from_reqwest(e, endpoint))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AcquireError::Http {
                status: status.as_u16(),
                endpoint: endpoint.to_string(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| AcquireError::from_reqwest(e, endpoint))?;
        let json: serde_json::Value = serde_json::from_str(&body)
            .map_err(|e| AcquireError::Deserialization(format!("{endpoint}: {e}")))?;

        extract_records(json)
    }
}

impl RecordFetcher for HttpFetcher {
    fn fetch<'a>(
        &'a self,
        endpoint: &'a str,
        options: &'a FetchOptions,
    ) -> BoxFuture<'a, Result<Vec<RawRecord>, AcquireError>> {
        Box::pin(self.get_records(endpoint, options))
    }
}

/// Accept a bare array or an object wrapping one under a known key.
pub fn extract_records(json: serde_json::Value) -> Result<Vec<RawRecord>, AcquireError> {
    match json {
        serde_json::Value::Array(records) => Ok(records),
        serde_json::Value::Object(mut map) => ENVELOPE_KEYS
            .iter()
            .find_map(|key| match map.remove(*key) {
                Some(serde_json::Value::Array(records)) => Some(records),
                _ => None,
            })
            .ok_or_else(|| {
                let keys: Vec<&str> = map.keys().map(String::as_str).collect();
                AcquireError::UnexpectedShape(format!("object without record list (keys: {keys:?})"))
            }),
        other => Err(AcquireError::UnexpectedShape(format!(
            "expected array, got {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(v: &serde_json::Value) -> &'static str {
    match v {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
