//! Acquisition strategies.
//!
//! A strategy is one way of getting raw records: straight from the API
//! (with mirrors), through public CORS proxies, or generated locally. Each
//! strategy walks its own small, fixed list of endpoints and gives up after
//! the last one.

use futures::future::BoxFuture;
use reqwest::Url;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::api::client::{FetchOptions, RecordFetcher};
use crate::api::errors::AcquireError;
use crate::data::models::RawRecord;
use crate::data::synthetic::SyntheticGenerator;

pub trait AcquisitionStrategy: Send + Sync {
    /// Short tag recorded on every game this strategy produces.
    fn name(&self) -> &str;

    /// Overrides the acquirer's per-strategy timeout when set.
    fn timeout(&self) -> Option<Duration> {
        None
    }

    /// `Ok(vec![])` means the source answered but had no games.
    fn try_acquire<'a>(
        &'a self,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<Vec<RawRecord>, AcquireError>>;
}

// =============================================================================
// Endpoint walking
// =============================================================================

/// Try each endpoint in order; the first non-empty batch wins.
///
/// Returns `Ok(vec![])` if at least one endpoint answered with nothing and
/// none had data, or `AllEndpointsFailed` if every endpoint errored. A
/// non-retryable error ends the walk and is returned as-is.
async fn walk_endpoints(
    strategy: &str,
    fetcher: &dyn RecordFetcher,
    endpoints: &[String],
    options: &FetchOptions,
    cancel: &CancellationToken,
) -> Result<Vec<RawRecord>, AcquireError> {
    let mut last_error: Option<AcquireError> = None;
    let mut answered_empty = false;

    for (attempt, endpoint) in endpoints.iter().enumerate() {
        if cancel.is_cancelled() {
            return Err(AcquireError::Cancelled);
        }

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(AcquireError::Cancelled),
            r = fetcher.fetch(endpoint, options) => r,
        };

        match result {
            Ok(records) if !records.is_empty() => {
                debug!(strategy, endpoint = %endpoint, count = records.len(), "Endpoint returned records");
                return Ok(records);
            }
            Ok(_) => {
                debug!(strategy, endpoint = %endpoint, "Endpoint returned no records");
                answered_empty = true;
            }
            Err(e) if !e.is_retryable() => {
                debug!(strategy, endpoint = %endpoint, error = %e, "Endpoint walk stopped");
                return Err(e);
            }
            Err(e) => {
                warn!(
                    strategy,
                    endpoint = %endpoint,
                    attempt = attempt + 1,
                    error = %e,
                    "Endpoint failed, trying next"
                );
                last_error = Some(e);
            }
        }
    }

    match last_error {
        Some(e) if !answered_empty => Err(AcquireError::AllEndpointsFailed {
            attempts: endpoints.len(),
            last_error: e.to_string(),
        }),
        _ => Ok(Vec::new()),
    }
}

// =============================================================================
// Direct
// =============================================================================

/// Calls the API and then each mirror, in order.
pub struct DirectStrategy {
    endpoints: Vec<String>,
    fetcher: Arc<dyn RecordFetcher>,
    options: FetchOptions,
}

impl DirectStrategy {
    pub fn new(primary: &str, mirrors: &[String], fetcher: Arc<dyn RecordFetcher>, options: FetchOptions) -> Self {
        let endpoints = std::iter::once(primary.to_string())
            .chain(mirrors.iter().cloned())
            .filter(|e| !e.trim().is_empty())
            .collect();
        Self {
            endpoints,
            fetcher,
            options,
        }
    }
}

impl AcquisitionStrategy for DirectStrategy {
    fn name(&self) -> &str {
        "direct"
    }

    fn try_acquire<'a>(
        &'a self,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<Vec<RawRecord>, AcquireError>> {
        Box::pin(walk_endpoints(
            self.name(),
            self.fetcher.as_ref(),
            &self.endpoints,
            &self.options,
            cancel,
        ))
    }
}

// =============================================================================
// Proxy
// =============================================================================

/// Routes the API URL through public CORS proxies.
///
/// A proxy ending in `=` (e.g. `https://api.allorigins.win/raw?url=`) gets
/// the target URL-encoded into that query parameter; any other proxy gets
/// the raw target appended (e.g. `https://corsproxy.io/?`).
pub struct ProxyStrategy {
    endpoints: Vec<String>,
    fetcher: Arc<dyn RecordFetcher>,
    options: FetchOptions,
}

impl ProxyStrategy {
    pub fn new(target: &str, proxies: &[String], fetcher: Arc<dyn RecordFetcher>, options: FetchOptions) -> Self {
        let endpoints = proxies
            .iter()
            .filter_map(|proxy| match proxy_url(proxy, target) {
                Some(url) => Some(url),
                None => {
                    warn!(proxy = %proxy, "Ignoring malformed proxy URL");
                    None
                }
            })
            .collect();
        Self {
            endpoints,
            fetcher,
            options,
        }
    }
}

impl AcquisitionStrategy for ProxyStrategy {
    fn name(&self) -> &str {
        "proxy"
    }

    fn try_acquire<'a>(
        &'a self,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<Vec<RawRecord>, AcquireError>> {
        Box::pin(walk_endpoints(
            self.name(),
            self.fetcher.as_ref(),
            &self.endpoints,
            &self.options,
            cancel,
        ))
    }
}

/// Build the proxied URL for `target`.
pub fn proxy_url(proxy: &str, target: &str) -> Option<String> {
    let proxy = proxy.trim();
    if proxy.is_empty() {
        return None;
    }

    let Some(without_eq) = proxy.strip_suffix('=') else {
        return Url::parse(proxy).ok().map(|_| format!("{proxy}{target}"));
    };

    let split = without_eq.rfind(['?', '&'])?;
    let (head, param) = (&without_eq[..split], &without_eq[split + 1..]);
    if param.is_empty() {
        return None;
    }

    let mut url = Url::parse(head).ok()?;
    url.query_pairs_mut().append_pair(param, target);
    Some(url.to_string())
}

// =============================================================================
// Synthetic
// =============================================================================

/// Always succeeds with generated records. Reserved as the last resort.
pub struct SyntheticStrategy {
    generator: SyntheticGenerator,
}

impl SyntheticStrategy {
    pub fn new(generator: SyntheticGenerator) -> Self {
        Self { generator }
    }
}

impl AcquisitionStrategy for SyntheticStrategy {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn try_acquire<'a>(
        &'a self,
        _cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<Vec<RawRecord>, AcquireError>> {
        let records = self.generator.generate();
        Box::pin(async move { Ok(records) })
    }
}

// =============================================================================
// Tests
// =============================================================================
