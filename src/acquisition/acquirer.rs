//! Data acquisition driver.
//!
//! Runs the configured strategies one after another, each under its own
//! timeout, and returns the first non-empty batch. Failures never escape:
//! they are logged and collected on the returned `Acquisition`.

use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::api::errors::AcquireError;
use crate::data::models::RawRecord;

use super::strategy::AcquisitionStrategy;

#[derive(Debug, Clone)]
pub struct AcquirerConfig {
    /// Budget for one strategy, including all of its endpoints.
    pub strategy_timeout: Duration,
}

impl Default for AcquirerConfig {
    fn default() -> Self {
        Self {
            strategy_timeout: Duration::from_secs(20),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StrategyFailure {
    pub strategy: String,
    pub error: AcquireError,
}

/// Outcome of one pass over the strategy chain.
#[derive(Debug, Clone, Default)]
pub struct Acquisition {
    pub records: Vec<RawRecord>,
    /// Name of the strategy that produced `records`.
    pub source: Option<String>,
    pub failures: Vec<StrategyFailure>,
    pub cancelled: bool,
}

pub struct DataAcquirer {
    strategies: Vec<Arc<dyn AcquisitionStrategy>>,
    last_resort: Option<Arc<dyn AcquisitionStrategy>>,
    config: AcquirerConfig,
}

impl DataAcquirer {
    pub fn new(config: AcquirerConfig) -> Self {
        Self {
            strategies: Vec::new(),
            last_resort: None,
            config,
        }
    }

    /// Append a primary strategy. Order of calls is order of attempts.
    pub fn with_strategy(mut self, strategy: Arc<dyn AcquisitionStrategy>) -> Self {
        self.strategies.push(strategy);
        self
    }

    /// Strategy tried only through `acquire_last_resort`.
    pub fn with_last_resort(mut self, strategy: Arc<dyn AcquisitionStrategy>) -> Self {
        self.last_resort = Some(strategy);
        self
    }

    pub fn strategy_names(&self) -> Vec<&str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    pub fn has_last_resort(&self) -> bool {
        self.last_resort.is_some()
    }

    /// Walk the primary strategies in order.
    ///
    /// Returns an empty acquisition if every strategy failed or had no data.
    pub async fn acquire(&self, cancel: &CancellationToken) -> Acquisition {
        self.run_chain(&self.strategies, cancel).await
    }

    pub async fn acquire_last_resort(&self, cancel: &CancellationToken) -> Acquisition {
        match &self.last_resort {
            Some(strategy) => self.run_chain(std::slice::from_ref(strategy), cancel).await,
            None => Acquisition::default(),
        }
    }

    async fn run_chain(&self, chain: &[Arc<dyn AcquisitionStrategy>], cancel: &CancellationToken) -> Acquisition {
        let mut acquisition = Acquisition::default();

        for strategy in chain {
            if cancel.is_cancelled() {
                acquisition.cancelled = true;
                break;
            }

            let name = strategy.name();
            match self.run_one(strategy.as_ref(), cancel).await {
                Ok(records) if !records.is_empty() => {
                    info!(strategy = name, count = records.len(), "Acquired records");
                    acquisition.records = records;
                    acquisition.source = Some(name.to_string());
                    return acquisition;
                }
                Ok(_) => {
                    debug!(strategy = name, "Strategy returned no records");
                }
                Err(AcquireError::Cancelled) => {
                    debug!(strategy = name, "Acquisition cancelled");
                    acquisition.cancelled = true;
                    break;
                }
                Err(e) => {
                    warn!(strategy = name, timeout = e.is_timeout(), error = %e, "Strategy failed");
                    acquisition.failures.push(StrategyFailure {
                        strategy: name.to_string(),
                        error: e,
                    });
                }
            }
        }

        acquisition
    }

    async fn run_one(
        &self,
        strategy: &dyn AcquisitionStrategy,
        cancel: &CancellationToken,
    ) -> Result<Vec<RawRecord>, AcquireError> {
        let budget = strategy.timeout().unwrap_or(self.config.strategy_timeout);

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(AcquireError::Cancelled),
            result = tokio::time::timeout(budget, strategy.try_acquire(cancel)) => {
                result.unwrap_or_else(|_| {
                    Err(AcquireError::Timeout(format!(
                        "strategy {} exceeded {}s",
                        strategy.name(),
                        budget.as_secs_f64()
                    )))
                })
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
