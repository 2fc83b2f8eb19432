//! Acquisition error types.
//!
//! Every variant is recoverable: a failing endpoint or strategy is logged
//! and the next one in the fallback chain is tried.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AcquireError {
    #[error("HTTP {status} from {endpoint}")]
    Http { status: u16, endpoint: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Unexpected response shape: {0}")]
    UnexpectedShape(String),

    #[error("Acquisition cancelled")]
    Cancelled,

    #[error("All {attempts} endpoints failed, last error: {last_error}")]
    AllEndpointsFailed { attempts: usize, last_error: String },
}

impl AcquireError {
    pub fn from_reqwest(err: reqwest::Error, endpoint: &str) -> Self {
        if err.is_timeout() {
            Self::Timeout(format!("{endpoint}: {err}"))
        } else if err.is_decode() {
            Self::Deserialization(format!("{endpoint}: {err}"))
        } else if let Some(status) = err.status() {
            Self::Http {
                status: status.as_u16(),
                endpoint: endpoint.to_string(),
            }
        } else {
            Self::Network(format!("{endpoint}: {err}"))
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }

    /// Whether another attempt against a different endpoint makes sense.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let e = AcquireError::Http {
            status: 503,
            endpoint: "https://example.test/live".to_string(),
        };
        assert_eq!(e.to_string(), "HTTP 503 from https://example.test/live");

        let e = AcquireError::AllEndpointsFailed {
            attempts: 3,
            last_error: "Timeout: x".to_string(),
        };
        assert!(e.to_string().starts_with("All 3 endpoints failed"));
    }

    #[test]
    fn test_cancelled_is_not_retryable() {
        assert!(!AcquireError::Cancelled.is_retryable());
        assert!(AcquireError::Timeout("t".into()).is_retryable());
        assert!(AcquireError::Timeout("t".into()).is_timeout());
    }
}
