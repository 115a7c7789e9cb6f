//! Price provider trait and structured error types.
//!
//! The PriceProvider trait abstracts over the remote price-history API so the
//! fetcher and orchestrator can be driven by a mock in tests.

use crate::domain::{DateRange, PriceBar, Symbol};
use thiserror::Error;

/// Errors returned by a single provider request.
///
/// `is_transient` decides whether the fetcher retries.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum DataError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("rate limited by provider{}", retry_hint(.retry_after_secs))]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("provider server error (HTTP {status})")]
    ServerError { status: u16 },

    #[error("unexpected HTTP status {status}")]
    HttpStatus { status: u16 },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("data error: {0}")]
    Other(String),
}

fn retry_hint(retry_after_secs: &Option<u64>) -> String {
    match retry_after_secs {
        Some(secs) => format!(" (retry after {secs}s)"),
        None => String::new(),
    }
}

impl DataError {
    /// Timeouts, connection failures, rate limits and 5xx responses are worth retrying.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            DataError::NetworkUnreachable(_)
                | DataError::Timeout(_)
                | DataError::RateLimited { .. }
                | DataError::ServerError { .. }
        )
    }

    /// Map an HTTP status that is not a success into an error.
    pub fn from_status(status: u16, retry_after_secs: Option<u64>) -> Self {
        match status {
            429 => DataError::RateLimited { retry_after_secs },
            500..=599 => DataError::ServerError { status },
            _ => DataError::HttpStatus { status },
        }
    }
}

impl From<reqwest::Error> for DataError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            DataError::Timeout(e.to_string())
        } else if e.is_connect() || e.is_request() || e.is_body() {
            DataError::NetworkUnreachable(e.to_string())
        } else if let Some(status) = e.status() {
            DataError::from_status(status.as_u16(), None)
        } else if e.is_decode() {
            DataError::ResponseFormatChanged(e.to_string())
        } else {
            DataError::Other(e.to_string())
        }
    }
}

/// Source of adjusted daily price history.
///
/// One call is one request; retry policy lives in the fetcher above this trait.
pub trait PriceProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Fetch adjusted daily bars for `symbol` between `range.start()` and `range.end()`.
    ///
    /// An instrument with no history in the range yields `Ok` with no bars.
    fn fetch(&self, symbol: &Symbol, range: &DateRange) -> Result<Vec<PriceBar>, DataError>;
}
