//! Series fetcher: one symbol, one date range, retried on transient failure.

use super::canonicalize::canonicalize;
use super::provider::{DataError, PriceProvider};
use super::retry::RetryPolicy;
use crate::domain::{DateRange, PriceSeries, Symbol};
use thiserror::Error;

/// Terminal failure for a symbol; the run records it and moves on.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum FetchError {
    /// Every allowed attempt hit a transient error.
    #[error("{symbol}: gave up after {attempts} attempt(s): {source}")]
    Exhausted {
        symbol: String,
        attempts: u32,
        #[source]
        source: DataError,
    },

    /// The provider rejected the request in a way retrying will not fix.
    #[error("{symbol}: {source}")]
    Rejected {
        symbol: String,
        attempts: u32,
        #[source]
        source: DataError,
    },
}

impl FetchError {
    pub fn attempts(&self) -> u32 {
        match self {
            FetchError::Exhausted { attempts, .. } | FetchError::Rejected { attempts, .. } => *attempts,
        }
    }

    pub fn source_error(&self) -> &DataError {
        match self {
            FetchError::Exhausted { source, .. } | FetchError::Rejected { source, .. } => source,
        }
    }
}

/// A successful fetch. An empty series means the provider had no rows in range.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchOutcome {
    pub series: PriceSeries,
    pub attempts: u32,
}

impl FetchOutcome {
    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

/// Wraps a provider with a retry policy and canonicalizes what comes back.
pub struct SeriesFetcher<'a> {
    provider: &'a dyn PriceProvider,
    policy: RetryPolicy,
}

impl<'a> SeriesFetcher<'a> {
    pub fn new(provider: &'a dyn PriceProvider, policy: RetryPolicy) -> Self {
        Self { provider, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn fetch(&self, symbol: &Symbol, range: &DateRange) -> Result<FetchOutcome, FetchError> {
        let name = symbol.provider_symbol();
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            tracing::debug!(
                symbol = %name,
                attempt,
                max_attempts = self.policy.max_attempts,
                range = %range,
                provider = self.provider.name(),
                "fetch attempt"
            );

            match self.provider.fetch(symbol, range) {
                Ok(bars) => {
                    let raw_rows = bars.len();
                    let (series, report) = canonicalize(&name, bars, range);
                    if report.dropped() > 0 {
                        tracing::debug!(
                            symbol = %name,
                            raw_rows,
                            duplicates = report.duplicates,
                            out_of_range = report.out_of_range,
                            incomplete = report.incomplete,
                            "dropped rows during canonicalization"
                        );
                    }
                    if series.is_empty() {
                        tracing::warn!(symbol = %name, attempt, range = %range, "no data available");
                    } else {
                        tracing::info!(symbol = %name, attempt, rows = series.len(), "fetched");
                    }
                    return Ok(FetchOutcome {
                        series,
                        attempts: attempt,
                    });
                }
                Err(e) if e.is_transient() && self.policy.should_retry(attempt) => {
                    let delay = self.policy.backoff.delay(attempt);
                    tracing::warn!(
                        symbol = %name,
                        attempt,
                        max_attempts = self.policy.max_attempts,
                        range = %range,
                        error = %e,
                        retry_in_ms = delay.as_millis() as u64,
                        "transient fetch failure, retrying"
                    );
                    if !delay.is_zero() {
                        std::thread::sleep(delay);
                    }
                }
                Err(e) => {
                    tracing::error!(
                        symbol = %name,
                        attempt,
                        range = %range,
                        error = %e,
                        "fetch failed"
                    );
                    return Err(if e.is_transient() {
                        FetchError::Exhausted {
                            symbol: name,
                            attempts: attempt,
                            source: e,
                        }
                    } else {
                        FetchError::Rejected {
                            symbol: name,
                            attempts: attempt,
                            source: e,
                        }
                    });
                }
            }
        }
    }
}
