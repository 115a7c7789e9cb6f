//! Data acquisition: provider, constituents, fetching, persistence, orchestration.

pub mod canonicalize;
pub mod constituents;
pub mod download;
pub mod fetcher;
pub mod layout;
pub mod pacing;
pub mod provider;
pub mod retry;
pub mod writer;
pub mod yahoo;

pub use canonicalize::{canonicalize, CanonicalReport};
pub use constituents::{resolve, ConstituentSource, HttpConstituentSource, Resolution, Universe};
pub use download::{BulkDownloader, DownloadPlan, DownloadProgress, LogProgress, INDICES_KEY};
pub use fetcher::{FetchError, FetchOutcome, SeriesFetcher};
pub use layout::{MarketIndex, OutputLayout, MARKET_INDICES};
pub use pacing::Pacer;
pub use provider::{DataError, PriceProvider};
pub use retry::{Backoff, RetryPolicy};
pub use writer::{CsvWriter, WriteError};
pub use yahoo::YahooProvider;
