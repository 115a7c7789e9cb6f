//! indexdl core: bulk download of Indian equity and index price history.
//!
//! - Domain types (symbols, date ranges, price bars and series)
//! - Price provider trait and the Yahoo Finance implementation
//! - Constituent resolution with embedded fallback lists
//! - Retrying series fetcher with pluggable backoff
//! - Atomic CSV writer and the output directory layout
//! - Sequential, paced bulk orchestrator and run statistics

pub mod config;
pub mod data;
pub mod domain;
pub mod stats;

pub use config::{ConfigError, DownloadConfig};
pub use stats::{DownloadResult, RunStatistics, SymbolStatus, UniverseStats};
