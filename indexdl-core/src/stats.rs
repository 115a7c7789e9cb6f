//! Per-symbol results and per-universe run statistics.

use crate::domain::DateRange;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Terminal state of one symbol in a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolStatus {
    /// Data fetched and written.
    Written,
    /// Provider had no rows in range; nothing written.
    Empty,
    /// Fetch or write failed.
    Failed,
}

/// Outcome for a single symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadResult {
    pub symbol: String,
    pub row_count: usize,
    pub status: SymbolStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub attempts: u32,
}

impl DownloadResult {
    pub fn written(symbol: impl Into<String>, row_count: usize, attempts: u32) -> Self {
        Self {
            symbol: symbol.into(),
            row_count,
            status: SymbolStatus::Written,
            error: None,
            attempts,
        }
    }

    pub fn empty(symbol: impl Into<String>, attempts: u32) -> Self {
        Self {
            symbol: symbol.into(),
            row_count: 0,
            status: SymbolStatus::Empty,
            error: None,
            attempts,
        }
    }

    pub fn failed(symbol: impl Into<String>, error: impl Into<String>, attempts: u32) -> Self {
        Self {
            symbol: symbol.into(),
            row_count: 0,
            status: SymbolStatus::Failed,
            error: Some(error.into()),
            attempts,
        }
    }
}

/// Counters for one universe (or the index set).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UniverseStats {
    pub name: String,
    pub attempted: usize,
    pub succeeded: usize,
    pub empty: usize,
    pub failed: usize,
    pub rows_written: usize,
    /// True when the symbol list came from the embedded fallback.
    #[serde(default)]
    pub used_fallback: bool,
    pub results: Vec<DownloadResult>,
}

impl UniverseStats {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn record(&mut self, result: DownloadResult) {
        self.attempted += 1;
        match result.status {
            SymbolStatus::Written => {
                self.succeeded += 1;
                self.rows_written += result.row_count;
            }
            SymbolStatus::Empty => self.empty += 1,
            SymbolStatus::Failed => self.failed += 1,
        }
        self.results.push(result);
    }

    pub fn failures(&self) -> impl Iterator<Item = &DownloadResult> {
        self.results.iter().filter(|r| r.status == SymbolStatus::Failed)
    }

    /// Succeeded as a percentage of attempted.
    pub fn success_rate(&self) -> f64 {
        if self.attempted == 0 {
            0.0
        } else {
            (self.succeeded as f64 / self.attempted as f64) * 100.0
        }
    }

    pub fn log_summary(&self) {
        tracing::info!(
            universe = %self.name,
            attempted = self.attempted,
            succeeded = self.succeeded,
            empty = self.empty,
            failed = self.failed,
            rows = self.rows_written,
            success_rate = %format!("{:.1}%", self.success_rate()),
            "universe complete: {}/{} written",
            self.succeeded,
            self.attempted
        );
    }
}

/// Aggregate of one full run, in download order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunStatistics {
    pub range: DateRange,
    pub universes: Vec<UniverseStats>,
    #[serde(skip)]
    pub elapsed: Duration,
}

impl RunStatistics {
    pub fn new(range: DateRange) -> Self {
        Self {
            range,
            universes: Vec::new(),
            elapsed: Duration::ZERO,
        }
    }

    pub fn push(&mut self, stats: UniverseStats) {
        self.universes.push(stats);
    }

    pub fn get(&self, name: &str) -> Option<&UniverseStats> {
        self.universes.iter().find(|u| u.name == name)
    }

    /// All universes merged into one set of counters (results omitted).
    pub fn totals(&self) -> UniverseStats {
        let mut total = UniverseStats::new("total");
        for u in &self.universes {
            total.attempted += u.attempted;
            total.succeeded += u.succeeded;
            total.empty += u.empty;
            total.failed += u.failed;
            total.rows_written += u.rows_written;
        }
        total
    }

    pub fn has_failures(&self) -> bool {
        self.universes.iter().any(|u| u.failed > 0)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn log_summary(&self) {
        tracing::info!("{}", "=".repeat(70));
        tracing::info!("DOWNLOAD SUMMARY REPORT");
        tracing::info!("{}", "=".repeat(70));
        tracing::info!("Date range: {}", self.range);
        for u in &self.universes {
            tracing::info!(
                "{:<10} attempted {:>3}  succeeded {:>3}  empty {:>3}  failed {:>3}{}",
                u.name,
                u.attempted,
                u.succeeded,
                u.empty,
                u.failed,
                if u.used_fallback { "  (fallback list)" } else { "" }
            );
            for f in u.failures() {
                tracing::info!("    failed: {} ({})", f.symbol, f.error.as_deref().unwrap_or("unknown error"));
            }
        }
        let total = self.totals();
        tracing::info!(
            attempted = total.attempted,
            succeeded = total.succeeded,
            empty = total.empty,
            failed = total.failed,
            rows = total.rows_written,
            elapsed = %format!("{:.1}s", self.elapsed.as_secs_f64()),
            "run complete"
        );
        tracing::info!("{}", "=".repeat(70));
    }
}
