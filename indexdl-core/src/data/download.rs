//! Download orchestrator: indices first, then each universe symbol by symbol.
//!
//! Strictly sequential. One fetch-then-write cycle finishes before the next
//! symbol starts, and a fixed quiet gap follows every fetch.
//! No single symbol can abort the run.

use super::constituents::{resolve, ConstituentSource, Universe};
use super::fetcher::SeriesFetcher;
use super::layout::{OutputLayout, MARKET_INDICES};
use super::pacing::Pacer;
use super::provider::PriceProvider;
use super::retry::RetryPolicy;
use super::writer::CsvWriter;
use crate::domain::{DateRange, Symbol};
use crate::stats::{DownloadResult, RunStatistics, SymbolStatus, UniverseStats};
use std::path::Path;
use std::time::{Duration, Instant};

/// Statistics key for the market index phase.
pub const INDICES_KEY: &str = "indices";

/// Observer for multi-symbol progress.
pub trait DownloadProgress {
    /// Called when a phase (index set or universe) starts.
    fn on_phase_start(&self, name: &str, total: usize);

    /// Called before fetching a symbol.
    fn on_start(&self, symbol: &str, index: usize, total: usize);

    /// Called once a symbol reaches a terminal state.
    fn on_complete(&self, result: &DownloadResult, index: usize, total: usize);

    /// Called when a phase is done.
    fn on_phase_complete(&self, stats: &UniverseStats);
}

/// Progress reporter that emits `tracing` events.
pub struct LogProgress;

impl DownloadProgress for LogProgress {
    fn on_phase_start(&self, name: &str, total: usize) {
        tracing::info!("{}", "=".repeat(70));
        tracing::info!(phase = name, symbols = total, "starting bulk download of {total} symbols");
        tracing::info!("{}", "=".repeat(70));
    }

    fn on_start(&self, symbol: &str, index: usize, total: usize) {
        tracing::info!("Processing {}/{}: {symbol}", index + 1, total);
    }

    fn on_complete(&self, result: &DownloadResult, _index: usize, _total: usize) {
        match result.status {
            SymbolStatus::Written => tracing::info!(
                symbol = %result.symbol,
                rows = result.row_count,
                attempts = result.attempts,
                "saved"
            ),
            SymbolStatus::Empty => tracing::warn!(symbol = %result.symbol, "no data available, nothing written"),
            SymbolStatus::Failed => tracing::error!(
                symbol = %result.symbol,
                attempts = result.attempts,
                error = result.error.as_deref().unwrap_or("unknown error"),
                "download failed"
            ),
        }
    }

    fn on_phase_complete(&self, stats: &UniverseStats) {
        stats.log_summary();
    }
}

/// What to download and how hard to push the provider.
#[derive(Debug, Clone)]
pub struct DownloadPlan {
    pub universes: Vec<Universe>,
    pub include_indices: bool,
    pub request_delay: Duration,
    pub retry: RetryPolicy,
}

impl Default for DownloadPlan {
    fn default() -> Self {
        Self {
            universes: Universe::ALL.to_vec(),
            include_indices: true,
            request_delay: Duration::from_millis(500),
            retry: RetryPolicy::default(),
        }
    }
}

/// Drives fetcher and writer over every symbol in the plan.
pub struct BulkDownloader<'a> {
    fetcher: SeriesFetcher<'a>,
    constituents: &'a dyn ConstituentSource,
    writer: CsvWriter,
    layout: OutputLayout,
    pacer: Pacer,
    progress: &'a dyn DownloadProgress,
    universes: Vec<Universe>,
    include_indices: bool,
}

impl<'a> BulkDownloader<'a> {
    pub fn new(
        provider: &'a dyn PriceProvider,
        constituents: &'a dyn ConstituentSource,
        layout: OutputLayout,
        plan: DownloadPlan,
        progress: &'a dyn DownloadProgress,
    ) -> Self {
        Self {
            fetcher: SeriesFetcher::new(provider, plan.retry),
            constituents,
            writer: CsvWriter::new(),
            layout,
            pacer: Pacer::new(plan.request_delay),
            progress,
            universes: plan.universes,
            include_indices: plan.include_indices,
        }
    }

    pub fn layout(&self) -> &OutputLayout {
        &self.layout
    }

    /// Run every phase of the plan over `range`.
    pub fn run(&mut self, range: &DateRange) -> RunStatistics {
        let started = Instant::now();
        let mut run = RunStatistics::new(*range);

        tracing::info!(range = %range, base = %self.layout.base().display(), "starting download run");

        if let Err(e) = self.layout.ensure_dirs() {
            tracing::error!(base = %self.layout.base().display(), error = %e, "failed to create output directories");
        }

        if self.include_indices {
            run.push(self.download_indices(range));
        }

        for universe in self.universes.clone() {
            run.push(self.download_universe(universe, range));
        }

        run.elapsed = started.elapsed();
        run
    }

    /// Fetch the fixed market indices into `{base}/{NAME}_index.csv`.
    pub fn download_indices(&mut self, range: &DateRange) -> UniverseStats {
        let mut stats = UniverseStats::new(INDICES_KEY);
        let total = MARKET_INDICES.len();
        self.progress.on_phase_start(INDICES_KEY, total);

        for (i, index) in MARKET_INDICES.iter().enumerate() {
            self.progress.on_start(index.name, i, total);
            let result = match index.symbol() {
                Some(symbol) => {
                    let path = self.layout.index_path(index);
                    self.download_one(&symbol, range, &path)
                }
                None => DownloadResult::failed(index.ticker, "invalid index ticker", 0),
            };
            self.progress.on_complete(&result, i, total);
            stats.record(result);
        }

        self.progress.on_phase_complete(&stats);
        stats
    }

    /// Resolve a universe and fetch every member into `{base}/{universe}/`.
    pub fn download_universe(&mut self, universe: Universe, range: &DateRange) -> UniverseStats {
        let resolution = resolve(universe, self.constituents);
        let mut stats = UniverseStats::new(universe.key());
        stats.used_fallback = resolution.is_fallback();
        let symbols = resolution.into_symbols();
        self.download_symbols(universe, &symbols, range, &mut stats);
        stats
    }

    /// Fetch an explicit symbol list into a universe's directory.
    pub fn download_symbols(
        &mut self,
        universe: Universe,
        symbols: &[Symbol],
        range: &DateRange,
        stats: &mut UniverseStats,
    ) {
        let total = symbols.len();
        self.progress.on_phase_start(universe.key(), total);

        for (i, symbol) in symbols.iter().enumerate() {
            self.progress.on_start(&symbol.provider_symbol(), i, total);
            let path = self.layout.symbol_path(universe, symbol);
            let result = self.download_one(symbol, range, &path);
            self.progress.on_complete(&result, i, total);
            stats.record(result);
        }

        self.progress.on_phase_complete(stats);
    }

    /// pending → fetching → {written, empty, failed}
    fn download_one(&mut self, symbol: &Symbol, range: &DateRange, path: &Path) -> DownloadResult {
        let name = symbol.provider_symbol();
        self.pacer.wait();
        let fetched = self.fetcher.fetch(symbol, range);
        self.pacer.done();

        let outcome = match fetched {
            Ok(outcome) => outcome,
            Err(e) => return DownloadResult::failed(name, e.to_string(), e.attempts()),
        };

        if outcome.is_empty() {
            return DownloadResult::empty(name, outcome.attempts);
        }

        match self.writer.write(&outcome.series, path) {
            Ok(rows) => {
                tracing::debug!(symbol = %name, path = %path.display(), rows, "wrote csv");
                DownloadResult::written(name, rows, outcome.attempts)
            }
            Err(e) => DownloadResult::failed(name, e.to_string(), outcome.attempts),
        }
    }
}
