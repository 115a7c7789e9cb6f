//! Output directory layout.
//!
//! ```text
//! {base}/NIFTY50_index.csv
//! {base}/SENSEX_index.csv
//! {base}/BANKNIFTY_index.csv
//! {base}/nifty50/{TICKER}.csv
//! {base}/sensex30/{TICKER}.csv
//! ```

use super::constituents::Universe;
use crate::domain::Symbol;
use std::fs;
use std::path::{Path, PathBuf};

/// A market index downloaded to its own top-level file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarketIndex {
    /// Provider ticker, e.g. `^NSEI`.
    pub ticker: &'static str,
    /// Output name, e.g. `NIFTY50`.
    pub name: &'static str,
}

impl MarketIndex {
    pub fn symbol(&self) -> Option<Symbol> {
        Symbol::index(self.ticker).ok()
    }
}

pub const MARKET_INDICES: [MarketIndex; 3] = [
    MarketIndex {
        ticker: "^NSEI",
        name: "NIFTY50",
    },
    MarketIndex {
        ticker: "^BSESN",
        name: "SENSEX",
    },
    MarketIndex {
        ticker: "^NSEBANK",
        name: "BANKNIFTY",
    },
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    base: PathBuf,
}

impl OutputLayout {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    pub fn index_path(&self, index: &MarketIndex) -> PathBuf {
        self.base.join(format!("{}_index.csv", index.name))
    }

    pub fn universe_dir(&self, universe: Universe) -> PathBuf {
        self.base.join(universe.key())
    }

    pub fn symbol_path(&self, universe: Universe, symbol: &Symbol) -> PathBuf {
        self.universe_dir(universe).join(format!("{}.csv", symbol.file_stem()))
    }

    /// Create the base directory and one directory per universe.
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        fs::create_dir_all(&self.base)?;
        for universe in Universe::ALL {
            fs::create_dir_all(self.universe_dir(universe))?;
        }
        Ok(())
    }
}
