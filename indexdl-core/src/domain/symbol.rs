//! Ticker symbols and the exchange they trade on.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SymbolError {
    #[error("empty symbol")]
    Empty,

    #[error("invalid character in symbol '{0}'")]
    InvalidCharacter(String),
}

/// Where a symbol is listed, which determines the provider suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Exchange {
    /// National Stock Exchange of India (`.NS`).
    Nse,
    /// Bombay Stock Exchange (`.BO`).
    Bse,
    /// Index ticker such as `^NSEI`; no suffix.
    Index,
}

impl Exchange {
    pub fn suffix(&self) -> &'static str {
        match self {
            Exchange::Nse => ".NS",
            Exchange::Bse => ".BO",
            Exchange::Index => "",
        }
    }
}

/// A tradable instrument or index: bare ticker plus exchange.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Symbol {
    ticker: String,
    exchange: Exchange,
}

impl Symbol {
    pub fn new(ticker: impl Into<String>, exchange: Exchange) -> Result<Self, SymbolError> {
        let ticker = ticker.into().trim().to_uppercase();
        if ticker.is_empty() {
            return Err(SymbolError::Empty);
        }
        if ticker.chars().any(|c| c.is_whitespace() || c == '/' || c == ',') {
            return Err(SymbolError::InvalidCharacter(ticker));
        }
        Ok(Self { ticker, exchange })
    }

    pub fn nse(ticker: impl Into<String>) -> Result<Self, SymbolError> {
        Self::new(ticker, Exchange::Nse)
    }

    pub fn bse(ticker: impl Into<String>) -> Result<Self, SymbolError> {
        Self::new(ticker, Exchange::Bse)
    }

    pub fn index(ticker: impl Into<String>) -> Result<Self, SymbolError> {
        Self::new(ticker, Exchange::Index)
    }

    /// Parse provider form: `RELIANCE.NS`, `TCS.BO`, `^NSEI`.
    ///
    /// A bare ticker without a known suffix is taken as NSE-listed.
    pub fn parse(s: &str) -> Result<Self, SymbolError> {
        let s = s.trim();
        if s.starts_with('^') {
            return Self::index(s);
        }
        let upper = s.to_uppercase();
        if let Some(ticker) = upper.strip_suffix(".NS") {
            Self::nse(ticker)
        } else if let Some(ticker) = upper.strip_suffix(".BO") {
            Self::bse(ticker)
        } else {
            Self::nse(upper)
        }
    }

    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    pub fn exchange(&self) -> Exchange {
        self.exchange
    }

    /// Symbol as the price provider expects it, suffix included.
    pub fn provider_symbol(&self) -> String {
        format!("{}{}", self.ticker, self.exchange.suffix())
    }

    /// File stem for the per-symbol CSV: the bare ticker.
    pub fn file_stem(&self) -> &str {
        &self.ticker
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.ticker, self.exchange.suffix())
    }
}

impl FromStr for Symbol {
    type Err = SymbolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
