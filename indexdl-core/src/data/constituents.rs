//! Index constituents: dynamic lookup with a static fallback.
//!
//! The NSE publishes the Nifty 50 member list as a CSV file. When that source
//! cannot be reached or parsed, the embedded lists below are used instead.

use super::provider::DataError;
use crate::domain::{Exchange, Symbol};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

pub const NSE_NIFTY50_CSV_URL: &str = "https://archives.nseindia.com/content/indices/ind_nifty50list.csv";

const NIFTY50_FALLBACK: [&str; 50] = [
    "ADANIPORTS", "ASIANPAINT", "AXISBANK", "BAJAJ-AUTO", "BAJFINANCE",
    "BAJAJFINSV", "BPCL", "BHARTIARTL", "CIPLA", "COALINDIA",
    "DRREDDY", "EICHERMOT", "GRASIM", "HCLTECH", "HDFCBANK",
    "HDFCLIFE", "HEROMOTOCO", "HINDALCO", "HINDUNILVR", "ICICIBANK",
    "INDUSINDBK", "INFY", "ITC", "JSWSTEEL", "KOTAKBANK",
    "LT", "M&M", "MARUTI", "NESTLEIND", "NTPC",
    "ONGC", "POWERGRID", "RELIANCE", "SBIN", "SUNPHARMA",
    "TATAMOTORS", "TATASTEEL", "TCS", "TECHM", "TITAN",
    "ULTRACEMCO", "WIPRO", "ADANIENT", "APOLLOHOSP", "BRITANNIA",
    "DIVISLAB", "SHRIRAMFIN", "LTIM", "SBILIFE", "TATACONSUM",
];

const SENSEX30_FALLBACK: [&str; 30] = [
    "RELIANCE", "TCS", "HDFCBANK", "INFY", "ICICIBANK",
    "HINDUNILVR", "ITC", "SBIN", "BHARTIARTL", "BAJFINANCE",
    "KOTAKBANK", "LT", "AXISBANK", "ASIANPAINT", "MARUTI",
    "SUNPHARMA", "TITAN", "ULTRACEMCO", "NESTLEIND", "TATAMOTORS",
    "M&M", "HCLTECH", "POWERGRID", "NTPC", "WIPRO",
    "TATASTEEL", "BAJAJFINSV", "TECHM", "INDUSINDBK", "JSWSTEEL",
];

/// A named stock list downloaded into its own directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Universe {
    Nifty50,
    Sensex30,
}

impl Universe {
    pub const ALL: [Universe; 2] = [Universe::Nifty50, Universe::Sensex30];

    /// Key used for the output directory and in run statistics.
    pub fn key(&self) -> &'static str {
        match self {
            Universe::Nifty50 => "nifty50",
            Universe::Sensex30 => "sensex30",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Universe::Nifty50 => "Nifty 50",
            Universe::Sensex30 => "Sensex 30",
        }
    }

    pub fn exchange(&self) -> Exchange {
        match self {
            Universe::Nifty50 => Exchange::Nse,
            Universe::Sensex30 => Exchange::Bse,
        }
    }

    /// The embedded constituent list, in index order.
    pub fn fallback_symbols(&self) -> Vec<Symbol> {
        let tickers: &[&str] = match self {
            Universe::Nifty50 => &NIFTY50_FALLBACK,
            Universe::Sensex30 => &SENSEX30_FALLBACK,
        };
        tickers
            .iter()
            .filter_map(|t| Symbol::new(*t, self.exchange()).ok())
            .collect()
    }
}

impl fmt::Display for Universe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Universe {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace([' ', '_', '-'], "").as_str() {
            "nifty50" | "nifty" => Ok(Universe::Nifty50),
            "sensex30" | "sensex" => Ok(Universe::Sensex30),
            other => Err(format!("unknown universe '{other}' (expected nifty50 or sensex30)")),
        }
    }
}

/// Outcome of resolving a universe. Both variants carry a usable list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// List came from the dynamic source.
    Resolved(Vec<Symbol>),
    /// Dynamic source unavailable; embedded list used.
    Fallback(Vec<Symbol>),
}

impl Resolution {
    pub fn symbols(&self) -> &[Symbol] {
        match self {
            Resolution::Resolved(s) | Resolution::Fallback(s) => s,
        }
    }

    pub fn into_symbols(self) -> Vec<Symbol> {
        match self {
            Resolution::Resolved(s) | Resolution::Fallback(s) => s,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Resolution::Fallback(_))
    }
}

/// Dynamic source of constituent tickers (bare, without exchange suffix).
pub trait ConstituentSource {
    /// `Ok(None)` means no dynamic source exists for this universe.
    fn fetch(&self, universe: Universe) -> Result<Option<Vec<String>>, DataError>;
}

/// Resolve a universe to its symbol list. Never fails: any problem with the
/// dynamic source falls back to the embedded list.
pub fn resolve(universe: Universe, source: &dyn ConstituentSource) -> Resolution {
    match source.fetch(universe) {
        Ok(Some(tickers)) => {
            let symbols: Vec<Symbol> = tickers
                .iter()
                .filter_map(|t| Symbol::new(t.as_str(), universe.exchange()).ok())
                .collect();
            if symbols.is_empty() {
                tracing::warn!(universe = %universe, "constituent source returned no symbols, using fallback list");
                return fallback(universe);
            }
            tracing::info!(universe = %universe, count = symbols.len(), "fetched live constituent list");
            Resolution::Resolved(symbols)
        }
        Ok(None) => {
            let resolution = fallback(universe);
            tracing::info!(
                universe = %universe,
                count = resolution.symbols().len(),
                "no live constituent source, using embedded list"
            );
            resolution
        }
        Err(e) => {
            tracing::warn!(universe = %universe, error = %e, "failed to fetch live constituent list, using fallback list");
            fallback(universe)
        }
    }
}

fn fallback(universe: Universe) -> Resolution {
    let symbols = universe.fallback_symbols();
    if symbols.is_empty() {
        tracing::warn!(universe = %universe, "fallback constituent list is empty");
    }
    Resolution::Fallback(symbols)
}

/// Fetches constituent CSVs over HTTP (`Symbol` column).
pub struct HttpConstituentSource {
    client: reqwest::blocking::Client,
    nifty50_url: Option<String>,
    sensex30_url: Option<String>,
}

impl HttpConstituentSource {
    pub fn new(
        timeout: Duration,
        user_agent: &str,
        nifty50_url: Option<String>,
        sensex30_url: Option<String>,
    ) -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| DataError::Other(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            nifty50_url,
            sensex30_url,
        })
    }

    fn url_for(&self, universe: Universe) -> Option<&str> {
        match universe {
            Universe::Nifty50 => self.nifty50_url.as_deref(),
            Universe::Sensex30 => self.sensex30_url.as_deref(),
        }
    }
}

impl ConstituentSource for HttpConstituentSource {
    fn fetch(&self, universe: Universe) -> Result<Option<Vec<String>>, DataError> {
        let Some(url) = self.url_for(universe) else {
            return Ok(None);
        };

        let resp = self.client.get(url).send()?;
        let status = resp.status();
        if !status.is_success() {
            return Err(DataError::from_status(status.as_u16(), None));
        }
        let body = resp.text()?;
        parse_constituents_csv(&body).map(Some)
    }
}

/// Pull the `Symbol` column out of an index constituents CSV.
pub fn parse_constituents_csv(body: &str) -> Result<Vec<String>, DataError> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(body.as_bytes());

    let headers = rdr
        .headers()
        .map_err(|e| DataError::ResponseFormatChanged(format!("constituents header: {e}")))?;
    let col = headers
        .iter()
        .position(|h| h.eq_ignore_ascii_case("symbol"))
        .ok_or_else(|| DataError::ResponseFormatChanged("constituents CSV has no Symbol column".into()))?;

    let mut tickers = Vec::new();
    for record in rdr.records() {
        let record = record.map_err(|e| DataError::ResponseFormatChanged(format!("constituents row: {e}")))?;
        if let Some(t) = record.get(col).filter(|t| !t.is_empty()) {
            tickers.push(t.to_string());
        }
    }
    Ok(tickers)
}
