//! Yahoo Finance price provider.
//!
//! Fetches daily bars from Yahoo's v8 chart API and applies the split/dividend
//! adjustment (`adjclose / close`) to open, high, low and close. One call is
//! one HTTP request; retrying is the fetcher's job.

use super::provider::{DataError, PriceProvider};
use crate::domain::{DateRange, PriceBar, Symbol};
use chrono::NaiveDate;
use reqwest::blocking::{Client, Response};
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_CHART_URL: &str = "https://query2.finance.yahoo.com/v8/finance/chart/";

/// Top level of every chart reply, success or not.
#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    chart: ChartBody,
}

/// Exactly one of `result` / `error` is normally set.
#[derive(Debug, Deserialize)]
struct ChartBody {
    result: Option<Vec<ChartSeries>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartSeries {
    /// Session timestamps (UTC seconds). Absent when the range has no trading days.
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteColumns>,
    adjclose: Option<Vec<AdjCloseColumn>>,
}

/// Column-oriented OHLCV, index-aligned with `timestamp`. Gaps are `null`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct QuoteColumns {
    open: Vec<Option<f64>>,
    high: Vec<Option<f64>>,
    low: Vec<Option<f64>>,
    close: Vec<Option<f64>>,
    volume: Vec<Option<u64>>,
}

#[derive(Debug, Deserialize)]
struct AdjCloseColumn {
    adjclose: Vec<Option<f64>>,
}

/// Unadjusted bar as Yahoo reports it.
#[derive(Debug, Clone, PartialEq)]
struct RawBar {
    date: NaiveDate,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: u64,
    adj_close: Option<f64>,
}

impl RawBar {
    /// Scale OHLC by `adj_close / close`; volume is left as reported.
    fn adjusted(&self) -> PriceBar {
        let factor = match self.adj_close {
            Some(adj) if self.close.is_finite() && self.close != 0.0 && adj.is_finite() => {
                adj / self.close
            }
            _ => 1.0,
        };
        PriceBar {
            date: self.date,
            open: self.open * factor,
            high: self.high * factor,
            low: self.low * factor,
            close: self.close * factor,
            volume: self.volume,
        }
    }
}

fn column<T: Copy>(values: &[Option<T>], i: usize) -> Option<T> {
    values.get(i).copied().flatten()
}

fn session_date(ts: i64) -> Result<NaiveDate, DataError> {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.date_naive())
        .ok_or_else(|| DataError::ResponseFormatChanged(format!("invalid timestamp: {ts}")))
}

/// Yahoo Finance provider over a blocking HTTP client.
pub struct YahooProvider {
    client: Client,
    base_url: Url,
}

impl YahooProvider {
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self, DataError> {
        Self::with_base_url(DEFAULT_CHART_URL, timeout, user_agent)
    }

    /// Point the provider at a different chart endpoint (mirrors, test servers).
    pub fn with_base_url(base_url: &str, timeout: Duration, user_agent: &str) -> Result<Self, DataError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| DataError::Other(format!("failed to build HTTP client: {e}")))?;
        Self::from_client(client, base_url)
    }

    fn from_client(client: Client, base_url: &str) -> Result<Self, DataError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| DataError::Other(format!("invalid chart URL '{base_url}': {e}")))?;
        Ok(Self { client, base_url })
    }

    /// Build the chart API URL for a symbol and date range.
    ///
    /// The symbol is pushed as a single path segment; `/` and `%` inside it get escaped.
    fn chart_url(&self, symbol: &str, range: &DateRange) -> Result<Url, DataError> {
        let start_ts = range.start().and_time(chrono::NaiveTime::MIN).and_utc().timestamp();
        // period2 is exclusive on Yahoo's side; ask for the whole of the end day.
        let end_ts = range.end().and_time(chrono::NaiveTime::MIN).and_utc().timestamp() + 86_400;

        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| DataError::Other(format!("chart URL cannot take a path: {}", self.base_url)))?
            .pop_if_empty()
            .push(symbol);
        url.query_pairs_mut()
            .append_pair("period1", &start_ts.to_string())
            .append_pair("period2", &end_ts.to_string())
            .append_pair("interval", "1d")
            .append_pair("events", "div,splits")
            .append_pair("includeAdjustedClose", "true");
        Ok(url)
    }

    /// Turn a decoded chart reply into unadjusted bars.
    ///
    /// Zero rows is a normal answer: no timestamps in range, or the `Not Found`
    /// chart error Yahoo gives for delisted and unknown tickers.
    fn parse_response(envelope: ChartEnvelope) -> Result<Vec<RawBar>, DataError> {
        let ChartBody { result, error } = envelope.chart;
        let series = match (result, error) {
            (Some(result), _) => result
                .into_iter()
                .next()
                .ok_or_else(|| DataError::ResponseFormatChanged("result array is empty".into()))?,
            (None, Some(err)) if err.code == "Not Found" => return Ok(Vec::new()),
            (None, Some(err)) => {
                return Err(DataError::ResponseFormatChanged(format!("{}: {}", err.code, err.description)))
            }
            (None, None) => {
                return Err(DataError::ResponseFormatChanged("chart reply has neither result nor error".into()))
            }
        };

        let Some(timestamps) = series.timestamp else {
            return Ok(Vec::new());
        };
        let quote = series
            .indicators
            .quote
            .into_iter()
            .next()
            .ok_or_else(|| DataError::ResponseFormatChanged("no quote data".into()))?;
        let adj = series
            .indicators
            .adjclose
            .and_then(|v| v.into_iter().next())
            .map(|a| a.adjclose);

        let mut bars = Vec::with_capacity(timestamps.len());
        for (i, ts) in timestamps.into_iter().enumerate() {
            let prices = [
                column(&quote.open, i),
                column(&quote.high, i),
                column(&quote.low, i),
                column(&quote.close, i),
            ];
            let volume = column(&quote.volume, i);
            // market holidays show up as all-null rows
            if prices.iter().all(Option::is_none) && volume.is_none() {
                continue;
            }
            let [open, high, low, close] = prices.map(|p| p.unwrap_or(f64::NAN));
            bars.push(RawBar {
                date: session_date(ts)?,
                open,
                high,
                low,
                close,
                volume: volume.unwrap_or(0),
                adj_close: adj.as_deref().and_then(|v| column(v, i)),
            });
        }

        Ok(bars)
    }

    /// Decode a response body. Read failures are transport problems and stay
    /// retryable; only a body that arrived whole but does not parse is a format error.
    fn read_chart(resp: Response, symbol: &str) -> Result<Result<ChartEnvelope, DataError>, DataError> {
        let body = resp.bytes().map_err(|e| {
            if e.is_timeout() {
                DataError::Timeout(e.to_string())
            } else {
                DataError::NetworkUnreachable(format!("failed to read response for {symbol}: {e}"))
            }
        })?;
        Ok(serde_json::from_slice(&body).map_err(|e| {
            DataError::ResponseFormatChanged(format!("failed to parse response for {symbol}: {e}"))
        }))
    }

    fn retry_after(resp: &Response) -> Option<u64> {
        resp.headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
    }
}

impl PriceProvider for YahooProvider {
    fn name(&self) -> &str {
        "yahoo_finance"
    }

    fn fetch(&self, symbol: &Symbol, range: &DateRange) -> Result<Vec<PriceBar>, DataError> {
        let provider_symbol = symbol.provider_symbol();
        let url = self.chart_url(&provider_symbol, range)?;
        tracing::debug!(symbol = %provider_symbol, %url, "requesting chart");

        let resp = self.client.get(url).send()?;
        let status = resp.status();

        let raw = if status == StatusCode::NOT_FOUND {
            // Delisted and unknown tickers come back as 404; any unreadable 404 body means the same.
            match Self::read_chart(resp, &provider_symbol)? {
                Ok(envelope) => Self::parse_response(envelope)?,
                Err(_) => Vec::new(),
            }
        } else if status.is_success() {
            Self::parse_response(Self::read_chart(resp, &provider_symbol)??)?
        } else {
            return Err(DataError::from_status(status.as_u16(), Self::retry_after(&resp)));
        };

        Ok(raw.iter().map(RawBar::adjusted).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{RetryPolicy, SeriesFetcher};
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread;

    fn parse(json: &str) -> Result<Vec<RawBar>, DataError> {
        let envelope: ChartEnvelope = serde_json::from_str(json).unwrap();
        YahooProvider::parse_response(envelope)
    }

    fn range() -> DateRange {
        DateRange::new(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
        )
        .unwrap()
    }

    const TWO_DAYS: &str = r#"{
        "chart": {
            "result": [{
                "timestamp": [1704166200, 1704252600, 1704339000],
                "indicators": {
                    "quote": [{
                        "open":   [100.0, null, 102.0],
                        "high":   [110.0, null, 104.0],
                        "low":    [ 95.0, null, 101.0],
                        "close":  [105.0, null, 103.0],
                        "volume": [1000,  null, 2000]
                    }],
                    "adjclose": [{ "adjclose": [52.5, null, 103.0] }]
                }
            }],
            "error": null
        }
    }"#;

    const DELISTED: &str = r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found, symbol may be delisted"}}}"#;

    /// Serve one canned HTTP reply per incoming connection, in order.
    fn serve(replies: Vec<Vec<u8>>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        thread::spawn(move || {
            for reply in replies {
                let Ok((mut stream, _)) = listener.accept() else {
                    return;
                };
                let mut request = Vec::new();
                let mut buf = [0u8; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    match stream.read(&mut buf) {
                        Ok(0) | Err(_) => break,
                        Ok(n) => request.extend_from_slice(&buf[..n]),
                    }
                }
                let _ = stream.write_all(&reply);
            }
        });
        format!("http://{addr}/v8/finance/chart/")
    }

    fn reply(status: &str, headers: &[&str], body: &str) -> Vec<u8> {
        let mut out = format!("HTTP/1.1 {status}\r\nContent-Type: application/json\r\nConnection: close\r\n");
        for h in headers {
            out.push_str(h);
            out.push_str("\r\n");
        }
        if !headers.iter().any(|h| h.starts_with("Content-Length")) {
            out.push_str(&format!("Content-Length: {}\r\n", body.len()));
        }
        out.push_str("\r\n");
        out.push_str(body);
        out.into_bytes()
    }

    fn provider(base_url: &str) -> YahooProvider {
        let client = Client::builder()
            .no_proxy()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap();
        YahooProvider::from_client(client, base_url).unwrap()
    }

    #[test]
    fn parses_bars_and_skips_null_rows() {
        let bars = parse(TWO_DAYS).unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].date, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert_eq!(bars[1].date, NaiveDate::from_ymd_opt(2024, 1, 4).unwrap());
        assert_eq!(bars[1].volume, 2000);
    }

    #[test]
    fn adjustment_scales_ohlc_not_volume() {
        let bars = parse(TWO_DAYS).unwrap();
        let adj = bars[0].adjusted();
        assert!((adj.open - 50.0).abs() < 1e-9);
        assert!((adj.high - 55.0).abs() < 1e-9);
        assert!((adj.low - 47.5).abs() < 1e-9);
        assert!((adj.close - 52.5).abs() < 1e-9);
        assert_eq!(adj.volume, 1000);

        let unchanged = bars[1].adjusted();
        assert_eq!(unchanged.close, 103.0);
    }

    #[test]
    fn missing_adjclose_leaves_prices_alone() {
        let raw = RawBar {
            date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            open: 1.0,
            high: 2.0,
            low: 0.5,
            close: 1.5,
            volume: 7,
            adj_close: None,
        };
        assert_eq!(raw.adjusted().close, 1.5);
    }

    #[test]
    fn no_timestamps_means_no_rows() {
        let json = r#"{"chart":{"result":[{"indicators":{"quote":[{}],"adjclose":[{"adjclose":[]}]}}],"error":null}}"#;
        assert!(parse(json).unwrap().is_empty());
    }

    #[test]
    fn not_found_chart_error_means_no_rows() {
        assert!(parse(DELISTED).unwrap().is_empty());
    }

    #[test]
    fn other_chart_error_is_format_change() {
        let json = r#"{"chart":{"result":null,"error":{"code":"Bad Request","description":"Invalid input"}}}"#;
        assert!(matches!(parse(json), Err(DataError::ResponseFormatChanged(_))));
    }

    #[test]
    fn chart_url_encodes_symbol_and_range() {
        let provider = YahooProvider::new(Duration::from_secs(5), "indexdl-test").unwrap();
        let url = provider.chart_url("M&M.NS", &range()).unwrap();
        let s = url.as_str();
        assert!(s.starts_with("https://query2.finance.yahoo.com/v8/finance/chart/M&M.NS?"));
        assert!(s.contains("period1=1704067200"));
        assert!(s.contains("period2=1704931200"));
        assert!(s.contains("interval=1d"));

        let url = provider.chart_url("^NSEI", &range()).unwrap();
        assert!(url.path().starts_with("/v8/finance/chart/"));
        assert!(url.path().ends_with("NSEI"));
    }

    #[test]
    fn fetch_returns_adjusted_bars() {
        let base = serve(vec![reply("200 OK", &[], TWO_DAYS)]);
        let bars = provider(&base).fetch(&Symbol::nse("RELIANCE").unwrap(), &range()).unwrap();
        assert_eq!(bars.len(), 2);
        assert!((bars[0].close - 52.5).abs() < 1e-9);
    }

    #[test]
    fn delisted_symbol_is_empty_after_one_attempt() {
        let base = serve(vec![reply("404 Not Found", &[], DELISTED)]);
        let provider = provider(&base);

        let out = SeriesFetcher::new(&provider, RetryPolicy::immediate(3))
            .fetch(&Symbol::nse("DELISTED").unwrap(), &range())
            .unwrap();
        assert!(out.is_empty());
        assert_eq!(out.attempts, 1);
    }

    #[test]
    fn unparseable_404_is_empty() {
        let base = serve(vec![reply("404 Not Found", &[], "<html>gone</html>")]);
        let bars = provider(&base).fetch(&Symbol::nse("GONE").unwrap(), &range()).unwrap();
        assert!(bars.is_empty());
    }

    #[test]
    fn rate_limit_carries_retry_after() {
        let base = serve(vec![reply("429 Too Many Requests", &["Retry-After: 30"], "")]);
        let err = provider(&base).fetch(&Symbol::nse("AAA").unwrap(), &range()).unwrap_err();
        assert_eq!(err, DataError::RateLimited { retry_after_secs: Some(30) });
        assert!(err.is_transient());
    }

    #[test]
    fn server_error_is_transient() {
        let base = serve(vec![reply("503 Service Unavailable", &[], "")]);
        let err = provider(&base).fetch(&Symbol::nse("AAA").unwrap(), &range()).unwrap_err();
        assert_eq!(err, DataError::ServerError { status: 503 });
        assert!(err.is_transient());
    }

    #[test]
    fn other_client_error_is_not_transient() {
        let base = serve(vec![reply("401 Unauthorized", &[], "")]);
        let err = provider(&base).fetch(&Symbol::nse("AAA").unwrap(), &range()).unwrap_err();
        assert_eq!(err, DataError::HttpStatus { status: 401 });
        assert!(!err.is_transient());
    }

    #[test]
    fn malformed_success_body_is_format_change() {
        let base = serve(vec![reply("200 OK", &[], r#"{"unexpected":true}"#)]);
        let err = provider(&base).fetch(&Symbol::nse("AAA").unwrap(), &range()).unwrap_err();
        assert!(matches!(err, DataError::ResponseFormatChanged(_)));
    }

    #[test]
    fn body_cut_short_is_transient_and_retried() {
        let truncated = reply("200 OK", &["Content-Length: 5000"], &TWO_DAYS[..40]);
        let base = serve(vec![truncated.clone(), truncated, reply("200 OK", &[], TWO_DAYS)]);
        let provider = provider(&base);
        let symbol = Symbol::nse("AAA").unwrap();

        let err = provider.fetch(&symbol, &range()).unwrap_err();
        assert!(err.is_transient(), "{err:?}");

        let out = SeriesFetcher::new(&provider, RetryPolicy::immediate(3))
            .fetch(&symbol, &range())
            .unwrap();
        assert_eq!(out.attempts, 2);
        assert_eq!(out.series.len(), 2);
    }
}
