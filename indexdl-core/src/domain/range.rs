//! Calendar date range for a download.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RangeError {
    #[error("start date {start} must be before end date {end}")]
    NotIncreasing { start: NaiveDate, end: NaiveDate },

    #[error("invalid date '{0}' (expected YYYY-MM-DD)")]
    Parse(String),
}

/// Inclusive `[start, end]` range of calendar dates, with `start < end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, RangeError> {
        if start >= end {
            return Err(RangeError::NotIncreasing { start, end });
        }
        Ok(Self { start, end })
    }

    /// The last `years` years up to `today`, counting a year as 365 days.
    pub fn last_years(years: u32, today: NaiveDate) -> Result<Self, RangeError> {
        let start = today - Duration::days(i64::from(years) * 365);
        Self::new(start, today)
    }

    /// Build a range from optional `YYYY-MM-DD` strings.
    ///
    /// A missing end defaults to `today`; a missing start to `years` before the end.
    pub fn from_args(
        start: Option<&str>,
        end: Option<&str>,
        years: u32,
        today: NaiveDate,
    ) -> Result<Self, RangeError> {
        let end = end.map(parse_date).transpose()?.unwrap_or(today);
        match start.map(parse_date).transpose()? {
            Some(start) => Self::new(start, end),
            None => Self::last_years(years, end),
        }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// True if `date` falls inside the range, both ends included.
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {}", self.start, self.end)
    }
}

fn parse_date(s: &str) -> Result<NaiveDate, RangeError> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|_| RangeError::Parse(s.to_string()))
}
