//! CSV persistence for price series.
//!
//! Writes are atomic: rows go to `{file}.tmp` beside the target, which is then
//! renamed over the target. A failed write leaves any existing file untouched.

use crate::domain::PriceSeries;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const CSV_HEADER: [&str; 6] = ["Date", "Open", "High", "Low", "Close", "Volume"];

#[derive(Debug, Error)]
pub enum WriteError {
    #[error("failed to create directory {}: {source}", .path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {}: {source}", .path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("failed to write {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Writes `PriceSeries` as `Date,Open,High,Low,Close,Volume` CSV files.
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvWriter;

impl CsvWriter {
    pub fn new() -> Self {
        Self
    }

    /// Write `series` to `path`, replacing any previous file. Returns rows written.
    pub fn write(&self, series: &PriceSeries, path: &Path) -> Result<usize, WriteError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| WriteError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let tmp_path = tmp_path_for(path);
        if let Err(e) = write_rows(series, &tmp_path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e);
        }

        fs::rename(&tmp_path, path).map_err(|source| {
            let _ = fs::remove_file(&tmp_path);
            WriteError::Io {
                path: path.to_path_buf(),
                source,
            }
        })?;

        Ok(series.len())
    }
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

fn write_rows(series: &PriceSeries, tmp_path: &Path) -> Result<(), WriteError> {
    let csv_err = |source: csv::Error| WriteError::Csv {
        path: tmp_path.to_path_buf(),
        source,
    };

    let mut wtr = csv::Writer::from_path(tmp_path).map_err(csv_err)?;
    wtr.write_record(CSV_HEADER).map_err(csv_err)?;

    for bar in &series.bars {
        wtr.write_record([
            bar.date.format("%Y-%m-%d").to_string(),
            bar.open.to_string(),
            bar.high.to_string(),
            bar.low.to_string(),
            bar.close.to_string(),
            bar.volume.to_string(),
        ])
        .map_err(csv_err)?;
    }

    let file = wtr.into_inner().map_err(|e| WriteError::Io {
        path: tmp_path.to_path_buf(),
        source: e.into_error(),
    })?;
    file.sync_all().map_err(|source| WriteError::Io {
        path: tmp_path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PriceBar;
    use chrono::NaiveDate;

    fn series() -> PriceSeries {
        PriceSeries::new(
            "INFY.NS",
            vec![
                PriceBar {
                    date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
                    open: 1500.25,
                    high: 1510.0,
                    low: 1490.5,
                    close: 1505.75,
                    volume: 1_234_567,
                },
                PriceBar {
                    date: NaiveDate::from_ymd_opt(2024, 1, 3).unwrap(),
                    open: 1506.0,
                    high: 1520.0,
                    low: 1500.0,
                    close: 1518.1,
                    volume: 987_654,
                },
            ],
        )
    }

    #[test]
    fn writes_header_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nifty50").join("INFY.csv");

        let rows = CsvWriter::new().write(&series(), &path).unwrap();
        assert_eq!(rows, 2);

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "Date,Open,High,Low,Close,Volume");
        assert_eq!(lines[1], "2024-01-02,1500.25,1510,1490.5,1505.75,1234567");
        assert_eq!(lines[2], "2024-01-03,1506,1520,1500,1518.1,987654");
        assert_eq!(lines.len(), 3);
        assert!(!dir.path().join("nifty50").join("INFY.csv.tmp").exists());
    }

    #[test]
    fn overwrites_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("INFY.csv");
        fs::write(&path, "stale content\nmore\nand more\nand more\n").unwrap();

        CsvWriter::new().write(&series(), &path).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert!(!content.contains("stale"));
        assert_eq!(content.lines().count(), 3);
    }

    #[test]
    fn failure_leaves_prior_file_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("INFY.csv");
        fs::write(&path, "previous").unwrap();

        // A directory squatting on the temp path makes the write fail.
        fs::create_dir(dir.path().join("INFY.csv.tmp")).unwrap();

        let err = CsvWriter::new().write(&series(), &path).unwrap_err();
        assert!(matches!(err, WriteError::Csv { .. }));
        assert_eq!(fs::read_to_string(&path).unwrap(), "previous");
    }

    #[test]
    fn parent_that_is_a_file_fails_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("sensex30");
        fs::write(&blocker, "not a directory").unwrap();

        let err = CsvWriter::new().write(&series(), &blocker.join("TCS.csv")).unwrap_err();
        assert!(matches!(err, WriteError::CreateDir { .. }));
    }

    #[test]
    fn empty_series_writes_header_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("EMPTY.csv");
        let rows = CsvWriter::new().write(&PriceSeries::empty("EMPTY.NS"), &path).unwrap();
        assert_eq!(rows, 0);
        assert_eq!(fs::read_to_string(&path).unwrap(), "Date,Open,High,Low,Close,Volume\n");
    }
}
