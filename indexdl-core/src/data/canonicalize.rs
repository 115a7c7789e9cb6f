//! Canonicalization of fetched bars: sort, dedupe, clip to range, drop void bars.

use crate::domain::{DateRange, PriceBar, PriceSeries};

/// Counts of what canonicalization removed, for logging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CanonicalReport {
    pub duplicates: usize,
    pub out_of_range: usize,
    pub incomplete: usize,
}

impl CanonicalReport {
    pub fn dropped(&self) -> usize {
        self.duplicates + self.out_of_range + self.incomplete
    }
}

/// Turn raw provider bars into a series that is ascending, unique by date,
/// inside `range` and free of non-finite prices.
///
/// When a date appears more than once, the last occurrence wins.
pub fn canonicalize(
    symbol: &str,
    bars: Vec<PriceBar>,
    range: &DateRange,
) -> (PriceSeries, CanonicalReport) {
    let mut report = CanonicalReport::default();
    let mut kept: Vec<PriceBar> = Vec::with_capacity(bars.len());

    for bar in bars {
        if !range.contains(bar.date) {
            report.out_of_range += 1;
        } else if !bar.is_complete() {
            report.incomplete += 1;
        } else {
            kept.push(bar);
        }
    }

    // Stable sort keeps provider order among equal dates, so the later one is last.
    kept.sort_by_key(|b| b.date);
    let before = kept.len();
    kept.reverse();
    kept.dedup_by_key(|b| b.date);
    kept.reverse();
    report.duplicates = before - kept.len();

    (PriceSeries::new(symbol, kept), report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn bar(day: u32, close: f64) -> PriceBar {
        PriceBar {
            date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            open: close,
            high: close,
            low: close,
            close,
            volume: 10,
        }
    }

    fn range() -> DateRange {
        DateRange::new(
            NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn sorts_ascending() {
        let (series, report) = canonicalize("X", vec![bar(5, 5.0), bar(3, 3.0), bar(4, 4.0)], &range());
        let days: Vec<u32> = series.bars.iter().map(|b| chrono::Datelike::day(&b.date)).collect();
        assert_eq!(days, vec![3, 4, 5]);
        assert_eq!(report.dropped(), 0);
    }

    #[test]
    fn later_duplicate_wins() {
        let (series, report) = canonicalize("X", vec![bar(3, 1.0), bar(4, 4.0), bar(3, 2.0)], &range());
        assert_eq!(series.len(), 2);
        assert_eq!(series.bars[0].close, 2.0);
        assert_eq!(report.duplicates, 1);
    }

    #[test]
    fn clips_to_range_and_drops_void() {
        let mut void = bar(6, 6.0);
        void.close = f64::NAN;
        let (series, report) =
            canonicalize("X", vec![bar(1, 1.0), bar(2, 2.0), void, bar(10, 10.0), bar(11, 11.0)], &range());
        assert_eq!(series.len(), 2);
        assert_eq!(report.out_of_range, 2);
        assert_eq!(report.incomplete, 1);
    }
}
