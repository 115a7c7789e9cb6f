//! Property tests for canonicalization invariants.
//!
//! Whatever order and duplication the provider returns, the series handed to
//! the writer is ascending, unique by date and inside the requested range.

use chrono::{Duration, NaiveDate};
use indexdl_core::data::canonicalize;
use indexdl_core::domain::{DateRange, PriceBar};
use proptest::prelude::*;
use std::collections::BTreeSet;

fn base() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
}

fn arb_bar() -> impl Strategy<Value = PriceBar> {
    (-20i64..60, 1.0..5000.0_f64, 0u64..10_000_000).prop_map(|(offset, px, volume)| PriceBar {
        date: base() + Duration::days(offset),
        open: px,
        high: px * 1.01,
        low: px * 0.99,
        close: px,
        volume,
    })
}

fn arb_range() -> impl Strategy<Value = DateRange> {
    (0i64..20, 1i64..30).prop_map(|(start, len)| {
        let start = base() + Duration::days(start);
        DateRange::new(start, start + Duration::days(len)).unwrap()
    })
}

proptest! {
    #[test]
    fn output_is_sorted_unique_and_in_range(
        bars in prop::collection::vec(arb_bar(), 0..80),
        range in arb_range(),
    ) {
        let (series, _) = canonicalize("X.NS", bars, &range);

        for w in series.bars.windows(2) {
            prop_assert!(w[0].date < w[1].date);
        }
        for b in &series.bars {
            prop_assert!(range.contains(b.date));
        }
    }

    #[test]
    fn keeps_every_in_range_date_once(
        bars in prop::collection::vec(arb_bar(), 0..80),
        range in arb_range(),
    ) {
        let expected: BTreeSet<NaiveDate> =
            bars.iter().map(|b| b.date).filter(|d| range.contains(*d)).collect();
        let (series, report) = canonicalize("X.NS", bars.clone(), &range);
        let got: Vec<NaiveDate> = series.bars.iter().map(|b| b.date).collect();

        prop_assert_eq!(got, expected.into_iter().collect::<Vec<_>>());
        prop_assert_eq!(series.len() + report.dropped(), bars.len());
    }

    #[test]
    fn canonicalize_is_idempotent(
        bars in prop::collection::vec(arb_bar(), 0..80),
        range in arb_range(),
    ) {
        let (once, _) = canonicalize("X.NS", bars, &range);
        let (twice, report) = canonicalize("X.NS", once.bars.clone(), &range);
        prop_assert_eq!(report.dropped(), 0);
        prop_assert_eq!(once, twice);
    }
}
