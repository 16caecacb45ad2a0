//! Property tests for the joiner and grouped aggregation.
//!
//! 1. Annotation keeps every row, in order, and flags follow list membership
//! 2. Day-0 classification splits exactly at the threshold
//! 3. Grouped counts add up to the keyed rows with a finite value

use chrono::NaiveDate;
use proptest::prelude::*;

use ipolens_core::stats::group_summaries;
use ipolens_core::{
    classify_day0, Day0Level, Flag, IpoRecord, ReferenceList, ReferenceSet, ReturnWindow,
};

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_symbol() -> impl Strategy<Value = String> {
    "[A-E]{1,3}"
}

fn arb_return() -> impl Strategy<Value = Option<f64>> {
    prop::option::of(-0.99..4.0_f64)
}

fn arb_rows() -> impl Strategy<Value = Vec<(String, Option<f64>, Option<f64>)>> {
    prop::collection::vec((arb_symbol(), arb_return(), arb_return()), 0..60)
}

fn record(symbol: &str, day0: Option<f64>, day252: Option<f64>) -> IpoRecord {
    let date = NaiveDate::from_ymd_opt(2021, 6, 1).unwrap();
    let mut r = IpoRecord::new(symbol, date);
    r.set_ipo_return(ReturnWindow::Day0, day0);
    r.set_ipo_return(ReturnWindow::Day252, day252);
    r
}

// ── Properties ───────────────────────────────────────────────────────

proptest! {
    #[test]
    fn annotation_keeps_rows_and_follows_lists(
        rows in arb_rows(),
        spacs in prop::collection::vec(arb_symbol(), 0..10),
    ) {
        let list = ReferenceList::from_symbols("spacs", &spacs);
        let set = ReferenceSet { spacs: Some(list), ..ReferenceSet::default() };
        let records: Vec<IpoRecord> = rows.iter().map(|(s, d0, d252)| record(s, *d0, *d252)).collect();

        let annotated = set.annotate(records);
        prop_assert_eq!(annotated.len(), rows.len());
        for (row, (symbol, _, _)) in annotated.iter().zip(&rows) {
            prop_assert_eq!(&row.record.symbol, symbol);
            let expected = Flag::from_bool(spacs.contains(symbol));
            prop_assert_eq!(row.membership.spac, Some(expected));
            prop_assert_eq!(row.membership.sp500, None);
            prop_assert_eq!(row.membership.russell1000, None);
        }
    }

    #[test]
    fn day0_split_is_exact(r in -1.0..5.0_f64, threshold in 0.1..3.0_f64) {
        let level = classify_day0(Some(r), threshold);
        if r < threshold {
            prop_assert_eq!(level, Some(Day0Level::Normal));
        } else {
            prop_assert_eq!(level, Some(Day0Level::Abnormal));
        }
        prop_assert_eq!(classify_day0(None, threshold), None);
    }

    #[test]
    fn grouped_counts_cover_keyed_values(rows in arb_rows(), threshold in 0.5..2.0_f64) {
        let set = ReferenceSet { day0_abnormal_threshold: threshold, ..ReferenceSet::default() };
        let records: Vec<IpoRecord> = rows.iter().map(|(s, d0, d252)| record(s, *d0, *d252)).collect();
        let annotated = set.annotate(records);

        let groups = group_summaries(
            &annotated,
            |r| r.membership.day0_level,
            |r| r.ipo_return(ReturnWindow::Day252),
        );
        let total: usize = groups.values().map(|s| s.count).sum();
        let expected = rows.iter().filter(|(_, d0, d252)| d0.is_some() && d252.is_some()).count();
        prop_assert_eq!(total, expected);

        let keys: Vec<Day0Level> = groups.keys().copied().collect();
        let mut sorted = keys.clone();
        sorted.sort();
        prop_assert_eq!(keys, sorted);
    }
}
