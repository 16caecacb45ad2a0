//! Reference-data joiner: derives membership flags from ticker lists.
//!
//! Matching is exact and case-sensitive on the trimmed symbol. A symbol
//! missing from a list is simply "no"; nothing is signalled.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::classify::{classify_day0, DEFAULT_ABNORMAL_THRESHOLD};
use crate::domain::{AnnotatedIpo, Flag, IpoRecord, Membership, ReturnWindow};

/// A named set of ticker symbols (SPAC list, index constituents).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceList {
    pub name: String,
    symbols: BTreeSet<String>,
}

impl ReferenceList {
    /// Build a list from raw cells. Whitespace is trimmed and empty cells
    /// are skipped; duplicates collapse.
    pub fn from_symbols<I, S>(name: impl Into<String>, symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let symbols = symbols
            .into_iter()
            .map(|s| s.as_ref().trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        Self {
            name: name.into(),
            symbols,
        }
    }

    /// Exact, case-sensitive lookup. The query is not trimmed; loaders
    /// trim cells on read.
    pub fn contains(&self, symbol: &str) -> bool {
        self.symbols.contains(symbol)
    }

    pub fn flag(&self, symbol: &str) -> Flag {
        Flag::from_bool(self.contains(symbol))
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.symbols.iter().map(|s| s.as_str())
    }
}

/// The three reference lists plus the day-0 classification threshold.
///
/// Any list may be absent (failed to load); the matching flag is then left
/// as `None` on every row.
#[derive(Debug, Clone)]
pub struct ReferenceSet {
    pub spacs: Option<ReferenceList>,
    pub sp500: Option<ReferenceList>,
    pub russell1000: Option<ReferenceList>,
    pub day0_abnormal_threshold: f64,
}

impl Default for ReferenceSet {
    fn default() -> Self {
        Self {
            spacs: None,
            sp500: None,
            russell1000: None,
            day0_abnormal_threshold: DEFAULT_ABNORMAL_THRESHOLD,
        }
    }
}

impl ReferenceSet {
    /// Derive the flags for one record.
    pub fn membership(&self, record: &IpoRecord) -> Membership {
        let flag = |list: &Option<ReferenceList>| list.as_ref().map(|l| l.flag(&record.symbol));
        Membership {
            spac: flag(&self.spacs),
            sp500: flag(&self.sp500),
            russell1000: flag(&self.russell1000),
            day0_level: classify_day0(
                record.ipo_return(ReturnWindow::Day0),
                self.day0_abnormal_threshold,
            ),
        }
    }

    /// Annotate every record, preserving input order.
    pub fn annotate(&self, records: Vec<IpoRecord>) -> Vec<AnnotatedIpo> {
        records
            .into_iter()
            .map(|record| AnnotatedIpo {
                membership: self.membership(&record),
                record,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Day0Level;
    use chrono::NaiveDate;

    fn record(symbol: &str, day0: f64) -> IpoRecord {
        IpoRecord::new(symbol, NaiveDate::from_ymd_opt(2021, 3, 1).unwrap())
            .with_return(ReturnWindow::Day0, day0)
    }

    #[test]
    fn matching_is_exact_and_case_sensitive() {
        let list = ReferenceList::from_symbols("spacs", ["PSTH", " IPOE ", ""]);
        assert_eq!(list.len(), 2);
        assert!(list.contains("PSTH"));
        assert!(list.contains("IPOE"));
        assert!(!list.contains("psth"));
        assert!(!list.contains("PST"));
        assert!(!list.contains(" PSTH"));
        assert_eq!(list.flag("NOPE"), Flag::No);
    }

    #[test]
    fn annotate_sets_all_flags() {
        let refs = ReferenceSet {
            spacs: Some(ReferenceList::from_symbols("spacs", ["SPC"])),
            sp500: Some(ReferenceList::from_symbols("sp500", ["ABNB"])),
            russell1000: Some(ReferenceList::from_symbols("russell", ["ABNB", "SNOW"])),
            day0_abnormal_threshold: 1.0,
        };
        let rows = refs.annotate(vec![record("SPC", 0.0), record("ABNB", 1.13), record("SNOW", 1.12)]);

        assert_eq!(rows[0].membership.spac, Some(Flag::Yes));
        assert_eq!(rows[0].membership.sp500, Some(Flag::No));
        assert_eq!(rows[0].membership.day0_level, Some(Day0Level::Normal));

        assert_eq!(rows[1].membership.spac, Some(Flag::No));
        assert_eq!(rows[1].membership.sp500, Some(Flag::Yes));
        assert_eq!(rows[1].membership.russell1000, Some(Flag::Yes));
        assert_eq!(rows[1].membership.day0_level, Some(Day0Level::Abnormal));

        assert_eq!(rows[2].membership.sp500, Some(Flag::No));
        assert_eq!(rows[2].membership.russell1000, Some(Flag::Yes));
    }

    #[test]
    fn missing_list_leaves_flag_unset() {
        let refs = ReferenceSet::default();
        let rows = refs.annotate(vec![record("ANY", 0.1)]);
        assert_eq!(rows[0].membership.spac, None);
        assert_eq!(rows[0].membership.sp500, None);
        assert_eq!(rows[0].membership.day0_level, Some(Day0Level::Normal));
    }
}
