//! Categorical flags derived for every IPO.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Yes/no membership flag. Orders `No` before `Yes` so grouped output
/// lists the excluded group first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Flag {
    No,
    Yes,
}

impl Flag {
    pub fn from_bool(value: bool) -> Self {
        if value {
            Flag::Yes
        } else {
            Flag::No
        }
    }

    pub fn is_yes(self) -> bool {
        self == Flag::Yes
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Flag::No => "no",
            Flag::Yes => "yes",
        }
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// First-day return level.
///
/// A day-0 return at or above the abnormal threshold (default 1.0, i.e. a
/// 100% first-day gain) is `Abnormal`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Day0Level {
    Abnormal,
    Normal,
}

impl Day0Level {
    pub fn as_str(self) -> &'static str {
        match self {
            Day0Level::Abnormal => "abnormal",
            Day0Level::Normal => "normal",
        }
    }
}

impl fmt::Display for Day0Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// All derived flags for one IPO.
///
/// A membership flag is `None` only when its reference list was not
/// available for the run; `day0_level` is `None` when the day-0 return is
/// missing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    pub spac: Option<Flag>,
    pub sp500: Option<Flag>,
    pub russell1000: Option<Flag>,
    pub day0_level: Option<Day0Level>,
}

impl Membership {
    /// True when the IPO is in neither index. `None` if either index list
    /// is unavailable.
    pub fn in_no_index(&self) -> Option<bool> {
        match (self.sp500, self.russell1000) {
            (Some(sp), Some(russ)) => Some(!sp.is_yes() && !russ.is_yes()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_orders_no_first() {
        assert!(Flag::No < Flag::Yes);
        assert!(Day0Level::Abnormal < Day0Level::Normal);
    }

    #[test]
    fn in_no_index_requires_both_lists() {
        let m = Membership {
            sp500: Some(Flag::No),
            russell1000: None,
            ..Default::default()
        };
        assert_eq!(m.in_no_index(), None);

        let m = Membership {
            sp500: Some(Flag::No),
            russell1000: Some(Flag::No),
            ..Default::default()
        };
        assert_eq!(m.in_no_index(), Some(true));

        let m = Membership {
            sp500: Some(Flag::No),
            russell1000: Some(Flag::Yes),
            ..Default::default()
        };
        assert_eq!(m.in_no_index(), Some(false));
    }
}
