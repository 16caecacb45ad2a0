//! ipolens core: domain types and statistics for the IPO returns study.
//!
//! This crate holds everything that does not touch the filesystem:
//! - Domain types (IPO records, return windows, membership flags)
//! - The reference-data joiner that derives SPAC / index flags
//! - Day-0 classification and derived returns
//! - Descriptive statistics, grouped aggregation, correlation, OLS

pub mod classify;
pub mod domain;
pub mod membership;
pub mod stats;

pub use classify::{classify_day0, eleven_month_return, DEFAULT_ABNORMAL_THRESHOLD};
pub use domain::{AnnotatedIpo, Day0Level, Flag, IpoRecord, Membership, ReturnWindow};
pub use membership::{ReferenceList, ReferenceSet};
pub use stats::{CorrelationMatrix, OlsFit, Summary};
