//! Statistics: pure functions over columns of optional values.
//!
//! No I/O and no knowledge of the study; everything here takes slices and
//! closures and returns plain values.

pub mod correlation;
pub mod distribution;
pub mod group;
pub mod regression;
pub mod summary;

pub use correlation::{complete_pairs, pearson, CorrelationMatrix};
pub use distribution::{t_cdf, two_sided_p, welch_t_test, WelchTest};
pub use group::{count_by, filtered_mean, group_summaries, BoxStats};
pub use regression::{ols, Coefficient, OlsFit};
pub use summary::{finite_values, mean, median, quantile, sample_std, Summary};
