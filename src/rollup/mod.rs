//! Pure transforms from a finished [`Accumulator`](crate::aggregate::Accumulator)
//! to the serializable summaries.

mod hierarchy;
mod histogram;
mod ranking;
mod summary;

use std::cmp::Ordering;

pub use hierarchy::{hierarchy, RollupNode};
pub use histogram::{national_distribution, regional_histogram, BucketShare, RegionHistogram};
pub use ranking::{ranked_regions, rankings, regional_top_cultures, CultureRanking, CultureShare, RankEntry, RankingOptions, Rankings, RegionSummary};
pub use summary::{size_extremes, summary, Summary, SummaryRow, SizeExtremes};

/// Descending by value, ties broken by ascending key.
#[inline]
pub(crate) fn by_value_desc(a_value: f64, a_key: &str, b_value: f64, b_key: &str) -> Ordering {
    b_value.total_cmp(&a_value).then_with(|| a_key.cmp(b_key))
}

/// `part` as a percentage of `whole`, 0 when `whole` is 0.
#[inline]
pub(crate) fn percent(part: f64, whole: f64) -> f64 {
    if whole > 0.0 { part / whole * 100.0 } else { 0.0 }
}
