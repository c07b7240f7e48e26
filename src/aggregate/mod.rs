mod bucket;
mod fold;
mod size;

pub use bucket::{AggKey, StatMap, Stats};
pub use fold::{Accumulator, AggregationMode, Aggregator, FoldOptions, FoldReport, SkipTally};
pub use size::{SizeBucket, SizeBuckets};
