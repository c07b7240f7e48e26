#![doc = "openparcel: geometry decoding and spatial aggregation for cadastral parcel datasets"]
pub mod aggregate;
pub mod config;
pub mod error;
pub mod geom;
pub mod io;
pub mod pipeline;
pub mod record;
pub mod region;
pub mod rollup;

#[doc(inline)]
pub use aggregate::{Accumulator, AggregationMode, Aggregator, FoldOptions, FoldReport, SizeBuckets};

#[doc(inline)]
pub use config::{ColumnMap, PipelineConfig, RegionStrategy};

#[doc(inline)]
pub use error::{ParcelError, ParcelResult, SkipReason};

#[doc(inline)]
pub use geom::{decode_container, ParcelGeometry, Reprojector};

#[doc(inline)]
pub use pipeline::{build_assigner, open_source, sample_features, MapSample, Pipeline};

#[doc(inline)]
pub use record::{ParcelRecord, RecordGeometry, RecordSource, Sampling, Surface};

#[doc(inline)]
pub use region::{DepartmentTable, Region, RegionAssigner, RegionMatch, RegionSet};
