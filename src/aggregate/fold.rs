use std::{collections::BTreeMap, fmt, str::FromStr, sync::Arc};

use anyhow::{anyhow, bail, ensure, Result};
use serde::Serialize;
use smallvec::smallvec;
use tracing::{debug, trace};

use crate::aggregate::{AggKey, SizeBuckets, StatMap};
use crate::config::PipelineConfig;
use crate::error::{ParcelError, ParcelResult, SkipReason};
use crate::record::{category, ParcelRecord};
use crate::region::RegionAssigner;

/// Which key a statistic map is grouped by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationMode {
    /// `(group)`
    Group,
    /// `(group, culture)`
    GroupCulture,
    /// `(culture)`
    Culture,
    /// `(culture, region)`
    CultureRegion,
    /// `(region, size bucket)`
    RegionSize,
}

impl AggregationMode {
    pub const ALL: [AggregationMode; 5] = [
        AggregationMode::Group,
        AggregationMode::GroupCulture,
        AggregationMode::Culture,
        AggregationMode::CultureRegion,
        AggregationMode::RegionSize,
    ];

    /// Modes whose key includes the region.
    #[inline]
    pub fn needs_region(&self) -> bool {
        matches!(self, Self::CultureRegion | Self::RegionSize)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Group => "group",
            Self::GroupCulture => "group_culture",
            Self::Culture => "culture",
            Self::CultureRegion => "culture_region",
            Self::RegionSize => "region_size",
        }
    }

    #[inline]
    fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for AggregationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AggregationMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL.into_iter()
            .find(|mode| mode.as_str() == s.to_lowercase().replace('-', "_"))
            .ok_or_else(|| anyhow!("Unknown aggregation mode: {}", s))
    }
}

/// Labels and policies applied while folding.
#[derive(Debug, Clone, PartialEq)]
pub struct FoldOptions {
    pub unknown_label: Arc<str>,
    pub unresolved_label: Arc<str>,
    /// Treat a missing or zero surface as a missing attribute.
    pub require_positive_surface: bool,
}

impl Default for FoldOptions {
    fn default() -> Self {
        Self {
            unknown_label: Arc::from("UNKNOWN"),
            unresolved_label: Arc::from("Unresolved"),
            require_positive_surface: false,
        }
    }
}

impl From<&PipelineConfig> for FoldOptions {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            unknown_label: Arc::from(config.unknown_label.as_str()),
            unresolved_label: Arc::from(config.unresolved_label.as_str()),
            require_positive_surface: config.require_positive_surface,
        }
    }
}

/// Counters of one pass: every offered record is either processed or skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SkipTally {
    offered: u64,
    processed: u64,
    skipped: [u64; SkipReason::ALL.len()],
}

impl SkipTally {
    #[inline]
    fn skip(&mut self, reason: SkipReason) {
        self.skipped[reason.index()] += 1;
    }

    fn merge(&mut self, other: &SkipTally) {
        self.offered += other.offered;
        self.processed += other.processed;
        self.skipped.iter_mut().zip(other.skipped).for_each(|(a, b)| *a += b);
    }

    #[inline] pub fn offered(&self) -> u64 { self.offered }

    #[inline] pub fn processed(&self) -> u64 { self.processed }

    #[inline] pub fn skipped(&self) -> u64 { self.skipped.iter().sum() }

    #[inline] pub fn skipped_for(&self, reason: SkipReason) -> u64 { self.skipped[reason.index()] }
}

/// Run summary: offered, processed and skipped records by reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FoldReport {
    pub offered: u64,
    pub processed: u64,
    pub skipped: u64,
    pub skipped_by_reason: BTreeMap<SkipReason, u64>,
}

impl FoldReport {
    /// Records were offered but none survived validation.
    pub fn all_skipped(&self) -> bool {
        self.offered > 0 && self.processed == 0
    }

    /// Error out on a run whose output would be empty because of skips.
    pub fn ensure_usable(&self) -> Result<()> {
        ensure!(
            !self.all_skipped(),
            "All {} records were skipped ({})", self.offered,
            self.skipped_by_reason.iter()
                .map(|(reason, n)| format!("{reason}: {n}"))
                .collect::<Vec<_>>()
                .join(", ")
        );
        Ok(())
    }
}

/// Mutable state of a fold. Accumulators of disjoint partitions merge exactly.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Accumulator {
    maps: [StatMap; AggregationMode::ALL.len()],
    tally: SkipTally,
}

impl Accumulator {
    /// Add `other`'s buckets and counters into `self`.
    pub fn merge(&mut self, other: Accumulator) {
        for (mine, theirs) in self.maps.iter_mut().zip(other.maps) {
            mine.merge(theirs);
        }
        self.tally.merge(&other.tally);
    }

    /// Statistics of one mode; empty when the mode was not enabled.
    #[inline]
    pub fn get(&self, mode: AggregationMode) -> &StatMap {
        &self.maps[mode.index()]
    }

    #[inline] pub fn tally(&self) -> &SkipTally { &self.tally }

    pub fn report(&self) -> FoldReport {
        FoldReport {
            offered: self.tally.offered,
            processed: self.tally.processed,
            skipped: self.tally.skipped(),
            skipped_by_reason: SkipReason::ALL.into_iter()
                .map(|reason| (reason, self.tally.skipped_for(reason)))
                .filter(|&(_, n)| n > 0)
                .collect(),
        }
    }
}

/// Attributes of a record that passed validation.
struct Validated<'a> {
    surface: f64,
    culture: Arc<str>,
    group: Arc<str>,
    region: Option<Arc<str>>,
    size: &'a Arc<str>,
}

/// Read-only fold context: enabled modes, size classes and region assignment.
#[derive(Debug)]
pub struct Aggregator {
    modes: Vec<AggregationMode>,
    sizes: SizeBuckets,
    assigner: Option<RegionAssigner>,
    options: FoldOptions,
}

impl Aggregator {
    pub fn new(
        modes: &[AggregationMode],
        sizes: SizeBuckets,
        assigner: Option<RegionAssigner>,
        options: FoldOptions,
    ) -> Result<Self> {
        ensure!(!modes.is_empty(), "At least one aggregation mode is required");
        sizes.validate()?;

        let mut modes = modes.to_vec();
        modes.sort_unstable();
        modes.dedup();

        let needs_region = modes.iter().any(AggregationMode::needs_region);
        match (&assigner, needs_region) {
            (None, true) => bail!("Modes {:?} require a region assigner", modes),
            (Some(_), false) => debug!("region assigner provided but unused by {:?}", modes),
            _ => {}
        }

        Ok(Self { modes, sizes, assigner: assigner.filter(|_| needs_region), options })
    }

    #[inline] pub fn modes(&self) -> &[AggregationMode] { &self.modes }

    #[inline] pub fn sizes(&self) -> &SizeBuckets { &self.sizes }

    #[inline] pub fn options(&self) -> &FoldOptions { &self.options }

    /// Whether records must carry a geometry to be processed.
    pub fn needs_geometry(&self) -> bool {
        self.assigner.as_ref().is_some_and(RegionAssigner::needs_geometry)
    }

    pub fn accumulator(&self) -> Accumulator {
        Accumulator::default()
    }

    /// Every check that can fail, before any bucket is touched.
    fn validate(&self, record: &ParcelRecord) -> ParcelResult<Validated<'_>> {
        let surface = record.surface.hectares()?;
        if self.options.require_positive_surface && surface <= 0.0 {
            return Err(ParcelError::MissingAttribute("surface"));
        }
        let region = self.assigner.as_ref()
            .map(|assigner| assigner.assign(record))
            .transpose()?
            .map(|found| found.label(&self.options.unresolved_label));

        Ok(Validated {
            surface,
            culture: category(record.culture.as_deref(), &self.options.unknown_label),
            group: category(record.group.as_deref(), &self.options.unknown_label),
            region,
            size: self.sizes.label_for(surface),
        })
    }

    /// Fold one record into `acc`, or tally why it was skipped.
    pub fn fold(&self, acc: &mut Accumulator, record: &ParcelRecord) {
        acc.tally.offered += 1;

        let v = match self.validate(record) {
            Ok(v) => v,
            Err(e) => {
                trace!(id = record.id.as_deref().unwrap_or(""), reason = %e.reason(), error = %e, "skipping record");
                acc.tally.skip(e.reason());
                return;
            }
        };

        for &mode in &self.modes {
            let key: AggKey = match (mode, &v.region) {
                (AggregationMode::Group, _) => smallvec![v.group.clone()],
                (AggregationMode::GroupCulture, _) => smallvec![v.group.clone(), v.culture.clone()],
                (AggregationMode::Culture, _) => smallvec![v.culture.clone()],
                (AggregationMode::CultureRegion, Some(region)) => smallvec![v.culture.clone(), region.clone()],
                (AggregationMode::RegionSize, Some(region)) => smallvec![region.clone(), v.size.clone()],
                // Region modes always have an assigner.
                (AggregationMode::CultureRegion | AggregationMode::RegionSize, None) => continue,
            };
            acc.maps[mode.index()].add(key, v.surface);
        }
        acc.tally.processed += 1;
    }

    /// Fold a whole batch into a fresh accumulator.
    pub fn fold_all<'a>(&self, records: impl IntoIterator<Item = &'a ParcelRecord>) -> Accumulator {
        let mut acc = self.accumulator();
        records.into_iter().for_each(|record| self.fold(&mut acc, record));
        acc
    }
}
