use std::sync::Arc;

use ahash::AHashMap;
use serde::Serialize;

use crate::aggregate::{Accumulator, AggregationMode, SizeBuckets, Stats};
use crate::rollup::{by_value_desc, percent};

/// One size class within a region or nationally.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BucketShare {
    pub label: Arc<str>,
    pub count: u64,
    pub surface: f64,
    /// Percent of the enclosing total's count.
    pub pct_count: f64,
    /// Percent of the enclosing total's surface.
    pub pct_surface: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionHistogram {
    pub region: Arc<str>,
    pub total_count: u64,
    pub total_surface: f64,
    pub avg_size: f64,
    /// Every size class in bucket order, empty ones included.
    pub buckets: Vec<BucketShare>,
}

fn shares(sizes: &SizeBuckets, per_label: &AHashMap<Arc<str>, Stats>, total: &Stats) -> Vec<BucketShare> {
    sizes.labels().iter()
        .map(|label| {
            let stats = per_label.get(label).copied().unwrap_or_default();
            BucketShare {
                label: label.clone(),
                count: stats.count,
                surface: stats.surface,
                pct_count: percent(stats.count as f64, total.count as f64),
                pct_surface: percent(stats.surface, total.surface),
            }
        })
        .collect()
}

/// Size distribution of each region, percentages relative to the region's
/// own totals. Regions are ordered by average parcel size, largest first.
pub fn regional_histogram(acc: &Accumulator, sizes: &SizeBuckets) -> Vec<RegionHistogram> {
    let mut by_region: AHashMap<Arc<str>, AHashMap<Arc<str>, Stats>> = AHashMap::new();
    for (key, stats) in acc.get(AggregationMode::RegionSize).iter() {
        by_region.entry(key[0].clone())
            .or_default()
            .entry(key[1].clone())
            .or_default()
            .merge(stats);
    }

    let mut regions = by_region.into_iter()
        .filter_map(|(region, per_label)| {
            let mut total = Stats::default();
            per_label.values().for_each(|s| total.merge(s));
            (total.count > 0).then(|| RegionHistogram {
                buckets: shares(sizes, &per_label, &total),
                region,
                total_count: total.count,
                total_surface: total.surface,
                avg_size: total.avg_size(),
            })
        })
        .collect::<Vec<_>>();
    regions.sort_by(|a, b| by_value_desc(a.avg_size, &a.region, b.avg_size, &b.region));
    regions
}

/// Size distribution over every region (unresolved included), in bucket order.
pub fn national_distribution(acc: &Accumulator, sizes: &SizeBuckets) -> Vec<BucketShare> {
    let mut per_label: AHashMap<Arc<str>, Stats> = AHashMap::new();
    for (key, stats) in acc.get(AggregationMode::RegionSize).iter() {
        per_label.entry(key[1].clone()).or_default().merge(stats);
    }
    let mut total = Stats::default();
    per_label.values().for_each(|s| total.merge(s));
    shares(sizes, &per_label, &total)
}
