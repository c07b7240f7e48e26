use std::{collections::BTreeMap, sync::Arc};

use ahash::AHashMap;
use serde::Serialize;

use crate::aggregate::{Accumulator, AggregationMode, Stats};
use crate::config::PipelineConfig;
use crate::rollup::by_value_desc;

#[derive(Debug, Clone, PartialEq)]
pub struct RankingOptions {
    /// Cultures totalling less than this many hectares are left out.
    pub significance_threshold: f64,
    pub include_unresolved: bool,
    pub unresolved_label: Arc<str>,
}

impl Default for RankingOptions {
    fn default() -> Self {
        Self {
            significance_threshold: 10.0,
            include_unresolved: false,
            unresolved_label: Arc::from("Unresolved"),
        }
    }
}

impl From<&PipelineConfig> for RankingOptions {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            significance_threshold: config.significance_threshold,
            include_unresolved: config.include_unresolved,
            unresolved_label: Arc::from(config.unresolved_label.as_str()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankEntry {
    pub region: Arc<str>,
    pub surface: f64,
    pub count: u64,
}

/// One culture's regions ranked by surface, with its totals over them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CultureRanking {
    pub total_surface: f64,
    pub total_count: u64,
    pub rankings: Vec<RankEntry>,
}

/// Culture -> regions ranked by surface.
pub type Rankings = BTreeMap<Arc<str>, CultureRanking>;

/// Per culture, the regions growing it ranked by surface.
///
/// The threshold is compared against the culture's total over the entries
/// actually listed, so an excluded unresolved bucket does not count.
pub fn rankings(acc: &Accumulator, options: &RankingOptions) -> Rankings {
    let mut by_culture: AHashMap<Arc<str>, Vec<RankEntry>> = AHashMap::new();
    for (key, stats) in acc.get(AggregationMode::CultureRegion).iter() {
        let (culture, region) = (&key[0], &key[1]);
        if !options.include_unresolved && *region == options.unresolved_label {
            continue;
        }
        by_culture.entry(culture.clone()).or_default().push(RankEntry {
            region: region.clone(),
            surface: stats.surface,
            count: stats.count,
        });
    }

    by_culture.into_iter()
        .filter_map(|(culture, mut entries)| {
            let total_surface: f64 = entries.iter().map(|e| e.surface).sum();
            if entries.is_empty() || total_surface < options.significance_threshold {
                return None;
            }
            let total_count = entries.iter().map(|e| e.count).sum();
            entries.sort_by(|a, b| by_value_desc(a.surface, &a.region, b.surface, &b.region));
            Some((culture, CultureRanking { total_surface, total_count, rankings: entries }))
        })
        .collect()
}

/// Distinct region names appearing in `rankings`, sorted.
pub fn ranked_regions(rankings: &Rankings) -> Vec<Arc<str>> {
    let mut regions = rankings.values()
        .flat_map(|culture| culture.rankings.iter().map(|e| e.region.clone()))
        .collect::<Vec<_>>();
    regions.sort();
    regions.dedup();
    regions
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CultureShare {
    pub code: Arc<str>,
    pub surface: f64,
    pub count: u64,
}

/// A region's totals and its leading cultures.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionSummary {
    pub region: Arc<str>,
    pub total_surface: f64,
    pub total_count: u64,
    pub top_cultures: Vec<CultureShare>,
}

/// Per region, totals and the `top_n` cultures by surface. Regions are
/// sorted by total surface.
pub fn regional_top_cultures(acc: &Accumulator, top_n: usize) -> Vec<RegionSummary> {
    let mut by_region: AHashMap<Arc<str>, (Stats, Vec<CultureShare>)> = AHashMap::new();
    for (key, stats) in acc.get(AggregationMode::CultureRegion).iter() {
        let (total, cultures) = by_region.entry(key[1].clone()).or_default();
        total.merge(stats);
        cultures.push(CultureShare { code: key[0].clone(), surface: stats.surface, count: stats.count });
    }

    let mut regions = by_region.into_iter()
        .map(|(region, (total, mut cultures))| {
            cultures.sort_by(|a, b| by_value_desc(a.surface, &a.code, b.surface, &b.code));
            cultures.truncate(top_n);
            RegionSummary { region, total_surface: total.surface, total_count: total.count, top_cultures: cultures }
        })
        .collect::<Vec<_>>();
    regions.sort_by(|a, b| by_value_desc(a.total_surface, &a.region, b.total_surface, &b.region));
    regions
}
