use std::sync::Arc;

use ahash::AHashMap;
use serde::Serialize;
use smallvec::SmallVec;

/// Aggregation key: one or two categorical values.
pub type AggKey = SmallVec<[Arc<str>; 2]>;

/// Running totals of one bucket. Both fields only grow during a pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Stats {
    /// Hectares.
    pub surface: f64,
    pub count: u64,
}

impl Stats {
    #[inline]
    pub fn add(&mut self, surface: f64) {
        self.surface += surface;
        self.count += 1;
    }

    #[inline]
    pub fn merge(&mut self, other: &Stats) {
        self.surface += other.surface;
        self.count += other.count;
    }

    /// Mean surface per parcel, 0 for an empty bucket.
    #[inline]
    pub fn avg_size(&self) -> f64 {
        if self.count == 0 { 0.0 } else { self.surface / self.count as f64 }
    }
}

/// Key -> statistics for a single aggregation mode.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatMap {
    buckets: AHashMap<AggKey, Stats>,
}

impl StatMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, key: AggKey, surface: f64) {
        self.buckets.entry(key).or_default().add(surface);
    }

    /// Add matching buckets and take over the rest.
    pub fn merge(&mut self, other: StatMap) {
        for (key, stats) in other.buckets {
            self.buckets.entry(key).or_default().merge(&stats);
        }
    }

    pub fn get(&self, key: &[&str]) -> Option<&Stats> {
        let key: AggKey = key.iter().map(|&k| Arc::from(k)).collect();
        self.buckets.get(&key)
    }

    #[inline] pub fn len(&self) -> usize { self.buckets.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.buckets.is_empty() }

    pub fn iter(&self) -> impl Iterator<Item = (&AggKey, &Stats)> {
        self.buckets.iter()
    }

    /// Sum over every bucket.
    pub fn total(&self) -> Stats {
        let mut total = Stats::default();
        self.buckets.values().for_each(|s| total.merge(s));
        total
    }

    /// Totals by the first key component.
    pub fn by_first(&self) -> AHashMap<Arc<str>, Stats> {
        let mut totals: AHashMap<Arc<str>, Stats> = AHashMap::new();
        for (key, stats) in &self.buckets {
            totals.entry(key[0].clone()).or_default().merge(stats);
        }
        totals
    }
}
