use std::sync::Arc;

use serde::Serialize;

use crate::aggregate::{Accumulator, AggregationMode, StatMap};
use crate::rollup::by_value_desc;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRow {
    pub code: Arc<str>,
    pub surface: f64,
    pub count: u64,
    pub avg_size: f64,
}

/// Flat per-culture and per-group totals, each sorted by surface.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub culture: Vec<SummaryRow>,
    pub group: Vec<SummaryRow>,
}

/// Cultures with the largest and smallest average parcel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SizeExtremes {
    pub largest: Vec<SummaryRow>,
    /// Only codes with at least `min_count` parcels.
    pub smallest: Vec<SummaryRow>,
}

fn rows(map: &StatMap) -> Vec<SummaryRow> {
    let mut rows = map.iter()
        .map(|(key, stats)| SummaryRow {
            code: key[0].clone(),
            surface: stats.surface,
            count: stats.count,
            avg_size: stats.avg_size(),
        })
        .collect::<Vec<_>>();
    rows.sort_by(|a, b| by_value_desc(a.surface, &a.code, b.surface, &b.code));
    rows
}

pub fn summary(acc: &Accumulator) -> Summary {
    Summary {
        culture: rows(acc.get(AggregationMode::Culture)),
        group: rows(acc.get(AggregationMode::Group)),
    }
}

pub fn size_extremes(rows: &[SummaryRow], limit: usize, min_count: u64) -> SizeExtremes {
    let mut largest = rows.to_vec();
    largest.sort_by(|a, b| by_value_desc(a.avg_size, &a.code, b.avg_size, &b.code));
    largest.truncate(limit);

    let mut smallest = rows.iter()
        .filter(|row| row.count >= min_count)
        .cloned()
        .collect::<Vec<_>>();
    smallest.sort_by(|a, b| a.avg_size.total_cmp(&b.avg_size).then_with(|| a.code.cmp(&b.code)));
    smallest.truncate(limit);

    SizeExtremes { largest, smallest }
}
