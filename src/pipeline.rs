use std::{collections::BTreeMap, path::Path, sync::Arc};

use anyhow::{bail, Context, Result};
use serde_json::{json, Value};
use tracing::{debug, info, trace, warn};

use crate::aggregate::{Accumulator, AggregationMode, Aggregator, FoldOptions, FoldReport};
use crate::config::{ColumnMap, PipelineConfig, RegionStrategy};
use crate::error::ParcelResult;
use crate::geom::Reprojector;
use crate::io::{feature, read_regions};
use crate::record::{category, read_csv_records, GpkgSource, ParcelRecord, RecordSource, Sampling, ShapefileSource};
use crate::region::RegionAssigner;

/// Records between two progress log lines.
const PROGRESS_EVERY: u64 = 100_000;

/// Open a record store, choosing the reader from the file extension.
pub fn open_source(path: &Path, columns: &ColumnMap) -> Result<Box<dyn RecordSource>> {
    let ext = path.extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    let source: Box<dyn RecordSource> = match ext.as_str() {
        "gpkg" | "sqlite" | "db" => Box::new(GpkgSource::open(path, columns)?),
        "shp" => Box::new(ShapefileSource::open(path, columns)?),
        "csv" => Box::new(read_csv_records(path, columns)?),
        _ => bail!("Unsupported record store (expected .gpkg, .shp or .csv): {}", path.display()),
    };
    debug!(path = %path.display(), "opened record store");
    Ok(source)
}

/// Region assignment for the configured strategy. The centroid strategy
/// needs a boundaries file.
pub fn build_assigner(config: &PipelineConfig, regions: Option<&Path>) -> Result<RegionAssigner> {
    Ok(match config.region_strategy {
        RegionStrategy::Centroid => {
            let Some(path) = regions else {
                bail!("The centroid region strategy needs a regions GeoJSON file (--regions)");
            };
            RegionAssigner::Centroid {
                regions: read_regions(path, &config.region_name_property)?,
                reprojector: Reprojector::new(&config.source_crs, &config.target_crs)?,
            }
        }
        RegionStrategy::Department => {
            if config.columns.department.is_none() {
                bail!("The department region strategy needs columns.department to be set");
            }
            RegionAssigner::Department(config.department_table())
        }
        RegionStrategy::IdPrefix => {
            if config.columns.id.is_none() {
                bail!("The id_prefix region strategy needs columns.id to be set");
            }
            RegionAssigner::IdPrefix(config.department_table())
        }
    })
}

/// One configured aggregation pass.
#[derive(Debug)]
pub struct Pipeline {
    aggregator: Aggregator,
    sampling: Sampling,
}

impl Pipeline {
    pub fn new(config: &PipelineConfig, modes: &[AggregationMode], assigner: Option<RegionAssigner>) -> Result<Self> {
        config.validate()?;
        let aggregator = Aggregator::new(modes, config.size_buckets.clone(), assigner, FoldOptions::from(config))?;
        Ok(Self { aggregator, sampling: config.sampling() })
    }

    #[inline] pub fn aggregator(&self) -> &Aggregator { &self.aggregator }

    #[inline] pub fn sampling(&self) -> Sampling { self.sampling }

    /// Stream `source` through the fold and report what happened.
    pub fn run(&self, source: &mut dyn RecordSource) -> Result<Accumulator> {
        let total = source.count().context("Failed to count records")?;
        info!(records = ?total, sampling = ?self.sampling, modes = ?self.aggregator.modes(), "starting aggregation");

        let mut acc = self.aggregator.accumulator();
        source.for_each(self.sampling, &mut |record| {
            self.aggregator.fold(&mut acc, &record);
            let offered = acc.tally().offered();
            if offered % PROGRESS_EVERY == 0 {
                debug!(offered, processed = acc.tally().processed(), "progress");
            }
        })?;

        log_report(&acc.report());
        Ok(acc)
    }
}

fn log_report(report: &FoldReport) {
    info!(
        offered = report.offered,
        processed = report.processed,
        skipped = report.skipped,
        by_reason = ?report.skipped_by_reason,
        "aggregation finished"
    );
    if report.all_skipped() {
        warn!(offered = report.offered, "every record was skipped");
    }
}

/// Sampled parcels with every vertex reprojected, as GeoJSON features.
#[derive(Debug, Clone)]
pub struct MapSample {
    pub features: Vec<Value>,
    pub report: FoldReport,
}

fn sample_feature(record: &ParcelRecord, reprojector: &Reprojector, unknown: &Arc<str>) -> ParcelResult<Value> {
    let surface = record.surface.hectares()?;
    let geometry = record.geometry.decode()?.reproject(reprojector)?;
    Ok(feature(&geometry, json!({
        "id": record.id.as_deref().map(str::trim),
        "culture": category(record.culture.as_deref(), unknown).to_string(),
        "surface": surface,
    })))
}

/// Build the map sample: records whose geometry cannot be decoded or
/// reprojected are skipped and tallied.
pub fn sample_features(
    source: &mut dyn RecordSource,
    sampling: Sampling,
    reprojector: &Reprojector,
    config: &PipelineConfig,
) -> Result<MapSample> {
    let unknown: Arc<str> = Arc::from(config.unknown_label.as_str());
    let mut features = Vec::new();
    let mut report = FoldReport { offered: 0, processed: 0, skipped: 0, skipped_by_reason: BTreeMap::new() };

    source.for_each(sampling, &mut |record| {
        report.offered += 1;
        match sample_feature(&record, reprojector, &unknown) {
            Ok(feature) => {
                report.processed += 1;
                features.push(feature);
            }
            Err(e) => {
                trace!(id = record.id.as_deref().unwrap_or(""), error = %e, "skipping sample record");
                report.skipped += 1;
                *report.skipped_by_reason.entry(e.reason()).or_default() += 1;
            }
        }
    })?;

    log_report(&report);
    Ok(MapSample { features, report })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::{ParcelGeometry, WGS_84};
    use crate::record::{MemorySource, RecordGeometry, Surface};
    use geo::Point;

    #[test]
    fn runs_over_a_memory_source() {
        let config = PipelineConfig::default();
        let pipeline = Pipeline::new(&config, &[AggregationMode::Group], None).unwrap();
        let mut source = MemorySource::new(vec![
            ParcelRecord { group: Some("1".into()), surface: Surface::Hectares(2.0), ..Default::default() },
            ParcelRecord { surface: Surface::Invalid("x".into()), ..Default::default() },
        ]);
        let acc = pipeline.run(&mut source).unwrap();
        assert_eq!(acc.get(AggregationMode::Group).get(&["1"]).unwrap().surface, 2.0);
        assert_eq!(acc.report().skipped, 1);
    }

    #[test]
    fn strategies_check_their_inputs() {
        let config = PipelineConfig::default();
        assert!(build_assigner(&config, None).is_err());

        let config = PipelineConfig { region_strategy: RegionStrategy::Department, ..Default::default() };
        assert!(build_assigner(&config, None).is_err());

        let config = PipelineConfig { region_strategy: RegionStrategy::IdPrefix, ..Default::default() };
        assert!(matches!(build_assigner(&config, None), Ok(RegionAssigner::IdPrefix(_))));
    }

    #[test]
    fn unknown_extension_is_rejected() {
        assert!(open_source(Path::new("parcels.parquet"), &ColumnMap::default()).is_err());
    }

    #[test]
    fn map_sample_reprojects_and_skips() {
        let reprojector = Reprojector::new(WGS_84, WGS_84).unwrap();
        let mut source = MemorySource::new(vec![
            ParcelRecord {
                id: Some("A1".into()),
                surface: Surface::Hectares(1.5),
                geometry: RecordGeometry::Decoded(ParcelGeometry::Point(Point::new(2.0, 48.0))),
                ..Default::default()
            },
            ParcelRecord::default(),
        ]);
        let sample = sample_features(&mut source, Sampling::Full, &reprojector, &PipelineConfig::default()).unwrap();
        assert_eq!(sample.features.len(), 1);
        assert_eq!(sample.features[0]["properties"]["culture"], "UNKNOWN");
        assert_eq!(sample.features[0]["properties"]["id"], "A1");
        assert_eq!(sample.report.skipped, 1);
    }
}
