mod common;

use common::{record, record_at, REGIONS_GEOJSON, CENTRE, PARIS};
use openparcel::{
    io::regions_from_geojson, record::MemorySource, rollup::hierarchy, AggregationMode, Aggregator,
    FoldOptions, ParcelRecord, Pipeline, PipelineConfig, RecordGeometry, RegionAssigner, Reprojector,
    SizeBuckets, SkipReason, Surface,
};

fn group_pipeline() -> Pipeline {
    Pipeline::new(&PipelineConfig::default(), &[AggregationMode::Group, AggregationMode::GroupCulture], None).unwrap()
}

#[test]
fn three_record_hierarchy() {
    let mut source = MemorySource::new(vec![
        record("1", "BTH", 10.0),
        record("1", "MIS", 5.0),
        record("2", "ORH", 20.0),
    ]);
    let acc = group_pipeline().run(&mut source).unwrap();
    let tree = hierarchy(&acc, "RPG");

    let groups = tree.children.iter().map(|g| (&*g.name, g.value)).collect::<Vec<_>>();
    assert_eq!(groups, [("2", 20.0), ("1", 15.0)]);
    let cultures = tree.children[1].children.iter().map(|c| &*c.name).collect::<Vec<_>>();
    assert_eq!(cultures, ["BTH", "MIS"]);
}

#[test]
fn absent_surface_and_culture_count_as_unknown() {
    let mut source = MemorySource::new(vec![ParcelRecord { group: Some("1".into()), ..Default::default() }]);
    let acc = Pipeline::new(&PipelineConfig::default(), &[AggregationMode::Culture], None)
        .unwrap()
        .run(&mut source)
        .unwrap();
    let unknown = acc.get(AggregationMode::Culture).get(&["UNKNOWN"]).unwrap();
    assert_eq!(unknown.count, 1);
    assert_eq!(unknown.surface, 0.0);
}

fn mixed_records() -> Vec<ParcelRecord> {
    let mut records = Vec::new();
    for i in 0..60 {
        let culture = ["BTH", "MIS", "ORH"][i % 3];
        let (x, y) = if i % 2 == 0 { CENTRE } else { PARIS };
        records.push(record_at(culture, 0.5 + i as f64, x + i as f64, y));
    }
    records.push(ParcelRecord { surface: Surface::Invalid("n/a".into()), ..record_at("BTH", 0.0, CENTRE.0, CENTRE.1) });
    records.push(record("1", "BTH", 3.0));
    records.push(ParcelRecord { geometry: RecordGeometry::Container(b"XX\0\0\0\0\0\0".to_vec()), ..record("1", "BTH", 3.0) });
    records
}

fn region_aggregator() -> Aggregator {
    let regions = regions_from_geojson(REGIONS_GEOJSON.as_bytes(), "nom").unwrap();
    Aggregator::new(
        &[AggregationMode::CultureRegion, AggregationMode::RegionSize, AggregationMode::Group],
        SizeBuckets::coarse(),
        Some(RegionAssigner::Centroid { regions, reprojector: Reprojector::lambert93_to_wgs84().unwrap() }),
        FoldOptions::default(),
    ).unwrap()
}

#[test]
fn every_offered_record_is_counted_once() {
    let agg = region_aggregator();
    let acc = agg.fold_all(&mixed_records());
    let report = acc.report();

    assert_eq!(report.offered, 63);
    assert_eq!(report.skipped, 3);
    assert_eq!(report.skipped_by_reason[&SkipReason::InvalidAttribute], 1);
    assert_eq!(report.skipped_by_reason[&SkipReason::MissingAttribute], 1);
    assert_eq!(report.skipped_by_reason[&SkipReason::MalformedGeometry], 1);
    for mode in agg.modes() {
        assert_eq!(acc.get(*mode).total().count + report.skipped, report.offered, "mode {mode}");
    }

    let by_region = acc.get(AggregationMode::CultureRegion);
    assert_eq!(by_region.get(&["BTH", "Sud"]).unwrap().count, 10);
    assert_eq!(by_region.get(&["MIS", "Nord"]).unwrap().count, 10);
}

#[test]
fn partitioned_fold_matches_single_pass() {
    let agg = region_aggregator();
    let records = mixed_records();
    let whole = agg.fold_all(&records);

    let mut merged = agg.accumulator();
    for chunk in records.chunks(7) {
        merged.merge(agg.fold_all(chunk));
    }

    assert_eq!(merged.report(), whole.report());
    for mode in agg.modes() {
        let (a, b) = (merged.get(*mode), whole.get(*mode));
        assert_eq!(a.len(), b.len());
        for (key, stats) in b.iter() {
            let key = key.iter().map(|k| &**k).collect::<Vec<_>>();
            let other = a.get(&key).unwrap();
            assert_eq!(other.count, stats.count);
            assert!((other.surface - stats.surface).abs() < 1e-9);
        }
    }
}

#[test]
fn all_skipped_run_is_flagged() {
    let mut source = MemorySource::new(vec![
        ParcelRecord { surface: Surface::Invalid("-".into()), ..Default::default() },
        ParcelRecord { surface: Surface::Invalid("?".into()), ..Default::default() },
    ]);
    let acc = group_pipeline().run(&mut source).unwrap();
    let report = acc.report();
    assert!(report.all_skipped());
    assert!(report.ensure_usable().is_err());
}
