//! Builders for GeoPackage geometry blobs and parcel records.
#![allow(dead_code)]

use openparcel::{ParcelRecord, RecordGeometry, Surface};

const WKB_POLYGON: u32 = 3;

/// Little-endian WKB polygon.
pub fn wkb_polygon(rings: &[&[(f64, f64)]]) -> Vec<u8> {
    let mut wkb = vec![1u8];
    wkb.extend_from_slice(&WKB_POLYGON.to_le_bytes());
    wkb.extend_from_slice(&(rings.len() as u32).to_le_bytes());
    for ring in rings {
        wkb.extend_from_slice(&(ring.len() as u32).to_le_bytes());
        for &(x, y) in *ring {
            wkb.extend_from_slice(&x.to_le_bytes());
            wkb.extend_from_slice(&y.to_le_bytes());
        }
    }
    wkb
}

/// GeoPackage container (no envelope, srs 2154) around `wkb`.
pub fn container(wkb: &[u8]) -> Vec<u8> {
    let mut blob = vec![b'G', b'P', 0, 0x01];
    blob.extend_from_slice(&2154i32.to_le_bytes());
    blob.extend_from_slice(wkb);
    blob
}

/// Closed square ring of side `size` centred on `(x, y)`.
pub fn square(x: f64, y: f64, size: f64) -> Vec<(f64, f64)> {
    let h = size / 2.0;
    vec![(x - h, y - h), (x + h, y - h), (x + h, y + h), (x - h, y + h), (x - h, y - h)]
}

/// Container holding a 100 m square parcel centred on `(x, y)`.
pub fn parcel_blob(x: f64, y: f64) -> Vec<u8> {
    container(&wkb_polygon(&[&square(x, y, 100.0)]))
}

pub fn record(group: &str, culture: &str, surface: f64) -> ParcelRecord {
    ParcelRecord {
        group: Some(group.into()),
        culture: Some(culture.into()),
        surface: Surface::Hectares(surface),
        ..Default::default()
    }
}

pub fn record_at(culture: &str, surface: f64, x: f64, y: f64) -> ParcelRecord {
    ParcelRecord {
        geometry: RecordGeometry::Container(parcel_blob(x, y)),
        ..record("1", culture, surface)
    }
}

/// Lambert-93 points with known WGS84 positions.
pub const CENTRE: (f64, f64) = (700_000.0, 6_600_000.0); // 3 E, 46.5 N
pub const PARIS: (f64, f64) = (652_000.0, 6_862_000.0); // about 2.35 E, 48.86 N
pub const NORTH_SEA: (f64, f64) = (700_000.0, 7_300_000.0); // about 52.8 N

/// Two WGS84 boxes: "Nord" (47-52 N) and "Sud" (42-47 N), both 0-6 E.
pub const REGIONS_GEOJSON: &str = r#"{
  "type": "FeatureCollection",
  "features": [
    { "type": "Feature", "properties": { "nom": "Nord" },
      "geometry": { "type": "Polygon", "coordinates": [[[0,47],[6,47],[6,52],[0,52],[0,47]]] } },
    { "type": "Feature", "properties": { "nom": "Sud" },
      "geometry": { "type": "MultiPolygon", "coordinates": [[[[0,42],[6,42],[6,47],[0,47],[0,42]]]] } }
  ]
}"#;
