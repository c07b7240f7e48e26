use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use flate2::read::GzDecoder;
use geo::{Coord, LineString, MultiPolygon, Polygon};
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::geom::ParcelGeometry;
use crate::io::{is_stdout, round_floats, PendingWrite};
use crate::region::{Region, RegionSet};

/// Load region boundaries from a GeoJSON FeatureCollection, gunzipping
/// `.gz` files. Features keep their file order, which is the resolver's
/// tie-break order.
pub fn read_regions(path: &Path, name_property: &str) -> Result<RegionSet> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open regions file: {}", path.display()))?;
    let mut bytes = Vec::new();
    let read = if path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("gz")) {
        GzDecoder::new(BufReader::new(file)).read_to_end(&mut bytes)
    } else {
        BufReader::new(file).read_to_end(&mut bytes)
    };
    read.with_context(|| format!("Failed to read regions file: {}", path.display()))?;

    let regions = regions_from_geojson(&bytes, name_property)
        .with_context(|| format!("Invalid regions file: {}", path.display()))?;
    info!(path = %path.display(), regions = regions.len(), "loaded region boundaries");
    Ok(regions)
}

/// Parse Polygon and MultiPolygon features; other geometry types are skipped.
pub fn regions_from_geojson(bytes: &[u8], name_property: &str) -> Result<RegionSet> {
    let value: Value = serde_json::from_slice(bytes).context("Failed to parse GeoJSON bytes")?;
    let features = value["features"].as_array()
        .ok_or_else(|| anyhow!("Expected a GeoJSON FeatureCollection"))?;

    let mut regions = Vec::with_capacity(features.len());
    for (i, feature) in features.iter().enumerate() {
        let name = match &feature["properties"][name_property] {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            _ => bail!("Feature {} has no {:?} property", i, name_property),
        };
        let geometry = &feature["geometry"];
        let coords = geometry["coordinates"].as_array();
        let boundary = match (geometry["type"].as_str(), coords) {
            (Some("Polygon"), Some(rings)) => MultiPolygon(vec![parse_polygon(rings)?]),
            (Some("MultiPolygon"), Some(polygons)) => MultiPolygon(
                polygons.iter()
                    .map(|p| p.as_array().ok_or_else(|| anyhow!("Invalid MultiPolygon member")).and_then(|r| parse_polygon(r)))
                    .collect::<Result<Vec<_>>>()
                    .with_context(|| format!("Feature {} ({})", i, name))?,
            ),
            (other, _) => {
                warn!(feature = i, name = %name, geometry = ?other, "skipping non-polygonal region feature");
                continue;
            }
        };
        regions.push(Region::new(name, boundary));
    }
    RegionSet::new(regions)
}

/// `[exterior, hole, ...]` rings to a polygon.
fn parse_polygon(rings: &[Value]) -> Result<Polygon<f64>> {
    let mut rings = rings.iter().map(|ring| {
        ring.as_array()
            .ok_or_else(|| anyhow!("Invalid polygon: ring must be an array"))
            .and_then(|coords| parse_ring(coords))
    });
    let exterior = rings.next().ok_or_else(|| anyhow!("Invalid polygon: missing exterior ring"))??;
    let interiors = rings.collect::<Result<Vec<_>>>()?;
    Ok(Polygon::new(exterior, interiors))
}

/// `[[x, y], ...]` to a closed ring.
fn parse_ring(coords: &[Value]) -> Result<LineString<f64>> {
    let mut points = coords.iter()
        .map(|pair| match pair.as_array().map(Vec::as_slice) {
            Some([x, y, ..]) => match (x.as_f64(), y.as_f64()) {
                (Some(x), Some(y)) => Ok(Coord { x, y }),
                _ => Err(anyhow!("Invalid coordinate: x and y must be numbers")),
            },
            _ => Err(anyhow!("Invalid coordinate: expected [x, y]")),
        })
        .collect::<Result<Vec<_>>>()?;

    if let (Some(&first), Some(&last)) = (points.first(), points.last()) {
        if first != last { points.push(first) }
    }
    Ok(LineString(points))
}

/// A GeoJSON Feature wrapping `geometry`.
pub fn feature(geometry: &ParcelGeometry, properties: Value) -> Value {
    json!({
        "type": "Feature",
        "geometry": geometry.to_geojson(),
        "properties": properties,
    })
}

pub fn feature_collection(features: Vec<Value>) -> Value {
    json!({
        "type": "FeatureCollection",
        "features": features,
    })
}

/// Write a compact FeatureCollection to `path` (`-` for stdout).
pub fn write_geojson(path: &Path, features: Vec<Value>, precision: Option<u32>) -> Result<()> {
    let mut collection = feature_collection(features);
    if let Some(places) = precision {
        round_floats(&mut collection, places);
    }
    if is_stdout(path) {
        serde_json::to_writer(std::io::stdout().lock(), &collection)?;
        return Ok(());
    }
    let mut pending = PendingWrite::open(path)?;
    serde_json::to_writer(&mut pending, &collection)
        .with_context(|| format!("Failed to write GeoJSON: {}", path.display()))?;
    pending.finalize()
}
