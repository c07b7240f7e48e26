use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use geo::{Coord, LineString, MultiPolygon, Point, Polygon};
use shapefile::{dbase::{FieldValue, Record}, Reader, Shape};
use tracing::debug;

use crate::config::ColumnMap;
use crate::geom::ParcelGeometry;
use crate::record::{sample_indices, ParcelRecord, RecordGeometry, RecordSource, Sampling, Surface};

/// Legacy shapefile export; geometries arrive already decoded.
#[derive(Debug, Clone)]
pub struct ShapefileSource {
    path: PathBuf,
    columns: ColumnMap,
}

/// Rings of a shapefile polygon grouped into polygons.
///
/// Exterior rings are clockwise (negative signed area) and are followed by
/// their holes.
fn rings_to_multipolygon(polygon: &shapefile::Polygon) -> MultiPolygon<f64> {
    fn signed_area(coords: &[Coord<f64>]) -> f64 {
        coords.windows(2).map(|w| w[0].x * w[1].y - w[1].x * w[0].y).sum::<f64>() / 2.0
    }

    let mut polygons = Vec::new();
    let mut exterior: Option<LineString<f64>> = None;
    let mut holes = Vec::new();

    for ring in polygon.rings() {
        let mut coords: Vec<Coord<f64>> = ring.points().iter().map(|p| Coord { x: p.x, y: p.y }).collect();
        if let (Some(first), Some(last)) = (coords.first().copied(), coords.last().copied()) {
            if first != last { coords.push(first) }
        }
        let is_exterior = signed_area(&coords) < 0.0;
        let ring = LineString(coords);

        if is_exterior {
            if let Some(ext) = exterior.replace(ring) {
                polygons.push(Polygon::new(ext, std::mem::take(&mut holes)));
            }
        } else {
            holes.push(ring);
        }
    }
    if let Some(ext) = exterior {
        polygons.push(Polygon::new(ext, holes));
    }
    MultiPolygon(polygons)
}

fn shape_to_geometry(shape: Shape) -> RecordGeometry {
    match shape {
        Shape::NullShape => RecordGeometry::Missing,
        Shape::Point(p) => RecordGeometry::Decoded(ParcelGeometry::Point(Point::new(p.x, p.y))),
        Shape::Polygon(p) => RecordGeometry::Decoded(ParcelGeometry::MultiPolygon(rings_to_multipolygon(&p))),
        other => RecordGeometry::Unsupported(other.shapetype() as i32 as u32),
    }
}

/// Field value by name, trying the name as given, then upper and lower case.
fn field<'a>(record: &'a Record, name: &str) -> Option<&'a FieldValue> {
    record.get(name)
        .or_else(|| record.get(&name.to_uppercase()))
        .or_else(|| record.get(&name.to_lowercase()))
}

fn field_text(record: &Record, name: Option<&str>) -> Option<String> {
    match field(record, name?)? {
        FieldValue::Character(value) => value.clone(),
        FieldValue::Numeric(value) => value.map(|v| v.to_string()),
        FieldValue::Float(value) => value.map(|v| v.to_string()),
        FieldValue::Integer(value) => Some(value.to_string()),
        FieldValue::Double(value) => Some(value.to_string()),
        FieldValue::Memo(value) => Some(value.clone()),
        _ => None,
    }
}

fn field_surface(record: &Record, name: &str) -> Surface {
    match field(record, name) {
        None => Surface::Missing,
        Some(FieldValue::Numeric(value)) => value.map_or(Surface::Missing, Surface::from_f64),
        Some(FieldValue::Float(value)) => value.map_or(Surface::Missing, |v| Surface::from_f64(v as f64)),
        Some(FieldValue::Double(value)) => Surface::from_f64(*value),
        Some(FieldValue::Integer(value)) => Surface::from_f64(*value as f64),
        Some(FieldValue::Character(value)) => value.as_deref().map_or(Surface::Missing, Surface::parse),
        Some(other) => Surface::Invalid(format!("{other:?}")),
    }
}

impl ShapefileSource {
    pub fn open(path: &Path, columns: &ColumnMap) -> Result<Self> {
        // Fail early on a missing or unreadable file.
        Reader::from_path(path)
            .with_context(|| format!("Failed to open shapefile: {}", path.display()))?;
        Ok(Self { path: path.to_path_buf(), columns: columns.clone() })
    }

    fn reader(&self) -> Result<Reader<std::io::BufReader<std::fs::File>, std::io::BufReader<std::fs::File>>> {
        Reader::from_path(&self.path)
            .with_context(|| format!("Failed to open shapefile: {}", self.path.display()))
    }

    fn to_record(&self, shape: Shape, record: Record) -> ParcelRecord {
        let columns = &self.columns;
        ParcelRecord {
            id: field_text(&record, columns.id.as_deref()),
            surface: field_surface(&record, &columns.surface),
            culture: field_text(&record, columns.culture.as_deref()),
            group: field_text(&record, columns.group.as_deref()),
            department: field_text(&record, columns.department.as_deref()),
            geometry: shape_to_geometry(shape),
        }
    }
}

impl RecordSource for ShapefileSource {
    fn count(&mut self) -> Result<Option<u64>> {
        Ok(Some(self.reader()?.shape_count()? as u64))
    }

    fn for_each(&mut self, sampling: Sampling, f: &mut dyn FnMut(ParcelRecord)) -> Result<()> {
        let mut reader = self.reader()?;
        let mut picked = match sampling {
            Sampling::Full => None,
            Sampling::Random { size, seed } => {
                let population = reader.shape_count()?;
                debug!(population, size, seed, "sampling shapefile records");
                Some(sample_indices(population, size, seed).into_iter().peekable())
            }
        };

        for (i, item) in reader.iter_shapes_and_records().enumerate() {
            if let Some(picked) = picked.as_mut() {
                match picked.peek() {
                    None => break,
                    Some(&next) if next != i => continue,
                    Some(_) => { picked.next(); }
                }
            }
            let (shape, record) = item.context("Error reading shape+record")?;
            f(self.to_record(shape, record));
        }
        Ok(())
    }
}
