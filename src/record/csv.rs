use std::{fs::File, path::Path};

use anyhow::{Context, Result};
use polars::{
    io::SerReader,
    prelude::{CsvReadOptions, DataFrame, DataType},
};
use tracing::debug;

use crate::config::ColumnMap;
use crate::record::{MemorySource, ParcelRecord, RecordGeometry, Surface};

/// Column `name` (case-insensitive) as optional strings, one per row.
fn string_column(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let actual = df.get_column_names().into_iter()
        .find(|c| c.as_str().eq_ignore_ascii_case(name))
        .with_context(|| format!("Column {:?} not found in CSV", name))?
        .clone();
    let column = df.column(actual.as_str())?.cast(&DataType::String)?;
    Ok(column.str()?.into_iter().map(|v| v.map(str::to_string)).collect())
}

fn optional_column(df: &DataFrame, name: Option<&str>) -> Result<Vec<Option<String>>> {
    match name {
        Some(name) => string_column(df, name),
        None => Ok(vec![None; df.height()]),
    }
}

/// Read a CSV export into memory. The geometry column holds hex-encoded
/// GeoPackage blobs.
///
/// Every column is read as text: parcel ids and department codes keep their
/// leading zeros, and all-digit hex is not taken for a number.
pub fn read_csv_records(path: &Path, columns: &ColumnMap) -> Result<MemorySource> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open CSV: {}", path.display()))?;
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .into_reader_with_file_handle(file)
        .finish()
        .with_context(|| format!("Failed to parse CSV: {}", path.display()))?;

    let ids = optional_column(&df, columns.id.as_deref())?;
    let surfaces = string_column(&df, &columns.surface)?;
    let cultures = optional_column(&df, columns.culture.as_deref())?;
    let groups = optional_column(&df, columns.group.as_deref())?;
    let departments = optional_column(&df, columns.department.as_deref())?;
    let geometries = optional_column(&df, columns.geometry.as_deref())?;

    let records = ids.into_iter()
        .zip(surfaces)
        .zip(cultures)
        .zip(groups)
        .zip(departments)
        .zip(geometries)
        .map(|(((((id, surface), culture), group), department), geometry)| ParcelRecord {
            id,
            surface: surface.as_deref().map_or(Surface::Missing, Surface::parse),
            culture,
            group,
            department,
            geometry: match geometry {
                None => RecordGeometry::Missing,
                Some(text) if text.trim().is_empty() => RecordGeometry::Missing,
                // Text that is not hex cannot be a container; the decoder rejects it.
                Some(text) => RecordGeometry::Container(hex::decode(text.trim()).unwrap_or_else(|_| text.into_bytes())),
            },
        })
        .collect::<Vec<_>>();

    debug!(path = %path.display(), records = records.len(), "read CSV records");
    Ok(MemorySource::new(records))
}
