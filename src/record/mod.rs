mod csv;
mod gpkg;
mod memory;
mod shp;

use std::borrow::Cow;
use std::sync::Arc;

use anyhow::Result;
use rand::{rngs::StdRng, SeedableRng};

use crate::error::{ParcelError, ParcelResult};
use crate::geom::{decode_container, ParcelGeometry};

pub use csv::read_csv_records;
pub use gpkg::GpkgSource;
pub use memory::MemorySource;
pub use shp::ShapefileSource;

/// Surface attribute as read from the store, in hectares.
#[derive(Debug, Clone, PartialEq)]
pub enum Surface {
    Missing,
    Hectares(f64),
    /// Present but unusable: unparseable, negative or non-finite.
    Invalid(String),
}

impl Surface {
    /// Classify a numeric store value.
    pub fn from_f64(value: f64) -> Self {
        if value.is_finite() && value >= 0.0 { Self::Hectares(value) }
        else { Self::Invalid(value.to_string()) }
    }

    /// Classify a textual store value; blank text counts as missing.
    pub fn parse(text: &str) -> Self {
        let text = text.trim();
        if text.is_empty() { return Self::Missing }
        match text.parse::<f64>() {
            Ok(value) => Self::from_f64(value),
            Err(_) => Self::Invalid(text.to_string()),
        }
    }

    /// Surface to accumulate; missing counts as zero. A hand-built negative
    /// or non-finite value is rejected like unparseable text.
    pub fn hectares(&self) -> ParcelResult<f64> {
        match self {
            Self::Missing => Ok(0.0),
            Self::Hectares(value) if value.is_finite() && *value >= 0.0 => Ok(*value),
            Self::Hectares(value) => Err(ParcelError::InvalidAttribute { field: "surface", value: value.to_string() }),
            Self::Invalid(value) => Err(ParcelError::InvalidAttribute { field: "surface", value: value.clone() }),
        }
    }
}

/// Geometry attribute as read from the store.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordGeometry {
    /// GeoPackage container blob, decoded on demand.
    Container(Vec<u8>),
    /// Already decoded by the reader (shapefile).
    Decoded(ParcelGeometry),
    /// A shape type the reader cannot express.
    Unsupported(u32),
    Missing,
}

impl RecordGeometry {
    /// Decode the geometry, borrowing it when the reader already did.
    pub fn decode(&self) -> ParcelResult<Cow<'_, ParcelGeometry>> {
        match self {
            Self::Container(blob) => decode_container(blob).map(Cow::Owned),
            Self::Decoded(geom) => Ok(Cow::Borrowed(geom)),
            Self::Unsupported(code) => Err(ParcelError::UnsupportedGeometry(*code)),
            Self::Missing => Err(ParcelError::MissingAttribute("geometry")),
        }
    }
}

/// One row of the parcel store.
#[derive(Debug, Clone, PartialEq)]
pub struct ParcelRecord {
    pub id: Option<String>,
    pub surface: Surface,
    pub culture: Option<String>,
    pub group: Option<String>,
    pub department: Option<String>,
    pub geometry: RecordGeometry,
}

impl Default for ParcelRecord {
    fn default() -> Self {
        Self {
            id: None,
            surface: Surface::Missing,
            culture: None,
            group: None,
            department: None,
            geometry: RecordGeometry::Missing,
        }
    }
}

/// Trimmed categorical value, or `unknown` when absent or blank.
pub(crate) fn category(value: Option<&str>, unknown: &Arc<str>) -> Arc<str> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Arc::from(v),
        _ => unknown.clone(),
    }
}

/// Which records a source hands out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sampling {
    Full,
    /// At most `size` records drawn uniformly without replacement.
    Random { size: usize, seed: u64 },
}

impl Sampling {
    pub fn new(sample_size: Option<usize>, seed: Option<u64>) -> Self {
        match sample_size {
            None => Self::Full,
            Some(size) => Self::Random { size, seed: seed.unwrap_or_else(rand::random) },
        }
    }
}

/// Sorted positions of a seeded sample of `size` out of `population`.
pub(crate) fn sample_indices(population: usize, size: usize, seed: u64) -> Vec<usize> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut indices = rand::seq::index::sample(&mut rng, population, size.min(population)).into_vec();
    indices.sort_unstable();
    indices
}

/// A store of parcel records.
pub trait RecordSource {
    /// Number of records in the store, when cheap to know.
    fn count(&mut self) -> Result<Option<u64>>;

    /// Hand every selected record to `f`, in store order.
    ///
    /// Errors are resource-level failures (unreadable store); per-record
    /// problems are carried inside the records and handled by the fold.
    fn for_each(&mut self, sampling: Sampling, f: &mut dyn FnMut(ParcelRecord)) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn surface_parsing() {
        assert_eq!(Surface::parse(" 12.5 "), Surface::Hectares(12.5));
        assert_eq!(Surface::parse(""), Surface::Missing);
        assert_eq!(Surface::parse("abc"), Surface::Invalid("abc".into()));
        assert!(matches!(Surface::parse("-1"), Surface::Invalid(_)));
        assert!(matches!(Surface::from_f64(f64::NAN), Surface::Invalid(_)));
    }

    #[test]
    fn missing_surface_counts_as_zero() {
        assert_eq!(Surface::Missing.hectares(), Ok(0.0));
        assert!(Surface::Invalid("x".into()).hectares().is_err());
    }

    #[test]
    fn hand_built_out_of_range_surface_is_invalid() {
        for value in [-3.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                Surface::Hectares(value).hectares(),
                Err(ParcelError::InvalidAttribute { field: "surface", .. })
            ));
        }
        assert_eq!(Surface::Hectares(0.0).hectares(), Ok(0.0));
    }

    #[test]
    fn blank_category_is_unknown() {
        let unknown: Arc<str> = Arc::from("UNKNOWN");
        assert_eq!(&*category(None, &unknown), "UNKNOWN");
        assert_eq!(&*category(Some("  "), &unknown), "UNKNOWN");
        assert_eq!(&*category(Some(" BTH "), &unknown), "BTH");
    }

    #[test]
    fn missing_geometry_is_missing_attribute() {
        assert_eq!(RecordGeometry::Missing.decode(), Err(ParcelError::MissingAttribute("geometry")));
        assert_eq!(RecordGeometry::Unsupported(3).decode(), Err(ParcelError::UnsupportedGeometry(3)));
    }

    #[test]
    fn samples_are_sorted_bounded_and_seeded() {
        let a = sample_indices(100, 10, 7);
        assert_eq!(a.len(), 10);
        assert!(a.windows(2).all(|w| w[0] < w[1]));
        assert!(a.iter().all(|&i| i < 100));
        assert_eq!(a, sample_indices(100, 10, 7));
        assert_eq!(sample_indices(5, 10, 1), vec![0, 1, 2, 3, 4]);
    }
}
