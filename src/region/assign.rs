use crate::error::{ParcelError, ParcelResult};
use crate::geom::Reprojector;
use crate::record::ParcelRecord;
use crate::region::{DepartmentTable, RegionMatch, RegionSet};

/// Strategy assigning a record to a region.
///
/// `Centroid` is the canonical one; the department strategies are fallbacks
/// for stores without usable geometry.
#[derive(Debug)]
pub enum RegionAssigner {
    /// Centroid in the source CRS, reprojected, tested against the polygons.
    Centroid { regions: RegionSet, reprojector: Reprojector },
    /// The record's department attribute.
    Department(DepartmentTable),
    /// Department inferred from the parcel ID prefix.
    IdPrefix(DepartmentTable),
}

impl RegionAssigner {
    pub fn needs_geometry(&self) -> bool {
        matches!(self, Self::Centroid { .. })
    }

    pub fn assign(&self, record: &ParcelRecord) -> ParcelResult<RegionMatch> {
        match self {
            Self::Centroid { regions, reprojector } => {
                let geometry = record.geometry.decode()?;
                let point = geometry.representative_point(reprojector)?;
                Ok(regions.resolve(&point))
            }
            Self::Department(table) => {
                let code = record.department.as_deref()
                    .filter(|code| !code.trim().is_empty())
                    .ok_or(ParcelError::MissingAttribute("department"))?;
                Ok(Self::lookup(table, code))
            }
            Self::IdPrefix(table) => {
                let id = record.id.as_deref()
                    .filter(|id| !id.trim().is_empty())
                    .ok_or(ParcelError::MissingAttribute("id"))?;
                Ok(DepartmentTable::department_from_id(id)
                    .map_or(RegionMatch::Unresolved, |code| Self::lookup(table, &code)))
            }
        }
    }

    fn lookup(table: &DepartmentTable, code: &str) -> RegionMatch {
        table.lookup(code).map_or(RegionMatch::Unresolved, RegionMatch::Region)
    }
}
