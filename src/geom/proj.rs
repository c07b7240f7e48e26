use anyhow::{anyhow, Context, Result};
use proj4rs::{proj::Proj as Proj4, transform::transform};

use crate::error::{ParcelError, ParcelResult};

/// RGF93 / Lambert-93 (EPSG:2154), the CRS of the cadastral parcel exports.
pub const LAMBERT_93: &str = "+proj=lcc +lat_0=46.5 +lon_0=3 +lat_1=49 +lat_2=44 +x_0=700000 +y_0=6600000 \
    +ellps=GRS80 +towgs84=0,0,0,0,0,0,0 +units=m +no_defs +type=crs";

/// WGS84 lon/lat (EPSG:4326).
pub const WGS_84: &str = "+proj=longlat +datum=WGS84 +no_defs +type=crs";

/// Point transform between two fixed CRSs.
///
/// Built once per run; `reproject` is then a pure O(1) call with no shared
/// mutable state, so one instance can serve every record.
pub struct Reprojector {
    from: Proj4,
    to: Proj4,
    from_geographic: bool,
    to_geographic: bool,
}

impl std::fmt::Debug for Reprojector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reprojector")
            .field("from_geographic", &self.from_geographic)
            .field("to_geographic", &self.to_geographic)
            .finish_non_exhaustive()
    }
}

/// Lon/lat CRSs take and return degrees; proj4rs works in radians for them.
#[inline]
fn is_geographic(proj_string: &str) -> bool {
    proj_string.split_whitespace()
        .any(|token| matches!(token, "+proj=longlat" | "+proj=latlong" | "+proj=lonlat" | "+proj=latlon"))
}

impl Reprojector {
    /// Build a transform between two PROJ.4 definitions.
    pub fn new(source: &str, target: &str) -> Result<Self> {
        let from = Proj4::from_proj_string(source)
            .map_err(|e| anyhow!("{e:?}"))
            .with_context(|| format!("failed to build source PROJ.4: {source}"))?;
        let to = Proj4::from_proj_string(target)
            .map_err(|e| anyhow!("{e:?}"))
            .with_context(|| format!("failed to build target PROJ.4: {target}"))?;

        Ok(Self {
            from,
            to,
            from_geographic: is_geographic(source),
            to_geographic: is_geographic(target),
        })
    }

    /// Lambert-93 metres to WGS84 degrees.
    pub fn lambert93_to_wgs84() -> Result<Self> {
        Self::new(LAMBERT_93, WGS_84)
    }

    /// Map `(x, y)` in the source CRS to `(lon, lat)` (or `(x, y)`) in the target CRS.
    pub fn reproject(&self, x: f64, y: f64) -> ParcelResult<(f64, f64)> {
        let error = |message: String| ParcelError::ReprojectionError { x, y, message };

        if !x.is_finite() || !y.is_finite() {
            return Err(error("non-finite input coordinate".into()));
        }

        let mut point = if self.from_geographic {
            (x.to_radians(), y.to_radians(), 0.0)
        } else {
            (x, y, 0.0)
        };
        transform(&self.from, &self.to, &mut point).map_err(|e| error(format!("{e:?}")))?;

        let (out_x, out_y) = if self.to_geographic {
            (point.0.to_degrees(), point.1.to_degrees())
        } else {
            (point.0, point.1)
        };

        if !out_x.is_finite() || !out_y.is_finite() {
            return Err(error("transform produced a non-finite coordinate".into()));
        }
        if self.to_geographic && out_y.abs() > 90.0 {
            return Err(error(format!("latitude {out_y} out of range")));
        }
        Ok((out_x, out_y))
    }
}
