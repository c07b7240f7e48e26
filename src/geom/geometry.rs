use geo::{BoundingRect, Centroid, Coord, LineString, MapCoords, MultiPolygon, Point, Polygon, Rect};
use serde_json::{json, Value};

use crate::error::{ParcelError, ParcelResult};
use crate::geom::Reprojector;

/// Geometry of a single parcel, in whatever CRS it was read or reprojected to.
#[derive(Debug, Clone, PartialEq)]
pub enum ParcelGeometry {
    Point(Point<f64>),
    Polygon(Polygon<f64>),
    MultiPolygon(MultiPolygon<f64>),
}

impl ParcelGeometry {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Point(_) => "Point",
            Self::Polygon(_) => "Polygon",
            Self::MultiPolygon(_) => "MultiPolygon",
        }
    }

    /// Representative point for spatial joins.
    pub fn centroid(&self) -> Option<Point<f64>> {
        match self {
            Self::Point(p) => Some(*p),
            Self::Polygon(p) => p.centroid(),
            Self::MultiPolygon(mp) => mp.centroid(),
        }
    }

    pub fn bounding_rect(&self) -> Option<Rect<f64>> {
        match self {
            Self::Point(p) => Some(p.bounding_rect()),
            Self::Polygon(p) => p.bounding_rect(),
            Self::MultiPolygon(mp) => mp.bounding_rect(),
        }
    }

    /// Centroid of the geometry, reprojected to the target CRS.
    pub fn representative_point(&self, reprojector: &Reprojector) -> ParcelResult<Point<f64>> {
        let centroid = self.centroid()
            .ok_or_else(|| ParcelError::malformed("[geom] empty geometry has no centroid"))?;
        let (lon, lat) = reprojector.reproject(centroid.x(), centroid.y())?;
        Ok(Point::new(lon, lat))
    }

    /// Reproject every vertex.
    pub fn reproject(&self, reprojector: &Reprojector) -> ParcelResult<Self> {
        let transform = |coord: Coord<f64>| {
            reprojector.reproject(coord.x, coord.y).map(|(x, y)| Coord { x, y })
        };
        Ok(match self {
            Self::Point(p) => Self::Point(p.try_map_coords(transform)?),
            Self::Polygon(p) => Self::Polygon(p.try_map_coords(transform)?),
            Self::MultiPolygon(mp) => Self::MultiPolygon(mp.try_map_coords(transform)?),
        })
    }

    /// GeoJSON geometry object.
    pub fn to_geojson(&self) -> Value {
        fn ring(ls: &LineString<f64>) -> Vec<[f64; 2]> {
            ls.coords().map(|c| [c.x, c.y]).collect()
        }

        fn rings(polygon: &Polygon<f64>) -> Vec<Vec<[f64; 2]>> {
            std::iter::once(polygon.exterior())
                .chain(polygon.interiors())
                .map(ring)
                .collect()
        }

        match self {
            Self::Point(p) => json!({ "type": "Point", "coordinates": [p.x(), p.y()] }),
            Self::Polygon(p) => json!({ "type": "Polygon", "coordinates": rings(p) }),
            Self::MultiPolygon(mp) => json!({
                "type": "MultiPolygon",
                "coordinates": mp.0.iter().map(rings).collect::<Vec<_>>(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::polygon;

    #[test]
    fn centroid_of_square() {
        let geom = ParcelGeometry::Polygon(polygon![
            (x: 0.0, y: 0.0), (x: 2.0, y: 0.0), (x: 2.0, y: 2.0), (x: 0.0, y: 2.0), (x: 0.0, y: 0.0)
        ]);
        let c = geom.centroid().unwrap();
        assert!((c.x() - 1.0).abs() < 1e-12 && (c.y() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn empty_multipolygon_has_no_centroid() {
        assert_eq!(ParcelGeometry::MultiPolygon(MultiPolygon(vec![])).centroid(), None);
    }

    #[test]
    fn geojson_keeps_holes() {
        let geom = ParcelGeometry::Polygon(Polygon::new(
            LineString::from(vec![(0.0, 0.0), (4.0, 0.0), (4.0, 4.0), (0.0, 0.0)]),
            vec![LineString::from(vec![(1.0, 1.0), (2.0, 1.0), (2.0, 2.0), (1.0, 1.0)])],
        ));
        let value = geom.to_geojson();
        assert_eq!(value["type"], "Polygon");
        assert_eq!(value["coordinates"].as_array().unwrap().len(), 2);
        assert_eq!(value["coordinates"][1][0], json!([1.0, 1.0]));
    }
}
