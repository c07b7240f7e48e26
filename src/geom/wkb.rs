//! WKB reading operations.

use std::io::{Cursor, Read};

use geo::{Coord, LineString, MultiPolygon, Point, Polygon};

use crate::error::{ParcelError, ParcelResult};
use crate::geom::ParcelGeometry;

/// WKB geometry type for Point
pub(crate) const WKB_POINT: u32 = 1;
/// WKB geometry type for Polygon
pub(crate) const WKB_POLYGON: u32 = 3;
/// WKB geometry type for MultiPolygon
pub(crate) const WKB_MULTIPOLYGON: u32 = 6;
/// WKB byte order: big endian
const WKB_BE: u8 = 0;
/// WKB byte order: little endian
const WKB_LE: u8 = 1;

/// Bytes taken by one XY coordinate pair.
const COORD_SIZE: usize = 16;
/// Smallest possible encoding of a ring (its point count).
const MIN_RING_SIZE: usize = 4;
/// Smallest possible encoding of a nested polygon (byte order, type, ring count).
const MIN_POLYGON_SIZE: usize = 9;

struct WkbReader<'a> {
    cursor: Cursor<&'a [u8]>,
}

impl<'a> WkbReader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { cursor: Cursor::new(bytes) }
    }

    /// Bytes left after the cursor.
    fn remaining(&self) -> usize {
        let len = self.cursor.get_ref().len() as u64;
        len.saturating_sub(self.cursor.position()) as usize
    }

    fn read_array<const N: usize>(&mut self, what: &str) -> ParcelResult<[u8; N]> {
        let mut buf = [0u8; N];
        self.cursor.read_exact(&mut buf)
            .map_err(|_| ParcelError::malformed(format!("[geom::wkb] truncated while reading {what}")))?;
        Ok(buf)
    }

    /// Read the byte order marker, returning `true` for little endian.
    fn read_byte_order(&mut self) -> ParcelResult<bool> {
        match self.read_array::<1>("byte order")?[0] {
            WKB_LE => Ok(true),
            WKB_BE => Ok(false),
            other => Err(ParcelError::malformed(format!("[geom::wkb] invalid byte order {other}"))),
        }
    }

    fn read_u32(&mut self, is_le: bool, what: &str) -> ParcelResult<u32> {
        let bytes = self.read_array::<4>(what)?;
        Ok(if is_le { u32::from_le_bytes(bytes) } else { u32::from_be_bytes(bytes) })
    }

    fn read_f64(&mut self, is_le: bool, what: &str) -> ParcelResult<f64> {
        let bytes = self.read_array::<8>(what)?;
        Ok(if is_le { f64::from_le_bytes(bytes) } else { f64::from_be_bytes(bytes) })
    }

    /// Read an element count, rejecting counts the remaining bytes cannot hold.
    fn read_count(&mut self, is_le: bool, item_size: usize, what: &str) -> ParcelResult<usize> {
        let count = self.read_u32(is_le, what)? as usize;
        if count.saturating_mul(item_size) > self.remaining() {
            return Err(ParcelError::malformed(format!(
                "[geom::wkb] declares {count} {what} but only {} bytes remain",
                self.remaining()
            )));
        }
        Ok(count)
    }

    fn read_coord(&mut self, is_le: bool) -> ParcelResult<Coord<f64>> {
        let x = self.read_f64(is_le, "x coordinate")?;
        let y = self.read_f64(is_le, "y coordinate")?;
        Ok(Coord { x, y })
    }

    fn read_ring(&mut self, is_le: bool) -> ParcelResult<LineString<f64>> {
        let len = self.read_count(is_le, COORD_SIZE, "ring points")?;
        let coords = (0..len)
            .map(|_| self.read_coord(is_le))
            .collect::<ParcelResult<Vec<_>>>()?;

        if let (Some(first), Some(last)) = (coords.first(), coords.last()) {
            if first != last {
                return Err(ParcelError::malformed("[geom::wkb] ring is not closed"));
            }
        }
        Ok(LineString::from(coords))
    }

    /// Read rings after the polygon type tag.
    fn read_polygon_body(&mut self, is_le: bool) -> ParcelResult<Polygon<f64>> {
        let num_rings = self.read_count(is_le, MIN_RING_SIZE, "rings")?;
        if num_rings == 0 {
            return Err(ParcelError::malformed("[geom::wkb] polygon must have at least one ring"));
        }

        let exterior = self.read_ring(is_le)?;
        let interiors = (1..num_rings)
            .map(|_| self.read_ring(is_le))
            .collect::<ParcelResult<Vec<_>>>()?;

        Ok(Polygon::new(exterior, interiors))
    }

    fn read_multipolygon_body(&mut self, is_le: bool) -> ParcelResult<MultiPolygon<f64>> {
        let count = self.read_count(is_le, MIN_POLYGON_SIZE, "polygons")?;
        if count == 0 {
            return Err(ParcelError::malformed("[geom::wkb] multipolygon has no members"));
        }

        let mut polygons = Vec::with_capacity(count);
        for _ in 0..count {
            // Every member carries its own byte order.
            let member_le = self.read_byte_order()?;
            let member_type = self.read_u32(member_le, "member geometry type")?;
            if member_type != WKB_POLYGON {
                return Err(ParcelError::malformed(format!(
                    "[geom::wkb] multipolygon member has type {member_type}, expected polygon"
                )));
            }
            polygons.push(self.read_polygon_body(member_le)?);
        }
        Ok(MultiPolygon(polygons))
    }

    fn read_geometry(&mut self) -> ParcelResult<ParcelGeometry> {
        let is_le = self.read_byte_order()?;
        match self.read_u32(is_le, "geometry type")? {
            WKB_POINT => Ok(ParcelGeometry::Point(Point::from(self.read_coord(is_le)?))),
            WKB_POLYGON => Ok(ParcelGeometry::Polygon(self.read_polygon_body(is_le)?)),
            WKB_MULTIPOLYGON => Ok(ParcelGeometry::MultiPolygon(self.read_multipolygon_body(is_le)?)),
            other => Err(ParcelError::UnsupportedGeometry(other)),
        }
    }
}

/// Parse a standard (ISO, 2D) WKB geometry.
pub(crate) fn geometry_from_wkb(bytes: &[u8]) -> ParcelResult<ParcelGeometry> {
    WkbReader::new(bytes).read_geometry()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Encode a polygon as little-endian WKB without the type header.
    fn polygon_body(rings: &[&[(f64, f64)]], out: &mut Vec<u8>) {
        out.extend_from_slice(&(rings.len() as u32).to_le_bytes());
        for ring in rings {
            out.extend_from_slice(&(ring.len() as u32).to_le_bytes());
            for (x, y) in ring.iter() {
                out.extend_from_slice(&x.to_le_bytes());
                out.extend_from_slice(&y.to_le_bytes());
            }
        }
    }

    pub(crate) fn polygon_wkb(rings: &[&[(f64, f64)]]) -> Vec<u8> {
        let mut out = vec![WKB_LE];
        out.extend_from_slice(&WKB_POLYGON.to_le_bytes());
        polygon_body(rings, &mut out);
        out
    }

    pub(crate) fn multipolygon_wkb(polygons: &[&[&[(f64, f64)]]]) -> Vec<u8> {
        let mut out = vec![WKB_LE];
        out.extend_from_slice(&WKB_MULTIPOLYGON.to_le_bytes());
        out.extend_from_slice(&(polygons.len() as u32).to_le_bytes());
        for rings in polygons {
            out.extend_from_slice(&polygon_wkb(rings));
        }
        out
    }

    const SQUARE: &[(f64, f64)] = &[(0.0, 0.0), (4.0, 0.0), (4.0, 4.0), (0.0, 4.0), (0.0, 0.0)];
    const HOLE: &[(f64, f64)] = &[(1.0, 1.0), (2.0, 1.0), (2.0, 2.0), (1.0, 2.0), (1.0, 1.0)];

    #[test]
    fn reads_big_endian_point() {
        let mut wkb = vec![WKB_BE];
        wkb.extend_from_slice(&WKB_POINT.to_be_bytes());
        wkb.extend_from_slice(&1.5f64.to_be_bytes());
        wkb.extend_from_slice(&(-2.0f64).to_be_bytes());

        let geom = geometry_from_wkb(&wkb).unwrap();
        assert_eq!(geom, ParcelGeometry::Point(Point::new(1.5, -2.0)));
    }

    #[test]
    fn reads_polygon_with_hole() {
        let geom = geometry_from_wkb(&polygon_wkb(&[SQUARE, HOLE])).unwrap();
        let ParcelGeometry::Polygon(polygon) = geom else { panic!("expected polygon") };
        assert_eq!(polygon.exterior().0.len(), 5);
        assert_eq!(polygon.interiors().len(), 1);
    }

    #[test]
    fn reads_multipolygon_members() {
        let geom = geometry_from_wkb(&multipolygon_wkb(&[&[SQUARE], &[SQUARE, HOLE]])).unwrap();
        let ParcelGeometry::MultiPolygon(mp) = geom else { panic!("expected multipolygon") };
        assert_eq!(mp.0.len(), 2);
        assert_eq!(mp.0[1].interiors().len(), 1);
    }

    #[test]
    fn unknown_type_is_unsupported() {
        let mut wkb = vec![WKB_LE];
        wkb.extend_from_slice(&2u32.to_le_bytes()); // LineString
        wkb.extend_from_slice(&0u32.to_le_bytes());
        assert_eq!(geometry_from_wkb(&wkb), Err(ParcelError::UnsupportedGeometry(2)));
    }

    #[test]
    fn truncated_polygon_is_malformed() {
        let wkb = polygon_wkb(&[SQUARE]);
        let err = geometry_from_wkb(&wkb[..wkb.len() - 3]).unwrap_err();
        assert!(matches!(err, ParcelError::MalformedGeometry(_)));
    }

    #[test]
    fn oversized_count_is_malformed() {
        let mut wkb = vec![WKB_LE];
        wkb.extend_from_slice(&WKB_POLYGON.to_le_bytes());
        wkb.extend_from_slice(&1u32.to_le_bytes());
        wkb.extend_from_slice(&u32::MAX.to_le_bytes());
        assert!(matches!(geometry_from_wkb(&wkb), Err(ParcelError::MalformedGeometry(_))));
    }

    #[test]
    fn open_ring_is_malformed() {
        let open: &[(f64, f64)] = &[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)];
        assert!(matches!(geometry_from_wkb(&polygon_wkb(&[open])), Err(ParcelError::MalformedGeometry(_))));
    }

    #[test]
    fn empty_multipolygon_is_malformed() {
        assert!(matches!(geometry_from_wkb(&multipolygon_wkb(&[])), Err(ParcelError::MalformedGeometry(_))));
    }

    #[test]
    fn bad_byte_order_is_malformed() {
        let mut wkb = polygon_wkb(&[SQUARE]);
        wkb[0] = 7;
        assert!(matches!(geometry_from_wkb(&wkb), Err(ParcelError::MalformedGeometry(_))));
    }
}
