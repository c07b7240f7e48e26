//! GeoPackage binary geometry container.
//!
//! Layout: `"GP"`, version byte, flags byte, 4-byte `srs_id`, an optional
//! envelope of 4, 6 or 8 doubles, then a standard WKB geometry.

use geo::{Coord, Rect};

use crate::error::{ParcelError, ParcelResult};
use crate::geom::{wkb, ParcelGeometry};

/// Magic bytes opening every container.
pub const MAGIC: &[u8; 2] = b"GP";
/// Magic, version, flags and srs_id.
pub const HEADER_SIZE: usize = 8;

/// Flag bit 0: byte order of the header fields (1 = little endian).
const FLAG_LITTLE_ENDIAN: u8 = 0x01;
/// Flag bit 4: the geometry is empty.
const FLAG_EMPTY: u8 = 0x10;

/// Envelope encodings selected by flag bits 1-3.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeKind {
    None,
    Xy,
    Xyz,
    Xym,
    Xyzm,
}

impl EnvelopeKind {
    pub fn from_indicator(indicator: u8) -> ParcelResult<Self> {
        match indicator {
            0 => Ok(Self::None),
            1 => Ok(Self::Xy),
            2 => Ok(Self::Xyz),
            3 => Ok(Self::Xym),
            4 => Ok(Self::Xyzm),
            other => Err(ParcelError::malformed(format!("[geom::gpkg] invalid envelope indicator {other}"))),
        }
    }

    /// Size of the envelope in bytes.
    pub fn size(&self) -> usize {
        match self {
            Self::None => 0,
            Self::Xy => 32,
            Self::Xyz | Self::Xym => 48,
            Self::Xyzm => 64,
        }
    }
}

/// Decoded container header.
#[derive(Debug, Clone, PartialEq)]
pub struct GpkgHeader {
    pub version: u8,
    pub flags: u8,
    pub srs_id: i32,
    pub envelope_kind: EnvelopeKind,
    /// Raw envelope doubles: `minx, maxx, miny, maxy[, minz, maxz][, minm, maxm]`.
    pub envelope: Vec<f64>,
}

impl GpkgHeader {
    /// Parse the header at the start of `blob`.
    pub fn parse(blob: &[u8]) -> ParcelResult<Self> {
        if blob.len() < HEADER_SIZE || &blob[..2] != MAGIC {
            return Err(ParcelError::malformed("[geom::gpkg] missing GP magic"));
        }

        let version = blob[2];
        let flags = blob[3];
        let envelope_kind = EnvelopeKind::from_indicator((flags >> 1) & 0x07)?;
        let is_le = flags & FLAG_LITTLE_ENDIAN != 0;

        let offset = HEADER_SIZE + envelope_kind.size();
        if blob.len() < offset {
            return Err(ParcelError::malformed(format!(
                "[geom::gpkg] blob of {} bytes is shorter than its {offset}-byte header",
                blob.len()
            )));
        }

        let mut srs_bytes = [0u8; 4];
        srs_bytes.copy_from_slice(&blob[4..8]);
        let srs_id = if is_le { i32::from_le_bytes(srs_bytes) } else { i32::from_be_bytes(srs_bytes) };

        let envelope = blob[HEADER_SIZE..offset]
            .chunks_exact(8)
            .map(|chunk| {
                let mut bytes = [0u8; 8];
                bytes.copy_from_slice(chunk);
                if is_le { f64::from_le_bytes(bytes) } else { f64::from_be_bytes(bytes) }
            })
            .collect();

        Ok(Self { version, flags, srs_id, envelope_kind, envelope })
    }

    /// Offset of the WKB payload.
    #[inline]
    pub fn payload_offset(&self) -> usize {
        HEADER_SIZE + self.envelope_kind.size()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.flags & FLAG_EMPTY != 0
    }

    /// The XY part of the envelope, if one is present.
    pub fn envelope_rect(&self) -> Option<Rect<f64>> {
        match self.envelope.as_slice() {
            [minx, maxx, miny, maxy, ..] => Some(Rect::new(
                Coord { x: *minx, y: *miny },
                Coord { x: *maxx, y: *maxy },
            )),
            _ => None,
        }
    }
}

/// Offset of the WKB payload inside a container blob.
pub fn payload_offset(blob: &[u8]) -> ParcelResult<usize> {
    GpkgHeader::parse(blob).map(|header| header.payload_offset())
}

/// Decode the geometry held by a GeoPackage container blob.
pub fn decode_container(blob: &[u8]) -> ParcelResult<ParcelGeometry> {
    let header = GpkgHeader::parse(blob)?;
    wkb::geometry_from_wkb(&blob[header.payload_offset()..])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::wkb::tests::polygon_wkb;

    /// Container with the given envelope indicator and a zero-filled envelope.
    fn container(indicator: u8, payload: &[u8]) -> Vec<u8> {
        let kind = EnvelopeKind::from_indicator(indicator).unwrap();
        let mut blob = vec![b'G', b'P', 0, (indicator << 1) | FLAG_LITTLE_ENDIAN];
        blob.extend_from_slice(&2154i32.to_le_bytes());
        blob.extend(std::iter::repeat_n(0u8, kind.size()));
        blob.extend_from_slice(payload);
        blob
    }

    const SQUARE: &[(f64, f64)] = &[(0.0, 0.0), (2.0, 0.0), (2.0, 2.0), (0.0, 2.0), (0.0, 0.0)];

    #[test]
    fn payload_offsets_follow_envelope_indicator() {
        for (indicator, offset) in [(0u8, 8usize), (1, 40), (2, 56), (3, 56), (4, 72)] {
            assert_eq!(payload_offset(&container(indicator, &[])), Ok(offset), "indicator {indicator}");
        }
    }

    #[test]
    fn reserved_indicators_are_malformed() {
        for indicator in 5u8..=7 {
            let mut blob = vec![b'G', b'P', 0, (indicator << 1) | FLAG_LITTLE_ENDIAN];
            blob.extend_from_slice(&[0u8; 128]);
            assert!(matches!(payload_offset(&blob), Err(ParcelError::MalformedGeometry(_))));
        }
    }

    #[test]
    fn bad_magic_is_malformed_whatever_follows() {
        let mut blob = container(0, &polygon_wkb(&[SQUARE]));
        blob[0] = b'X';
        assert!(matches!(decode_container(&blob), Err(ParcelError::MalformedGeometry(_))));
        assert!(matches!(decode_container(b"G"), Err(ParcelError::MalformedGeometry(_))));
        assert!(matches!(decode_container(&[]), Err(ParcelError::MalformedGeometry(_))));
    }

    #[test]
    fn envelope_longer_than_blob_is_malformed() {
        let blob = container(4, &[]);
        assert!(matches!(decode_container(&blob[..40]), Err(ParcelError::MalformedGeometry(_))));
    }

    #[test]
    fn decodes_polygon_behind_envelope() {
        for indicator in 0u8..=4 {
            let geom = decode_container(&container(indicator, &polygon_wkb(&[SQUARE]))).unwrap();
            assert!(matches!(geom, ParcelGeometry::Polygon(_)), "indicator {indicator}");
        }
    }

    #[test]
    fn header_exposes_srs_and_envelope() {
        let mut blob = vec![b'G', b'P', 0, (1 << 1) | FLAG_LITTLE_ENDIAN];
        blob.extend_from_slice(&2154i32.to_le_bytes());
        for v in [1.0f64, 3.0, 2.0, 4.0] {
            blob.extend_from_slice(&v.to_le_bytes());
        }
        let header = GpkgHeader::parse(&blob).unwrap();
        assert_eq!(header.srs_id, 2154);
        assert_eq!(header.envelope_kind, EnvelopeKind::Xy);
        let rect = header.envelope_rect().unwrap();
        assert_eq!(rect.min(), Coord { x: 1.0, y: 2.0 });
        assert_eq!(rect.max(), Coord { x: 3.0, y: 4.0 });
        assert!(!header.is_empty());
    }

    #[test]
    fn big_endian_srs_id() {
        let mut blob = vec![b'G', b'P', 0, 0];
        blob.extend_from_slice(&4326i32.to_be_bytes());
        assert_eq!(GpkgHeader::parse(&blob).unwrap().srs_id, 4326);
    }
}
