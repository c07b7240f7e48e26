mod bbox;
mod geometry;
mod gpkg;
mod proj;
mod wkb;

pub(crate) use bbox::RegionEnvelope;
pub use geometry::ParcelGeometry;
pub use gpkg::{decode_container, payload_offset, EnvelopeKind, GpkgHeader, HEADER_SIZE, MAGIC};
pub use proj::{Reprojector, LAMBERT_93, WGS_84};
