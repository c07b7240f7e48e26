mod assign;
mod department;

use std::sync::Arc;

use anyhow::{bail, Result};
use geo::{BoundingRect, Contains, MultiPolygon, Point, Polygon};
use rstar::{RTree, AABB};

use crate::geom::RegionEnvelope;

pub use assign::RegionAssigner;
pub use department::DepartmentTable;

/// A named region boundary in geographic coordinates.
#[derive(Debug, Clone)]
pub struct Region {
    name: Arc<str>,
    boundary: MultiPolygon<f64>,
}

impl Region {
    pub fn new(name: impl Into<Arc<str>>, boundary: MultiPolygon<f64>) -> Self {
        Self { name: name.into(), boundary }
    }

    pub fn from_polygon(name: impl Into<Arc<str>>, boundary: Polygon<f64>) -> Self {
        Self::new(name, MultiPolygon(vec![boundary]))
    }

    #[inline] pub fn name(&self) -> &Arc<str> { &self.name }

    #[inline] pub fn boundary(&self) -> &MultiPolygon<f64> { &self.boundary }

    /// Point inside an exterior ring and outside all of that polygon's holes.
    #[inline]
    pub fn contains(&self, point: &Point<f64>) -> bool {
        self.boundary.contains(point)
    }
}

/// Outcome of a point lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegionMatch {
    Region(Arc<str>),
    /// No region contains the point. A legitimate outcome, not an error.
    Unresolved,
}

impl RegionMatch {
    /// Key for aggregation, using `unresolved` for the sentinel.
    pub fn label(&self, unresolved: &Arc<str>) -> Arc<str> {
        match self {
            Self::Region(name) => name.clone(),
            Self::Unresolved => unresolved.clone(),
        }
    }
}

/// The static set of region polygons, loaded once per run.
#[derive(Debug, Clone)]
pub struct RegionSet {
    regions: Vec<Region>,
    rtree: RTree<RegionEnvelope>,
}

impl RegionSet {
    /// Build the set; load order is the tie-break order for overlapping regions.
    pub fn new(regions: Vec<Region>) -> Result<Self> {
        let mut boxes = Vec::with_capacity(regions.len());
        for (i, region) in regions.iter().enumerate() {
            if regions[..i].iter().any(|other| other.name == region.name) {
                bail!("Duplicate region name: {}", region.name);
            }
            // Empty boundaries never contain anything; keep them out of the index.
            if let Some(rect) = region.boundary.bounding_rect() {
                boxes.push(RegionEnvelope::new(i, rect));
            }
        }
        Ok(Self { rtree: RTree::bulk_load(boxes), regions })
    }

    #[inline] pub fn len(&self) -> usize { self.regions.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.regions.is_empty() }

    #[inline] pub fn regions(&self) -> &[Region] { &self.regions }

    pub fn names(&self) -> impl Iterator<Item = &Arc<str>> {
        self.regions.iter().map(Region::name)
    }

    /// First region (in load order) whose boundary contains `point`.
    pub fn resolve(&self, point: &Point<f64>) -> RegionMatch {
        let envelope = AABB::from_point([point.x(), point.y()]);
        let mut candidates = self.rtree.locate_in_envelope_intersecting(&envelope)
            .map(RegionEnvelope::order)
            .collect::<Vec<_>>();
        candidates.sort_unstable();

        candidates.into_iter()
            .map(|i| &self.regions[i])
            .find(|region| region.contains(point))
            .map_or(RegionMatch::Unresolved, |region| RegionMatch::Region(region.name.clone()))
    }
}
