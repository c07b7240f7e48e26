use geo::Rect;
use rstar::{RTreeObject, AABB};

/// R-tree entry for one region boundary: its envelope in WGS84 degrees and
/// its position in the regions file. Candidates found through the tree are
/// re-sorted by that position so the first region in file order wins.
#[derive(Debug, Clone)]
pub(crate) struct RegionEnvelope {
    order: usize,
    extent: Rect<f64>,
}

impl RegionEnvelope {
    pub(crate) fn new(order: usize, extent: Rect<f64>) -> Self {
        Self { order, extent }
    }

    #[inline] pub(crate) fn order(&self) -> usize { self.order }
}

impl RTreeObject for RegionEnvelope {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        let (min, max) = (self.extent.min(), self.extent.max());
        AABB::from_corners([min.x, min.y], [max.x, max.y])
    }
}
