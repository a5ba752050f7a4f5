use geo::Line;
use rstar::{RTreeObject, AABB};

/// A ring segment in an R-tree, associated with its position along the ring.
#[derive(Debug, Clone)]
pub(crate) struct SegmentBox {
    idx: usize, // Index of the segment's start vertex in the open ring
    line: Line<f64>,
}

impl SegmentBox {
    pub(crate) fn new(idx: usize, line: Line<f64>) -> Self {
        Self { idx, line }
    }

    /// Get the index of the segment along its ring.
    #[inline] pub(crate) fn idx(&self) -> usize { self.idx }

    /// Get a reference to the segment.
    #[inline] pub(crate) fn line(&self) -> &Line<f64> { &self.line }
}

impl RTreeObject for SegmentBox {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(
            [self.line.start.x.min(self.line.end.x), self.line.start.y.min(self.line.end.y)],
            [self.line.start.x.max(self.line.end.x), self.line.start.y.max(self.line.end.y)],
        )
    }
}
