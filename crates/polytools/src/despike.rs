use geo::{Coord, LineString, MultiPolygon, Polygon};

use crate::{invalid_reason, PolygonError, DESPIKE_TOLERANCE};

/// Distance from `p` to the line through `a` and `b` (or to `a` when they coincide).
#[inline]
fn distance_to_line(p: Coord<f64>, a: Coord<f64>, b: Coord<f64>) -> f64 {
    let (dx, dy) = (b.x - a.x, b.y - a.y);
    let len = dx.hypot(dy);
    if len == 0.0 { return (p.x - a.x).hypot(p.y - a.y) }
    (dx * (p.y - a.y) - dy * (p.x - a.x)).abs() / len
}

/// A vertex is a spike if its neighbours coincide (zero-width excursion) or
/// if it lies within `tolerance` of the line joining them.
#[inline]
fn is_spike(prev: Coord<f64>, v: Coord<f64>, next: Coord<f64>, tolerance: f64) -> bool {
    prev == next || distance_to_line(v, prev, next) < tolerance
}

/// Remove spiked and near-collinear vertices from a closed ring.
///
/// Neighbours wrap around the closing coordinate, so the first and last
/// vertices are tested against each other. Removal repeats until no vertex
/// qualifies. A ring left with fewer than 4 coordinates becomes empty.
pub fn despike_ring(ring: &LineString<f64>, tolerance: f64) -> LineString<f64> {
    let mut vertices = ring.0.clone();
    if vertices.len() > 1 && vertices.first() == vertices.last() { vertices.pop(); }

    let mut changed = true;
    while changed && vertices.len() >= 3 {
        changed = false;
        let mut i = 0;
        while i < vertices.len() && vertices.len() >= 3 {
            let n = vertices.len();
            let prev = vertices[(i + n - 1) % n];
            let next = vertices[(i + 1) % n];
            if is_spike(prev, vertices[i], next, tolerance) {
                vertices.remove(i);
                changed = true;
            } else {
                i += 1;
            }
        }
    }

    if vertices.len() < 3 { return LineString::new(vec![]) }
    vertices.push(vertices[0]);
    LineString::new(vertices)
}

/// Repair a multipolygon by despiking every ring.
///
/// Polygons whose exterior collapses are dropped, as are collapsed holes.
/// Fails with [`PolygonError::Repair`] if the result is still invalid.
pub fn despike(mp: &MultiPolygon<f64>) -> Result<MultiPolygon<f64>, PolygonError> {
    let mut polygons = Vec::with_capacity(mp.0.len());

    for polygon in mp {
        let exterior = despike_ring(polygon.exterior(), DESPIKE_TOLERANCE);
        if exterior.0.is_empty() { continue }

        let interiors = polygon.interiors().iter()
            .map(|hole| despike_ring(hole, DESPIKE_TOLERANCE))
            .filter(|hole| !hole.0.is_empty())
            .collect();

        polygons.push(Polygon::new(exterior, interiors));
    }

    let repaired = MultiPolygon::new(polygons);
    match invalid_reason(&repaired) {
        None => Ok(repaired),
        Some(reason) => {
            tracing::debug!(%reason, "despike left geometry invalid");
            Err(PolygonError::Repair(reason))
        }
    }
}
