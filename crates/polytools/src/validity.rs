use geo::algorithm::coordinate_position::{CoordPos, CoordinatePosition};
use geo::algorithm::line_intersection::{line_intersection, LineIntersection};
use geo::{Area, BoundingRect, Coord, Intersects, Line, LineString, MultiPolygon, Polygon, Relate};
use rstar::{RTree, RTreeObject};

use crate::bbox::SegmentBox;

/// Open ring vertices with consecutive duplicates and the closing coordinate removed.
pub(crate) fn distinct_vertices(ring: &LineString<f64>) -> Vec<Coord<f64>> {
    let mut vertices: Vec<Coord<f64>> = Vec::with_capacity(ring.0.len());
    for &coord in &ring.0 {
        if vertices.last() != Some(&coord) { vertices.push(coord) }
    }
    if vertices.len() > 1 && vertices.first() == vertices.last() { vertices.pop(); }
    vertices
}

#[inline]
fn is_finite(coord: &Coord<f64>) -> bool { coord.x.is_finite() && coord.y.is_finite() }

/// Returns true iff the closed ring does not touch or cross itself.
///
/// Adjacent segments may only share their common vertex; any contact between
/// non-adjacent segments, or a collinear fold-back between adjacent ones,
/// makes the ring non-simple. Repeated consecutive vertices are ignored.
pub fn is_simple_ring(ring: &LineString<f64>) -> bool {
    let vertices = distinct_vertices(ring);
    let n = vertices.len();
    if n < 3 || !vertices.iter().all(is_finite) { return false }

    let rtree = RTree::bulk_load(
        (0..n).map(|i| SegmentBox::new(i, Line::new(vertices[i], vertices[(i + 1) % n])))
            .collect(),
    );

    for seg in rtree.iter() {
        let i = seg.idx();
        for cand in rtree.locate_in_envelope_intersecting(&seg.envelope()) {
            let j = cand.idx();
            if j <= i { continue }

            let Some(hit) = line_intersection(*seg.line(), *cand.line()) else { continue };
            let adjacent = j == i + 1 || (i == 0 && j == n - 1);
            match hit {
                LineIntersection::Collinear { .. } => return false,
                LineIntersection::SinglePoint { .. } if !adjacent => return false,
                LineIntersection::SinglePoint { .. } => {}
            }
        }
    }

    true
}

/// Check a single ring's basic structure, returning a description of the first defect.
fn ring_defect(ring: &LineString<f64>, kind: &str) -> Option<String> {
    if ring.0.len() < 4 {
        return Some(format!("{kind} ring has {} coordinates (minimum 4)", ring.0.len()));
    }
    if ring.0.first() != ring.0.last() {
        return Some(format!("{kind} ring is not closed"));
    }
    if !ring.0.iter().all(is_finite) {
        return Some(format!("{kind} ring has non-finite coordinates"));
    }
    if !is_simple_ring(ring) {
        return Some(format!("{kind} ring self-intersects"));
    }
    None
}

fn polygon_defect(polygon: &Polygon<f64>) -> Option<String> {
    if let Some(defect) = ring_defect(polygon.exterior(), "exterior") { return Some(defect) }

    let shell = Polygon::new(polygon.exterior().clone(), vec![]);
    if shell.unsigned_area() == 0.0 { return Some("polygon has zero area".to_string()) }

    for hole in polygon.interiors() {
        if let Some(defect) = ring_defect(hole, "interior") { return Some(defect) }
        if hole.0.iter().any(|c| shell.coordinate_position(c) == CoordPos::Outside) {
            return Some("interior ring lies outside its shell".to_string());
        }
    }
    None
}

/// Describe why a multipolygon is invalid, or `None` if it is valid.
///
/// An empty multipolygon is valid.
pub fn invalid_reason(mp: &MultiPolygon<f64>) -> Option<String> {
    for (i, polygon) in mp.0.iter().enumerate() {
        if let Some(defect) = polygon_defect(polygon) {
            return Some(format!("polygon {i}: {defect}"));
        }
    }

    let rects = mp.0.iter().map(|p| p.bounding_rect()).collect::<Vec<_>>();
    for i in 0..mp.0.len() {
        for j in i + 1..mp.0.len() {
            let (Some(a), Some(b)) = (rects[i], rects[j]) else { continue };
            if !a.intersects(&b) { continue }

            // Interior/Interior of dimension 2 means the members overlap in area.
            let im = mp.0[i].relate(&mp.0[j]);
            if im.matches("2********").unwrap_or(true) {
                return Some(format!("polygons {i} and {j} overlap"));
            }
        }
    }
    None
}

/// Returns true iff every member polygon is well-formed and no two overlap.
#[inline]
pub fn is_valid(mp: &MultiPolygon<f64>) -> bool { invalid_reason(mp).is_none() }
