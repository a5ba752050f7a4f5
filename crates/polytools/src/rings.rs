//! Splitting of rings that pass through the same vertex more than once.
//!
//! Boolean operations report a hole that touches its shell at one point as a
//! single shell ring pinched at that point. Cutting such rings at the
//! repeated vertex recovers the shell and its holes as separate simple rings.

use std::collections::{HashMap, HashSet};

use geo::algorithm::coordinate_position::{CoordPos, CoordinatePosition};
use geo::{Area, Coord, InteriorPoint, LineString, MultiPolygon, Point, Polygon};

use crate::validity::distinct_vertices;

/// Hash key of a coordinate; `-0.0` and `0.0` share a key.
#[inline]
fn key(c: &Coord<f64>) -> (u64, u64) {
    ((c.x + 0.0).to_bits(), (c.y + 0.0).to_bits())
}

fn has_repeated_vertex(ring: &LineString<f64>) -> bool {
    let vertices = distinct_vertices(ring);
    let mut seen = HashSet::with_capacity(vertices.len());
    !vertices.iter().all(|v| seen.insert(key(v)))
}

/// Cut an open vertex loop at every repeated vertex.
///
/// Loops with fewer than 3 vertices are dropped.
fn cut_loops(vertices: &[Coord<f64>]) -> Vec<Vec<Coord<f64>>> {
    let mut loops = Vec::new();
    let mut path: Vec<Coord<f64>> = Vec::with_capacity(vertices.len());
    let mut seen: HashMap<(u64, u64), usize> = HashMap::with_capacity(vertices.len());

    for &v in vertices {
        match seen.get(&key(&v)) {
            Some(&start) => {
                let cut: Vec<Coord<f64>> = path.drain(start + 1..).collect();
                for c in &cut {
                    seen.remove(&key(c));
                }
                let mut piece = Vec::with_capacity(cut.len() + 1);
                piece.push(v);
                piece.extend(cut);
                loops.push(piece);
            }
            None => {
                seen.insert(key(&v), path.len());
                path.push(v);
            }
        }
    }
    loops.push(path);

    loops.retain(|piece| piece.len() >= 3);
    loops
}

fn closed(mut vertices: Vec<Coord<f64>>) -> LineString<f64> {
    vertices.push(vertices[0]);
    LineString::new(vertices)
}

/// A loop with its area and a point strictly inside it.
struct Loop {
    ring: Polygon<f64>,
    area: f64,
    inner: Point<f64>,
}

impl Loop {
    fn new(vertices: Vec<Coord<f64>>) -> Option<Self> {
        let ring = Polygon::new(closed(vertices), vec![]);
        let area = ring.unsigned_area();
        if area == 0.0 { return None }
        let inner = ring.interior_point()?;
        Some(Self { ring, area, inner })
    }

    /// Whether `other` lies inside this loop. Loops cut from one ring only
    /// share vertices, so a point inside a smaller loop decides.
    fn encloses(&self, other: &Loop) -> bool {
        self.area > other.area && self.ring.coordinate_position(&other.inner.0) == CoordPos::Inside
    }
}

/// Sort the loops of one ring by nesting depth: even depths keep the ring's
/// role, odd depths take the opposite one.
fn sort_loops(ring: &LineString<f64>, same: &mut Vec<Loop>, opposite: &mut Vec<Loop>) {
    let loops: Vec<Loop> = cut_loops(&distinct_vertices(ring)).into_iter().filter_map(Loop::new).collect();
    let depths: Vec<usize> = loops.iter()
        .map(|l| loops.iter().filter(|other| other.encloses(l)).count())
        .collect();

    for (l, depth) in loops.into_iter().zip(depths) {
        if depth % 2 == 0 { same.push(l) } else { opposite.push(l) }
    }
}

fn split_polygon(polygon: &Polygon<f64>) -> Vec<Polygon<f64>> {
    let mut shells = Vec::new();
    let mut holes = Vec::new();
    sort_loops(polygon.exterior(), &mut shells, &mut holes);
    for hole in polygon.interiors() {
        sort_loops(hole, &mut holes, &mut shells);
    }

    let mut interiors: Vec<Vec<LineString<f64>>> = vec![Vec::new(); shells.len()];
    for hole in holes {
        // The smallest enclosing shell owns the hole.
        let owner = shells.iter().enumerate()
            .filter(|(_, shell)| shell.ring.coordinate_position(&hole.inner.0) == CoordPos::Inside)
            .min_by(|(_, a), (_, b)| a.area.total_cmp(&b.area))
            .map(|(i, _)| i);
        match owner {
            Some(i) => interiors[i].push(hole.ring.into_inner().0),
            None => tracing::debug!("dropping hole outside every shell"),
        }
    }

    shells.into_iter().zip(interiors)
        .map(|(shell, holes)| Polygon::new(shell.ring.into_inner().0, holes))
        .collect()
}

/// Split every ring that touches itself at a vertex into simple rings.
///
/// A pinched shell becomes a shell plus the holes (or further shells) it
/// enclosed; a pinched hole becomes several holes. Loops without area are
/// dropped. Polygons with no repeated vertex are returned unchanged.
pub fn split_touching_rings(mp: &MultiPolygon<f64>) -> MultiPolygon<f64> {
    let mut polygons = Vec::with_capacity(mp.0.len());
    for polygon in mp {
        let pinched = has_repeated_vertex(polygon.exterior())
            || polygon.interiors().iter().any(has_repeated_vertex);
        if pinched {
            polygons.extend(split_polygon(polygon));
        } else {
            polygons.push(polygon.clone());
        }
    }
    MultiPolygon::new(polygons)
}
