//! Snap rounding of a group of polygons onto one shared lattice.
//!
//! The boolean kernel rounds every crossing it computes to an integer
//! lattice picked per call from the bounds of that call's input, so pieces
//! cut by different calls disagree along their common boundaries by a
//! fraction of a lattice step. A group snap rounded onto a [`Grid`] has no
//! crossings left for the kernel to compute: edges of the group meet only
//! at shared vertices or along shared collinear runs. The grid is a power
//! of two at least four times coarser than any lattice the kernel picks for
//! geometry inside the group, so the kernel reproduces grid points exactly
//! and every later intersection or difference of group members is made of
//! the same vertices and edges.

use geo::{BooleanOps, BoundingRect, Coord, CoordsIter, LineString, MultiPolygon, Polygon, Rect};
use rstar::{RTree, RTreeObject, AABB};

use crate::ops::guarded;
use crate::{repair, PolygonError};

/// Bits of resolution between the half-extent of a group and its grid cell.
const GRID_BITS: i32 = 27;

/// A lattice point, in grid cells.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
struct GridPoint {
    x: i64,
    y: i64,
}

/// One ring edge between two lattice points.
#[derive(Clone, Copy, Debug)]
struct Edge {
    a: GridPoint,
    b: GridPoint,
}

/// An edge in an R-tree, by position in the edge list.
struct EdgeBox {
    idx: usize,
    envelope: AABB<[i64; 2]>,
}

impl RTreeObject for EdgeBox {
    type Envelope = AABB<[i64; 2]>;

    fn envelope(&self) -> Self::Envelope { self.envelope }
}

impl Edge {
    fn envelope(&self) -> AABB<[i64; 2]> {
        AABB::from_corners([self.a.x, self.a.y], [self.b.x, self.b.y])
    }
}

/// Sign of the turn `a` → `b` → `c`.
#[inline]
fn orientation(a: GridPoint, b: GridPoint, c: GridPoint) -> i128 {
    let (abx, aby) = (i128::from(b.x - a.x), i128::from(b.y - a.y));
    let (acx, acy) = (i128::from(c.x - a.x), i128::from(c.y - a.y));
    (abx * acy - aby * acx).signum()
}

/// `n / d` rounded to the nearest integer, halves upward.
#[inline]
fn round_div(n: i128, d: i128) -> i128 {
    let (n, d) = if d < 0 { (-n, -d) } else { (n, d) };
    (2 * n + d).div_euclid(2 * d)
}

/// The lattice point nearest to where `p` and `q` cross, if they cross at a
/// point interior to both.
fn crossing(p: Edge, q: Edge) -> Option<GridPoint> {
    let (d1, d2) = (orientation(p.a, p.b, q.a), orientation(p.a, p.b, q.b));
    let (d3, d4) = (orientation(q.a, q.b, p.a), orientation(q.a, q.b, p.b));
    if d1 * d2 >= 0 || d3 * d4 >= 0 { return None }

    let (rx, ry) = (i128::from(p.b.x - p.a.x), i128::from(p.b.y - p.a.y));
    let (sx, sy) = (i128::from(q.b.x - q.a.x), i128::from(q.b.y - q.a.y));
    let (wx, wy) = (i128::from(q.a.x - p.a.x), i128::from(q.a.y - p.a.y));
    let den = rx * sy - ry * sx;
    let num = wx * sy - wy * sx;

    // Rounded offsets are no larger than the edge itself, so they fit.
    Some(GridPoint {
        x: p.a.x + round_div(rx * num, den) as i64,
        y: p.a.y + round_div(ry * num, den) as i64,
    })
}

/// Whether the segment `a`–`b` meets the closed unit pixel centred on `h`.
fn passes_through(a: GridPoint, b: GridPoint, h: GridPoint) -> bool {
    // Doubled coordinates put the pixel corners on integers.
    let (ax, ay) = (2 * i128::from(a.x), 2 * i128::from(a.y));
    let (bx, by) = (2 * i128::from(b.x), 2 * i128::from(b.y));
    let (lo_x, hi_x) = (2 * i128::from(h.x) - 1, 2 * i128::from(h.x) + 1);
    let (lo_y, hi_y) = (2 * i128::from(h.y) - 1, 2 * i128::from(h.y) + 1);

    if ax.max(bx) < lo_x || ax.min(bx) > hi_x || ay.max(by) < lo_y || ay.min(by) > hi_y {
        return false;
    }

    let side = |x: i128, y: i128| ((bx - ax) * (y - ay) - (by - ay) * (x - ax)).signum();
    let sides = [side(lo_x, lo_y), side(hi_x, lo_y), side(hi_x, hi_y), side(lo_x, hi_y)];
    !(sides.iter().all(|&s| s > 0) || sides.iter().all(|&s| s < 0))
}

/// Position of `h` along the direction `a` → `b`, scaled by the edge length.
#[inline]
fn along(a: GridPoint, b: GridPoint, h: GridPoint) -> i128 {
    i128::from(h.x - a.x) * i128::from(b.x - a.x) + i128::from(h.y - a.y) * i128::from(b.y - a.y)
}

#[inline]
fn push_distinct(out: &mut Vec<GridPoint>, p: GridPoint) {
    if out.last() != Some(&p) { out.push(p) }
}

#[inline]
fn is_finite(mp: &MultiPolygon<f64>) -> bool {
    mp.coords_iter().all(|c| c.x.is_finite() && c.y.is_finite())
}

/// Vertex loops of one multipolygon: per polygon, the shell then its holes.
type Loops = Vec<Vec<Vec<GridPoint>>>;

/// A power-of-two lattice shared by a group of polygons.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Grid {
    cell: f64,
}

impl Grid {
    /// The grid for geometry inside `rect`; `None` for a degenerate or
    /// non-finite rectangle.
    pub fn covering(rect: Rect<f64>) -> Option<Self> {
        let half = rect.width().max(rect.height()) * 0.5;
        if !half.is_finite() || half <= 0.0 { return None }
        let exponent = half.log2().ceil() as i32 - GRID_BITS;
        Some(Self { cell: 2f64.powi(exponent) })
    }

    /// The grid covering every finite member of `group`.
    pub fn for_group<'a, I>(group: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a MultiPolygon<f64>>,
    {
        let rect = group.into_iter()
            .filter(|mp| is_finite(mp))
            .filter_map(|mp| mp.bounding_rect())
            .reduce(|a, b| Rect::new(
                Coord { x: a.min().x.min(b.min().x), y: a.min().y.min(b.min().y) },
                Coord { x: a.max().x.max(b.max().x), y: a.max().y.max(b.max().y) },
            ))?;
        Self::covering(rect)
    }

    /// Side length of one grid cell.
    #[inline] pub fn cell(&self) -> f64 { self.cell }

    #[inline]
    fn point(&self, c: Coord<f64>) -> GridPoint {
        GridPoint { x: (c.x / self.cell).round() as i64, y: (c.y / self.cell).round() as i64 }
    }

    #[inline]
    fn coord(&self, p: GridPoint) -> Coord<f64> {
        Coord { x: p.x as f64 * self.cell, y: p.y as f64 * self.cell }
    }

    /// The grid point nearest to `c`.
    #[inline]
    pub fn snap(&self, c: Coord<f64>) -> Coord<f64> { self.coord(self.point(c)) }

    /// Rounded vertex loops of a ring, without repeats or the closing vertex.
    fn ring_loop(&self, ring: &LineString<f64>) -> Vec<GridPoint> {
        let mut out = Vec::with_capacity(ring.0.len());
        for &c in &ring.0 {
            push_distinct(&mut out, self.point(c));
        }
        if out.len() > 1 && out.first() == out.last() { out.pop(); }
        out
    }

    fn loops(&self, mp: &MultiPolygon<f64>) -> Loops {
        mp.0.iter()
            .map(|polygon| {
                std::iter::once(polygon.exterior())
                    .chain(polygon.interiors())
                    .map(|ring| self.ring_loop(ring))
                    .collect()
            })
            .collect()
    }

    fn to_ring(&self, vertices: &[GridPoint]) -> LineString<f64> {
        let mut coords: Vec<Coord<f64>> = vertices.iter().map(|&p| self.coord(p)).collect();
        coords.push(coords[0]);
        LineString::new(coords)
    }

    /// Snap round a group of multipolygons onto this grid.
    ///
    /// Every vertex moves to its nearest grid point. Hot pixels are the
    /// cells holding a vertex or a crossing of two edges of the group, and
    /// every edge is rerouted through the centre of each hot pixel it meets.
    /// Each member is then rebuilt by the boolean kernel and repaired.
    /// Members with non-finite coordinates are returned unchanged.
    pub fn snap_round(&self, group: &[MultiPolygon<f64>]) -> Vec<Result<MultiPolygon<f64>, PolygonError>> {
        let members: Vec<Option<Loops>> = group.iter()
            .map(|mp| is_finite(mp).then(|| self.loops(mp)))
            .collect();

        let mut edges = Vec::new();
        for ring in members.iter().flatten().flatten().flatten() {
            for (i, &a) in ring.iter().enumerate() {
                let b = ring[(i + 1) % ring.len()];
                if a != b { edges.push(Edge { a, b }) }
            }
        }

        let mut hot: Vec<GridPoint> = edges.iter().map(|e| e.a).collect();
        let tree = RTree::bulk_load(
            edges.iter().enumerate().map(|(idx, e)| EdgeBox { idx, envelope: e.envelope() }).collect(),
        );
        for (i, edge) in edges.iter().enumerate() {
            for other in tree.locate_in_envelope_intersecting(&edge.envelope()) {
                if other.idx <= i { continue }
                if let Some(p) = crossing(*edge, edges[other.idx]) { hot.push(p) }
            }
        }
        hot.sort_unstable();
        hot.dedup();
        tracing::trace!(edges = edges.len(), hot_pixels = hot.len(), "snap rounding");

        let pixels: RTree<[i64; 2]> = RTree::bulk_load(hot.iter().map(|p| [p.x, p.y]).collect());

        group.iter().zip(members)
            .map(|(original, loops)| match loops {
                None => Ok(original.clone()),
                Some(loops) => self.rebuild(&loops, &pixels),
            })
            .collect()
    }

    /// Route a loop's edges through the hot pixels they meet.
    fn reroute(&self, ring: &[GridPoint], pixels: &RTree<[i64; 2]>) -> Vec<GridPoint> {
        let mut out = Vec::with_capacity(ring.len());
        for (i, &a) in ring.iter().enumerate() {
            let b = ring[(i + 1) % ring.len()];
            push_distinct(&mut out, a);
            if a == b { continue }

            let search = AABB::from_corners(
                [a.x.min(b.x) - 1, a.y.min(b.y) - 1],
                [a.x.max(b.x) + 1, a.y.max(b.y) + 1],
            );
            let mut via: Vec<GridPoint> = pixels.locate_in_envelope(&search)
                .map(|&[x, y]| GridPoint { x, y })
                .filter(|&h| h != a && h != b && passes_through(a, b, h))
                .collect();
            via.sort_unstable_by_key(|&h| (along(a, b, h), h));
            for h in via {
                push_distinct(&mut out, h);
            }
        }
        if out.len() > 1 && out.first() == out.last() { out.pop(); }
        out
    }

    fn rebuild(&self, loops: &Loops, pixels: &RTree<[i64; 2]>) -> Result<MultiPolygon<f64>, PolygonError> {
        let mut polygons = Vec::with_capacity(loops.len());
        for polygon in loops {
            let mut rings = polygon.iter()
                .map(|ring| self.reroute(ring, pixels))
                .map(|ring| (ring.len() >= 3).then(|| self.to_ring(&ring)));
            let Some(Some(shell)) = rings.next() else { continue };
            polygons.push(Polygon::new(shell, rings.flatten().collect()));
        }

        let snapped = MultiPolygon::new(polygons);
        let rebuilt = guarded("snap", || snapped.union(&MultiPolygon::new(Vec::new())))?;
        repair(&rebuilt)
    }
}
