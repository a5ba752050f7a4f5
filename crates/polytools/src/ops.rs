use std::panic::{self, AssertUnwindSafe};

use geo::{Area, BooleanOps, BoundingRect, CoordsIter, Geometry, Intersects, MultiPolygon, Polygon, Relate};

use crate::{despike, is_valid, split_touching_rings, PolygonError, AREA_TOLERANCE};

/// Run a geometry-engine call, converting a panic inside the kernel into a typed error.
pub(crate) fn guarded<T>(op: &'static str, f: impl FnOnce() -> T) -> Result<T, PolygonError> {
    panic::catch_unwind(AssertUnwindSafe(f)).map_err(|payload| {
        let message = payload.downcast_ref::<&str>().map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "geometry engine panicked".to_string());
        PolygonError::geometry_op(op, message)
    })
}

/// Reject input the boolean kernel cannot represent.
fn check_finite(op: &'static str, mp: &MultiPolygon<f64>) -> Result<(), PolygonError> {
    if mp.coords_iter().all(|c| c.x.is_finite() && c.y.is_finite()) { return Ok(()) }
    Err(PolygonError::geometry_op(op, "illegal argument: non-finite coordinate"))
}

/// Intersection of two multipolygons.
pub fn intersect(a: &MultiPolygon<f64>, b: &MultiPolygon<f64>) -> Result<MultiPolygon<f64>, PolygonError> {
    check_finite("intersect", a)?;
    check_finite("intersect", b)?;
    guarded("intersect", || a.intersection(b))
}

/// The part of `a` not covered by `b`.
pub fn difference(a: &MultiPolygon<f64>, b: &MultiPolygon<f64>) -> Result<MultiPolygon<f64>, PolygonError> {
    check_finite("difference", a)?;
    check_finite("difference", b)?;
    guarded("difference", || a.difference(b))
}

#[inline]
fn is_areal(polygon: &Polygon<f64>) -> bool { !polygon.exterior().0.is_empty() }

fn collect_polygons(geometry: &Geometry<f64>, out: &mut Vec<Polygon<f64>>) {
    match geometry {
        Geometry::Polygon(p) => if is_areal(p) { out.push(p.clone()) },
        Geometry::MultiPolygon(mp) => out.extend(mp.0.iter().filter(|p| is_areal(p)).cloned()),
        Geometry::Rect(r) => out.push(r.to_polygon()),
        Geometry::Triangle(t) => out.push(t.to_polygon()),
        Geometry::GeometryCollection(gc) => gc.iter().for_each(|g| collect_polygons(g, out)),
        _ => {} // points and lines carry no area
    }
}

/// Extract the polygonal members of any geometry into a fresh multipolygon.
///
/// Points and lines are discarded; an empty input yields an empty multipolygon.
pub fn normalize_to_polygons(geometry: &Geometry<f64>) -> MultiPolygon<f64> {
    let mut polygons = Vec::new();
    collect_polygons(geometry, &mut polygons);
    MultiPolygon::new(polygons)
}

/// [`normalize_to_polygons`] for an input that is already a multipolygon.
pub fn retain_polygons(mp: &MultiPolygon<f64>) -> MultiPolygon<f64> {
    MultiPolygon::new(mp.0.iter().filter(|p| is_areal(p)).cloned().collect())
}

/// Split rings pinched at a vertex, then despike, falling back to the split
/// geometry when despiking fails but the split geometry is valid.
pub fn repair(mp: &MultiPolygon<f64>) -> Result<MultiPolygon<f64>, PolygonError> {
    let split = split_touching_rings(mp);
    despike(&split).or_else(|err| if is_valid(&split) { Ok(retain_polygons(&split)) } else { Err(err) })
}

/// Unsigned planar area.
#[inline]
pub fn area(mp: &MultiPolygon<f64>) -> f64 { mp.unsigned_area() }

/// Area divided by the square of the longer bounding-box side.
///
/// Near 1 for compact shapes, near 0 for slivers; 0 for empty input.
pub fn thickness(mp: &MultiPolygon<f64>) -> f64 {
    let Some(rect) = mp.bounding_rect() else { return 0.0 };
    let side = rect.width().max(rect.height());
    if side == 0.0 { return 0.0 }
    area(mp) / (side * side)
}

/// Geometric equality of two multipolygons.
///
/// Exact topological equality is tried first. Otherwise the two are equal
/// if the area of their symmetric difference is below [`AREA_TOLERANCE`].
pub fn equals(a: &MultiPolygon<f64>, b: &MultiPolygon<f64>) -> Result<bool, PolygonError> {
    match (a.0.is_empty(), b.0.is_empty()) {
        (true, true) => return Ok(true),
        (true, false) | (false, true) => return Ok(false),
        (false, false) => {}
    }
    check_finite("equals", a)?;
    check_finite("equals", b)?;
    if a == b { return Ok(true) }

    if (area(a) - area(b)).abs() >= AREA_TOLERANCE { return Ok(false) }

    if let (Some(ra), Some(rb)) = (a.bounding_rect(), b.bounding_rect()) {
        if !ra.intersects(&rb) { return Ok(false) }
    }

    if guarded("equals", || a.relate(b).is_equal_topo())? { return Ok(true) }

    let a_only = difference(a, b)?;
    let b_only = difference(b, a)?;
    Ok(area(&a_only) + area(&b_only) < AREA_TOLERANCE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{line_string, point, polygon, GeometryCollection, Rect};

    fn square(x0: f64, y0: f64, x1: f64, y1: f64) -> MultiPolygon<f64> {
        MultiPolygon::new(vec![Rect::new((x0, y0), (x1, y1)).to_polygon()])
    }

    #[test]
    fn intersect_overlapping_squares() {
        let out = intersect(&square(0.0, 0.0, 1.0, 1.0), &square(0.5, 0.0, 1.5, 1.0)).unwrap();
        assert!((area(&out) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn intersect_disjoint_is_empty() {
        let out = intersect(&square(0.0, 0.0, 1.0, 1.0), &square(2.0, 2.0, 3.0, 3.0)).unwrap();
        assert!(out.0.is_empty());
    }

    #[test]
    fn difference_of_contained_square_leaves_hole() {
        let out = difference(&square(0.0, 0.0, 4.0, 4.0), &square(1.0, 1.0, 2.0, 2.0)).unwrap();
        assert!((area(&out) - 15.0).abs() < 1e-12);
        assert_eq!(out.0.len(), 1);
        assert_eq!(out.0[0].interiors().len(), 1);
    }

    #[test]
    fn non_finite_input_is_a_geometry_error() {
        let bad = square(0.0, 0.0, f64::NAN, 1.0);
        let err = intersect(&bad, &square(0.0, 0.0, 1.0, 1.0)).unwrap_err();
        assert!(matches!(err, PolygonError::GeometryOp { op: "intersect", .. }));
    }

    #[test]
    fn normalize_keeps_only_areal_members() {
        let collection = Geometry::GeometryCollection(GeometryCollection::new_from(vec![
            Geometry::Point(point!(x: 5.0, y: 5.0)),
            Geometry::LineString(line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 1.0)]),
            Geometry::Polygon(polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0)]),
            Geometry::MultiPolygon(square(2.0, 2.0, 3.0, 3.0)),
        ]));
        let out = normalize_to_polygons(&collection);
        assert_eq!(out.0.len(), 2);
    }

    #[test]
    fn normalize_empty_is_empty() {
        let empty = Geometry::GeometryCollection(GeometryCollection::<f64>::new_from(vec![]));
        assert!(normalize_to_polygons(&empty).0.is_empty());
    }

    #[test]
    fn equals_ignores_start_vertex_and_extra_collinear_vertices() {
        let a = square(0.0, 0.0, 1.0, 1.0);
        let b = MultiPolygon::new(vec![polygon![
            (x: 1.0, y: 1.0), (x: 0.0, y: 1.0), (x: 0.0, y: 0.0), (x: 0.5, y: 0.0), (x: 1.0, y: 0.0)
        ]]);
        assert!(equals(&a, &b).unwrap());
        assert!(!equals(&a, &square(0.0, 0.0, 1.0, 2.0)).unwrap());
    }

    #[test]
    fn equals_tolerance_is_absolute() {
        let unit = square(0.0, 0.0, 1.0, 1.0);
        // Same area, shifted by less than the old relative tolerance.
        let shifted = square(0.0, 5e-8, 1.0, 1.0 + 5e-8);
        assert!(!equals(&unit, &shifted).unwrap());
        let taller = square(0.0, 0.0, 1.0, 1.0 + 5e-8);
        assert!(!equals(&unit, &taller).unwrap());

        let nudged = MultiPolygon::new(vec![polygon![
            (x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0), (x: 0.5, y: 1.0 + 1e-15), (x: 0.0, y: 1.0)
        ]]);
        assert!(equals(&unit, &nudged).unwrap());
    }

    #[test]
    fn repair_splits_pinched_shell() {
        let pinched = MultiPolygon::new(vec![polygon![
            (x: 0.0, y: 0.0), (x: 2.0, y: 0.0), (x: 1.0, y: 1.0), (x: 2.0, y: 2.0), (x: 3.0, y: 1.0),
            (x: 2.0, y: 0.0), (x: 4.0, y: 0.0), (x: 4.0, y: 4.0), (x: 0.0, y: 4.0)
        ]]);
        assert!(!is_valid(&pinched));
        let out = repair(&pinched).unwrap();
        assert!(is_valid(&out));
        assert_eq!(out.0.len(), 1);
        assert_eq!(out.0[0].interiors().len(), 1);
        assert!((area(&out) - 14.0).abs() < 1e-12);
    }

    #[test]
    fn equals_rejects_non_finite_input() {
        let bad = square(0.0, 0.0, f64::NAN, 1.0);
        assert!(matches!(equals(&bad, &square(0.0, 0.0, 1.0, 1.0)), Err(PolygonError::GeometryOp { op: "equals", .. })));
    }

    #[test]
    fn thickness_of_square_and_sliver() {
        assert!((thickness(&square(0.0, 0.0, 2.0, 2.0)) - 1.0).abs() < 1e-12);
        assert!(thickness(&square(0.0, 0.0, 100.0, 1.0)) < 0.001);
        assert_eq!(thickness(&MultiPolygon::new(vec![])), 0.0);
    }

    #[test]
    fn repair_falls_back_to_valid_raw_geometry() {
        let a = square(0.0, 0.0, 1.0, 1.0);
        assert_eq!(repair(&a).unwrap(), despike(&a).unwrap());

        let bowtie = MultiPolygon::new(vec![polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 1.0), (x: 1.0, y: 0.0), (x: 0.0, y: 1.0)]]);
        assert!(matches!(repair(&bowtie), Err(PolygonError::Repair(_))));
    }
}
