//! Fixing up footprints that wrap the 0/360 meridian.

use geo::{Coord, LineString, MultiPolygon, Polygon, Rect, Translate};
use polytools::GroundMap;
use tracing::debug;

use super::FootprintError;

/// How close to ±90° a latitude must be to count as a pole.
pub(super) const POLE_TOLERANCE: f64 = 1e-9;

/// Latitude of the pole visible in the image, if any.
pub(super) fn find_pole(ground_map: &mut dyn GroundMap) -> Result<Option<f64>, FootprintError> {
    let north = ground_map.try_set_ground(90.0, 0.0);
    let south = ground_map.try_set_ground(-90.0, 0.0);
    match (north, south) {
        (true, true) => Err(FootprintError::BothPoles),
        (true, false) => Ok(Some(90.0)),
        (false, true) => Ok(Some(-90.0)),
        (false, false) => Ok(None),
    }
}

/// Close a ring that circles a pole by routing it along the meridian and
/// the pole's latitude.
///
/// `crossings` holds the indices of ring points followed by a 0/360 jump.
/// The one closest to the pole gets four points spliced in after it:
/// down the meridian edge to the pole, across, and back on the other edge.
pub(super) fn insert_pole(
    coords: &[Coord<f64>],
    crossings: &[usize],
    pole_lat: f64,
) -> Result<Vec<Coord<f64>>, FootprintError> {
    let nearest = crossings.iter().copied().filter(|&i| i + 1 < coords.len()).min_by(|&a, &b| {
        (pole_lat - coords[a].y).abs().total_cmp(&(pole_lat - coords[b].y).abs())
    });
    let Some(at) = nearest else {
        return Err(FootprintError::Degenerate(
            "image contains a pole but its boundary never crosses the meridian".to_string(),
        ));
    };

    let (c, next) = (coords[at], coords[at + 1]);
    let (edge, far_edge, next_x) = if c.x > next.x {
        (360.0, 0.0, next.x + 360.0)
    } else {
        (0.0, 360.0, next.x - 360.0)
    };
    let t = if next_x == c.x { 0.0 } else { (edge - c.x) / (next_x - c.x) };
    let lat = c.y + t * (next.y - c.y);
    debug!(at, meridian_lat = lat, "inserting pole wedge");

    let wedge = [
        Coord { x: edge, y: lat },
        Coord { x: edge, y: pole_lat },
        Coord { x: far_edge, y: pole_lat },
        Coord { x: far_edge, y: lat },
    ];

    let mut out = Vec::with_capacity(coords.len() + wedge.len());
    out.extend_from_slice(&coords[..=at]);
    out.extend_from_slice(&wedge);
    out.extend_from_slice(&coords[at + 1..]);
    Ok(out)
}

/// Split a ring whose longitudes jump across 0/360 into pieces that each
/// lie within [0, 360].
///
/// The ring is first made continuous by offsetting every stretch past a jump
/// by ±360°. The continuous ring is then clipped against the three 360°-wide
/// bands it can touch and each out-of-range piece is shifted back.
pub(super) fn split_at_meridian(coords: Vec<Coord<f64>>) -> Result<MultiPolygon<f64>, FootprintError> {
    let mut unwrapped = Vec::with_capacity(coords.len());
    let mut offset = 0.0;
    let mut shifted = false;
    for (i, &c) in coords.iter().enumerate() {
        if i > 0 {
            let prev = coords[i - 1];
            let at_pole = (prev.y.abs() - 90.0).abs() < POLE_TOLERANCE;
            if (c.x - prev.x).abs() >= 180.0 && !at_pole {
                offset = if offset != 0.0 { 0.0 } else if c.x > prev.x { -360.0 } else { 360.0 };
                shifted = true;
            }
        }
        unwrapped.push(Coord { x: c.x + offset, y: c.y });
    }

    if !shifted {
        return Ok(MultiPolygon::new(vec![Polygon::new(LineString::new(coords), vec![])]));
    }

    let ring = MultiPolygon::new(vec![Polygon::new(LineString::new(unwrapped), vec![])]);
    let mut pieces = Vec::new();
    for (lo, shift) in [(-360.0, 360.0), (0.0, 0.0), (360.0, -360.0)] {
        let band = MultiPolygon::new(vec![Rect::new((lo, -90.0), (lo + 360.0, 90.0)).to_polygon()]);
        let piece = polytools::intersect(&ring, &band)?;
        pieces.extend(piece.0.into_iter().map(|p| p.translate(shift, 0.0)));
    }
    debug!(pieces = pieces.len(), "split footprint at the meridian");
    Ok(MultiPolygon::new(pieces))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use geo::{Area, BoundingRect};

    fn coords(points: &[(f64, f64)]) -> Vec<Coord<f64>> {
        points.iter().map(|&(x, y)| Coord { x, y }).collect()
    }

    #[test]
    fn split_straddling_square() {
        let ring = coords(&[(359.0, 1.0), (1.0, 1.0), (1.0, -1.0), (359.0, -1.0), (359.0, 1.0)]);
        let out = split_at_meridian(ring).unwrap();
        assert_eq!(out.0.len(), 2);
        assert_relative_eq!(out.unsigned_area(), 4.0, epsilon = 1e-9);
        let rect = out.bounding_rect().unwrap();
        assert_relative_eq!(rect.min().x, 0.0, epsilon = 1e-9);
        assert_relative_eq!(rect.max().x, 360.0, epsilon = 1e-9);
    }

    #[test]
    fn ring_without_jumps_is_left_alone() {
        let ring = coords(&[(10.0, 0.0), (20.0, 0.0), (20.0, 10.0), (10.0, 0.0)]);
        let out = split_at_meridian(ring.clone()).unwrap();
        assert_eq!(out.0.len(), 1);
        assert_eq!(out.0[0].exterior().0, ring);
    }

    #[test]
    fn pole_wedge_follows_the_meridian() {
        // Counter-clockwise around the north pole at latitude 80.
        let ring = coords(&[(0.0, 80.0), (90.0, 80.0), (180.0, 80.0), (270.0, 80.0), (350.0, 80.0), (0.0, 80.0)]);
        let out = insert_pole(&ring, &[4], 90.0).unwrap();
        assert_eq!(out.len(), ring.len() + 4);
        assert_eq!(out[5], Coord { x: 360.0, y: 80.0 });
        assert_eq!(out[6], Coord { x: 360.0, y: 90.0 });
        assert_eq!(out[7], Coord { x: 0.0, y: 90.0 });
        assert_eq!(out[8], Coord { x: 0.0, y: 80.0 });
    }

    #[test]
    fn wedge_latitude_is_interpolated() {
        let ring = coords(&[(350.0, 70.0), (10.0, 80.0)]);
        let out = insert_pole(&ring, &[0], 90.0).unwrap();
        assert_relative_eq!(out[1].y, 75.0, epsilon = 1e-12);
    }

    #[test]
    fn pole_without_crossing_is_degenerate() {
        let ring = coords(&[(10.0, 80.0), (20.0, 80.0), (15.0, 85.0), (10.0, 80.0)]);
        assert!(matches!(insert_pole(&ring, &[], 90.0), Err(FootprintError::Degenerate(_))));
    }
}
