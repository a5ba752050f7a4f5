//! Left-hand-rule walk around the border of an image's valid pixels.
//!
//! From the current point, the search direction starts at the previously
//! rejected neighbour and rotates clockwise (in sample/line space, lines
//! increasing downwards) until a valid neighbour is found. A dead end backs up
//! one point; a repeated step cuts the loop it closed.

use ahash::AHashSet;
use geo::{Coord, LineString};
use polytools::{is_simple_ring, GroundMap};
use tracing::{debug, trace};

use super::{FootprintError, FootprintOptions, SubArea};

/// Rotations tried around one point before giving up on it.
const MAX_SWEEP: usize = 7;

/// Walk steps allowed per pixel of image perimeter.
const STEPS_PER_EDGE_PIXEL: usize = 16;

/// Next direction clockwise from `(dx, dy)`.
#[inline]
fn rotate_clockwise(dx: i8, dy: i8) -> (i8, i8) {
    match (dx, dy) {
        (-1, -1) => (0, -1),
        (0, -1) => (1, -1),
        (1, -1) => (1, 0),
        (1, 0) => (1, 1),
        (1, 1) => (0, 1),
        (0, 1) => (-1, 1),
        (-1, 1) => (-1, 0),
        _ => (-1, -1), // (-1, 0)
    }
}

/// Pixel positions are whole numbers.
type Step = ((i64, i64), (i64, i64));

#[inline]
fn step_key(from: Coord<f64>, to: Coord<f64>) -> Step {
    ((from.x as i64, from.y as i64), (to.x as i64, to.y as i64))
}

#[inline]
fn sign(v: f64) -> i8 {
    if v > 0.0 { 1 } else if v < 0.0 { -1 } else { 0 }
}

pub(super) struct Walker<'a> {
    ground_map: &'a mut dyn GroundMap,
    min: Coord<f64>,
    max: Coord<f64>,
    sample_stride: f64,
    line_stride: f64,
    /// Squared distance from the anchor within which the walk closes: one
    /// diagonal stride step.
    close_radius_sq: f64,
    /// Strides smaller than the image and not 1: closure snaps to the anchor.
    snap_to_anchor: bool,
    /// Strides larger than the image: any revisit closes the walk.
    close_on_revisit: bool,
    max_steps: usize,
}

impl<'a> Walker<'a> {
    pub(super) fn new(ground_map: &'a mut dyn GroundMap, area: SubArea, options: &FootprintOptions) -> Self {
        let (sinc, linc) = (options.sample_stride, options.line_stride);
        let unit = sinc == 1 && linc == 1;
        let oversized = sinc > area.num_samples || linc > area.num_lines;
        Self {
            ground_map,
            min: Coord { x: area.start_sample as f64, y: area.start_line as f64 },
            max: Coord {
                x: area.start_sample as f64 + area.num_samples as f64 - 1.0,
                y: area.start_line as f64 + area.num_lines as f64 - 1.0,
            },
            sample_stride: sinc as f64,
            line_stride: linc as f64,
            close_radius_sq: (sinc as f64).powi(2) + (linc as f64).powi(2),
            snap_to_anchor: !unit && !oversized,
            close_on_revisit: oversized,
            max_steps: STEPS_PER_EDGE_PIXEL * (area.num_samples as usize + area.num_lines as usize),
        }
    }

    #[inline]
    fn in_bounds(&self, p: Coord<f64>) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    #[inline]
    fn is_valid(&mut self, p: Coord<f64>) -> bool {
        self.in_bounds(p) && self.ground_map.try_set_pixel(p.x, p.y)
    }

    /// First valid pixel in row-major order.
    fn first_point(&mut self) -> Option<Coord<f64>> {
        let (s0, s1) = (self.min.x as u32, self.max.x as u32);
        let (l0, l1) = (self.min.y as u32, self.max.y as u32);
        for line in l0..=l1 {
            for sample in s0..=s1 {
                let p = Coord { x: sample as f64, y: line as f64 };
                if self.ground_map.try_set_pixel(p.x, p.y) { return Some(p) }
            }
        }
        None
    }

    /// Pull a step that left the image back onto the edge it crossed.
    ///
    /// Only applies when exactly one axis is out of bounds and the step did
    /// not start on that edge already.
    fn snap_inside(&self, from: Coord<f64>, to: Coord<f64>) -> Coord<f64> {
        let out_x = to.x < self.min.x || to.x > self.max.x;
        let out_y = to.y < self.min.y || to.y > self.max.y;
        if out_x == out_y { return to }

        let mut to = to;
        if out_x {
            if to.x < self.min.x && from.x > self.min.x { to.x = self.min.x }
            else if to.x > self.max.x && from.x < self.max.x { to.x = self.max.x }
        } else if to.y < self.min.y && from.y > self.min.y {
            to.y = self.min.y;
        } else if to.y > self.max.y && from.y < self.max.y {
            to.y = self.max.y;
        }
        to
    }

    #[inline]
    fn step(&self, from: Coord<f64>, (dx, dy): (i8, i8)) -> Coord<f64> {
        Coord { x: from.x + dx as f64 * self.sample_stride, y: from.y + dy as f64 * self.line_stride }
    }

    /// Next boundary point after `current`, sweeping clockwise from `last`.
    ///
    /// Returns `current` itself when no neighbour is valid.
    fn find_next(&mut self, current: Coord<f64>, mut last: Coord<f64>) -> Coord<f64> {
        if last == current {
            // Start the sweep from the first invalid neighbour.
            let mut start = None;
            'scan: for dy in -1..=1i8 {
                for dx in -1..=1i8 {
                    if (dx, dy) == (0, 0) { continue }
                    let p = self.step(current, (dx, dy));
                    if !self.is_valid(p) {
                        start = Some(p);
                        break 'scan;
                    }
                }
            }
            match start {
                Some(p) => last = p,
                None => return current,
            }
        }

        for _ in 0..MAX_SWEEP {
            let direction = rotate_clockwise(sign(last.x - current.x), sign(last.y - current.y));
            let candidate = self.snap_inside(current, self.step(current, direction));
            if candidate != current && self.is_valid(candidate) { return candidate }
            last = candidate;
        }
        current
    }

    /// Trace the closed boundary ring in pixel space.
    pub(super) fn walk(mut self) -> Result<Vec<Coord<f64>>, FootprintError> {
        let Some(anchor) = self.first_point() else {
            return Err(FootprintError::NoGroundPoint(SubArea {
                start_sample: self.min.x as u32,
                start_line: self.min.y as u32,
                num_samples: (self.max.x - self.min.x) as u32 + 1,
                num_lines: (self.max.y - self.min.y) as u32 + 1,
            }));
        };

        let mut points = vec![anchor];
        let (mut current, mut last) = (anchor, anchor);
        let mut taken: AHashSet<Step> = AHashSet::new();
        let mut backtracks = 0usize;

        for _ in 0..self.max_steps {
            let mut next = self.find_next(current, last);

            if self.snap_to_anchor && points.len() > 2
                && (next.x - anchor.x).powi(2) + (next.y - anchor.y).powi(2) <= self.close_radius_sq
            {
                next = anchor;
            }
            if self.close_on_revisit && next != current && points[1..].contains(&next) {
                next = anchor;
            }

            if next == current {
                // Dead end: back up one point and sweep on from the one we left.
                if points.len() < 2 {
                    return Err(FootprintError::Degenerate(format!(
                        "isolated valid pixel at ({}, {})", anchor.x, anchor.y
                    )));
                }
                let stuck = points.pop().unwrap_or(anchor);
                current = points.last().copied().unwrap_or(anchor);
                last = stuck;
                backtracks += 1;
                trace!(sample = stuck.x, line = stuck.y, "walk backtracked");
                continue;
            }

            if next != anchor && !taken.insert(step_key(current, next)) {
                // Repeating a step means the walk is circling off the anchor's
                // stride grid: drop the loop and sweep on past that step.
                if let Some(k) = points.windows(2).position(|w| w[0] == current && w[1] == next) {
                    points.truncate(k + 1);
                }
                last = next;
                trace!(sample = current.x, line = current.y, points = points.len(), "walk cut a loop");
                continue;
            }

            points.push(next);
            (last, current) = (current, next);
            if next == anchor {
                debug!(points = points.len(), backtracks, "boundary walk closed");
                return finish(points);
            }
        }

        Err(FootprintError::Degenerate(format!(
            "boundary walk did not close within {} steps", self.max_steps
        )))
    }
}

/// Final checks on a closed walk: enough points, and no twist where the
/// ring closes.
fn finish(mut points: Vec<Coord<f64>>) -> Result<Vec<Coord<f64>>, FootprintError> {
    if points.len() < 4 {
        return Err(FootprintError::Degenerate(format!(
            "only {} boundary points found", points.len()
        )));
    }

    let n = points.len();
    if n >= 5 {
        let closing = LineString::new(vec![points[0], points[1], points[n - 3], points[n - 2], points[0]]);
        if !is_simple_ring(&closing) {
            points.remove(n - 2);
        }
    }
    Ok(points)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Mask<F: Fn(f64, f64) -> bool>(F, (f64, f64));

    impl<F: Fn(f64, f64) -> bool> GroundMap for Mask<F> {
        fn try_set_pixel(&mut self, sample: f64, line: f64) -> bool {
            self.1 = (sample, line);
            (self.0)(sample, line)
        }
        fn try_set_ground(&mut self, _latitude: f64, _longitude: f64) -> bool { false }
        fn latitude(&self) -> f64 { -self.1.1 }
        fn longitude(&self) -> f64 { self.1.0 }
        fn sample(&self) -> f64 { self.1.0 }
        fn line(&self) -> f64 { self.1.1 }
    }

    fn walk<F: Fn(f64, f64) -> bool>(mask: F, ns: u32, nl: u32, stride: u32) -> Result<Vec<Coord<f64>>, FootprintError> {
        let mut map = Mask(mask, (0.0, 0.0));
        Walker::new(&mut map, SubArea::full(ns, nl), &FootprintOptions::with_stride(stride)).walk()
    }

    #[test]
    fn rotation_visits_all_eight_directions() {
        let mut d = (-1, 0);
        let mut seen = Vec::new();
        for _ in 0..8 {
            d = rotate_clockwise(d.0, d.1);
            seen.push(d);
        }
        assert_eq!(d, (-1, 0));
        seen.sort();
        seen.dedup();
        assert_eq!(seen.len(), 8);
    }

    #[test]
    fn full_image_walks_its_border_clockwise() {
        let points = walk(|_, _| true, 3, 3, 1).unwrap();
        let expected: Vec<Coord<f64>> = [(1, 1), (2, 1), (3, 1), (3, 2), (3, 3), (2, 3), (1, 3), (1, 2), (1, 1)]
            .iter().map(|&(x, y)| Coord { x: x as f64, y: y as f64 }).collect();
        assert_eq!(points, expected);
    }

    #[test]
    fn anchor_is_first_valid_pixel_in_raster_order() {
        let points = walk(|s, l| l >= 2.0 && s >= 3.0, 6, 5, 1).unwrap();
        assert_eq!(points[0], Coord { x: 3.0, y: 2.0 });
        assert_eq!(points.first(), points.last());
    }

    #[test]
    fn disc_mask_closes() {
        let points = walk(|s, l| (s - 10.0).powi(2) + (l - 10.0).powi(2) <= 49.0, 20, 20, 1).unwrap();
        assert_eq!(points.first(), points.last());
        assert!(points.len() > 20);
        assert!(points.iter().all(|p| (p.x - 10.0).powi(2) + (p.y - 10.0).powi(2) <= 49.0));
    }

    #[test]
    fn coarse_stride_still_reaches_edges() {
        let points = walk(|_, _| true, 10, 10, 4).unwrap();
        assert_eq!(points.first(), points.last());
        assert!(points.iter().any(|p| p.x == 10.0));
        assert!(points.iter().any(|p| p.y == 10.0));
    }

    fn coords(points: &[(i32, i32)]) -> Vec<Coord<f64>> {
        points.iter().map(|&(x, y)| Coord { x: x as f64, y: y as f64 }).collect()
    }

    #[test]
    fn strides_off_the_anchor_grid_close() {
        // The hypotenuse runs through the anchor, so most stride steps from
        // the edges land beside the anchor's grid.
        for stride in [2, 3, 5, 7] {
            let points = walk(|s, l| l >= s, 20, 20, stride).unwrap();
            assert_eq!(points.first(), Some(&Coord { x: 1.0, y: 1.0 }), "stride {stride}");
            assert_eq!(points.first(), points.last(), "stride {stride}");
            assert!(points.len() >= 4, "stride {stride}");
            assert!(points.iter().all(|p| p.y >= p.x && p.x >= 1.0 && p.y <= 20.0), "stride {stride}");
        }
    }

    #[test]
    fn anchor_is_reached_diagonally() {
        // A lone pixel above a block. From (3, 6) the walk heads for (6, 6),
        // four lines below the anchor: more than one line stride away, but
        // within one diagonal stride step.
        let points = walk(|s, l| (s == 5.0 && l == 2.0) || l >= 4.0, 6, 6, 3).unwrap();
        assert_eq!(points, coords(&[(5, 2), (6, 5), (6, 6), (3, 6), (5, 2)]));
    }

    #[test]
    fn dead_end_spur_is_backed_out_of() {
        // 3x3 block with a one-pixel-wide spur to the right of its middle row.
        let points = walk(|s, l| (s <= 3.0 && l <= 3.0) || (l == 2.0 && s <= 5.0), 6, 4, 1).unwrap();
        assert_eq!(points, coords(&[(1, 1), (2, 1), (3, 1), (4, 2), (3, 3), (2, 3), (1, 3), (1, 2), (1, 1)]));
        assert!(!points.contains(&Coord { x: 5.0, y: 2.0 }));
    }

    #[test]
    fn twisted_closing_point_is_removed() {
        // (1, -1) makes the last edge cross the first one.
        let points = finish(coords(&[(0, 0), (4, 0), (4, 4), (0, 4), (1, -1), (0, 0)])).unwrap();
        assert_eq!(points, coords(&[(0, 0), (4, 0), (4, 4), (0, 4), (0, 0)]));

        let untwisted = coords(&[(0, 0), (4, 0), (4, 4), (0, 4), (0, 2), (0, 0)]);
        assert_eq!(finish(untwisted.clone()).unwrap(), untwisted);
    }

    #[test]
    fn too_few_points_is_degenerate() {
        assert!(matches!(finish(coords(&[(0, 0), (1, 0), (0, 0)])), Err(FootprintError::Degenerate(_))));
    }

    #[test]
    fn stride_larger_than_image_closes() {
        let points = walk(|_, _| true, 3, 3, 5).unwrap();
        assert_eq!(points.first(), points.last());
        assert!(points.len() >= 4);
    }

    #[test]
    fn no_valid_pixel() {
        assert!(matches!(walk(|_, _| false, 4, 4, 1), Err(FootprintError::NoGroundPoint(_))));
    }
}
