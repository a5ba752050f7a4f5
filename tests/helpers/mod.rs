// Shared fixtures: synthetic ground maps and polygon builders.

#![allow(dead_code)]

use geo::{MultiPolygon, Rect};
use overlapkit::GroundMap;

pub fn square(x0: f64, y0: f64, x1: f64, y1: f64) -> MultiPolygon<f64> {
    MultiPolygon::new(vec![Rect::new((x0, y0), (x1, y1)).to_polygon()])
}

/// lon = lon0 + (sample - 1) * step, lat = lat0 - (line - 1) * step,
/// valid wherever `mask(sample, line)` holds. Longitudes are not wrapped.
pub struct AffineMap {
    pub lon0: f64,
    pub lat0: f64,
    pub step: f64,
    mask: Box<dyn Fn(f64, f64) -> bool>,
    current: [f64; 4], // sample, line, lon, lat
}

impl AffineMap {
    pub fn new(lon0: f64, lat0: f64, step: f64) -> Self {
        Self::masked(lon0, lat0, step, |_, _| true)
    }

    pub fn masked(lon0: f64, lat0: f64, step: f64, mask: impl Fn(f64, f64) -> bool + 'static) -> Self {
        Self { lon0, lat0, step, mask: Box::new(mask), current: [f64::NAN; 4] }
    }
}

impl GroundMap for AffineMap {
    fn try_set_pixel(&mut self, sample: f64, line: f64) -> bool {
        if !(self.mask)(sample, line) { return false }
        let lon = self.lon0 + (sample - 1.0) * self.step;
        let lat = self.lat0 - (line - 1.0) * self.step;
        self.current = [sample, line, lon, lat];
        true
    }

    fn try_set_ground(&mut self, latitude: f64, longitude: f64) -> bool {
        let sample = 1.0 + (longitude - self.lon0) / self.step;
        let line = 1.0 + (self.lat0 - latitude) / self.step;
        if !(self.mask)(sample, line) { return false }
        self.current = [sample, line, longitude, latitude];
        // Pole lookups use fixed coordinates; only report a hit when the
        // grid actually reaches that latitude.
        latitude.abs() < 90.0
    }

    fn latitude(&self) -> f64 { self.current[3] }
    fn longitude(&self) -> f64 { self.current[2] }
    fn sample(&self) -> f64 { self.current[0] }
    fn line(&self) -> f64 { self.current[1] }
}

/// Square image looking straight down on the north pole: the center pixel is
/// the pole, latitude falls by `step` degrees per pixel of radius and
/// longitude is the azimuth.
pub struct PolarMap {
    pub size: u32,
    pub step: f64,
    current: [f64; 4],
}

impl PolarMap {
    pub fn new(size: u32, step: f64) -> Self { Self { size, step, current: [f64::NAN; 4] } }

    fn center(&self) -> f64 { (self.size as f64 + 1.0) / 2.0 }
}

impl GroundMap for PolarMap {
    fn try_set_pixel(&mut self, sample: f64, line: f64) -> bool {
        let n = self.size as f64;
        if sample < 1.0 || line < 1.0 || sample > n || line > n { return false }
        let (dx, dy) = ((sample - self.center()) * self.step, (line - self.center()) * self.step);
        let lat = 90.0 - dx.hypot(dy);
        let lon = dy.atan2(dx).to_degrees().rem_euclid(360.0);
        self.current = [sample, line, lon, lat];
        true
    }

    fn try_set_ground(&mut self, latitude: f64, longitude: f64) -> bool {
        let r = 90.0 - latitude;
        let (dx, dy) = (r * longitude.to_radians().cos(), r * longitude.to_radians().sin());
        let (sample, line) = (self.center() + dx / self.step, self.center() + dy / self.step);
        let n = self.size as f64;
        if sample < 1.0 || line < 1.0 || sample > n || line > n { return false }
        self.current = [sample, line, longitude, latitude];
        true
    }

    fn latitude(&self) -> f64 { self.current[3] }
    fn longitude(&self) -> f64 { self.current[2] }
    fn sample(&self) -> f64 { self.current[0] }
    fn line(&self) -> f64 { self.current[1] }
}
