//! Image footprints: the geographic outline of an image's valid pixels.
//!
//! The border of the valid pixel region is traced in pixel space with a
//! left-hand-rule walk ([`walk`]), projected through a [`GroundMap`], and
//! then unwrapped around a pole or split at the 0/360 meridian ([`meridian`])
//! so that the result is a well-formed multipolygon in [0, 360] longitude.

mod meridian;
mod walk;

use geo::{Coord, LineString, MultiPolygon, Polygon};
use polytools::{GroundMap, LongitudeDomain, PolygonError};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use tracing::{debug, info};

use walk::Walker;

/// Errors produced while extracting a footprint.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FootprintError {
    /// No pixel in the requested area maps to the body.
    #[error("no pixel in {0} maps to a ground point")]
    NoGroundPoint(SubArea),

    /// The traced boundary cannot form a polygon.
    #[error("degenerate footprint: {0}")]
    Degenerate(String),

    /// Both poles lie inside the image.
    #[error("image contains both poles")]
    BothPoles,

    /// The requested area or stride is unusable.
    #[error("invalid footprint request: {0}")]
    InvalidArgument(String),

    #[error(transparent)]
    Polygon(#[from] PolygonError),
}

/// The pixel window to outline (1-based, inclusive start).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubArea {
    pub start_sample: u32,
    pub start_line: u32,
    pub num_samples: u32,
    pub num_lines: u32,
}

impl SubArea {
    /// The whole image.
    pub fn full(num_samples: u32, num_lines: u32) -> Self {
        Self { start_sample: 1, start_line: 1, num_samples, num_lines }
    }

    /// Last sample, or `None` if the area is empty or ends past `u32::MAX`.
    #[inline] pub fn end_sample(&self) -> Option<u32> { last_index(self.start_sample, self.num_samples) }

    /// Last line, or `None` if the area is empty or ends past `u32::MAX`.
    #[inline] pub fn end_line(&self) -> Option<u32> { last_index(self.start_line, self.num_lines) }

    /// Pixel at the middle of the area.
    pub(crate) fn center(&self) -> Coord<f64> {
        Coord {
            x: self.start_sample as f64 + (self.num_samples as f64 - 1.0) / 2.0,
            y: self.start_line as f64 + (self.num_lines as f64 - 1.0) / 2.0,
        }
    }
}

#[inline]
fn last_index(start: u32, count: u32) -> Option<u32> {
    start.checked_add(count.checked_sub(1)?)
}

impl std::fmt::Display for SubArea {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let end = |start: u32, count: u32| start as i64 + count as i64 - 1;
        write!(f, "samples {}..={}, lines {}..={}",
            self.start_sample, end(self.start_sample, self.num_samples),
            self.start_line, end(self.start_line, self.num_lines))
    }
}

/// Boundary-walk settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FootprintOptions {
    /// Pixel increment along samples while walking the border.
    pub sample_stride: u32,
    /// Pixel increment along lines while walking the border.
    pub line_stride: u32,
    /// Band handed to the ground map before walking.
    pub band: u32,
}

impl Default for FootprintOptions {
    fn default() -> Self {
        Self { sample_stride: 1, line_stride: 1, band: 1 }
    }
}

impl FootprintOptions {
    /// Use the same increment along both axes.
    pub fn with_stride(stride: u32) -> Self {
        Self { sample_stride: stride, line_stride: stride, ..Self::default() }
    }
}

/// An extracted footprint.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageFootprint {
    /// Geographic outline (x = longitude in [0, 360], y = latitude).
    pub polygon: MultiPolygon<f64>,
    /// Closed sample/line ring traced by the walk.
    pub boundary: LineString<f64>,
}

/// Extracts footprints with fixed walk settings.
#[derive(Debug, Clone, Copy, Default)]
pub struct FootprintExtractor {
    options: FootprintOptions,
}

impl FootprintExtractor {
    pub fn new(options: FootprintOptions) -> Self { Self { options } }

    #[inline] pub fn options(&self) -> &FootprintOptions { &self.options }

    pub fn extract(&self, ground_map: &mut dyn GroundMap, area: SubArea) -> Result<ImageFootprint, FootprintError> {
        extract(ground_map, area, &self.options)
    }
}

/// Trace the footprint of `area` through `ground_map`.
pub fn extract(
    ground_map: &mut dyn GroundMap,
    area: SubArea,
    options: &FootprintOptions,
) -> Result<ImageFootprint, FootprintError> {
    if area.num_samples == 0 || area.num_lines == 0 {
        return Err(FootprintError::InvalidArgument(format!("empty area ({area})")));
    }
    if area.end_sample().is_none() || area.end_line().is_none() {
        return Err(FootprintError::InvalidArgument(format!("area ends past the last addressable pixel ({area})")));
    }
    if options.sample_stride == 0 || options.line_stride == 0 {
        return Err(FootprintError::InvalidArgument("stride must be at least 1".to_string()));
    }

    ground_map.set_band(options.band);

    let boundary = Walker::new(ground_map, area, options).walk()?;
    debug!(points = boundary.len(), %area, "traced image boundary");

    // Project to ground, remembering the point just before each 0/360 jump.
    let mut coords: Vec<Coord<f64>> = Vec::with_capacity(boundary.len());
    let mut crossings: SmallVec<[usize; 4]> = SmallVec::new();
    for (i, pixel) in boundary.iter().enumerate() {
        let Some(ground) = ground_map.ground_at(pixel.x, pixel.y) else {
            return Err(FootprintError::Degenerate(format!(
                "boundary pixel ({}, {}) no longer maps to the ground", pixel.x, pixel.y
            )));
        };
        let ground = Coord { x: LongitudeDomain::Positive360.normalize(ground.x), y: ground.y };
        if coords.last().is_some_and(|prev| (ground.x - prev.x).abs() >= 180.0) {
            crossings.push(i - 1);
        }
        coords.push(ground);
    }

    let center_is_pole = ground_map.ground_at(area.center().x, area.center().y)
        .is_some_and(|c| (c.y.abs() - 90.0).abs() < meridian::POLE_TOLERANCE);

    let mut pole = None;
    if center_is_pole || !crossings.is_empty() {
        pole = meridian::find_pole(ground_map)?;
        if let Some(pole_lat) = pole {
            coords = meridian::insert_pole(&coords, &crossings, pole_lat)?;
            info!(pole_lat, "footprint unwrapped around pole");
        }
    }

    let polygon = if pole.is_none() && (!crossings.is_empty() || ground_map.intersects_longitude_domain()) {
        meridian::split_at_meridian(coords)?
    } else {
        MultiPolygon::new(vec![Polygon::new(LineString::new(coords), vec![])])
    };

    let polygon = polytools::repair(&polygon)?;
    if polygon.0.is_empty() {
        return Err(FootprintError::Degenerate("footprint encloses no area".to_string()));
    }

    Ok(ImageFootprint { polygon, boundary: LineString::new(boundary) })
}
