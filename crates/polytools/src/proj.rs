use proj4rs::{proj::Proj as Proj4, transform::transform};

use crate::{LongitudeDomain, PolygonError, Projection};

/// A [`Projection`] backed by PROJ.4 definitions for the body's geographic
/// CRS and a projected CRS on the same body.
///
/// ```ignore
/// let mars = ProjProjection::new(
///     "+proj=longlat +a=3396190 +b=3376200 +no_defs",
///     "+proj=eqc +lon_0=180 +a=3396190 +b=3376200 +units=m +no_defs",
/// )?;
/// ```
pub struct ProjProjection {
    geographic: Proj4,
    projected: Proj4,
    domain: LongitudeDomain,
    latitude: f64,
    longitude: f64,
    x: f64,
    y: f64,
}

impl ProjProjection {
    /// Build a projection from two PROJ.4 strings.
    pub fn new(geographic: &str, projected: &str) -> Result<Self, PolygonError> {
        let build = |definition: &str| Proj4::from_proj_string(definition)
            .map_err(|e| PolygonError::Projection(format!("failed to build PROJ.4 `{definition}`: {e}")));

        Ok(Self {
            geographic: build(geographic)?,
            projected: build(projected)?,
            domain: LongitudeDomain::default(),
            latitude: f64::NAN,
            longitude: f64::NAN,
            x: f64::NAN,
            y: f64::NAN,
        })
    }

    /// Report longitudes in `domain` instead of [0, 360).
    pub fn with_domain(mut self, domain: LongitudeDomain) -> Self {
        self.domain = domain;
        self
    }
}

impl Projection for ProjProjection {
    fn set_ground(&mut self, latitude: f64, longitude: f64) -> bool {
        // Degrees in, radians through PROJ.4, projected units out.
        let mut point = (longitude.to_radians(), latitude.to_radians(), 0.0);
        if transform(&self.geographic, &self.projected, &mut point).is_err() { return false }
        if !point.0.is_finite() || !point.1.is_finite() { return false }

        (self.latitude, self.longitude) = (latitude, longitude);
        (self.x, self.y) = (point.0, point.1);
        true
    }

    #[inline] fn x_coord(&self) -> f64 { self.x }

    #[inline] fn y_coord(&self) -> f64 { self.y }

    fn set_world(&mut self, x: f64, y: f64) -> bool {
        let mut point = (x, y, 0.0);
        if transform(&self.projected, &self.geographic, &mut point).is_err() { return false }
        if !point.0.is_finite() || !point.1.is_finite() { return false }

        (self.x, self.y) = (x, y);
        self.longitude = self.domain.normalize(point.0.to_degrees());
        self.latitude = point.1.to_degrees();
        true
    }

    #[inline] fn latitude(&self) -> f64 { self.latitude }

    #[inline] fn longitude(&self) -> f64 { self.longitude }

    #[inline] fn longitude_domain(&self) -> LongitudeDomain { self.domain }
}
