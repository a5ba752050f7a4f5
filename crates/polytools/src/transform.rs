//! Coordinate-space conversion between geographic, projected and pixel space.
//!
//! Geographic multipolygons store longitude in `x` and latitude in `y`.

use geo::{Coord, LineString, MultiPolygon, Polygon};

use crate::PolygonError;

/// Pixel-to-ground mapping for one image, as provided by a camera or map
/// projection model.
///
/// Implementations are stateful: a successful `try_set_*` call makes the
/// corresponding ground or pixel coordinate available through the getters.
pub trait GroundMap {
    /// Set the active pixel (1-based sample/line). Returns whether the pixel
    /// maps to a valid point on the body.
    fn try_set_pixel(&mut self, sample: f64, line: f64) -> bool;

    /// Set the active ground point. Returns whether it is visible in the image.
    fn try_set_ground(&mut self, latitude: f64, longitude: f64) -> bool;

    /// Latitude of the active point, in degrees.
    fn latitude(&self) -> f64;

    /// Longitude of the active point, in degrees.
    fn longitude(&self) -> f64;

    /// Sample of the active point.
    fn sample(&self) -> f64;

    /// Line of the active point.
    fn line(&self) -> f64;

    /// Select the band used for subsequent mappings.
    fn set_band(&mut self, _band: u32) {}

    /// Whether the image's ground coverage crosses the longitude domain boundary.
    fn intersects_longitude_domain(&self) -> bool { false }

    /// Map a pixel to `(longitude, latitude)`, or `None` if it is off the body.
    fn ground_at(&mut self, sample: f64, line: f64) -> Option<Coord<f64>> {
        self.try_set_pixel(sample, line)
            .then(|| Coord { x: self.longitude(), y: self.latitude() })
    }
}

/// Longitude range a projection reports its longitudes in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LongitudeDomain {
    /// [0, 360)
    #[default]
    Positive360,
    /// [-180, 180)
    Signed180,
}

impl LongitudeDomain {
    /// Wrap a longitude into this domain.
    pub fn normalize(self, longitude: f64) -> f64 {
        match self {
            Self::Positive360 => longitude.rem_euclid(360.0),
            Self::Signed180 => (longitude + 180.0).rem_euclid(360.0) - 180.0,
        }
    }

    /// The domain's `(min, max)` longitudes.
    pub fn bounds(self) -> (f64, f64) {
        match self {
            Self::Positive360 => (0.0, 360.0),
            Self::Signed180 => (-180.0, 180.0),
        }
    }
}

/// Ground-to-world mapping for a map projection.
pub trait Projection {
    /// Set the active ground point. Returns false if it cannot be projected.
    fn set_ground(&mut self, latitude: f64, longitude: f64) -> bool;

    /// Projected x of the active point.
    fn x_coord(&self) -> f64;

    /// Projected y of the active point.
    fn y_coord(&self) -> f64;

    /// Set the active world (projected) point. Returns false if it has no
    /// ground equivalent.
    fn set_world(&mut self, x: f64, y: f64) -> bool;

    /// Latitude of the active point, in degrees.
    fn latitude(&self) -> f64;

    /// Longitude of the active point, in degrees.
    fn longitude(&self) -> f64;

    fn longitude_domain(&self) -> LongitudeDomain { LongitudeDomain::default() }

    /// Whether a longitude range spills over the projection's domain boundary.
    fn intersects_longitude_domain(&self, min_longitude: f64, max_longitude: f64) -> bool {
        let (lo, hi) = self.longitude_domain().bounds();
        min_longitude < lo || max_longitude > hi
    }
}

/// Rebuild a multipolygon with every vertex (outer rings and holes) mapped through `f`.
fn map_vertices<F>(mp: &MultiPolygon<f64>, mut f: F) -> Result<MultiPolygon<f64>, PolygonError>
where
    F: FnMut(Coord<f64>) -> Result<Coord<f64>, PolygonError>,
{
    fn map_ring<F>(ring: &LineString<f64>, f: &mut F) -> Result<LineString<f64>, PolygonError>
    where
        F: FnMut(Coord<f64>) -> Result<Coord<f64>, PolygonError>,
    {
        ring.0.iter().map(|&c| f(c)).collect::<Result<Vec<_>, _>>().map(LineString::new)
    }

    let mut polygons = Vec::with_capacity(mp.0.len());
    for polygon in mp {
        let exterior = map_ring(polygon.exterior(), &mut f)?;
        let interiors = polygon.interiors().iter()
            .map(|ring| map_ring(ring, &mut f))
            .collect::<Result<Vec<_>, _>>()?;
        polygons.push(Polygon::new(exterior, interiors));
    }
    Ok(MultiPolygon::new(polygons))
}

fn require<P: ?Sized>(projection: Option<&mut P>) -> Result<&mut P, PolygonError> {
    projection.ok_or_else(|| PolygonError::Projection("no projection supplied".to_string()))
}

/// Convert a geographic (lon/lat) multipolygon to projected x/y.
pub fn to_projected_xy(
    mp: &MultiPolygon<f64>,
    projection: Option<&mut dyn Projection>,
) -> Result<MultiPolygon<f64>, PolygonError> {
    let projection = require(projection)?;
    map_vertices(mp, |c| {
        if !projection.set_ground(c.y, c.x) {
            return Err(PolygonError::Projection(format!(
                "ground point (lat {}, lon {}) cannot be projected", c.y, c.x
            )));
        }
        Ok(Coord { x: projection.x_coord(), y: projection.y_coord() })
    })
}

/// Convert a projected x/y multipolygon back to geographic lon/lat.
pub fn to_geographic(
    mp: &MultiPolygon<f64>,
    projection: Option<&mut dyn Projection>,
) -> Result<MultiPolygon<f64>, PolygonError> {
    let projection = require(projection)?;
    map_vertices(mp, |c| {
        if !projection.set_world(c.x, c.y) {
            return Err(PolygonError::Projection(format!(
                "world point ({}, {}) has no ground coordinate", c.x, c.y
            )));
        }
        Ok(Coord { x: projection.longitude(), y: projection.latitude() })
    })
}

/// Convert a geographic multipolygon to the image's sample/line space.
pub fn to_pixel_space(
    mp: &MultiPolygon<f64>,
    ground_map: &mut dyn GroundMap,
) -> Result<MultiPolygon<f64>, PolygonError> {
    map_vertices(mp, |c| {
        if !ground_map.try_set_ground(c.y, c.x) {
            return Err(PolygonError::Projection(format!(
                "ground point (lat {}, lon {}) is not in the image", c.y, c.x
            )));
        }
        Ok(Coord { x: ground_map.sample(), y: ground_map.line() })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{BoundingRect, Rect};

    /// Scales lon/lat by a constant factor.
    struct Scale { k: f64, lat: f64, lon: f64, x: f64, y: f64 }

    impl Projection for Scale {
        fn set_ground(&mut self, latitude: f64, longitude: f64) -> bool {
            if latitude.abs() > 90.0 { return false }
            (self.lat, self.lon) = (latitude, longitude);
            (self.x, self.y) = (longitude * self.k, latitude * self.k);
            true
        }
        fn x_coord(&self) -> f64 { self.x }
        fn y_coord(&self) -> f64 { self.y }
        fn set_world(&mut self, x: f64, y: f64) -> bool {
            (self.x, self.y) = (x, y);
            (self.lon, self.lat) = (x / self.k, y / self.k);
            true
        }
        fn latitude(&self) -> f64 { self.lat }
        fn longitude(&self) -> f64 { self.lon }
    }

    fn scale(k: f64) -> Scale { Scale { k, lat: 0.0, lon: 0.0, x: 0.0, y: 0.0 } }

    #[test]
    fn projected_round_trip() {
        let mp = MultiPolygon::new(vec![Rect::new((10.0, -5.0), (20.0, 5.0)).to_polygon()]);
        let mut proj = scale(2.0);
        let xy = to_projected_xy(&mp, Some(&mut proj)).unwrap();
        let rect = xy.bounding_rect().unwrap();
        assert_eq!(rect.min(), Coord { x: 20.0, y: -10.0 });
        assert_eq!(rect.max(), Coord { x: 40.0, y: 10.0 });
        let back = to_geographic(&xy, Some(&mut proj)).unwrap();
        assert_eq!(back, mp);
    }

    #[test]
    fn missing_projection_is_an_error() {
        let mp = MultiPolygon::new(vec![Rect::new((0.0, 0.0), (1.0, 1.0)).to_polygon()]);
        assert!(matches!(to_projected_xy(&mp, None), Err(PolygonError::Projection(_))));
        assert!(matches!(to_geographic(&mp, None), Err(PolygonError::Projection(_))));
    }

    #[test]
    fn unprojectable_vertex_is_an_error() {
        let mp = MultiPolygon::new(vec![Rect::new((0.0, 80.0), (1.0, 95.0)).to_polygon()]);
        let err = to_projected_xy(&mp, Some(&mut scale(1.0))).unwrap_err();
        assert!(matches!(err, PolygonError::Projection(_)));
    }

    #[test]
    fn domain_normalization() {
        assert_eq!(LongitudeDomain::Positive360.normalize(-10.0), 350.0);
        assert_eq!(LongitudeDomain::Positive360.normalize(370.0), 10.0);
        assert_eq!(LongitudeDomain::Signed180.normalize(190.0), -170.0);
        assert!(scale(1.0).intersects_longitude_domain(-5.0, 10.0));
        assert!(!scale(1.0).intersects_longitude_domain(5.0, 10.0));
    }
}
