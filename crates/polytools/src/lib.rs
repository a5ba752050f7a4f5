//! Polygon utilities for footprint and overlap geometry.
//!
//! Every operation here is stateless: it takes owned or borrowed `geo`
//! geometries and returns a freshly built `MultiPolygon`. Failures of the
//! underlying boolean kernel are reported as [`PolygonError`] values instead
//! of panics, so callers can decide whether to repair, skip, or abort.
//!
//! The two external collaborators used for coordinate-space conversion,
//! [`GroundMap`] (pixel ↔ ground) and [`Projection`] (ground ↔ planar
//! world), are declared here as traits.

mod bbox;
pub mod despike;
pub mod error;
pub mod grid;
pub mod ops;
pub mod proj;
pub mod rings;
pub mod transform;
pub mod validity;

pub use despike::{despike, despike_ring};
pub use error::PolygonError;
pub use grid::Grid;
pub use ops::{
    area, difference, equals, intersect, normalize_to_polygons, repair, retain_polygons,
    thickness,
};
pub use proj::ProjProjection;
pub use rings::split_touching_rings;
pub use transform::{
    to_geographic, to_pixel_space, to_projected_xy, GroundMap, LongitudeDomain, Projection,
};
pub use validity::{invalid_reason, is_simple_ring, is_valid};

/// Vertices closer than this to the line through their neighbours are
/// removed by [`despike`] (native coordinate units).
pub const DESPIKE_TOLERANCE: f64 = 1e-14;

/// Regions with a smaller area are treated as empty, and multipolygons whose
/// symmetric difference is smaller are equal under [`equals`].
pub const AREA_TOLERANCE: f64 = 1e-14;
