#![doc = "Image footprints and overlap partitions for planetary image sets"]
pub mod cli;
pub mod commands;
pub mod footprint;
pub mod io;
pub mod overlap;
mod types;

#[doc(inline)]
pub use footprint::{extract, FootprintError, FootprintExtractor, FootprintOptions, ImageFootprint, SubArea};

#[doc(inline)]
pub use overlap::{CoverageStats, ErrorLogEntry, ImageCoverage, OverlapError, OverlapOptions, OverlapRecord, OverlapSet};

#[doc(inline)]
pub use types::{IdSet, ImageId};

#[doc(inline)]
pub use polytools::{self, GroundMap, LongitudeDomain, PolygonError, Projection};
