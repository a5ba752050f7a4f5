//! File formats: WKT geometry text, overlap-list persistence and error-log export.
//!
//! - `wkt` - WKT reader/writer for record polygons (geozero)
//! - `overlaps` - blank-line separated overlap lists (optionally gzip-compressed)
//! - `atomic` - write-then-rename outputs shared by all writers

pub(crate) mod atomic;
pub(crate) mod overlaps;
pub mod wkt;

pub use atomic::assert_not_stdout;
pub use overlaps::{load_overlaps, persist_overlaps, read_overlaps, write_error_log, write_overlaps};
