//! Overlap partitions: records of (polygon, image ids) refined until no two
//! records share area.

mod decompose;
mod error;
pub mod stats;

use ahash::AHashMap;
use geo::MultiPolygon;
use polytools::Grid;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::types::{IdSet, ImageId};

pub use error::OverlapError;
pub use stats::{CoverageStats, ImageCoverage};

/// A polygon region and the images that cover it.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlapRecord {
    pub polygon: MultiPolygon<f64>,
    pub ids: IdSet,
}

impl OverlapRecord {
    /// A record covered by a single image.
    pub fn new(polygon: MultiPolygon<f64>, id: ImageId) -> Self {
        Self { polygon, ids: IdSet::from([id]) }
    }

    pub fn with_ids(polygon: MultiPolygon<f64>, ids: IdSet) -> Self {
        Self { polygon, ids }
    }

    #[inline]
    pub fn contains_id(&self, id: &str) -> bool { self.ids.contains(id) }

    /// Whether the two records already have an image in common.
    #[inline]
    pub fn shares_id(&self, other: &OverlapRecord) -> bool {
        // Both sets are sorted, so this is a linear merge.
        !self.ids.is_disjoint(&other.ids)
    }

    pub(crate) fn ids_label(&self) -> String {
        self.ids.iter().map(ImageId::as_str).collect::<Vec<_>>().join(",")
    }
}

/// One pairwise failure recorded during decomposition.
///
/// `record_indices` are positions in the record list at the moment of the
/// failure; records may have moved or been removed since.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorLogEntry {
    pub record_indices: Vec<usize>,
    pub ids: Vec<ImageId>,
    pub filenames: Vec<String>,
    pub message: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlapOptions {
    /// Log and drop failing pairs instead of aborting the decomposition.
    pub continue_on_error: bool,
}

/// An ordered list of overlap records plus the decomposition error log.
#[derive(Debug, Clone, Default)]
pub struct OverlapSet {
    records: Vec<OverlapRecord>,
    filenames: AHashMap<ImageId, String>,
    error_log: Vec<ErrorLogEntry>,
    options: OverlapOptions,
    /// Lattice the records are snap rounded onto, if any.
    grid: Option<Grid>,
}

impl OverlapSet {
    pub fn new(options: OverlapOptions) -> Self {
        Self { options, ..Self::default() }
    }

    /// One record per footprint.
    pub fn from_footprints<I>(footprints: I, options: OverlapOptions) -> Self
    where
        I: IntoIterator<Item = (ImageId, MultiPolygon<f64>)>,
    {
        let mut set = Self::new(options);
        for (id, polygon) in footprints {
            set.add_record(polygon, id);
        }
        set
    }

    /// Wrap records that already carry id sets (e.g. a loaded partition).
    pub fn from_records(records: Vec<OverlapRecord>, options: OverlapOptions) -> Self {
        Self { records, options, ..Self::default() }
    }

    pub fn add_record(&mut self, polygon: MultiPolygon<f64>, id: ImageId) {
        self.records.push(OverlapRecord::new(polygon, id));
        self.grid = None;
    }

    /// Associate a source file with an image id, reported in error-log entries.
    pub fn set_filename(&mut self, id: ImageId, filename: impl Into<String>) {
        self.filenames.insert(id, filename.into());
    }

    pub fn filename(&self, id: &ImageId) -> Option<&str> {
        self.filenames.get(id).map(String::as_str)
    }

    #[inline] pub fn options(&self) -> &OverlapOptions { &self.options }

    #[inline] pub fn set_options(&mut self, options: OverlapOptions) { self.options = options }

    #[inline] pub fn len(&self) -> usize { self.records.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.records.is_empty() }

    #[inline] pub fn records(&self) -> &[OverlapRecord] { &self.records }

    #[inline] pub fn get(&self, index: usize) -> Option<&OverlapRecord> { self.records.get(index) }

    pub fn into_records(self) -> Vec<OverlapRecord> { self.records }

    /// Every record whose id set includes `id`.
    pub fn records_containing(&self, id: &str) -> Vec<&OverlapRecord> {
        self.records.iter().filter(|r| r.contains_id(id)).collect()
    }

    #[inline] pub fn error_log(&self) -> &[ErrorLogEntry] { &self.error_log }

    #[inline] pub fn grid(&self) -> Option<Grid> { self.grid }

    pub fn coverage_stats(&self) -> CoverageStats { CoverageStats::from_records(&self.records) }

    /// Append an error-log entry for the given records and emit it as a warning.
    fn log_error(&mut self, indices: &[usize], message: String) {
        let ids: Vec<ImageId> = indices.iter()
            .filter_map(|&i| self.records.get(i))
            .flat_map(|r| r.ids.iter().cloned())
            .collect::<IdSet>()
            .into_iter()
            .collect();
        let filenames = ids.iter().filter_map(|id| self.filenames.get(id).cloned()).collect();

        warn!(records = ?indices, ids = ?ids.iter().map(ImageId::as_str).collect::<Vec<_>>(), "{message}");
        self.error_log.push(ErrorLogEntry { record_indices: indices.to_vec(), ids, filenames, message });
    }
}
