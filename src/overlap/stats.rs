//! Coverage statistics over a decomposed overlap list.

use std::collections::BTreeMap;

use polytools::{area, thickness};
use serde::Serialize;

use super::OverlapRecord;
use crate::types::ImageId;

/// Area covered by one image, and how much of it other images also cover.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ImageCoverage {
    pub total_area: f64,
    pub overlapped_area: f64,
}

impl ImageCoverage {
    /// Share of the image's area seen by at least one other image.
    pub fn overlap_fraction(&self) -> f64 {
        if self.total_area > 0.0 { self.overlapped_area / self.total_area } else { 0.0 }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CoverageStats {
    pub records: usize,
    /// Largest number of images covering one record.
    pub max_depth: usize,
    /// Mean number of images per record.
    pub mean_depth: f64,
    /// Total record area keyed by overlap depth.
    pub area_by_depth: BTreeMap<usize, f64>,
    pub images: BTreeMap<ImageId, ImageCoverage>,
    /// Thickness of each record, in record order.
    pub thickness: Vec<f64>,
}

impl CoverageStats {
    /// Assumes the records are already disjoint.
    pub fn from_records(records: &[OverlapRecord]) -> Self {
        let mut stats = Self { records: records.len(), ..Self::default() };
        let mut depth_sum = 0usize;

        for record in records {
            let depth = record.ids.len();
            let record_area = area(&record.polygon);
            depth_sum += depth;
            stats.max_depth = stats.max_depth.max(depth);
            *stats.area_by_depth.entry(depth).or_default() += record_area;
            stats.thickness.push(thickness(&record.polygon));

            for id in &record.ids {
                let coverage = stats.images.entry(id.clone()).or_default();
                coverage.total_area += record_area;
                if depth > 1 { coverage.overlapped_area += record_area }
            }
        }

        if !records.is_empty() {
            stats.mean_depth = depth_sum as f64 / records.len() as f64;
        }
        stats
    }
}
