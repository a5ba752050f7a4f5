pub mod overlaps;
pub mod stats;
