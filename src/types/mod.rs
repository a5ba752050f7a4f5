mod image_id;

use std::collections::BTreeSet;

pub use image_id::ImageId;

/// Deduplicated, ordered set of image ids tagging one overlap record.
pub type IdSet = BTreeSet<ImageId>;
