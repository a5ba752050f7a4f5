use std::{borrow::Borrow, fmt, sync::Arc};

use serde::{Deserialize, Serialize};

/// Identifier of one image, usually its serial number.
/// Records share ids heavily, so the text is reference-counted rather than owned.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageId(Arc<str>);

impl ImageId {
    pub fn new(id: impl AsRef<str>) -> Self { Self(Arc::from(id.as_ref())) }

    #[inline] pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

impl From<&str> for ImageId {
    fn from(id: &str) -> Self { Self::new(id) }
}

impl From<String> for ImageId {
    fn from(id: String) -> Self { Self(Arc::from(id)) }
}

impl Borrow<str> for ImageId {
    fn borrow(&self) -> &str { &self.0 }
}
