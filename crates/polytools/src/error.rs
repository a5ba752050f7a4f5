/// Errors produced by polygon utilities.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PolygonError {
    /// A coordinate could not be converted between spaces, or no
    /// projection was supplied.
    #[error("projection error: {0}")]
    Projection(String),

    /// The boolean kernel rejected its input or failed mid-operation.
    #[error("geometry operation `{op}` failed: {message}")]
    GeometryOp { op: &'static str, message: String },

    /// Repair left the geometry invalid.
    #[error("polygon repair failed: {0}")]
    Repair(String),
}

impl PolygonError {
    pub(crate) fn geometry_op(op: &'static str, message: impl Into<String>) -> Self {
        Self::GeometryOp { op, message: message.into() }
    }
}
