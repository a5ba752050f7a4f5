use polytools::PolygonError;

/// Failures that stop (or, with `continue_on_error`, are logged during) a decomposition.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OverlapError {
    /// The overlap of two records could not be turned into a valid polygon.
    #[error("invalid overlap between [{first}] and [{second}]: {message}")]
    InvalidOverlap { first: String, second: String, message: String },

    /// A boolean operation on a pair of records failed.
    #[error("{op} failed between [{first}] and [{second}]: {source}")]
    PairwiseOpFailure {
        op: &'static str,
        first: String,
        second: String,
        #[source]
        source: PolygonError,
    },
}
