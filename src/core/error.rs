use thiserror::Error;

/// Errors that can occur while computing rotation statistics
#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    /// No quaternions were supplied
    #[error("empty sample: at least one quaternion is required")]
    EmptySample,

    /// Point is not on the manifold (e.g. quaternion norm is not 1)
    #[error("point not on manifold: {0}")]
    NotOnManifold(String),

    /// Dimension mismatch
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    /// Invalid parameter value
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Computation failed (e.g. normalizing a zero quaternion)
    #[error("computation failed: {0}")]
    ComputationFailed(String),

    /// Numerical error from ndarray-linalg
    #[error("linear algebra error: {0}")]
    LinalgError(String),
}

impl Error {
    /// True for errors caused by the caller's input rather than by the numerics
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            Error::EmptySample
                | Error::NotOnManifold(_)
                | Error::DimensionMismatch { .. }
                | Error::InvalidParameter(_)
        )
    }
}

/// Convert ndarray-linalg errors to Error
impl From<ndarray_linalg::error::LinalgError> for Error {
    fn from(err: ndarray_linalg::error::LinalgError) -> Self {
        Error::LinalgError(format!("{:?}", err))
    }
}

/// Result type for manifold operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_input_grouping() {
        assert!(Error::EmptySample.is_invalid_input());
        assert!(Error::NotOnManifold("norm 2".to_string()).is_invalid_input());
        assert!(Error::DimensionMismatch { expected: 3, got: 4 }.is_invalid_input());
        assert!(Error::InvalidParameter("max_iterations".to_string()).is_invalid_input());
        assert!(!Error::ComputationFailed("zero".to_string()).is_invalid_input());
        assert!(!Error::LinalgError("singular".to_string()).is_invalid_input());
    }

    #[test]
    fn test_display() {
        let err = Error::DimensionMismatch { expected: 3, got: 2 };
        assert_eq!(err.to_string(), "dimension mismatch: expected 3, got 2");
    }
}
