//! Error types for the tourcast library.

use thiserror::Error;

/// Result type alias for analytics operations.
pub type Result<T> = std::result::Result<T, AnalyticsError>;

/// Errors that can occur during analytics operations.
///
/// Under-sampled destinations and tours are not errors: they are silently
/// excluded from results, so there is no `InsufficientData` variant here.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalyticsError {
    /// The data provider is unreachable or a query failed.
    #[error("data provider unavailable: {0}")]
    DataUnavailable(String),

    /// Invalid parameter value, rejected before any query is issued.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Computation error (e.g., numerical issues).
    #[error("computation error: {0}")]
    Computation(String),

    /// Cache file unreadable or unwritable. Engines log this and fall back
    /// to recomputation; it never fails a request on its own.
    #[error("cache I/O error: {0}")]
    CacheIo(String),
}

impl From<std::io::Error> for AnalyticsError {
    fn from(err: std::io::Error) -> Self {
        AnalyticsError::CacheIo(err.to_string())
    }
}

impl From<serde_json::Error> for AnalyticsError {
    fn from(err: serde_json::Error) -> Self {
        AnalyticsError::CacheIo(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages_are_descriptive() {
        let err = AnalyticsError::DataUnavailable("connection refused".to_string());
        assert_eq!(
            err.to_string(),
            "data provider unavailable: connection refused"
        );

        let err = AnalyticsError::InvalidParameter("window_days must be in 1..=3650".to_string());
        assert_eq!(
            err.to_string(),
            "invalid parameter: window_days must be in 1..=3650"
        );

        let err = AnalyticsError::CacheIo("permission denied".to_string());
        assert_eq!(err.to_string(), "cache I/O error: permission denied");
    }

    #[test]
    fn errors_are_clonable_and_comparable() {
        let err1 = AnalyticsError::Computation("singular matrix".to_string());
        let err2 = err1.clone();
        assert_eq!(err1, err2);
    }

    #[test]
    fn io_errors_map_to_cache_io() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: AnalyticsError = io.into();
        assert!(matches!(err, AnalyticsError::CacheIo(_)));
    }
}
