//! Error types for the detection crates.

use thiserror::Error;

/// Errors raised by detector capabilities.
///
/// These never escape a detector run: a failed capability call zeroes
/// that signal's contribution for the affected tool and is noted in the
/// result's reason text.
#[derive(Debug, Error)]
pub enum DetectError {
    /// The embedding provider failed to produce a vector.
    #[error("Embedding failed: {0}")]
    Embedding(String),

    /// The deviation judge call failed or returned an unusable payload.
    #[error("Judge call failed: {0}")]
    Judge(String),

    /// A method name could not be parsed into a [`DetectionMethod`].
    ///
    /// [`DetectionMethod`]: crate::detector::DetectionMethod
    #[error("Unknown detection method: {0}")]
    UnknownMethod(String),
}

/// Result type alias for detection operations.
pub type Result<T> = std::result::Result<T, DetectError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedding_error_display() {
        let err = DetectError::Embedding("model not loaded".to_string());
        assert_eq!(err.to_string(), "Embedding failed: model not loaded");
    }

    #[test]
    fn test_judge_error_display() {
        let err = DetectError::Judge("invalid JSON in response".to_string());
        assert_eq!(err.to_string(), "Judge call failed: invalid JSON in response");
    }
}
