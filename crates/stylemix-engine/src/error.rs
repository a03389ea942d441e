//! Error types for the composition engine.

use stylemix_spec::{BackendError, CompositionMode, BAND_COUNT};
use thiserror::Error;

/// Result type for engine operations.
pub type ComposeResult<T> = Result<T, ComposeError>;

/// Errors that can occur while composing a conditioning vector.
///
/// Every error fails the whole invocation; the engine never returns partial
/// conditioning output.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ComposeError {
    /// Feature dimension is too small to split into non-empty bands.
    #[error("feature dimension {dim} is too small to split into {} bands", BAND_COUNT)]
    DimensionTooSmall {
        /// The offending feature dimension.
        dim: usize,
    },

    /// Two batches cannot be broadcast against each other.
    #[error("batch sizes {left} and {right} cannot be broadcast together")]
    BatchSizeMismatch {
        /// Batch size of the first operand.
        left: usize,
        /// Batch size of the second operand.
        right: usize,
    },

    /// A tensor's shape does not fit where it is used.
    #[error("shape mismatch: {message}")]
    ShapeMismatch {
        /// Description of the mismatch.
        message: String,
    },

    /// The selected mode needs an input that was not supplied.
    #[error("mode '{mode}' requires {input}")]
    MissingInput {
        /// Mode that needed the input.
        mode: CompositionMode,
        /// What was missing.
        input: &'static str,
    },

    /// A conditioning sequence has no entries.
    #[error("conditioning sequence is empty")]
    EmptyConditioning,
}

impl ComposeError {
    /// Creates a shape mismatch error.
    pub fn shape(message: impl Into<String>) -> Self {
        Self::ShapeMismatch {
            message: message.into(),
        }
    }
}

impl BackendError for ComposeError {
    fn code(&self) -> &'static str {
        match self {
            ComposeError::DimensionTooSmall { .. } => "COMPOSE_001",
            ComposeError::BatchSizeMismatch { .. } => "COMPOSE_002",
            ComposeError::ShapeMismatch { .. } => "COMPOSE_003",
            ComposeError::MissingInput { .. } => "COMPOSE_004",
            ComposeError::EmptyConditioning => "COMPOSE_005",
        }
    }

    fn category(&self) -> &'static str {
        "compose"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let err = ComposeError::DimensionTooSmall { dim: 4 };
        assert_eq!(
            err.to_string(),
            "feature dimension 4 is too small to split into 5 bands"
        );

        let err = ComposeError::MissingInput {
            mode: CompositionMode::Threshold,
            input: "text conditioning",
        };
        assert_eq!(err.to_string(), "mode 'threshold' requires text conditioning");
    }

    #[test]
    fn test_backend_codes() {
        assert_eq!(ComposeError::shape("x").code(), "COMPOSE_003");
        assert_eq!(ComposeError::EmptyConditioning.category(), "compose");
        assert!(ComposeError::shape("band width is zero")
            .message()
            .contains("band width is zero"));
    }
}
