//! Error types for job validation and processing.

use thiserror::Error;

/// Error codes for job validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Document errors (E001-E009)
    /// E001: Unsupported job_version
    UnsupportedJobVersion,
    /// E002: Invalid job_id format
    InvalidJobId,
    /// E003: Tensor shape and data length disagree
    InconsistentTensor,
    /// E004: Tensor contains NaN or infinite values
    NonFiniteTensor,
    /// E005: Tensor has the wrong rank
    InvalidTensorRank,
    /// E006: Conditioning sequence is empty
    EmptyConditioning,
    /// E007: Feature dimension is too small to split into bands
    FeatureDimTooSmall,
    /// E008: Conditioning feature width differs from the style embedding width
    FeatureDimMismatch,
    /// E009: Style embedding has an empty batch or sequence axis
    EmptyTensor,

    // Parameter errors (E010-E014)
    /// E010: Band weight outside the declared range
    WeightOutOfRange,
    /// E011: Similarity threshold outside the declared range
    ThresholdOutOfRange,
    /// E012: Enhancement base outside the declared range
    EnhancementBaseOutOfRange,
    /// E013: Enhancement factor outside the declared range
    EnhancementFactorOutOfRange,

    // Mode input errors (E020-E023)
    /// E020: Mode requires text conditioning that was not provided
    MissingTextConditioning,
    /// E021: Mode requires auxiliary embeddings that were not provided
    MissingAuxiliary,
    /// E022: Auxiliary embeddings do not cover every band
    IncompleteAuxiliary,
    /// E023: Projector layers do not cover every band or have the wrong size
    InvalidProjector,
}

impl ErrorCode {
    /// Returns the error code string (e.g., "E001").
    pub fn code(&self) -> &'static str {
        match self {
            ErrorCode::UnsupportedJobVersion => "E001",
            ErrorCode::InvalidJobId => "E002",
            ErrorCode::InconsistentTensor => "E003",
            ErrorCode::NonFiniteTensor => "E004",
            ErrorCode::InvalidTensorRank => "E005",
            ErrorCode::EmptyConditioning => "E006",
            ErrorCode::FeatureDimTooSmall => "E007",
            ErrorCode::FeatureDimMismatch => "E008",
            ErrorCode::EmptyTensor => "E009",
            ErrorCode::WeightOutOfRange => "E010",
            ErrorCode::ThresholdOutOfRange => "E011",
            ErrorCode::EnhancementBaseOutOfRange => "E012",
            ErrorCode::EnhancementFactorOutOfRange => "E013",
            ErrorCode::MissingTextConditioning => "E020",
            ErrorCode::MissingAuxiliary => "E021",
            ErrorCode::IncompleteAuxiliary => "E022",
            ErrorCode::InvalidProjector => "E023",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Warning codes for job validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WarningCode {
    /// W001: Text conditioning supplied but the mode ignores it
    UnusedTextConditioning,
    /// W002: Auxiliary embeddings supplied but the mode ignores them
    UnusedAuxiliary,
    /// W003: Every band weight is zero, the composed vector will be all zeros
    AllWeightsZero,
    /// W004: Feature dimension is not a multiple of five; the texture band absorbs the remainder
    UnevenBands,
}

impl WarningCode {
    /// Returns the warning code string (e.g., "W001").
    pub fn code(&self) -> &'static str {
        match self {
            WarningCode::UnusedTextConditioning => "W001",
            WarningCode::UnusedAuxiliary => "W002",
            WarningCode::AllWeightsZero => "W003",
            WarningCode::UnevenBands => "W004",
        }
    }
}

impl std::fmt::Display for WarningCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// A validation error with code, message, and optional JSON path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// The error code.
    pub code: ErrorCode,
    /// Human-readable error message.
    pub message: String,
    /// JSON path to the problematic field (e.g., "conditioning\[0\].embedding").
    pub path: Option<String>,
}

impl ValidationError {
    /// Creates a new validation error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            path: None,
        }
    }

    /// Creates a new validation error with a JSON path.
    pub fn with_path(code: ErrorCode, message: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            path: Some(path.into()),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.path {
            Some(path) => write!(f, "{}: {} (at {})", self.code, self.message, path),
            None => write!(f, "{}: {}", self.code, self.message),
        }
    }
}

impl std::error::Error for ValidationError {}

/// A validation warning with code, message, and optional JSON path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationWarning {
    /// The warning code.
    pub code: WarningCode,
    /// Human-readable warning message.
    pub message: String,
    /// JSON path to the problematic field.
    pub path: Option<String>,
}

impl ValidationWarning {
    /// Creates a new validation warning.
    pub fn new(code: WarningCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            path: None,
        }
    }

    /// Creates a new validation warning with a JSON path.
    pub fn with_path(
        code: WarningCode,
        message: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            path: Some(path.into()),
        }
    }
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.path {
            Some(path) => write!(f, "{}: {} (at {})", self.code, self.message, path),
            None => write!(f, "{}: {}", self.code, self.message),
        }
    }
}

/// Top-level error type for document operations.
#[derive(Debug, Error)]
pub enum SpecError {
    /// Job validation failed with one or more errors.
    #[error("job validation failed with {0} error(s)")]
    ValidationFailed(usize),

    /// JSON parsing error.
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result of job validation.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    /// List of validation errors.
    pub errors: Vec<ValidationError>,
    /// List of validation warnings.
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    /// Creates a successful validation result.
    pub fn success() -> Self {
        Self::default()
    }

    /// Adds an error to the result.
    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    /// Adds a warning to the result.
    pub fn add_warning(&mut self, warning: ValidationWarning) {
        self.warnings.push(warning);
    }

    /// Appends everything from another result.
    pub fn merge(&mut self, other: ValidationResult) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }

    /// Returns true if there are no errors.
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    /// Whether any error carries the given code.
    pub fn has_error(&self, code: ErrorCode) -> bool {
        self.errors.iter().any(|e| e.code == code)
    }

    /// Whether any warning carries the given code.
    pub fn has_warning(&self, code: WarningCode) -> bool {
        self.warnings.iter().any(|w| w.code == code)
    }

    /// Converts to a Result, returning Err if there are errors.
    pub fn into_result(self) -> Result<Vec<ValidationWarning>, Vec<ValidationError>> {
        if self.is_ok() {
            Ok(self.warnings)
        } else {
            Err(self.errors)
        }
    }
}

/// Common trait for engine-side errors.
///
/// Gives every engine error a stable code and a category so hosts can report
/// failures uniformly without depending on the engine crate's error enum.
pub trait BackendError: std::error::Error {
    /// Stable error code, e.g. "COMPOSE_001".
    fn code(&self) -> &'static str;

    /// Human-readable message; defaults to `Display`.
    fn message(&self) -> String {
        self.to_string()
    }

    /// Error category, e.g. "compose".
    fn category(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_with_path() {
        let err = ValidationError::with_path(
            ErrorCode::WeightOutOfRange,
            "style_weight must be in [0, 10], got 11",
            "params.style_weight",
        );
        assert_eq!(
            err.to_string(),
            "E010: style_weight must be in [0, 10], got 11 (at params.style_weight)"
        );
    }

    #[test]
    fn test_result_into_result() {
        let mut result = ValidationResult::success();
        result.add_warning(ValidationWarning::new(WarningCode::UnevenBands, "uneven"));
        assert!(result.is_ok());
        assert_eq!(result.clone().into_result().unwrap().len(), 1);

        result.add_error(ValidationError::new(ErrorCode::InvalidJobId, "bad id"));
        assert!(!result.is_ok());
        assert!(result.has_error(ErrorCode::InvalidJobId));
        assert_eq!(result.into_result().unwrap_err().len(), 1);
    }

    #[test]
    fn test_codes_are_unique() {
        let codes = [
            ErrorCode::UnsupportedJobVersion,
            ErrorCode::InvalidJobId,
            ErrorCode::InconsistentTensor,
            ErrorCode::NonFiniteTensor,
            ErrorCode::InvalidTensorRank,
            ErrorCode::EmptyConditioning,
            ErrorCode::FeatureDimTooSmall,
            ErrorCode::FeatureDimMismatch,
            ErrorCode::EmptyTensor,
            ErrorCode::WeightOutOfRange,
            ErrorCode::ThresholdOutOfRange,
            ErrorCode::EnhancementBaseOutOfRange,
            ErrorCode::EnhancementFactorOutOfRange,
            ErrorCode::MissingTextConditioning,
            ErrorCode::MissingAuxiliary,
            ErrorCode::IncompleteAuxiliary,
            ErrorCode::InvalidProjector,
        ];
        let mut strings: Vec<_> = codes.iter().map(|c| c.code()).collect();
        strings.sort();
        strings.dedup();
        assert_eq!(strings.len(), codes.len());
    }
}
