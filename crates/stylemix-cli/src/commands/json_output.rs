//! JSON output types for machine-readable CLI output.
//!
//! These types back the `--json` flag on `apply` and `validate`, and the
//! report written by `batch`.

use serde::{Deserialize, Serialize};
use stylemix_spec::{BackendError, ValidationError, ValidationWarning};

use crate::dispatch::JobOutcome;
use crate::input::InputError;

/// Error codes for CLI operations.
///
/// These codes are stable and can be used for programmatic error handling.
/// Format: CLI_XXX for CLI-level errors, or passes through validation and
/// engine error codes.
pub mod error_codes {
    /// File could not be read
    pub const FILE_READ: &str = "CLI_001";
    /// Unknown file extension
    pub const UNKNOWN_EXTENSION: &str = "CLI_002";
    /// JSON parse error
    pub const JSON_PARSE: &str = "CLI_003";
    /// Output could not be written
    pub const FILE_WRITE: &str = "CLI_004";
    /// JSON serialization error
    pub const JSON_SERIALIZE: &str = "CLI_005";
}

/// A structured error in JSON output.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct JsonError {
    /// Stable error code (e.g., "CLI_001", "E001", "COMPOSE_002")
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// JSON path to the problematic field (if applicable)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Source file path (if applicable)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

impl JsonError {
    /// Creates a new error with code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            path: None,
            file: None,
        }
    }

    /// Sets the JSON path for this error.
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Sets the file path for this error.
    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }
}

/// A structured warning in JSON output.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct JsonWarning {
    /// Stable warning code (e.g., "W001")
    pub code: String,
    /// Human-readable warning message
    pub message: String,
    /// JSON path to the problematic field (if applicable)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

/// JSON output for the `validate` command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidateOutput {
    /// Whether validation succeeded (no errors)
    pub success: bool,
    /// Validation errors
    pub errors: Vec<JsonError>,
    /// Validation warnings
    pub warnings: Vec<JsonWarning>,
    /// Job ID from the document
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
    /// Canonical params hash
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params_hash: Option<String>,
    /// BLAKE3 hash of the source file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_hash: Option<String>,
}

impl ValidateOutput {
    /// Creates a failed validate output.
    pub fn failure(errors: Vec<JsonError>, warnings: Vec<JsonWarning>) -> Self {
        Self {
            success: false,
            errors,
            warnings,
            job_id: None,
            params_hash: None,
            source_hash: None,
        }
    }
}

/// JSON output for the `apply` command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplyOutput {
    /// Whether the job ran
    pub success: bool,
    /// Errors encountered
    pub errors: Vec<JsonError>,
    /// Validation warnings
    pub warnings: Vec<JsonWarning>,
    /// Run summary (on success)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ApplyResult>,
}

impl ApplyOutput {
    /// Creates a successful apply output.
    pub fn success(result: ApplyResult, warnings: Vec<JsonWarning>) -> Self {
        Self {
            success: true,
            errors: Vec::new(),
            warnings,
            result: Some(result),
        }
    }

    /// Creates a failed apply output.
    pub fn failure(errors: Vec<JsonError>, warnings: Vec<JsonWarning>) -> Self {
        Self {
            success: false,
            errors,
            warnings,
            result: None,
        }
    }
}

/// Summary of an `apply` run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplyResult {
    /// Job ID
    pub job_id: String,
    /// Composition mode
    pub mode: String,
    /// Recombination law
    pub recombiner: String,
    /// Canonical params hash
    pub params_hash: String,
    /// Hash of the composed vector
    pub output_hash: String,
    /// BLAKE3 hash of the job file
    pub source_hash: String,
    /// Bands that were replaced
    pub replaced_bands: Vec<String>,
    /// Where the full outcome was written
    pub output_path: String,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

impl ApplyResult {
    /// Summarizes an outcome.
    pub fn from_outcome(
        outcome: &JobOutcome,
        source_hash: String,
        output_path: String,
        duration_ms: u64,
    ) -> Self {
        Self {
            job_id: outcome.job_id.clone(),
            mode: outcome.mode.to_string(),
            recombiner: outcome.recombiner.clone(),
            params_hash: outcome.params_hash.clone(),
            output_hash: outcome.output_hash.clone(),
            source_hash,
            replaced_bands: outcome
                .bands
                .iter()
                .filter(|b| b.replaced)
                .map(|b| b.band.to_string())
                .collect(),
            output_path,
            duration_ms,
        }
    }
}

/// Converts an input error to a JSON error.
pub fn input_error_to_json(error: &InputError, file: Option<&str>) -> JsonError {
    let code = match error {
        InputError::FileRead { .. } => error_codes::FILE_READ,
        InputError::UnknownExtension { .. } => error_codes::UNKNOWN_EXTENSION,
        InputError::JsonParse { .. } => error_codes::JSON_PARSE,
    };
    let mut json_error = JsonError::new(code, error.to_string());
    if let Some(f) = file {
        json_error = json_error.with_file(f);
    }
    json_error
}

/// Converts a validation error to a JSON error.
pub fn validation_error_to_json(error: &ValidationError) -> JsonError {
    let mut json_error = JsonError::new(error.code.code(), &error.message);
    if let Some(path) = &error.path {
        json_error = json_error.with_path(path);
    }
    json_error
}

/// Converts a validation warning to a JSON warning.
pub fn validation_warning_to_json(warning: &ValidationWarning) -> JsonWarning {
    JsonWarning {
        code: warning.code.code().to_string(),
        message: warning.message.clone(),
        path: warning.path.clone(),
    }
}

/// Converts any backend error to a JSON error, keeping its stable code.
pub fn backend_error_to_json(error: &dyn BackendError) -> JsonError {
    JsonError::new(error.code(), error.message())
}

/// Prints `value` as pretty JSON on stdout.
pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{}", json);
    Ok(())
}
