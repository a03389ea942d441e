//! Parameter and job validation.
//!
//! Validation is where declared ranges are enforced. The engine assumes its
//! inputs already passed these checks and never clamps values itself.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;

use crate::band::{BandName, BAND_COUNT};
use crate::error::{
    ErrorCode, ValidationError, ValidationResult, ValidationWarning, WarningCode,
};
use crate::job::{ConditioningSpec, JobSpec, ProjectorSpec, JOB_VERSION};
use crate::params::ComposeParams;
use crate::schema::{
    ENHANCEMENT_BASE_RANGE, ENHANCEMENT_FACTOR_RANGE, THRESHOLD_RANGE, WEIGHT_RANGE,
};
use crate::tensor::TensorData;

pub mod common;


use common::{check_tensor, validate_range, TensorIssue};

/// Regex pattern for valid job_id.
///
/// Rules:
/// - Must start with a lowercase letter
/// - Can contain lowercase letters, digits, underscores, and hyphens
/// - Length: 3-64 characters
pub const JOB_ID_PATTERN: &str = r"^[a-z][a-z0-9_-]{2,63}$";

static JOB_ID_REGEX: OnceLock<Regex> = OnceLock::new();

fn job_id_regex() -> &'static Regex {
    JOB_ID_REGEX.get_or_init(|| Regex::new(JOB_ID_PATTERN).expect("invalid regex pattern"))
}

/// Checks if a job_id is valid.
pub fn is_valid_job_id(job_id: &str) -> bool {
    job_id_regex().is_match(job_id)
}

/// Validates composition parameters against their declared ranges.
///
/// Errors carry paths relative to the params object (e.g. `style_weight`).
pub fn validate_params(params: &ComposeParams) -> ValidationResult {
    let mut result = ValidationResult::success();

    for band in BandName::ALL {
        let name = band.weight_param();
        if let Err(message) =
            validate_range(name, params.weight(band), WEIGHT_RANGE.0, WEIGHT_RANGE.1)
        {
            result.add_error(ValidationError::with_path(
                ErrorCode::WeightOutOfRange,
                message,
                name,
            ));
        }
    }

    if let Err(message) = validate_range(
        "similarity_threshold",
        params.similarity_threshold,
        THRESHOLD_RANGE.0,
        THRESHOLD_RANGE.1,
    ) {
        result.add_error(ValidationError::with_path(
            ErrorCode::ThresholdOutOfRange,
            message,
            "similarity_threshold",
        ));
    }

    if let Err(message) = validate_range(
        "enhancement_base",
        params.enhancement_base,
        ENHANCEMENT_BASE_RANGE.0,
        ENHANCEMENT_BASE_RANGE.1,
    ) {
        result.add_error(ValidationError::with_path(
            ErrorCode::EnhancementBaseOutOfRange,
            message,
            "enhancement_base",
        ));
    }

    for band in BandName::ALL {
        let path = format!("enhancement_factors.{}", band);
        if let Err(message) = validate_range(
            &path,
            params.enhancement_factors.get(band),
            ENHANCEMENT_FACTOR_RANGE.0,
            ENHANCEMENT_FACTOR_RANGE.1,
        ) {
            result.add_error(ValidationError::with_path(
                ErrorCode::EnhancementFactorOutOfRange,
                message,
                path,
            ));
        }
    }

    if BandName::ALL.iter().all(|&band| params.weight(band) == 0.0) {
        result.add_warning(ValidationWarning::new(
            WarningCode::AllWeightsZero,
            "every band weight is zero; the composed vector will be all zeros",
        ));
    }

    result
}

/// Validates a complete job: document fields, parameters, tensor shapes, and
/// the inputs the selected mode needs.
pub fn validate_job(job: &JobSpec) -> ValidationResult {
    let mut result = ValidationResult::success();

    if job.job_version != JOB_VERSION {
        result.add_error(ValidationError::with_path(
            ErrorCode::UnsupportedJobVersion,
            format!(
                "job_version must be {}, got {}",
                JOB_VERSION, job.job_version
            ),
            "job_version",
        ));
    }

    if !is_valid_job_id(&job.job_id) {
        result.add_error(ValidationError::with_path(
            ErrorCode::InvalidJobId,
            format!(
                "job_id '{}' does not match pattern {}",
                job.job_id, JOB_ID_PATTERN
            ),
            "job_id",
        ));
    }

    let params = validate_params(&job.params);
    for mut error in params.errors {
        error.path = error.path.map(|p| format!("params.{}", p));
        result.add_error(error);
    }
    result.warnings.extend(params.warnings);

    let feature_dim = validate_style_embedding(&job.style_embedding, &mut result);

    validate_conditioning_list(
        &job.conditioning,
        "conditioning",
        feature_dim,
        &mut result,
    );

    match (&job.text_conditioning, job.mode.requires_text()) {
        (Some(text), true) => {
            validate_conditioning_list(text, "text_conditioning", None, &mut result);
            for (i, entry) in text.iter().enumerate() {
                if let Some(dim) = entry.embedding.feature_dim() {
                    if dim < BAND_COUNT {
                        result.add_error(ValidationError::with_path(
                            ErrorCode::FeatureDimTooSmall,
                            format!(
                                "text feature dimension must be at least {}, got {}",
                                BAND_COUNT, dim
                            ),
                            format!("text_conditioning[{}].embedding", i),
                        ));
                    }
                }
            }
        }
        (None, true) => result.add_error(ValidationError::with_path(
            ErrorCode::MissingTextConditioning,
            format!("mode '{}' requires text_conditioning", job.mode),
            "text_conditioning",
        )),
        (Some(_), false) => result.add_warning(ValidationWarning::with_path(
            WarningCode::UnusedTextConditioning,
            format!("mode '{}' ignores text_conditioning", job.mode),
            "text_conditioning",
        )),
        (None, false) => {}
    }

    match (&job.auxiliary, job.mode.requires_auxiliary()) {
        (Some(aux), true) => {
            validate_auxiliary_table(&aux.primary, "auxiliary.primary", &mut result);
            if let Some(secondary) = &aux.secondary {
                validate_auxiliary_table(secondary, "auxiliary.secondary", &mut result);
            }
        }
        (None, true) => result.add_error(ValidationError::with_path(
            ErrorCode::MissingAuxiliary,
            format!("mode '{}' requires auxiliary embeddings", job.mode),
            "auxiliary",
        )),
        (Some(_), false) => result.add_warning(ValidationWarning::with_path(
            WarningCode::UnusedAuxiliary,
            format!("mode '{}' ignores auxiliary embeddings", job.mode),
            "auxiliary",
        )),
        (None, false) => {}
    }

    if let (ProjectorSpec::Layers { layers }, Some(dim)) = (&job.projector, feature_dim) {
        validate_projector_layers(layers, dim, &mut result);
    }

    result
}

/// Returns the style feature dimension when the embedding is usable.
fn validate_style_embedding(tensor: &TensorData, result: &mut ValidationResult) -> Option<usize> {
    if let Err(issue) = check_tensor(tensor, &[2, 3]) {
        result.add_error(tensor_issue_error(&issue, "style_embedding"));
        return None;
    }

    let (dim, leading) = tensor.shape.split_last()?;
    let dim = *dim;
    if leading.contains(&0) {
        result.add_error(ValidationError::with_path(
            ErrorCode::EmptyTensor,
            format!(
                "style embedding shape {:?} has an empty batch or sequence axis",
                tensor.shape
            ),
            "style_embedding",
        ));
        return None;
    }
    if dim < BAND_COUNT {
        result.add_error(ValidationError::with_path(
            ErrorCode::FeatureDimTooSmall,
            format!(
                "style feature dimension must be at least {}, got {}",
                BAND_COUNT, dim
            ),
            "style_embedding",
        ));
        return None;
    }
    if dim % BAND_COUNT != 0 {
        result.add_warning(ValidationWarning::with_path(
            WarningCode::UnevenBands,
            format!(
                "feature dimension {} is not a multiple of {}; texture band takes {} extra",
                dim,
                BAND_COUNT,
                dim % BAND_COUNT
            ),
            "style_embedding",
        ));
    }
    Some(dim)
}

fn validate_conditioning_list(
    entries: &[ConditioningSpec],
    name: &str,
    feature_dim: Option<usize>,
    result: &mut ValidationResult,
) {
    if entries.is_empty() {
        result.add_error(ValidationError::with_path(
            ErrorCode::EmptyConditioning,
            format!("{} must contain at least one entry", name),
            name,
        ));
        return;
    }

    for (i, entry) in entries.iter().enumerate() {
        let path = format!("{}[{}].embedding", name, i);
        if let Err(issue) = check_tensor(&entry.embedding, &[3]) {
            result.add_error(tensor_issue_error(&issue, &path));
            continue;
        }
        if let (Some(expected), Some(actual)) = (feature_dim, entry.embedding.feature_dim()) {
            if expected != actual {
                result.add_error(ValidationError::with_path(
                    ErrorCode::FeatureDimMismatch,
                    format!(
                        "feature width {} differs from style embedding width {}",
                        actual, expected
                    ),
                    path,
                ));
            }
        }
    }
}

fn validate_auxiliary_table(
    table: &BTreeMap<BandName, TensorData>,
    name: &str,
    result: &mut ValidationResult,
) {
    for band in BandName::ALL {
        let path = format!("{}.{}", name, band);
        match table.get(&band) {
            Some(tensor) => {
                if let Err(issue) = check_tensor(tensor, &[1, 2]) {
                    result.add_error(tensor_issue_error(&issue, &path));
                }
            }
            None => result.add_error(ValidationError::with_path(
                ErrorCode::IncompleteAuxiliary,
                format!("missing auxiliary embedding for band '{}'", band),
                path,
            )),
        }
    }
}

fn validate_projector_layers(
    layers: &BTreeMap<BandName, crate::job::LinearSpec>,
    dim: usize,
    result: &mut ValidationResult,
) {
    for band in BandName::ALL {
        let path = format!("projector.layers.{}", band);
        let Some(layer) = layers.get(&band) else {
            result.add_error(ValidationError::with_path(
                ErrorCode::InvalidProjector,
                format!("missing projection layer for band '{}'", band),
                path,
            ));
            continue;
        };
        let Some(weight_count) = dim.checked_mul(dim) else {
            result.add_error(ValidationError::with_path(
                ErrorCode::InvalidProjector,
                format!("a [{} -> {}] projection layer is too large", dim, dim),
                path,
            ));
            continue;
        };
        if layer.weights.len() != weight_count || layer.bias.len() != dim {
            result.add_error(ValidationError::with_path(
                ErrorCode::InvalidProjector,
                format!(
                    "layer must have {} weights and {} biases, got {} and {}",
                    weight_count,
                    dim,
                    layer.weights.len(),
                    layer.bias.len()
                ),
                path,
            ));
        }
    }
}

fn tensor_issue_error(issue: &TensorIssue, path: &str) -> ValidationError {
    let code = match issue {
        TensorIssue::Rank { .. } => ErrorCode::InvalidTensorRank,
        TensorIssue::Inconsistent { .. } => ErrorCode::InconsistentTensor,
        TensorIssue::NonFinite => ErrorCode::NonFiniteTensor,
    };
    ValidationError::with_path(code, issue.to_string(), path)
}
