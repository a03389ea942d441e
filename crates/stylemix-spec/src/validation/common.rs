//! Range and tensor checks shared by parameter and job validation.

use crate::tensor::TensorData;

/// Validate that a value is within `[min, max]`.
///
/// Returns a message suitable for a [`ValidationError`](crate::ValidationError)
/// when the value is not finite or out of range.
///
/// # Example
/// ```
/// use stylemix_spec::validation::common::validate_range;
///
/// assert!(validate_range("enhancement_base", 1.5, 1.0, 3.0).is_ok());
/// assert!(validate_range("enhancement_base", 0.5, 1.0, 3.0).is_err());
/// ```
pub fn validate_range(name: &str, value: f64, min: f64, max: f64) -> Result<(), String> {
    if !value.is_finite() {
        return Err(format!("{} must be finite, got {}", name, value));
    }
    if value < min || value > max {
        return Err(format!(
            "{} must be in [{}, {}], got {}",
            name, min, max, value
        ));
    }
    Ok(())
}

/// Shape problems found in a tensor payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TensorIssue {
    /// Rank is not one of the accepted ranks.
    Rank { accepted: Vec<usize>, actual: usize },
    /// Data length does not match the shape.
    Inconsistent { expected: Option<usize>, actual: usize },
    /// Some value is NaN or infinite.
    NonFinite,
}

impl std::fmt::Display for TensorIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TensorIssue::Rank { accepted, actual } => {
                write!(f, "rank must be one of {:?}, got {}", accepted, actual)
            }
            TensorIssue::Inconsistent {
                expected: Some(expected),
                actual,
            } => write!(
                f,
                "shape implies {} values but data has {}",
                expected, actual
            ),
            TensorIssue::Inconsistent {
                expected: None,
                actual,
            } => write!(f, "shape overflows, data has {} values", actual),
            TensorIssue::NonFinite => write!(f, "data contains NaN or infinite values"),
        }
    }
}

/// Check a tensor payload's rank, length, and values.
///
/// Reports the first problem found: rank, then consistency, then finiteness.
pub fn check_tensor(tensor: &TensorData, accepted_ranks: &[usize]) -> Result<(), TensorIssue> {
    if !accepted_ranks.contains(&tensor.rank()) {
        return Err(TensorIssue::Rank {
            accepted: accepted_ranks.to_vec(),
            actual: tensor.rank(),
        });
    }
    if !tensor.is_consistent() {
        return Err(TensorIssue::Inconsistent {
            expected: tensor.numel(),
            actual: tensor.data.len(),
        });
    }
    if !tensor.all_finite() {
        return Err(TensorIssue::NonFinite);
    }
    Ok(())
}
