//! Tensor payloads as they appear in job documents.

use serde::{Deserialize, Serialize};

/// A dense row-major `f32` tensor with an explicit shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TensorData {
    /// Dimension sizes, outermost first.
    pub shape: Vec<usize>,
    /// Row-major values; length must equal the product of `shape`.
    pub data: Vec<f32>,
}

impl TensorData {
    /// Creates a tensor payload without checking consistency.
    pub fn new(shape: Vec<usize>, data: Vec<f32>) -> Self {
        Self { shape, data }
    }

    /// Number of elements implied by the shape, or `None` on overflow.
    pub fn numel(&self) -> Option<usize> {
        self.shape
            .iter()
            .try_fold(1usize, |acc, &dim| acc.checked_mul(dim))
    }

    /// Rank of the tensor.
    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    /// Size of the last (feature) dimension, if any.
    pub fn feature_dim(&self) -> Option<usize> {
        self.shape.last().copied()
    }

    /// Whether the data length agrees with the shape.
    pub fn is_consistent(&self) -> bool {
        self.numel() == Some(self.data.len())
    }

    /// Whether every value is finite.
    pub fn all_finite(&self) -> bool {
        self.data.iter().all(|v| v.is_finite())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numel_and_consistency() {
        let t = TensorData::new(vec![1, 2, 3], vec![0.0; 6]);
        assert_eq!(t.numel(), Some(6));
        assert!(t.is_consistent());
        assert_eq!(t.feature_dim(), Some(3));

        let bad = TensorData::new(vec![2, 2], vec![0.0; 3]);
        assert!(!bad.is_consistent());
    }

    #[test]
    fn test_numel_overflow() {
        let t = TensorData::new(vec![usize::MAX, 2], vec![]);
        assert_eq!(t.numel(), None);
        assert!(!t.is_consistent());
    }

    #[test]
    fn test_all_finite() {
        assert!(TensorData::new(vec![2], vec![1.0, 2.0]).all_finite());
        assert!(!TensorData::new(vec![2], vec![1.0, f32::NAN]).all_finite());
    }
}
