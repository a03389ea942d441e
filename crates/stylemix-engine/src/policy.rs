//! Per-band keep/replace decisions.
//!
//! Decisions are plain values computed up front and handed to a
//! [`Recombiner`](crate::recombine::Recombiner) in one step.

use crate::tensor::BatchedEmbedding;

/// What the recombiner does with one band.
#[derive(Debug, Clone, PartialEq)]
pub enum BandDecision {
    /// Keep the original band; it is scaled by the band weight alone.
    Keep(BatchedEmbedding),
    /// Substitute a cross-modal feature, scaled by `weight * enhancement`.
    Replace {
        /// The substitute feature, already matched to the band's width.
        projected: BatchedEmbedding,
        /// Multiplier applied on top of the band weight.
        enhancement: f64,
    },
}

impl BandDecision {
    /// Whether the band was replaced.
    pub fn is_replaced(&self) -> bool {
        matches!(self, BandDecision::Replace { .. })
    }

    /// The feature the recombiner will scale.
    pub fn feature(&self) -> &BatchedEmbedding {
        match self {
            BandDecision::Keep(original) => original,
            BandDecision::Replace { projected, .. } => projected,
        }
    }

    /// Total multiplier for this band given its weight.
    pub fn factor(&self, weight: f64) -> f64 {
        match self {
            BandDecision::Keep(_) => weight,
            BandDecision::Replace { enhancement, .. } => weight * enhancement,
        }
    }
}

/// Whether `score` clears `threshold`. The comparison is strict.
#[inline]
pub fn exceeds_threshold(score: f64, threshold: f64) -> bool {
    score > threshold
}

/// Decides one band from its batch-level similarity score.
///
/// The same decision applies to every element of the batch.
pub fn decide(
    original: BatchedEmbedding,
    projected: BatchedEmbedding,
    score: f64,
    threshold: f64,
    enhancement: f64,
) -> BandDecision {
    if exceeds_threshold(score, threshold) {
        BandDecision::Replace {
            projected,
            enhancement,
        }
    } else {
        BandDecision::Keep(original)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(x: f32) -> BatchedEmbedding {
        BatchedEmbedding::from_vector(vec![x]).unwrap()
    }

    #[test]
    fn test_equal_score_keeps() {
        let d = decide(v(1.0), v(2.0), 0.7, 0.7, 1.5);
        assert_eq!(d, BandDecision::Keep(v(1.0)));
        assert_eq!(d.factor(2.0), 2.0);
    }

    #[test]
    fn test_higher_score_replaces() {
        let d = decide(v(1.0), v(2.0), 0.7 + 1e-9, 0.7, 1.5);
        assert!(d.is_replaced());
        assert_eq!(d.feature(), &v(2.0));
        assert_eq!(d.factor(2.0), 3.0);
    }
}
