//! Composite text/image band similarity.
//!
//! Four metrics are computed per batch element and blended with fixed
//! weights:
//!
//! | metric | per element |
//! |---|---|
//! | cosine | `t·i / (max(‖t‖, ε) · max(‖i‖, ε))` |
//! | inverse distance | `1 / (1 + ‖t − i‖)` |
//! | bounded dot | `tanh(t·i)` |
//! | attention | mean over keys of `softmax_k(t·i_k / √w)` |
//!
//! The blended per-element scores are averaged into one scalar for the band,
//! so one decision covers the whole batch.

use tracing::trace;

use crate::error::{ComposeError, ComposeResult};
use crate::tensor::{broadcast_batch, BatchedEmbedding};

/// Norm floor for cosine similarity.
const COSINE_EPS: f64 = 1e-8;

/// Mixing weights of the four similarity metrics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricWeights {
    /// Weight of cosine similarity.
    pub cosine: f64,
    /// Weight of inverse L2 distance.
    pub inverse_distance: f64,
    /// Weight of the tanh-bounded dot product.
    pub bounded_dot: f64,
    /// Weight of the mean attention weight.
    pub attention: f64,
}

impl Default for MetricWeights {
    fn default() -> Self {
        Self {
            cosine: 0.4,
            inverse_distance: 0.2,
            bounded_dot: 0.2,
            attention: 0.2,
        }
    }
}

/// Batch-averaged values of each metric for one band pair.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SimilarityBreakdown {
    /// Mean cosine similarity.
    pub cosine: f64,
    /// Mean inverse L2 distance similarity.
    pub inverse_distance: f64,
    /// Mean bounded dot product.
    pub bounded_dot: f64,
    /// Mean attention weight.
    pub attention: f64,
}

impl SimilarityBreakdown {
    /// Blends the metrics into one score.
    ///
    /// Because every metric is averaged over the batch and the blend is
    /// linear, this equals the batch mean of the per-element composites.
    pub fn composite(&self, weights: &MetricWeights) -> f64 {
        weights.cosine * self.cosine
            + weights.inverse_distance * self.inverse_distance
            + weights.bounded_dot * self.bounded_dot
            + weights.attention * self.attention
    }
}

/// Scores how similar a text-derived band is to an image-derived band.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SimilarityScorer {
    weights: MetricWeights,
}

impl SimilarityScorer {
    /// Creates a scorer with the standard 0.4 / 0.2 / 0.2 / 0.2 blend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a scorer with custom mixing weights.
    pub fn with_weights(weights: MetricWeights) -> Self {
        Self { weights }
    }

    /// The mixing weights.
    pub fn weights(&self) -> &MetricWeights {
        &self.weights
    }

    /// Composite similarity of `text` against `image`, one scalar for the batch.
    pub fn score(&self, text: &BatchedEmbedding, image: &BatchedEmbedding) -> ComposeResult<f64> {
        Ok(self.breakdown(text, image)?.composite(&self.weights))
    }

    /// Per-metric batch means of `text` against `image`.
    ///
    /// Either operand may have batch size 1 and is then broadcast to the
    /// other's batch size. Feature widths must match.
    pub fn breakdown(
        &self,
        text: &BatchedEmbedding,
        image: &BatchedEmbedding,
    ) -> ComposeResult<SimilarityBreakdown> {
        if text.dim() != image.dim() {
            return Err(ComposeError::shape(format!(
                "cannot score width {} text against width {} image",
                text.dim(),
                image.dim()
            )));
        }
        let batch = broadcast_batch(text.batch_size(), image.batch_size())?;
        let text = text.broadcast_to(batch)?;
        let image = image.broadcast_to(batch)?;

        let mut sum = SimilarityBreakdown::default();
        for (b, (t, i)) in text.rows().zip(image.rows()).enumerate() {
            let d = dot(t, i);
            sum.cosine += d / (norm(t).max(COSINE_EPS) * norm(i).max(COSINE_EPS));
            sum.inverse_distance += 1.0 / (1.0 + distance(t, i));
            sum.bounded_dot += d.tanh();
            sum.attention += mean_attention(t, &image);
            trace!(element = b, dot = d, "scored batch element");
        }

        let n = batch as f64;
        let mean = SimilarityBreakdown {
            cosine: sum.cosine / n,
            inverse_distance: sum.inverse_distance / n,
            bounded_dot: sum.bounded_dot / n,
            attention: sum.attention / n,
        };
        trace!(?mean, "similarity breakdown");
        Ok(mean)
    }
}

fn dot(a: &[f32], b: &[f32]) -> f64 {
    a.iter().zip(b).map(|(x, y)| *x as f64 * *y as f64).sum()
}

fn norm(a: &[f32]) -> f64 {
    dot(a, a).sqrt()
}

fn distance(a: &[f32], b: &[f32]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let d = *x as f64 - *y as f64;
            d * d
        })
        .sum::<f64>()
        .sqrt()
}

/// Mean over keys of the scaled dot-product attention weights of `query`
/// against every row of `keys`.
///
/// The softmax weights sum to one, so this is `1 / keys.batch_size()` up to
/// rounding.
fn mean_attention(query: &[f32], keys: &BatchedEmbedding) -> f64 {
    let scale = (keys.dim() as f64).sqrt();
    let logits: Vec<f64> = keys.rows().map(|k| dot(query, k) / scale).collect();
    let max = logits.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = logits.iter().map(|l| (l - max).exp()).collect();
    let total: f64 = exps.iter().sum();
    exps.iter().map(|e| e / total).sum::<f64>() / exps.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    fn vector(values: &[f32]) -> BatchedEmbedding {
        BatchedEmbedding::from_vector(values.to_vec()).unwrap()
    }

    #[test]
    fn test_identical_vectors() {
        let v = vector(&[0.6, 0.8]);
        let b = SimilarityScorer::new().breakdown(&v, &v).unwrap();
        assert!(approx(b.cosine, 1.0));
        assert!(approx(b.inverse_distance, 1.0));
        assert!(approx(b.bounded_dot, 1.0f64.tanh()));
        assert!(approx(b.attention, 1.0));

        let score = SimilarityScorer::new().score(&v, &v).unwrap();
        assert!(approx(score, 0.4 + 0.2 + 0.2 * 1.0f64.tanh() + 0.2));
    }

    #[test]
    fn test_orthogonal_vectors() {
        let t = vector(&[1.0, 0.0]);
        let i = vector(&[0.0, 1.0]);
        let b = SimilarityScorer::new().breakdown(&t, &i).unwrap();
        assert!(approx(b.cosine, 0.0));
        assert!(approx(b.inverse_distance, 1.0 / (1.0 + 2.0f64.sqrt())));
        assert!(approx(b.bounded_dot, 0.0));
    }

    #[test]
    fn test_zero_vector_cosine_is_finite() {
        let z = vector(&[0.0, 0.0, 0.0]);
        let b = SimilarityScorer::new().breakdown(&z, &z).unwrap();
        assert_eq!(b.cosine, 0.0);
        assert!(approx(b.inverse_distance, 1.0));
    }

    #[test]
    fn test_attention_is_uniform_over_keys() {
        let text = vector(&[1.0, 2.0, 3.0]);
        let image = BatchedEmbedding::from_rows(&[
            vec![1.0, 0.0, 0.0],
            vec![0.0, 5.0, 0.0],
            vec![-1.0, 0.0, 2.0],
            vec![0.0, 0.0, 0.0],
        ])
        .unwrap();
        let b = SimilarityScorer::new().breakdown(&text, &image).unwrap();
        assert!(approx(b.attention, 0.25));
    }

    #[test]
    fn test_broadcast_text_matches_repeated_text() {
        let text = vector(&[0.5, -0.25]);
        let image = BatchedEmbedding::from_rows(&[vec![1.0, 0.0], vec![0.2, 0.9]]).unwrap();
        let repeated = BatchedEmbedding::from_rows(&[vec![0.5, -0.25], vec![0.5, -0.25]]).unwrap();

        let scorer = SimilarityScorer::new();
        assert_eq!(
            scorer.score(&text, &image).unwrap(),
            scorer.score(&repeated, &image).unwrap()
        );
    }

    #[test]
    fn test_batch_and_width_errors() {
        let scorer = SimilarityScorer::new();
        let two = BatchedEmbedding::from_rows(&[vec![1.0, 0.0], vec![0.0, 1.0]]).unwrap();
        let three = BatchedEmbedding::new(3, 2, vec![0.0; 6]).unwrap();
        assert_eq!(
            scorer.score(&two, &three),
            Err(ComposeError::BatchSizeMismatch { left: 2, right: 3 })
        );
        assert!(matches!(
            scorer.score(&vector(&[1.0]), &vector(&[1.0, 2.0])),
            Err(ComposeError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_custom_weights() {
        let scorer = SimilarityScorer::with_weights(MetricWeights {
            cosine: 1.0,
            inverse_distance: 0.0,
            bounded_dot: 0.0,
            attention: 0.0,
        });
        let score = scorer
            .score(&vector(&[3.0, 4.0]), &vector(&[6.0, 8.0]))
            .unwrap();
        assert!(approx(score, 1.0));
    }
}
