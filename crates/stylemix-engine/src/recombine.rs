//! Band recombination strategies.
//!
//! Two laws exist and they are separate types:
//!
//! - [`ConcatRecombiner`] scales each band and concatenates them in band
//!   order. The output width is the sum of the band widths, which is `D`.
//! - [`MeanFusionRecombiner`] scales each band's fused feature and averages
//!   the five contributions. Every contribution must have the same width.

use std::fmt;

use stylemix_spec::{BandMap, BandName, BAND_COUNT};

use crate::error::{ComposeError, ComposeResult};
use crate::policy::BandDecision;
use crate::tensor::BatchedEmbedding;

/// Turns per-band decisions and weights into one embedding batch.
pub trait Recombiner: fmt::Debug + Send + Sync {
    /// Short strategy name for logs and reports.
    fn name(&self) -> &'static str;

    /// Recombines the five bands.
    fn recombine(
        &self,
        decisions: &BandMap<BandDecision>,
        weights: &BandMap<f64>,
    ) -> ComposeResult<BatchedEmbedding>;
}

/// Scale-then-concatenate law.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConcatRecombiner;

impl Recombiner for ConcatRecombiner {
    fn name(&self) -> &'static str {
        "concat"
    }

    fn recombine(
        &self,
        decisions: &BandMap<BandDecision>,
        weights: &BandMap<f64>,
    ) -> ComposeResult<BatchedEmbedding> {
        let scaled: Vec<BatchedEmbedding> = decisions
            .iter()
            .map(|(band, decision)| decision.feature().scaled(decision.factor(weights[band]) as f32))
            .collect();
        let parts: Vec<&BatchedEmbedding> = scaled.iter().collect();
        BatchedEmbedding::concat_features(&parts)
    }
}

/// Scale-then-average law.
#[derive(Debug, Clone, Copy, Default)]
pub struct MeanFusionRecombiner;

impl Recombiner for MeanFusionRecombiner {
    fn name(&self) -> &'static str {
        "mean_fusion"
    }

    fn recombine(
        &self,
        decisions: &BandMap<BandDecision>,
        weights: &BandMap<f64>,
    ) -> ComposeResult<BatchedEmbedding> {
        let first = decisions[BandName::Style].feature();
        let (batch, dim) = (first.batch_size(), first.dim());

        let mut sum = vec![0.0f32; batch * dim];
        for (band, decision) in decisions.iter() {
            let feature = decision.feature();
            if feature.batch_size() != batch {
                return Err(ComposeError::BatchSizeMismatch {
                    left: batch,
                    right: feature.batch_size(),
                });
            }
            if feature.dim() != dim {
                return Err(ComposeError::shape(format!(
                    "{} contribution has width {}, expected {}",
                    band,
                    feature.dim(),
                    dim
                )));
            }
            let factor = decision.factor(weights[band]) as f32;
            for (acc, v) in sum.iter_mut().zip(feature.as_slice()) {
                *acc += v * factor;
            }
        }

        let n = BAND_COUNT as f32;
        sum.iter_mut().for_each(|v| *v /= n);
        BatchedEmbedding::new(batch, dim, sum)
    }
}
