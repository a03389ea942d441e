//! The composition pipeline.
//!
//! [`StyleComposer`] runs split → (project / score / decide) → weight →
//! recombine → append. The variant is fixed at construction:
//!
//! - [`StyleComposer::weighted`]: every band is kept and scaled by its weight.
//! - [`StyleComposer::threshold`]: bands whose text similarity exceeds the
//!   threshold are replaced by the text band, scaled by
//!   `weight * enhancement_base * enhancement_factor`.
//! - [`StyleComposer::fusion`]: each band's projected image features are
//!   averaged with auxiliary embeddings and the five bands are mean-fused.

use std::ops::Range;

use stylemix_spec::{BandMap, BandName, ComposeParams, CompositionMode};
use tracing::debug;

use crate::compose::{ConditioningComposer, ConditioningEntry};
use crate::error::{ComposeError, ComposeResult};
use crate::policy::{decide, BandDecision};
use crate::project::CrossModalProjector;
use crate::recombine::{ConcatRecombiner, MeanFusionRecombiner, Recombiner};
use crate::score::SimilarityScorer;
use crate::split::BandSplitter;
use crate::tensor::{broadcast_batch, BatchedEmbedding};

/// What happened to one band during composition.
#[derive(Debug, Clone, PartialEq)]
pub struct BandTrace {
    /// The band.
    pub band: BandName,
    /// Feature range of the band in the style embedding.
    pub range: Range<usize>,
    /// Weight applied to the band.
    pub weight: f64,
    /// Composite text similarity, in threshold mode.
    pub score: Option<f64>,
    /// Whether the band was replaced by its text substitute.
    pub replaced: bool,
}

/// A composed vector plus the per-band trace that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Composition {
    /// Composed embedding, `[batch, D]`.
    pub output: BatchedEmbedding,
    /// Per-band trace in band order.
    pub bands: BandMap<BandTrace>,
}

impl Composition {
    /// Bands that were replaced.
    pub fn replaced_bands(&self) -> Vec<BandName> {
        self.bands
            .iter()
            .filter(|(_, trace)| trace.replaced)
            .map(|(band, _)| band)
            .collect()
    }
}

/// Result of applying a composer to a conditioning sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct Applied {
    /// The extended conditioning sequence.
    pub conditioning: Vec<ConditioningEntry>,
    /// How the appended tokens were composed.
    pub composition: Composition,
}

#[derive(Debug)]
enum Variant {
    Weighted,
    Threshold(SimilarityScorer),
    Fusion(CrossModalProjector),
}

/// Composes style embeddings into conditioning tokens.
///
/// A composer holds only read-only state and is `Send + Sync`; one instance
/// can serve concurrent calls.
#[derive(Debug)]
pub struct StyleComposer {
    params: ComposeParams,
    variant: Variant,
    recombiner: Box<dyn Recombiner>,
}

impl StyleComposer {
    /// Weighted variant: scale each band, concatenate.
    pub fn weighted(params: ComposeParams) -> Self {
        Self {
            params,
            variant: Variant::Weighted,
            recombiner: Box::new(ConcatRecombiner),
        }
    }

    /// Threshold variant with the standard similarity blend.
    pub fn threshold(params: ComposeParams) -> Self {
        Self::threshold_with_scorer(params, SimilarityScorer::new())
    }

    /// Threshold variant with a custom scorer.
    pub fn threshold_with_scorer(params: ComposeParams, scorer: SimilarityScorer) -> Self {
        Self {
            params,
            variant: Variant::Threshold(scorer),
            recombiner: Box::new(ConcatRecombiner),
        }
    }

    /// Fusion variant over a cross-modal projector.
    pub fn fusion(params: ComposeParams, projector: CrossModalProjector) -> Self {
        Self {
            params,
            variant: Variant::Fusion(projector),
            recombiner: Box::new(MeanFusionRecombiner),
        }
    }

    /// The variant this composer runs.
    pub fn mode(&self) -> CompositionMode {
        match self.variant {
            Variant::Weighted => CompositionMode::Weighted,
            Variant::Threshold(_) => CompositionMode::Threshold,
            Variant::Fusion(_) => CompositionMode::Fusion,
        }
    }

    /// The parameters this composer was built with.
    pub fn params(&self) -> &ComposeParams {
        &self.params
    }

    /// Name of the recombination law in use.
    pub fn recombiner_name(&self) -> &'static str {
        self.recombiner.name()
    }

    /// Composes `style` (`[N, D]`) into `[batch, D]` tokens.
    ///
    /// `text` (`[B, Dt]`) is required in threshold mode and ignored otherwise.
    pub fn compose_bands(
        &self,
        style: &BatchedEmbedding,
        text: Option<&BatchedEmbedding>,
    ) -> ComposeResult<Composition> {
        let splitter = BandSplitter::new(style.dim())?;
        let weights = self.params.weights();
        debug!(
            mode = %self.mode(),
            batch = style.batch_size(),
            dim = style.dim(),
            "composing style embedding"
        );

        let (decisions, scores) = match &self.variant {
            Variant::Weighted => {
                let bands = splitter.split(style)?;
                (bands.map(|_, b| BandDecision::Keep(b.clone())), None)
            }
            Variant::Threshold(scorer) => {
                let text = text.ok_or(ComposeError::MissingInput {
                    mode: CompositionMode::Threshold,
                    input: "text conditioning",
                })?;
                let (decisions, scores) = self.threshold_decisions(scorer, &splitter, style, text)?;
                (decisions, Some(scores))
            }
            Variant::Fusion(projector) => {
                let fused = projector.project(style)?;
                let base = self.params.enhancement_base;
                let decisions = fused.map(|_, f| BandDecision::Replace {
                    projected: f.clone(),
                    enhancement: base,
                });
                (decisions, None)
            }
        };

        let output = self.recombiner.recombine(&decisions, &weights)?;
        let bands = BandMap::from_fn(|band| BandTrace {
            band,
            range: splitter.range(band),
            weight: weights[band],
            score: scores.as_ref().map(|s: &BandMap<f64>| s[band]),
            replaced: matches!(self.variant, Variant::Threshold(_)) && decisions[band].is_replaced(),
        });
        Ok(Composition { output, bands })
    }

    fn threshold_decisions(
        &self,
        scorer: &SimilarityScorer,
        splitter: &BandSplitter,
        style: &BatchedEmbedding,
        text: &BatchedEmbedding,
    ) -> ComposeResult<(BandMap<BandDecision>, BandMap<f64>)> {
        let batch = broadcast_batch(text.batch_size(), style.batch_size())?;
        let image_bands = splitter.split(style)?;
        let text_bands = BandSplitter::new(text.dim())?.split(text)?;
        let threshold = self.params.similarity_threshold;

        let mut scores = BandMap::from_fn(|_| 0.0);
        let decisions = BandMap::try_from_fn(|band| {
            let image = image_bands[band].broadcast_to(batch)?.into_owned();
            let matched = text_bands[band].match_width(image.dim())?;
            let text = matched.broadcast_to(batch)?.into_owned();

            let score = scorer.score(&text, &image)?;
            scores[band] = score;
            let enhancement =
                self.params.enhancement_base * self.params.enhancement_factors.get(band);
            let decision = decide(image, text, score, threshold, enhancement);
            debug!(
                %band,
                score,
                threshold,
                replaced = decision.is_replaced(),
                "band decision"
            );
            Ok::<_, ComposeError>(decision)
        })?;
        Ok((decisions, scores))
    }

    /// Composes `style` and appends the result to every entry of `conditioning`.
    ///
    /// In threshold mode the first entry of `text_conditioning` is mean-pooled
    /// over its sequence axis to form the text batch.
    pub fn apply(
        &self,
        style: &BatchedEmbedding,
        conditioning: &[ConditioningEntry],
        text_conditioning: Option<&[ConditioningEntry]>,
    ) -> ComposeResult<Applied> {
        let pooled = match (self.mode(), text_conditioning) {
            (CompositionMode::Threshold, Some(entries)) => {
                let first = entries.first().ok_or(ComposeError::EmptyConditioning)?;
                Some(first.embedding.mean_over_sequence()?)
            }
            _ => None,
        };
        let composition = self.compose_bands(style, pooled.as_ref())?;
        let conditioning = ConditioningComposer.compose(conditioning, &composition.output)?;
        Ok(Applied {
            conditioning,
            composition,
        })
    }
}
