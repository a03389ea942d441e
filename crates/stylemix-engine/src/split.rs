//! Positional band splitting.
//!
//! A `D`-wide feature vector is cut into five contiguous bands of width
//! `floor(D / 5)`; the texture band also takes the `D % 5` leftover features.

use std::ops::Range;

use stylemix_spec::{BandMap, BandName, BAND_COUNT};
use tracing::trace;

use crate::error::{ComposeError, ComposeResult};
use crate::tensor::BatchedEmbedding;

/// Splits embeddings of one fixed feature dimension into bands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BandSplitter {
    dim: usize,
    ranges: BandMap<Range<usize>>,
}

impl BandSplitter {
    /// Creates a splitter for `dim`-wide features.
    pub fn new(dim: usize) -> ComposeResult<Self> {
        if dim < BAND_COUNT {
            return Err(ComposeError::DimensionTooSmall { dim });
        }
        let width = dim / BAND_COUNT;
        let ranges = BandMap::from_fn(|band| {
            let start = band.index() * width;
            let end = if band == BandName::Texture {
                dim
            } else {
                start + width
            };
            start..end
        });
        Ok(Self { dim, ranges })
    }

    /// Feature dimension this splitter accepts.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Feature range covered by `band`.
    pub fn range(&self, band: BandName) -> Range<usize> {
        self.ranges[band].clone()
    }

    /// Width of `band`.
    pub fn width(&self, band: BandName) -> usize {
        self.ranges[band].len()
    }

    /// All band ranges in positional order.
    pub fn ranges(&self) -> &BandMap<Range<usize>> {
        &self.ranges
    }

    /// Splits every row of `embedding` into its five bands.
    pub fn split(&self, embedding: &BatchedEmbedding) -> ComposeResult<BandMap<BatchedEmbedding>> {
        if embedding.dim() != self.dim {
            return Err(ComposeError::shape(format!(
                "splitter expects width {}, got {}",
                self.dim,
                embedding.dim()
            )));
        }
        trace!(dim = self.dim, batch = embedding.batch_size(), "splitting embedding into bands");
        BandMap::try_from_fn(|band| embedding.columns(self.range(band)))
    }

    /// Concatenates bands back into one `[batch, D]` embedding, in band order.
    pub fn concat(bands: &BandMap<BatchedEmbedding>) -> ComposeResult<BatchedEmbedding> {
        let parts: Vec<&BatchedEmbedding> = bands.values().collect();
        BatchedEmbedding::concat_features(&parts)
    }
}
