//! Property-based tests for band splitting and composition using proptest.
//!
//! These tests check the structural guarantees of the engine for arbitrary
//! dimensions, batch sizes, and weights.
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p stylemix-tests --test proptest_bands
//! ```

use proptest::prelude::*;

use stylemix_engine::{BandSplitter, BatchedEmbedding, ComposeError, SimilarityScorer, StyleComposer};
use stylemix_spec::{BandName, ComposeParams, BAND_COUNT};

// ============================================================================
// Strategies
// ============================================================================

/// A `[batch, dim]` embedding with values in `[-2, 2]`.
fn embedding(batch: usize, dim: usize) -> impl Strategy<Value = BatchedEmbedding> {
    prop::collection::vec(-2.0f32..2.0, batch * dim)
        .prop_map(move |data| BatchedEmbedding::new(batch, dim, data).unwrap())
}

/// A `[batch, dim]` embedding with strictly positive values.
fn positive_embedding(batch: usize, dim: usize) -> impl Strategy<Value = BatchedEmbedding> {
    prop::collection::vec(0.1f32..2.0, batch * dim)
        .prop_map(move |data| BatchedEmbedding::new(batch, dim, data).unwrap())
}

fn weights() -> impl Strategy<Value = [f64; BAND_COUNT]> {
    prop::array::uniform5(0.0f64..10.0)
}

// ============================================================================
// 1. Partition Completeness
// ============================================================================

proptest! {
    /// Bands are contiguous, ordered, and cover `[0, D)` exactly.
    #[test]
    fn bands_partition_the_feature_axis(dim in 5usize..5000) {
        let splitter = BandSplitter::new(dim).unwrap();
        let base = dim / BAND_COUNT;

        let mut cursor = 0;
        for band in BandName::ALL {
            let range = splitter.range(band);
            prop_assert_eq!(range.start, cursor);
            let expected = if band == BandName::Texture { dim - 4 * base } else { base };
            prop_assert_eq!(range.len(), expected);
            cursor = range.end;
        }
        prop_assert_eq!(cursor, dim);
    }

    /// Splitting then concatenating returns the input unchanged.
    #[test]
    fn split_then_concat_is_identity(
        (batch, dim, style) in (1usize..4, 5usize..64)
            .prop_flat_map(|(b, d)| (Just(b), Just(d), embedding(b, d)))
    ) {
        let splitter = BandSplitter::new(dim).unwrap();
        let bands = splitter.split(&style).unwrap();
        for (_, band) in bands.iter() {
            prop_assert_eq!(band.batch_size(), batch);
        }
        prop_assert_eq!(BandSplitter::concat(&bands).unwrap(), style);
    }

    /// Dimensions below five are always rejected.
    #[test]
    fn small_dimensions_rejected(dim in 0usize..5) {
        prop_assert_eq!(
            BandSplitter::new(dim).unwrap_err(),
            ComposeError::DimensionTooSmall { dim }
        );
    }
}

// ============================================================================
// 2. Weighted Linearity
// ============================================================================

proptest! {
    /// Weighted mode scales every feature by exactly its band's weight.
    #[test]
    fn weighted_output_is_bandwise_scaling(
        (dim, style) in (5usize..80).prop_flat_map(|d| (Just(d), embedding(2, d))),
        w in weights(),
    ) {
        let mut params = ComposeParams::default();
        for band in BandName::ALL {
            params.set_weight(band, w[band.index()]);
        }
        let out = StyleComposer::weighted(params).compose_bands(&style, None).unwrap().output;
        let splitter = BandSplitter::new(dim).unwrap();

        prop_assert_eq!(out.batch_size(), 2);
        prop_assert_eq!(out.dim(), dim);
        for band in BandName::ALL {
            let factor = w[band.index()] as f32;
            for row in 0..2 {
                for i in splitter.range(band) {
                    prop_assert_eq!(out.row(row)[i], style.row(row)[i] * factor);
                }
            }
        }
    }

    /// Unit weights leave the embedding unchanged.
    #[test]
    fn unit_weights_are_identity(
        style in (5usize..80).prop_flat_map(|d| embedding(3, d))
    ) {
        let out = StyleComposer::weighted(ComposeParams::default())
            .compose_bands(&style, None)
            .unwrap()
            .output;
        prop_assert_eq!(out, style);
    }
}

// ============================================================================
// 3. Broadcast Correctness
// ============================================================================

proptest! {
    /// A single text row against a batch of B images yields B identical
    /// replaced rows.
    #[test]
    fn text_batch_of_one_broadcasts(
        (batch, style, text) in (2usize..6, 5usize..40).prop_flat_map(|(b, d)| {
            (Just(b), positive_embedding(b, d), positive_embedding(1, d))
        })
    ) {
        let composition = StyleComposer::threshold(ComposeParams {
            similarity_threshold: 0.0,
            enhancement_base: 1.0,
            ..ComposeParams::default()
        })
        .compose_bands(&style, Some(&text))
        .unwrap();

        prop_assert_eq!(composition.replaced_bands().len(), BAND_COUNT);
        prop_assert_eq!(composition.output.batch_size(), batch);
        for row in composition.output.rows() {
            prop_assert_eq!(row, text.row(0));
        }
    }

    /// Batches that are neither equal nor one are rejected.
    #[test]
    fn incompatible_batches_rejected(
        image_batch in 2usize..6,
        offset in 1usize..4,
    ) {
        let text_batch = image_batch + offset;
        let style = BatchedEmbedding::new(image_batch, 10, vec![1.0; image_batch * 10]).unwrap();
        let text = BatchedEmbedding::new(text_batch, 10, vec![1.0; text_batch * 10]).unwrap();
        let err = StyleComposer::threshold(ComposeParams::default())
            .compose_bands(&style, Some(&text))
            .unwrap_err();
        let is_batch_mismatch = matches!(err, ComposeError::BatchSizeMismatch { .. });
        prop_assert!(is_batch_mismatch);
    }
}

// ============================================================================
// 4. Scorer Bounds
// ============================================================================

proptest! {
    /// The composite score is finite and inside the range its metrics allow.
    #[test]
    fn composite_score_is_bounded(
        (text, image) in (1usize..4, 1usize..32)
            .prop_flat_map(|(b, d)| (embedding(b, d), embedding(b, d)))
    ) {
        let score = SimilarityScorer::new().score(&text, &image).unwrap();
        prop_assert!(score.is_finite());
        prop_assert!((-0.6 - 1e-9..=1.0 + 1e-9).contains(&score), "score {}", score);
    }
}
