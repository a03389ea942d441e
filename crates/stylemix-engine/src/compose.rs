//! Appending composed tokens to a conditioning sequence.

use serde_json::{Map, Value};
use stylemix_spec::ConditioningSpec;
use tracing::debug;

use crate::error::{ComposeError, ComposeResult};
use crate::tensor::{BatchedEmbedding, SequenceTensor};

/// One conditioning entry: an embedding sequence plus side metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct ConditioningEntry {
    /// Embedding tensor `[groups, sequence, dim]`.
    pub embedding: SequenceTensor,
    /// Metadata carried alongside the embedding.
    pub metadata: Map<String, Value>,
}

impl ConditioningEntry {
    /// Creates an entry.
    pub fn new(embedding: SequenceTensor, metadata: Map<String, Value>) -> Self {
        Self {
            embedding,
            metadata,
        }
    }

    /// Converts back to a document entry.
    pub fn to_spec(&self) -> ConditioningSpec {
        ConditioningSpec {
            embedding: self.embedding.to_tensor_data(),
            metadata: self.metadata.clone(),
        }
    }
}

impl TryFrom<&ConditioningSpec> for ConditioningEntry {
    type Error = ComposeError;

    fn try_from(spec: &ConditioningSpec) -> ComposeResult<Self> {
        Ok(Self {
            embedding: SequenceTensor::try_from(&spec.embedding)?,
            metadata: spec.metadata.clone(),
        })
    }
}

/// Extends every conditioning entry with the composed vector.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConditioningComposer;

impl ConditioningComposer {
    /// Returns a new sequence where each entry's embedding has the composed
    /// `[n, dim]` rows appended to the end of every group's sequence.
    ///
    /// Entry count and order are preserved. Metadata is copied, never shared,
    /// and the input entries are left untouched.
    pub fn compose(
        &self,
        conditioning: &[ConditioningEntry],
        composed: &BatchedEmbedding,
    ) -> ComposeResult<Vec<ConditioningEntry>> {
        if conditioning.is_empty() {
            return Err(ComposeError::EmptyConditioning);
        }
        conditioning
            .iter()
            .enumerate()
            .map(|(i, entry)| {
                let embedding = entry.embedding.append_tokens(composed)?;
                debug!(
                    entry = i,
                    from = entry.embedding.seq_len(),
                    to = embedding.seq_len(),
                    "extended conditioning entry"
                );
                Ok(ConditioningEntry {
                    embedding,
                    metadata: entry.metadata.clone(),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn entry(groups: usize, seq_len: usize, dim: usize, tag: &str) -> ConditioningEntry {
        let mut metadata = Map::new();
        metadata.insert("tag".to_string(), json!(tag));
        metadata.insert("pooled_output".to_string(), json!([0.1, 0.2]));
        ConditioningEntry::new(
            SequenceTensor::new(groups, seq_len, dim, vec![0.5; groups * seq_len * dim]).unwrap(),
            metadata,
        )
    }

    #[test]
    fn test_sequence_grows_by_one() {
        let input = vec![entry(1, 3, 5, "a"), entry(2, 7, 5, "b")];
        let composed = BatchedEmbedding::from_vector(vec![1.0; 5]).unwrap();
        let out = ConditioningComposer.compose(&input, &composed).unwrap();

        assert_eq!(out.len(), 2);
        assert_eq!(out[0].embedding.shape(), [1, 4, 5]);
        assert_eq!(out[1].embedding.shape(), [2, 8, 5]);
        for (before, after) in input.iter().zip(&out) {
            assert_eq!(before.metadata, after.metadata);
        }
        assert_eq!(input[0].embedding.shape(), [1, 3, 5]);
    }

    #[test]
    fn test_multi_token_append() {
        let input = vec![entry(1, 1, 5, "a")];
        let composed = BatchedEmbedding::new(3, 5, vec![2.0; 15]).unwrap();
        let out = ConditioningComposer.compose(&input, &composed).unwrap();
        assert_eq!(out[0].embedding.shape(), [1, 4, 5]);
        assert_eq!(&out[0].embedding.as_slice()[5..], &[2.0; 15]);
    }

    #[test]
    fn test_metadata_is_copied() {
        let input = vec![entry(1, 1, 5, "a")];
        let composed = BatchedEmbedding::from_vector(vec![1.0; 5]).unwrap();
        let mut out = ConditioningComposer.compose(&input, &composed).unwrap();
        out[0].metadata.insert("tag".to_string(), json!("changed"));
        assert_eq!(input[0].metadata["tag"], json!("a"));
    }

    #[test]
    fn test_errors() {
        let composed = BatchedEmbedding::from_vector(vec![1.0; 5]).unwrap();
        assert_eq!(
            ConditioningComposer.compose(&[], &composed),
            Err(ComposeError::EmptyConditioning)
        );

        let input = vec![entry(1, 1, 6, "a")];
        assert!(matches!(
            ConditioningComposer.compose(&input, &composed),
            Err(ComposeError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_spec_round_trip() {
        let original = entry(1, 2, 5, "a");
        let spec = original.to_spec();
        assert_eq!(spec.embedding.shape, vec![1, 2, 5]);
        assert_eq!(ConditioningEntry::try_from(&spec).unwrap(), original);
    }
}
