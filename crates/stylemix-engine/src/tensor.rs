//! Dense row-major tensors used inside the engine.
//!
//! [`BatchedEmbedding`] is a `[batch, dim]` matrix of embeddings and
//! [`SequenceTensor`] is a `[groups, sequence, dim]` conditioning tensor. Both
//! keep the invariant `dim > 0`, so row iteration never degenerates.

use std::borrow::Cow;
use std::ops::Range;

use stylemix_spec::TensorData;

use crate::error::{ComposeError, ComposeResult};

/// Resolves the common batch size of two operands.
///
/// Equal sizes pass through; a size of 1 broadcasts to the other size.
/// Anything else is [`ComposeError::BatchSizeMismatch`].
pub fn broadcast_batch(left: usize, right: usize) -> ComposeResult<usize> {
    match (left, right) {
        (l, r) if l == r => Ok(l),
        (1, r) => Ok(r),
        (l, 1) => Ok(l),
        (l, r) => Err(ComposeError::BatchSizeMismatch { left: l, right: r }),
    }
}

/// A batch of embeddings sharing one feature dimension, shape `[batch, dim]`.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchedEmbedding {
    batch: usize,
    dim: usize,
    data: Vec<f32>,
}

impl BatchedEmbedding {
    /// Creates a batch from row-major data.
    pub fn new(batch: usize, dim: usize, data: Vec<f32>) -> ComposeResult<Self> {
        if dim == 0 {
            return Err(ComposeError::shape("feature dimension must be non-zero"));
        }
        if batch.checked_mul(dim) != Some(data.len()) {
            return Err(ComposeError::shape(format!(
                "[{}, {}] needs {} values, got {}",
                batch,
                dim,
                batch.saturating_mul(dim),
                data.len()
            )));
        }
        Ok(Self { batch, dim, data })
    }

    /// Creates a batch of one from a single vector.
    pub fn from_vector(values: Vec<f32>) -> ComposeResult<Self> {
        let dim = values.len();
        Self::new(1, dim, values)
    }

    /// Creates a batch from equally sized rows.
    pub fn from_rows(rows: &[Vec<f32>]) -> ComposeResult<Self> {
        let dim = rows.first().map(Vec::len).unwrap_or(0);
        if rows.iter().any(|row| row.len() != dim) {
            return Err(ComposeError::shape("rows have different lengths"));
        }
        Self::new(rows.len(), dim, rows.concat())
    }

    /// Number of embeddings in the batch.
    pub fn batch_size(&self) -> usize {
        self.batch
    }

    /// Feature dimension.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Row-major values.
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Consumes the batch, returning its row-major values.
    pub fn into_vec(self) -> Vec<f32> {
        self.data
    }

    /// Returns row `index`.
    ///
    /// # Panics
    /// Panics if `index >= batch_size()`.
    pub fn row(&self, index: usize) -> &[f32] {
        &self.data[index * self.dim..(index + 1) * self.dim]
    }

    /// Iterates rows in batch order.
    pub fn rows(&self) -> std::slice::ChunksExact<'_, f32> {
        self.data.chunks_exact(self.dim)
    }

    /// Copies a contiguous feature range out of every row.
    pub fn columns(&self, range: Range<usize>) -> ComposeResult<Self> {
        if range.start >= range.end || range.end > self.dim {
            return Err(ComposeError::shape(format!(
                "feature range {:?} is empty or exceeds width {}",
                range, self.dim
            )));
        }
        let width = range.end - range.start;
        let mut data = Vec::with_capacity(self.batch * width);
        for row in self.rows() {
            data.extend_from_slice(&row[range.clone()]);
        }
        Self::new(self.batch, width, data)
    }

    /// Returns a copy with every value multiplied by `factor`.
    pub fn scaled(&self, factor: f32) -> Self {
        Self {
            batch: self.batch,
            dim: self.dim,
            data: self.data.iter().map(|v| v * factor).collect(),
        }
    }

    /// Expands a batch of one to `batch` identical rows.
    ///
    /// Borrows when the size already matches.
    pub fn broadcast_to(&self, batch: usize) -> ComposeResult<Cow<'_, Self>> {
        if self.batch == batch {
            return Ok(Cow::Borrowed(self));
        }
        if self.batch != 1 {
            return Err(ComposeError::BatchSizeMismatch {
                left: self.batch,
                right: batch,
            });
        }
        Ok(Cow::Owned(Self {
            batch,
            dim: self.dim,
            data: self.data.repeat(batch),
        }))
    }

    /// Matches the feature width to `width`: truncates when wider, zero-pads
    /// when narrower. Borrows when the width already matches.
    pub fn match_width(&self, width: usize) -> ComposeResult<Cow<'_, Self>> {
        if width == 0 {
            return Err(ComposeError::shape("cannot match a band of width zero"));
        }
        if width == self.dim {
            return Ok(Cow::Borrowed(self));
        }
        let keep = width.min(self.dim);
        let mut data = Vec::with_capacity(self.batch * width);
        for row in self.rows() {
            data.extend_from_slice(&row[..keep]);
            data.resize(data.len() + (width - keep), 0.0);
        }
        Ok(Cow::Owned(Self {
            batch: self.batch,
            dim: width,
            data,
        }))
    }

    /// Concatenates batches along the feature axis.
    pub fn concat_features(parts: &[&Self]) -> ComposeResult<Self> {
        let Some(first) = parts.first() else {
            return Err(ComposeError::shape("nothing to concatenate"));
        };
        let batch = first.batch;
        if let Some(other) = parts.iter().find(|p| p.batch != batch) {
            return Err(ComposeError::BatchSizeMismatch {
                left: batch,
                right: other.batch,
            });
        }
        let dim: usize = parts.iter().map(|p| p.dim).sum();
        let mut data = Vec::with_capacity(batch * dim);
        for i in 0..batch {
            for part in parts {
                data.extend_from_slice(part.row(i));
            }
        }
        Self::new(batch, dim, data)
    }

    /// Converts to a `[batch, dim]` document payload.
    pub fn to_tensor_data(&self) -> TensorData {
        TensorData::new(vec![self.batch, self.dim], self.data.clone())
    }
}

/// Accepts `[dim]`, `[batch, dim]`, or `[groups, tokens, dim]`.
///
/// Grouped input is flattened to `[groups * tokens, dim]`.
impl TryFrom<&TensorData> for BatchedEmbedding {
    type Error = ComposeError;

    fn try_from(tensor: &TensorData) -> ComposeResult<Self> {
        let (batch, dim) = match tensor.shape.as_slice() {
            [dim] => (1, *dim),
            [batch, dim] => (*batch, *dim),
            [groups, tokens, dim] => (groups.saturating_mul(*tokens), *dim),
            shape => {
                return Err(ComposeError::shape(format!(
                    "embedding must have rank 1, 2, or 3, got shape {:?}",
                    shape
                )))
            }
        };
        Self::new(batch, dim, tensor.data.clone())
    }
}

/// A conditioning tensor of shape `[groups, sequence, dim]`.
#[derive(Debug, Clone, PartialEq)]
pub struct SequenceTensor {
    groups: usize,
    seq_len: usize,
    dim: usize,
    data: Vec<f32>,
}

impl SequenceTensor {
    /// Creates a sequence tensor from row-major data.
    pub fn new(groups: usize, seq_len: usize, dim: usize, data: Vec<f32>) -> ComposeResult<Self> {
        if dim == 0 {
            return Err(ComposeError::shape("feature dimension must be non-zero"));
        }
        let expected = groups
            .checked_mul(seq_len)
            .and_then(|n| n.checked_mul(dim));
        if expected != Some(data.len()) {
            return Err(ComposeError::shape(format!(
                "[{}, {}, {}] does not match {} values",
                groups,
                seq_len,
                dim,
                data.len()
            )));
        }
        Ok(Self {
            groups,
            seq_len,
            dim,
            data,
        })
    }

    /// Shape as `[groups, sequence, dim]`.
    pub fn shape(&self) -> [usize; 3] {
        [self.groups, self.seq_len, self.dim]
    }

    /// Number of groups.
    pub fn groups(&self) -> usize {
        self.groups
    }

    /// Sequence length.
    pub fn seq_len(&self) -> usize {
        self.seq_len
    }

    /// Feature dimension.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Row-major values.
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Appends `tokens` (`[n, dim]`) to the end of every group's sequence.
    ///
    /// The result has shape `[groups, sequence + n, dim]`; `self` is untouched.
    pub fn append_tokens(&self, tokens: &BatchedEmbedding) -> ComposeResult<Self> {
        if tokens.dim() != self.dim {
            return Err(ComposeError::shape(format!(
                "cannot append width {} tokens to a width {} sequence",
                tokens.dim(),
                self.dim
            )));
        }
        let group_len = self.seq_len * self.dim;
        let mut data = Vec::with_capacity(self.data.len() + self.groups * tokens.as_slice().len());
        for g in 0..self.groups {
            data.extend_from_slice(&self.data[g * group_len..(g + 1) * group_len]);
            data.extend_from_slice(tokens.as_slice());
        }
        Self::new(
            self.groups,
            self.seq_len + tokens.batch_size(),
            self.dim,
            data,
        )
    }

    /// Averages over the sequence axis, producing `[groups, dim]`.
    pub fn mean_over_sequence(&self) -> ComposeResult<BatchedEmbedding> {
        if self.seq_len == 0 {
            return Err(ComposeError::shape("cannot pool an empty sequence"));
        }
        let mut data = vec![0.0f32; self.groups * self.dim];
        for (g, pooled) in data.chunks_exact_mut(self.dim).enumerate() {
            let group = &self.data[g * self.seq_len * self.dim..(g + 1) * self.seq_len * self.dim];
            for token in group.chunks_exact(self.dim) {
                for (acc, v) in pooled.iter_mut().zip(token) {
                    *acc += v;
                }
            }
            let n = self.seq_len as f32;
            pooled.iter_mut().for_each(|v| *v /= n);
        }
        BatchedEmbedding::new(self.groups, self.dim, data)
    }

    /// Converts to a `[groups, sequence, dim]` document payload.
    pub fn to_tensor_data(&self) -> TensorData {
        TensorData::new(
            vec![self.groups, self.seq_len, self.dim],
            self.data.clone(),
        )
    }
}

impl TryFrom<&TensorData> for SequenceTensor {
    type Error = ComposeError;

    fn try_from(tensor: &TensorData) -> ComposeResult<Self> {
        match tensor.shape.as_slice() {
            [groups, seq_len, dim] => Self::new(*groups, *seq_len, *dim, tensor.data.clone()),
            shape => Err(ComposeError::shape(format!(
                "conditioning must have rank 3, got shape {:?}",
                shape
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn batch(rows: &[&[f32]]) -> BatchedEmbedding {
        BatchedEmbedding::from_rows(&rows.iter().map(|r| r.to_vec()).collect::<Vec<_>>()).unwrap()
    }

    #[test]
    fn test_broadcast_batch_rules() {
        assert_eq!(broadcast_batch(4, 4).unwrap(), 4);
        assert_eq!(broadcast_batch(1, 3).unwrap(), 3);
        assert_eq!(broadcast_batch(3, 1).unwrap(), 3);
        assert_eq!(
            broadcast_batch(2, 3),
            Err(ComposeError::BatchSizeMismatch { left: 2, right: 3 })
        );
    }

    #[test]
    fn test_new_rejects_bad_shapes() {
        assert!(BatchedEmbedding::new(2, 3, vec![0.0; 5]).is_err());
        assert!(BatchedEmbedding::new(1, 0, vec![]).is_err());
        assert!(BatchedEmbedding::from_rows(&[vec![1.0], vec![1.0, 2.0]]).is_err());
    }

    #[test]
    fn test_columns() {
        let b = batch(&[&[1.0, 2.0, 3.0], &[4.0, 5.0, 6.0]]);
        let c = b.columns(1..3).unwrap();
        assert_eq!(c.as_slice(), &[2.0, 3.0, 5.0, 6.0]);
        assert!(b.columns(2..2).is_err());
        assert!(b.columns(1..4).is_err());
    }

    #[test]
    fn test_broadcast_to() {
        let b = batch(&[&[1.0, 2.0]]);
        let expanded = b.broadcast_to(3).unwrap();
        assert_eq!(expanded.batch_size(), 3);
        assert!(expanded.rows().all(|row| row == [1.0, 2.0]));
        assert!(matches!(b.broadcast_to(1).unwrap(), Cow::Borrowed(_)));

        let two = batch(&[&[1.0], &[2.0]]);
        assert!(two.broadcast_to(3).is_err());
    }

    #[test]
    fn test_match_width_truncates_and_pads() {
        let b = batch(&[&[1.0, 2.0, 3.0], &[4.0, 5.0, 6.0]]);
        assert_eq!(b.match_width(2).unwrap().as_slice(), &[1.0, 2.0, 4.0, 5.0]);
        assert_eq!(
            b.match_width(4).unwrap().as_slice(),
            &[1.0, 2.0, 3.0, 0.0, 4.0, 5.0, 6.0, 0.0]
        );
        assert!(matches!(
            b.match_width(0),
            Err(ComposeError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_concat_features() {
        let a = batch(&[&[1.0], &[2.0]]);
        let b = batch(&[&[3.0, 4.0], &[5.0, 6.0]]);
        let c = BatchedEmbedding::concat_features(&[&a, &b]).unwrap();
        assert_eq!(c.dim(), 3);
        assert_eq!(c.as_slice(), &[1.0, 3.0, 4.0, 2.0, 5.0, 6.0]);

        let single = batch(&[&[0.0]]);
        assert!(BatchedEmbedding::concat_features(&[&a, &single]).is_err());
    }

    #[test]
    fn test_try_from_flattens_groups() {
        let t = TensorData::new(vec![2, 3, 5], (0..30).map(|v| v as f32).collect());
        let b = BatchedEmbedding::try_from(&t).unwrap();
        assert_eq!((b.batch_size(), b.dim()), (6, 5));
        assert_eq!(b.row(5), &[25.0, 26.0, 27.0, 28.0, 29.0]);

        let v = TensorData::new(vec![5], vec![1.0; 5]);
        assert_eq!(BatchedEmbedding::try_from(&v).unwrap().batch_size(), 1);

        let bad = TensorData::new(vec![1, 1, 1, 5], vec![1.0; 5]);
        assert!(BatchedEmbedding::try_from(&bad).is_err());
    }

    #[test]
    fn test_append_tokens_per_group() {
        let seq = SequenceTensor::new(2, 1, 2, vec![1.0, 1.0, 2.0, 2.0]).unwrap();
        let tokens = batch(&[&[9.0, 8.0]]);
        let grown = seq.append_tokens(&tokens).unwrap();
        assert_eq!(grown.shape(), [2, 2, 2]);
        assert_eq!(
            grown.as_slice(),
            &[1.0, 1.0, 9.0, 8.0, 2.0, 2.0, 9.0, 8.0]
        );
        assert_eq!(seq.shape(), [2, 1, 2]);

        let wide = batch(&[&[1.0, 2.0, 3.0]]);
        assert!(seq.append_tokens(&wide).is_err());
    }

    #[test]
    fn test_mean_over_sequence() {
        let seq = SequenceTensor::new(1, 2, 2, vec![1.0, 2.0, 3.0, 6.0]).unwrap();
        let pooled = seq.mean_over_sequence().unwrap();
        assert_eq!(pooled.as_slice(), &[2.0, 4.0]);

        let empty = SequenceTensor::new(1, 0, 2, vec![]).unwrap();
        assert!(empty.mean_over_sequence().is_err());
    }
}
