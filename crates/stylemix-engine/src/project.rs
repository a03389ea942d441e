//! Cross-modal projection.
//!
//! Each band owns a `D → D` linear map applied to the *whole* image feature
//! vector. In fusion mode the projected image features are averaged with one
//! or two auxiliary embeddings that an external encoder produced from the
//! band's fixed prompt.
//!
//! The [`ProjectionTable`] is built once and never mutated afterwards; share it
//! across threads with `Arc`.

use std::fmt;
use std::sync::Arc;

use rand::Rng;
use stylemix_spec::{BandMap, BandName, CompositionMode};
use tracing::debug;

use crate::error::{ComposeError, ComposeResult};
use crate::rng::create_band_rng;
use crate::tensor::BatchedEmbedding;

/// A dense affine map `y = W x + b` with row-major `W` of shape `[out, in]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Linear {
    in_dim: usize,
    out_dim: usize,
    weights: Vec<f32>,
    bias: Vec<f32>,
}

impl Linear {
    /// Creates a layer from explicit weights and bias.
    pub fn new(in_dim: usize, out_dim: usize, weights: Vec<f32>, bias: Vec<f32>) -> ComposeResult<Self> {
        if in_dim == 0 || out_dim == 0 {
            return Err(ComposeError::shape("linear layer dimensions must be non-zero"));
        }
        if in_dim.checked_mul(out_dim) != Some(weights.len()) || bias.len() != out_dim {
            return Err(ComposeError::shape(format!(
                "[{} -> {}] layer needs {} weights and {} biases, got {} and {}",
                in_dim,
                out_dim,
                in_dim.saturating_mul(out_dim),
                out_dim,
                weights.len(),
                bias.len()
            )));
        }
        Ok(Self {
            in_dim,
            out_dim,
            weights,
            bias,
        })
    }

    /// The identity map on `dim` features.
    pub fn identity(dim: usize) -> ComposeResult<Self> {
        let mut weights = vec![0.0; weight_count(dim, dim)?];
        for i in 0..dim {
            weights[i * dim + i] = 1.0;
        }
        Self::new(dim, dim, weights, vec![0.0; dim])
    }

    /// Xavier-uniform weights, zero bias.
    pub fn xavier_uniform<R: Rng>(in_dim: usize, out_dim: usize, rng: &mut R) -> ComposeResult<Self> {
        let count = weight_count(in_dim, out_dim)?;
        let limit = (6.0 / (in_dim as f64 + out_dim as f64)).sqrt() as f32;
        let weights = (0..count)
            .map(|_| rng.gen_range(-limit..=limit))
            .collect();
        Self::new(in_dim, out_dim, weights, vec![0.0; out_dim])
    }

    /// Input width.
    pub fn in_dim(&self) -> usize {
        self.in_dim
    }

    /// Output width.
    pub fn out_dim(&self) -> usize {
        self.out_dim
    }

    /// Applies the layer to every row.
    pub fn forward(&self, input: &BatchedEmbedding) -> ComposeResult<BatchedEmbedding> {
        if input.dim() != self.in_dim {
            return Err(ComposeError::shape(format!(
                "layer expects width {}, got {}",
                self.in_dim,
                input.dim()
            )));
        }
        let mut out = Vec::with_capacity(input.batch_size() * self.out_dim);
        for x in input.rows() {
            for (w_row, b) in self.weights.chunks_exact(self.in_dim).zip(&self.bias) {
                let acc: f32 = w_row.iter().zip(x).map(|(w, v)| w * v).sum();
                out.push(acc + b);
            }
        }
        BatchedEmbedding::new(input.batch_size(), self.out_dim, out)
    }
}

/// Number of weights in an `[out, in]` matrix.
fn weight_count(in_dim: usize, out_dim: usize) -> ComposeResult<usize> {
    in_dim.checked_mul(out_dim).ok_or_else(|| {
        ComposeError::shape(format!(
            "[{} -> {}] layer is too large to allocate",
            in_dim, out_dim
        ))
    })
}

/// One projection per band, all mapping `D → D`.
///
/// The identity table holds no weights; projecting through it returns the
/// image features as they are.
#[derive(Debug, Clone, PartialEq)]
pub enum ProjectionTable {
    /// Every band passes the image features through unchanged.
    Identity { dim: usize },
    /// One dense layer per band.
    Dense { dim: usize, layers: BandMap<Linear> },
}

impl ProjectionTable {
    /// Every band projects the image features unchanged.
    pub fn identity(dim: usize) -> ComposeResult<Self> {
        if dim == 0 {
            return Err(ComposeError::shape("projection width must be non-zero"));
        }
        Ok(Self::Identity { dim })
    }

    /// Xavier-uniform layers drawn from per-band streams of `seed`.
    pub fn seeded(dim: usize, seed: u32) -> ComposeResult<Self> {
        let layers = BandMap::try_from_fn(|band| {
            let mut rng = create_band_rng(seed, band);
            Linear::xavier_uniform(dim, dim, &mut rng)
        })?;
        Ok(Self::Dense { dim, layers })
    }

    /// Builds a table from explicit layers; every layer must be square and
    /// the same size.
    pub fn from_layers(layers: BandMap<Linear>) -> ComposeResult<Self> {
        let dim = layers[BandName::Style].in_dim();
        for (band, layer) in layers.iter() {
            if layer.in_dim() != dim || layer.out_dim() != dim {
                return Err(ComposeError::shape(format!(
                    "{} layer is [{} -> {}], expected [{} -> {}]",
                    band,
                    layer.in_dim(),
                    layer.out_dim(),
                    dim,
                    dim
                )));
            }
        }
        Ok(Self::Dense { dim, layers })
    }

    /// Feature dimension of every layer.
    pub fn dim(&self) -> usize {
        match self {
            Self::Identity { dim } | Self::Dense { dim, .. } => *dim,
        }
    }

    /// Whether every band passes features through unchanged.
    pub fn is_identity(&self) -> bool {
        matches!(self, Self::Identity { .. })
    }

    /// The dense layer for `band`; `None` for the identity table.
    pub fn layer(&self, band: BandName) -> Option<&Linear> {
        match self {
            Self::Identity { .. } => None,
            Self::Dense { layers, .. } => Some(&layers[band]),
        }
    }

    /// Projects `image` through every band's layer.
    pub fn project(&self, image: &BatchedEmbedding) -> ComposeResult<BandMap<BatchedEmbedding>> {
        match self {
            Self::Identity { dim } => {
                if image.dim() != *dim {
                    return Err(ComposeError::shape(format!(
                        "projection table expects width {}, got {}",
                        dim,
                        image.dim()
                    )));
                }
                Ok(BandMap::from_fn(|_| image.clone()))
            }
            Self::Dense { layers, .. } => BandMap::try_from_fn(|band| layers[band].forward(image)),
        }
    }
}

/// Encodes a band prompt into an auxiliary embedding.
///
/// Implementations wrap an external text encoder. The engine calls
/// [`encode`](Self::encode) once per band with [`BandName::prompt`] and only
/// reads the result.
pub trait AuxiliaryEncoder: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Encodes `prompt` for `band`, returning `[batch, width]` features.
    fn encode(&self, band: BandName, prompt: &str) -> ComposeResult<BatchedEmbedding>;
}

/// Projects image features per band and fuses them with auxiliary embeddings.
#[derive(Clone)]
pub struct CrossModalProjector {
    table: Arc<ProjectionTable>,
    encoders: Vec<Arc<dyn AuxiliaryEncoder>>,
}

impl fmt::Debug for CrossModalProjector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CrossModalProjector")
            .field("dim", &self.table.dim())
            .field(
                "encoders",
                &self.encoders.iter().map(|e| e.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl CrossModalProjector {
    /// Maximum number of auxiliary encoders.
    pub const MAX_ENCODERS: usize = 2;

    /// Creates a projector over one or two auxiliary encoders.
    pub fn new(
        table: Arc<ProjectionTable>,
        encoders: Vec<Arc<dyn AuxiliaryEncoder>>,
    ) -> ComposeResult<Self> {
        if encoders.is_empty() {
            return Err(ComposeError::MissingInput {
                mode: CompositionMode::Fusion,
                input: "at least one auxiliary encoder",
            });
        }
        if encoders.len() > Self::MAX_ENCODERS {
            return Err(ComposeError::shape(format!(
                "at most {} auxiliary encoders are supported, got {}",
                Self::MAX_ENCODERS,
                encoders.len()
            )));
        }
        Ok(Self { table, encoders })
    }

    /// The shared projection table.
    pub fn table(&self) -> &Arc<ProjectionTable> {
        &self.table
    }

    /// Number of auxiliary encoders.
    pub fn encoder_count(&self) -> usize {
        self.encoders.len()
    }

    /// Fuses each band's projected image features with its auxiliary
    /// embeddings by averaging: `(aux1 [+ aux2] + projected) / sources`.
    ///
    /// Auxiliary outputs are width-matched to `D` and broadcast to the image
    /// batch size. Every result is `[batch, D]`.
    pub fn project(&self, image: &BatchedEmbedding) -> ComposeResult<BandMap<BatchedEmbedding>> {
        if image.dim() != self.table.dim() {
            return Err(ComposeError::shape(format!(
                "projection table expects width {}, got {}",
                self.table.dim(),
                image.dim()
            )));
        }
        let projected = self.table.project(image)?;
        let batch = image.batch_size();
        let sources = (self.encoders.len() + 1) as f32;

        BandMap::try_from_fn(|band| {
            let mut sum = projected[band].as_slice().to_vec();
            for encoder in &self.encoders {
                let raw = encoder.encode(band, band.prompt())?;
                let matched = raw.match_width(image.dim())?;
                let aux = matched.broadcast_to(batch)?;
                for (acc, v) in sum.iter_mut().zip(aux.as_slice()) {
                    *acc += v;
                }
            }
            sum.iter_mut().for_each(|v| *v /= sources);
            debug!(%band, sources = sources as usize, "fused band features");
            BatchedEmbedding::new(batch, image.dim(), sum)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    struct Constant(Vec<f32>);

    impl AuxiliaryEncoder for Constant {
        fn name(&self) -> &str {
            "constant"
        }

        fn encode(&self, _band: BandName, _prompt: &str) -> ComposeResult<BatchedEmbedding> {
            BatchedEmbedding::from_vector(self.0.clone())
        }
    }

    #[test]
    fn test_linear_forward() {
        let layer = Linear::new(2, 3, vec![1.0, 0.0, 0.0, 1.0, 1.0, 1.0], vec![0.5, 0.0, -1.0]).unwrap();
        let x = BatchedEmbedding::from_rows(&[vec![2.0, 3.0]]).unwrap();
        assert_eq!(layer.forward(&x).unwrap().as_slice(), &[2.5, 3.0, 4.0]);
    }

    #[test]
    fn test_linear_rejects_bad_sizes() {
        assert!(Linear::new(2, 2, vec![0.0; 3], vec![0.0; 2]).is_err());
        assert!(Linear::new(2, 2, vec![0.0; 4], vec![0.0; 1]).is_err());
    }

    #[test]
    fn test_oversized_layers_are_rejected() {
        let huge = usize::MAX;
        assert!(matches!(
            Linear::identity(huge),
            Err(ComposeError::ShapeMismatch { .. })
        ));
        let mut rng = crate::rng::create_rng(1);
        assert!(matches!(
            Linear::xavier_uniform(huge, huge, &mut rng),
            Err(ComposeError::ShapeMismatch { .. })
        ));
        assert!(ProjectionTable::seeded(huge, 3).is_err());
    }

    #[test]
    fn test_identity_table_holds_no_weights() {
        let huge = usize::MAX;
        let table = ProjectionTable::identity(huge).unwrap();
        assert!(table.is_identity());
        assert_eq!(table.dim(), huge);
        assert_eq!(table.layer(BandName::Style), None);
        assert!(ProjectionTable::identity(0).is_err());

        let narrow = BatchedEmbedding::from_vector(vec![1.0; 5]).unwrap();
        assert!(ProjectionTable::identity(6).unwrap().project(&narrow).is_err());
    }

    #[test]
    fn test_identity_table_projects_unchanged() {
        let table = ProjectionTable::identity(5).unwrap();
        let x = BatchedEmbedding::from_rows(&[vec![1.0, 2.0, 3.0, 4.0, 5.0]]).unwrap();
        let out = table.project(&x).unwrap();
        for band in BandName::ALL {
            assert_eq!(out[band], x);
        }
    }

    #[test]
    fn test_seeded_table_deterministic_and_bounded() {
        let a = ProjectionTable::seeded(6, 11).unwrap();
        let b = ProjectionTable::seeded(6, 11).unwrap();
        assert_eq!(a, b);
        assert!(!a.is_identity());
        assert_ne!(a.layer(BandName::Style), a.layer(BandName::Color));
        assert_ne!(a, ProjectionTable::seeded(6, 12).unwrap());

        let limit = (6.0f64 / 12.0).sqrt() as f32;
        let texture = a.layer(BandName::Texture).unwrap();
        assert!(texture.weights.iter().all(|w| w.abs() <= limit));
    }

    #[test]
    fn test_from_layers_requires_uniform_square() {
        let mut layers = BandMap::from_fn(|_| Linear::identity(5).unwrap());
        assert!(ProjectionTable::from_layers(layers.clone()).is_ok());
        layers[BandName::Content] = Linear::identity(6).unwrap();
        assert!(ProjectionTable::from_layers(layers).is_err());
    }

    #[test]
    fn test_projector_averages_sources() {
        let table = Arc::new(ProjectionTable::identity(5).unwrap());
        let encoders: Vec<Arc<dyn AuxiliaryEncoder>> = vec![
            Arc::new(Constant(vec![3.0; 5])),
            Arc::new(Constant(vec![6.0; 5])),
        ];
        let projector = CrossModalProjector::new(table, encoders).unwrap();
        let image = BatchedEmbedding::new(2, 5, vec![0.0; 10]).unwrap();
        let fused = projector.project(&image).unwrap();
        for band in BandName::ALL {
            assert_eq!(fused[band].batch_size(), 2);
            assert!(fused[band].as_slice().iter().all(|v| *v == 3.0));
        }
    }

    #[test]
    fn test_projector_matches_auxiliary_width() {
        let table = Arc::new(ProjectionTable::identity(5).unwrap());
        let encoders: Vec<Arc<dyn AuxiliaryEncoder>> = vec![Arc::new(Constant(vec![2.0; 3]))];
        let projector = CrossModalProjector::new(table, encoders).unwrap();
        let image = BatchedEmbedding::from_vector(vec![2.0; 5]).unwrap();
        let fused = projector.project(&image).unwrap();
        assert_eq!(fused[BandName::Style].as_slice(), &[2.0, 2.0, 2.0, 1.0, 1.0]);
    }

    #[test]
    fn test_projector_encoder_count() {
        let table = Arc::new(ProjectionTable::identity(5).unwrap());
        assert!(matches!(
            CrossModalProjector::new(table.clone(), Vec::new()),
            Err(ComposeError::MissingInput { .. })
        ));
        let three: Vec<Arc<dyn AuxiliaryEncoder>> = (0..3)
            .map(|_| Arc::new(Constant(vec![0.0; 5])) as Arc<dyn AuxiliaryEncoder>)
            .collect();
        assert!(CrossModalProjector::new(table, three).is_err());
    }
}
