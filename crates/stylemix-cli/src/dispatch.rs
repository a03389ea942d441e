//! Engine dispatch.
//!
//! Converts a validated job document into engine values, builds the
//! [`StyleComposer`] for the job's mode, and runs it.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use stylemix_engine::{
    AuxiliaryEncoder, BatchedEmbedding, ComposeError, ComposeResult, ConditioningEntry,
    CrossModalProjector, Linear, ProjectionTable, StyleComposer,
};
use stylemix_spec::{
    canonical_params_hash, f32_slice_hash, BackendError, BandMap, BandName, CompositionMode,
    ConditioningSpec, JobSpec, ProjectorSpec, TensorData,
};
use tracing::{debug, info};

/// Errors that can occur while running a job.
#[derive(Debug)]
pub enum DispatchError {
    /// The engine rejected the inputs.
    Compose(ComposeError),
    /// The parameters could not be hashed.
    Hash(String),
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchError::Compose(e) => write!(f, "composition failed: {}", e),
            DispatchError::Hash(msg) => write!(f, "failed to hash params: {}", msg),
        }
    }
}

impl std::error::Error for DispatchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DispatchError::Compose(e) => Some(e),
            DispatchError::Hash(_) => None,
        }
    }
}

impl From<ComposeError> for DispatchError {
    fn from(e: ComposeError) -> Self {
        DispatchError::Compose(e)
    }
}

impl BackendError for DispatchError {
    fn code(&self) -> &'static str {
        match self {
            DispatchError::Compose(e) => e.code(),
            DispatchError::Hash(_) => "DISPATCH_001",
        }
    }

    fn category(&self) -> &'static str {
        match self {
            DispatchError::Compose(e) => e.category(),
            DispatchError::Hash(_) => "dispatch",
        }
    }
}

/// One band's line in a job report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandReport {
    /// Band name.
    pub band: BandName,
    /// First feature index of the band.
    pub start: usize,
    /// One past the last feature index of the band.
    pub end: usize,
    /// Weight applied.
    pub weight: f64,
    /// Composite text similarity (threshold mode).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    /// Whether the band was replaced.
    pub replaced: bool,
}

/// Everything a job run produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobOutcome {
    /// Job identifier.
    pub job_id: String,
    /// Mode that ran.
    pub mode: CompositionMode,
    /// Recombination law used.
    pub recombiner: String,
    /// Canonical hash of the params.
    pub params_hash: String,
    /// Hash of the composed vector's little-endian bytes.
    pub output_hash: String,
    /// Per-band trace.
    pub bands: Vec<BandReport>,
    /// The composed tokens, `[batch, D]`.
    pub composed: TensorData,
    /// The extended conditioning sequence.
    pub conditioning: Vec<ConditioningSpec>,
}

/// Auxiliary encoder backed by precomputed embeddings from the job document.
pub struct PromptTable {
    name: String,
    embeddings: BTreeMap<BandName, BatchedEmbedding>,
}

impl PromptTable {
    /// Builds a table from per-band tensor payloads.
    pub fn from_tensors(
        name: impl Into<String>,
        tensors: &BTreeMap<BandName, TensorData>,
    ) -> ComposeResult<Self> {
        let embeddings = tensors
            .iter()
            .map(|(band, tensor)| Ok((*band, BatchedEmbedding::try_from(tensor)?)))
            .collect::<ComposeResult<_>>()?;
        Ok(Self {
            name: name.into(),
            embeddings,
        })
    }
}

impl AuxiliaryEncoder for PromptTable {
    fn name(&self) -> &str {
        &self.name
    }

    fn encode(&self, band: BandName, prompt: &str) -> ComposeResult<BatchedEmbedding> {
        debug!(encoder = %self.name, %band, prompt, "looking up band prompt");
        self.embeddings
            .get(&band)
            .cloned()
            .ok_or(ComposeError::MissingInput {
                mode: CompositionMode::Fusion,
                input: "an auxiliary embedding for every band",
            })
    }
}

/// Builds the projection table a job asks for.
pub fn build_projection_table(spec: &ProjectorSpec, dim: usize) -> ComposeResult<ProjectionTable> {
    match spec {
        ProjectorSpec::Identity => ProjectionTable::identity(dim),
        ProjectorSpec::Seeded { seed } => ProjectionTable::seeded(dim, *seed),
        ProjectorSpec::Layers { layers } => {
            let layers = BandMap::try_from_fn(|band| {
                let layer = layers.get(&band).ok_or_else(|| {
                    ComposeError::shape(format!("missing projection layer for band '{}'", band))
                })?;
                Linear::new(dim, dim, layer.weights.clone(), layer.bias.clone())
            })?;
            ProjectionTable::from_layers(layers)
        }
    }
}

/// Builds the composer for a job's mode.
pub fn build_composer(job: &JobSpec, dim: usize) -> ComposeResult<StyleComposer> {
    let params = job.params.clone();
    match job.mode {
        CompositionMode::Weighted => Ok(StyleComposer::weighted(params)),
        CompositionMode::Threshold => Ok(StyleComposer::threshold(params)),
        CompositionMode::Fusion => {
            let aux = job.auxiliary.as_ref().ok_or(ComposeError::MissingInput {
                mode: CompositionMode::Fusion,
                input: "auxiliary embeddings",
            })?;
            let mut encoders: Vec<Arc<dyn AuxiliaryEncoder>> =
                vec![Arc::new(PromptTable::from_tensors("primary", &aux.primary)?)];
            if let Some(secondary) = &aux.secondary {
                encoders.push(Arc::new(PromptTable::from_tensors("secondary", secondary)?));
            }
            let table = Arc::new(build_projection_table(&job.projector, dim)?);
            let projector = CrossModalProjector::new(table, encoders)?;
            Ok(StyleComposer::fusion(params, projector))
        }
    }
}

fn entries(specs: &[ConditioningSpec]) -> ComposeResult<Vec<ConditioningEntry>> {
    specs.iter().map(ConditioningEntry::try_from).collect()
}

/// Runs a job through the engine.
///
/// The job should already have passed validation; the engine still rejects
/// inputs it cannot compose.
pub fn run_job(job: &JobSpec) -> Result<JobOutcome, DispatchError> {
    let style = BatchedEmbedding::try_from(&job.style_embedding)?;
    let composer = build_composer(job, style.dim())?;
    let conditioning = entries(&job.conditioning)?;
    let text = job.text_conditioning.as_deref().map(entries).transpose()?;

    info!(job_id = %job.job_id, mode = %job.mode, "running job");
    let applied = composer.apply(&style, &conditioning, text.as_deref())?;

    let params_hash =
        canonical_params_hash(&job.params).map_err(|e| DispatchError::Hash(e.to_string()))?;
    let composed = &applied.composition.output;
    let bands = applied
        .composition
        .bands
        .values()
        .map(|trace| BandReport {
            band: trace.band,
            start: trace.range.start,
            end: trace.range.end,
            weight: trace.weight,
            score: trace.score,
            replaced: trace.replaced,
        })
        .collect();

    Ok(JobOutcome {
        job_id: job.job_id.clone(),
        mode: composer.mode(),
        recombiner: composer.recombiner_name().to_string(),
        params_hash,
        output_hash: f32_slice_hash(composed.as_slice()),
        bands,
        composed: composed.to_tensor_data(),
        conditioning: applied.conditioning.iter().map(ConditioningEntry::to_spec).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use stylemix_spec::{AuxiliarySpec, LinearSpec};

    fn job(mode: CompositionMode) -> JobSpec {
        JobSpec::from_json(&format!(
            r#"{{
                "job_version": 1,
                "job_id": "dispatch-test",
                "mode": "{}",
                "style_embedding": {{"shape": [1, 2, 5], "data": [1, 1, 1, 1, 1, 2, 2, 2, 2, 2]}},
                "conditioning": [
                    {{"embedding": {{"shape": [1, 3, 5], "data": [0,0,0,0,0, 0,0,0,0,0, 0,0,0,0,0]}},
                      "metadata": {{"pooled_output": [0.5]}}}}
                ]
            }}"#,
            mode
        ))
        .unwrap()
    }

    fn aux(value: f32) -> BTreeMap<BandName, TensorData> {
        BandName::ALL
            .into_iter()
            .map(|band| (band, TensorData::new(vec![1, 5], vec![value; 5])))
            .collect()
    }

    #[test]
    fn test_weighted_job() {
        let outcome = run_job(&job(CompositionMode::Weighted)).unwrap();
        assert_eq!(outcome.mode, CompositionMode::Weighted);
        assert_eq!(outcome.recombiner, "concat");
        assert_eq!(outcome.composed.shape, vec![2, 5]);
        assert_eq!(outcome.conditioning[0].embedding.shape, vec![1, 5, 5]);
        assert_eq!(
            outcome.conditioning[0].metadata["pooled_output"],
            serde_json::json!([0.5])
        );
        assert_eq!(outcome.bands.len(), 5);
        assert_eq!((outcome.bands[4].start, outcome.bands[4].end), (4, 5));
    }

    #[test]
    fn test_outcome_is_deterministic() {
        let a = run_job(&job(CompositionMode::Weighted)).unwrap();
        let b = run_job(&job(CompositionMode::Weighted)).unwrap();
        assert_eq!(a.output_hash, b.output_hash);
        assert_eq!(a.params_hash, b.params_hash);
    }

    #[test]
    fn test_threshold_job_without_text_fails() {
        let err = run_job(&job(CompositionMode::Threshold)).unwrap_err();
        assert_eq!(err.code(), "COMPOSE_004");
    }

    #[test]
    fn test_fusion_job_with_two_encoders() {
        let mut j = job(CompositionMode::Fusion);
        j.auxiliary = Some(AuxiliarySpec {
            primary: aux(1.0),
            secondary: Some(aux(4.0)),
        });
        let outcome = run_job(&j).unwrap();
        assert_eq!(outcome.recombiner, "mean_fusion");
        // Row 0: (1 + 4 + 1) / 3 = 2, scaled by 1.5, mean of five equal bands.
        assert_eq!(&outcome.composed.data[..5], &[3.0; 5]);
    }

    #[test]
    fn test_layers_projector() {
        let layers = BandName::ALL
            .into_iter()
            .map(|band| {
                let mut weights = vec![0.0; 25];
                for i in 0..5 {
                    weights[i * 5 + i] = 1.0;
                }
                (band, LinearSpec { weights, bias: vec![0.0; 5] })
            })
            .collect();
        let table = build_projection_table(&ProjectorSpec::Layers { layers }, 5).unwrap();
        assert!(!table.is_identity());
        let image = BatchedEmbedding::new(2, 5, (0..10).map(|v| v as f32).collect()).unwrap();
        let projected = table.project(&image).unwrap();
        for (_, band) in projected.iter() {
            assert_eq!(band, &image);
        }

        let identity = build_projection_table(&ProjectorSpec::Identity, 5).unwrap();
        assert!(identity.is_identity());
        assert_eq!(identity.layer(BandName::Color), None);

        let missing = ProjectorSpec::Layers {
            layers: BTreeMap::new(),
        };
        assert!(build_projection_table(&missing, 5).is_err());
    }

    #[test]
    fn test_prompt_table_missing_band() {
        let mut tensors = aux(1.0);
        tensors.remove(&BandName::Texture);
        let table = PromptTable::from_tensors("primary", &tensors).unwrap();
        assert!(table.encode(BandName::Style, "artistic style").is_ok());
        assert!(table.encode(BandName::Texture, "surface texture").is_err());
    }
}
