//! Job documents.
//!
//! A job bundles everything one composition run consumes: the style embedding
//! produced by an image encoder, the conditioning sequence to extend, and the
//! optional text and auxiliary inputs used by the threshold and fusion modes.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::band::BandName;
use crate::error::SpecError;
use crate::params::{ComposeParams, CompositionMode};
use crate::tensor::TensorData;

/// Current job document version.
pub const JOB_VERSION: u32 = 1;

/// One conditioning entry: an embedding sequence plus side metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConditioningSpec {
    /// Embedding sequence, shape `[groups, sequence, features]`.
    pub embedding: TensorData,
    /// Arbitrary metadata carried alongside the embedding.
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

/// Auxiliary band-prompt embeddings from one or two text encoders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuxiliarySpec {
    /// Output of the first encoder, keyed by band.
    pub primary: BTreeMap<BandName, TensorData>,
    /// Output of the optional second encoder, keyed by band.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary: Option<BTreeMap<BandName, TensorData>>,
}

/// Explicit weights for one band's linear projection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LinearSpec {
    /// Row-major weight matrix `[out, in]`.
    pub weights: Vec<f32>,
    /// Bias vector `[out]`.
    pub bias: Vec<f32>,
}

/// How the per-band projection table is initialized.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProjectorSpec {
    /// Every band projects the image features unchanged.
    #[default]
    Identity,
    /// Xavier-uniform weights from a deterministic seed.
    Seeded {
        /// Base seed; each band derives its own stream from it.
        seed: u32,
    },
    /// Explicit weights for every band.
    Layers {
        /// One layer per band.
        layers: BTreeMap<BandName, LinearSpec>,
    },
}

/// A complete composition job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JobSpec {
    /// Document version; must equal [`JOB_VERSION`].
    pub job_version: u32,
    /// Job identifier, `^[a-z][a-z0-9_-]{2,63}$`.
    pub job_id: String,
    /// Composition variant to run.
    #[serde(default)]
    pub mode: CompositionMode,
    /// Composition parameters.
    #[serde(default)]
    pub params: ComposeParams,
    /// Image-encoder style embedding, `[tokens, features]` or `[groups, tokens, features]`.
    pub style_embedding: TensorData,
    /// Conditioning sequence to extend.
    pub conditioning: Vec<ConditioningSpec>,
    /// Text conditioning sequence (threshold mode).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_conditioning: Option<Vec<ConditioningSpec>>,
    /// Auxiliary band-prompt embeddings (fusion mode).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auxiliary: Option<AuxiliarySpec>,
    /// Projection table initialization (fusion mode).
    #[serde(default)]
    pub projector: ProjectorSpec,
}

impl JobSpec {
    /// Parses a job from JSON.
    pub fn from_json(json: &str) -> Result<Self, SpecError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serializes the job to pretty-printed JSON.
    pub fn to_json_pretty(&self) -> Result<String, SpecError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Serializes the job to a JSON value.
    pub fn to_value(&self) -> Result<serde_json::Value, SpecError> {
        Ok(serde_json::to_value(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const MINIMAL: &str = r#"{
        "job_version": 1,
        "job_id": "portrait-01",
        "style_embedding": {"shape": [1, 5], "data": [1, 2, 3, 4, 5]},
        "conditioning": [
            {"embedding": {"shape": [1, 1, 5], "data": [0, 0, 0, 0, 0]},
             "metadata": {"pooled_output": null}}
        ]
    }"#;

    #[test]
    fn test_minimal_job_defaults() {
        let job = JobSpec::from_json(MINIMAL).unwrap();
        assert_eq!(job.mode, CompositionMode::Weighted);
        assert_eq!(job.params, ComposeParams::default());
        assert_eq!(job.projector, ProjectorSpec::Identity);
        assert!(job.text_conditioning.is_none());
        assert_eq!(job.conditioning.len(), 1);
        assert!(job.conditioning[0].metadata.contains_key("pooled_output"));
    }

    #[test]
    fn test_projector_tagged() {
        let spec: ProjectorSpec = serde_json::from_str(r#"{"kind": "seeded", "seed": 7}"#).unwrap();
        assert_eq!(spec, ProjectorSpec::Seeded { seed: 7 });
    }

    #[test]
    fn test_auxiliary_keyed_by_band() {
        let json = r#"{"primary": {"style": {"shape": [1, 2], "data": [0.5, 0.5]}}}"#;
        let aux: AuxiliarySpec = serde_json::from_str(json).unwrap();
        assert!(aux.primary.contains_key(&BandName::Style));
        assert!(aux.secondary.is_none());

        let bad = r#"{"primary": {"shape": {"shape": [1], "data": [0.0]}}}"#;
        assert!(serde_json::from_str::<AuxiliarySpec>(bad).is_err());
    }

    #[test]
    fn test_json_round_trip() {
        let job = JobSpec::from_json(MINIMAL).unwrap();
        let parsed = JobSpec::from_json(&job.to_json_pretty().unwrap()).unwrap();
        assert_eq!(job, parsed);
    }

    #[test]
    fn test_unknown_top_level_field_rejected() {
        let json = MINIMAL.replacen("\"job_version\"", "\"extra\": 1, \"job_version\"", 1);
        assert!(JobSpec::from_json(&json).is_err());
    }
}
