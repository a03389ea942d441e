//! Composition parameters.
//!
//! These are the values a host declares for the composing node. Ranges are
//! enforced by [`crate::validation::validate_params`]; the engine consumes the
//! values as given.

use serde::{Deserialize, Serialize};

use crate::band::{BandMap, BandName};

/// Default per-band weight.
pub const DEFAULT_WEIGHT: f64 = 1.0;
/// Default similarity threshold for band replacement.
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.7;
/// Default base multiplier for replaced or fused bands.
pub const DEFAULT_ENHANCEMENT_BASE: f64 = 1.5;
/// Default per-band enhancement factor.
pub const DEFAULT_ENHANCEMENT_FACTOR: f64 = 1.0;

/// Which composition variant the engine runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompositionMode {
    /// Split, weight each band, concatenate.
    #[default]
    Weighted,
    /// Replace bands whose text similarity exceeds the threshold, then concatenate.
    Threshold,
    /// Average projected image features with auxiliary embeddings, then mean-fuse bands.
    Fusion,
}

impl CompositionMode {
    /// Returns the snake_case name used in documents and reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            CompositionMode::Weighted => "weighted",
            CompositionMode::Threshold => "threshold",
            CompositionMode::Fusion => "fusion",
        }
    }

    /// Whether this mode consumes a text conditioning sequence.
    pub fn requires_text(&self) -> bool {
        matches!(self, CompositionMode::Threshold)
    }

    /// Whether this mode consumes auxiliary band-prompt embeddings.
    pub fn requires_auxiliary(&self) -> bool {
        matches!(self, CompositionMode::Fusion)
    }
}

impl std::fmt::Display for CompositionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-band multipliers applied only when a band is replaced by its text substitute.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnhancementFactors {
    /// Style band factor.
    #[serde(default = "default_enhancement_factor")]
    pub style: f64,
    /// Color band factor.
    #[serde(default = "default_enhancement_factor")]
    pub color: f64,
    /// Content band factor.
    #[serde(default = "default_enhancement_factor")]
    pub content: f64,
    /// Structure band factor.
    #[serde(default = "default_enhancement_factor")]
    pub structure: f64,
    /// Texture band factor.
    #[serde(default = "default_enhancement_factor")]
    pub texture: f64,
}

impl Default for EnhancementFactors {
    fn default() -> Self {
        Self {
            style: DEFAULT_ENHANCEMENT_FACTOR,
            color: DEFAULT_ENHANCEMENT_FACTOR,
            content: DEFAULT_ENHANCEMENT_FACTOR,
            structure: DEFAULT_ENHANCEMENT_FACTOR,
            texture: DEFAULT_ENHANCEMENT_FACTOR,
        }
    }
}

impl EnhancementFactors {
    /// Returns the factor for one band.
    pub fn get(&self, band: BandName) -> f64 {
        match band {
            BandName::Style => self.style,
            BandName::Color => self.color,
            BandName::Content => self.content,
            BandName::Structure => self.structure,
            BandName::Texture => self.texture,
        }
    }

    /// Returns all factors as a band map.
    pub fn to_band_map(&self) -> BandMap<f64> {
        BandMap::from_fn(|band| self.get(band))
    }
}

/// Parameters for one composition run.
///
/// Field names and defaults match the declared parameter schema, see
/// [`crate::schema::param_schema`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ComposeParams {
    /// Scales the style band.
    #[serde(default = "default_weight")]
    pub style_weight: f64,
    /// Scales the color band.
    #[serde(default = "default_weight")]
    pub color_weight: f64,
    /// Scales the content band.
    #[serde(default = "default_weight")]
    pub content_weight: f64,
    /// Scales the structure band.
    #[serde(default = "default_weight")]
    pub structure_weight: f64,
    /// Scales the texture band.
    #[serde(default = "default_weight")]
    pub texture_weight: f64,
    /// Minimum composite similarity that triggers replacement (threshold mode).
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f64,
    /// Base multiplier for replaced or fused bands.
    #[serde(default = "default_enhancement_base")]
    pub enhancement_base: f64,
    /// Per-band multipliers for replaced bands (threshold mode).
    #[serde(default)]
    pub enhancement_factors: EnhancementFactors,
}

impl Default for ComposeParams {
    fn default() -> Self {
        Self {
            style_weight: DEFAULT_WEIGHT,
            color_weight: DEFAULT_WEIGHT,
            content_weight: DEFAULT_WEIGHT,
            structure_weight: DEFAULT_WEIGHT,
            texture_weight: DEFAULT_WEIGHT,
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            enhancement_base: DEFAULT_ENHANCEMENT_BASE,
            enhancement_factors: EnhancementFactors::default(),
        }
    }
}

impl ComposeParams {
    /// Returns the weight for one band.
    pub fn weight(&self, band: BandName) -> f64 {
        match band {
            BandName::Style => self.style_weight,
            BandName::Color => self.color_weight,
            BandName::Content => self.content_weight,
            BandName::Structure => self.structure_weight,
            BandName::Texture => self.texture_weight,
        }
    }

    /// Sets the weight for one band.
    pub fn set_weight(&mut self, band: BandName, value: f64) {
        let slot = match band {
            BandName::Style => &mut self.style_weight,
            BandName::Color => &mut self.color_weight,
            BandName::Content => &mut self.content_weight,
            BandName::Structure => &mut self.structure_weight,
            BandName::Texture => &mut self.texture_weight,
        };
        *slot = value;
    }

    /// Builder-style weight override.
    pub fn with_weight(mut self, band: BandName, value: f64) -> Self {
        self.set_weight(band, value);
        self
    }

    /// Returns all five weights as a band map.
    pub fn weights(&self) -> BandMap<f64> {
        BandMap::from_fn(|band| self.weight(band))
    }

    /// Parses params from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

fn default_weight() -> f64 {
    DEFAULT_WEIGHT
}

fn default_similarity_threshold() -> f64 {
    DEFAULT_SIMILARITY_THRESHOLD
}

fn default_enhancement_base() -> f64 {
    DEFAULT_ENHANCEMENT_BASE
}

fn default_enhancement_factor() -> f64 {
    DEFAULT_ENHANCEMENT_FACTOR
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_empty_json_uses_defaults() {
        let params = ComposeParams::from_json("{}").unwrap();
        assert_eq!(params, ComposeParams::default());
        assert_eq!(params.similarity_threshold, 0.7);
        assert_eq!(params.enhancement_base, 1.5);
    }

    #[test]
    fn test_partial_json_keeps_other_defaults() {
        let params = ComposeParams::from_json(r#"{"style_weight": 2.0}"#).unwrap();
        assert_eq!(params.weight(BandName::Style), 2.0);
        assert_eq!(params.weight(BandName::Color), 1.0);
    }

    #[test]
    fn test_unknown_field_rejected() {
        assert!(ComposeParams::from_json(r#"{"shape_weight": 2.0}"#).is_err());
    }

    #[test]
    fn test_partial_enhancement_factors() {
        let params =
            ComposeParams::from_json(r#"{"enhancement_factors": {"texture": 1.8}}"#).unwrap();
        assert_eq!(params.enhancement_factors.get(BandName::Texture), 1.8);
        assert_eq!(params.enhancement_factors.get(BandName::Style), 1.0);
    }

    #[test]
    fn test_with_weight_only_touches_one_band() {
        let params = ComposeParams::default().with_weight(BandName::Content, 3.5);
        let weights = params.weights();
        assert_eq!(weights.into_array(), [1.0, 1.0, 3.5, 1.0, 1.0]);
    }

    #[test]
    fn test_mode_serde() {
        let mode: CompositionMode = serde_json::from_str("\"fusion\"").unwrap();
        assert_eq!(mode, CompositionMode::Fusion);
        assert!(mode.requires_auxiliary());
        assert!(!mode.requires_text());
        assert_eq!(CompositionMode::default(), CompositionMode::Weighted);
    }
}
