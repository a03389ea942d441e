//! Declared parameter schema.
//!
//! Hosts use this table to render controls and clamp inputs. Every entry
//! corresponds to a field of [`ComposeParams`](crate::params::ComposeParams).

use serde::Serialize;

use crate::params::{
    DEFAULT_ENHANCEMENT_BASE, DEFAULT_ENHANCEMENT_FACTOR, DEFAULT_SIMILARITY_THRESHOLD,
    DEFAULT_WEIGHT,
};

/// Inclusive range for band weights.
pub const WEIGHT_RANGE: (f64, f64) = (0.0, 10.0);
/// Inclusive range for the similarity threshold.
pub const THRESHOLD_RANGE: (f64, f64) = (0.0, 1.0);
/// Inclusive range for the enhancement base.
pub const ENHANCEMENT_BASE_RANGE: (f64, f64) = (1.0, 3.0);
/// Inclusive range for per-band enhancement factors.
pub const ENHANCEMENT_FACTOR_RANGE: (f64, f64) = (0.5, 2.0);

/// Description of one declared float parameter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParamDescriptor {
    /// Parameter name as it appears in documents.
    pub name: &'static str,
    /// Default value.
    pub default: f64,
    /// Inclusive minimum.
    pub min: f64,
    /// Inclusive maximum.
    pub max: f64,
    /// UI step size.
    pub step: f64,
    /// Short user-facing description.
    pub tooltip: &'static str,
}

impl ParamDescriptor {
    const fn new(
        name: &'static str,
        default: f64,
        range: (f64, f64),
        step: f64,
        tooltip: &'static str,
    ) -> Self {
        Self {
            name,
            default,
            min: range.0,
            max: range.1,
            step,
            tooltip,
        }
    }

    /// Whether `value` is finite and inside the declared range.
    pub fn contains(&self, value: f64) -> bool {
        value.is_finite() && value >= self.min && value <= self.max
    }
}

const SCHEMA: &[ParamDescriptor] = &[
    ParamDescriptor::new(
        "style_weight",
        DEFAULT_WEIGHT,
        WEIGHT_RANGE,
        0.01,
        "Weight of the overall artistic style",
    ),
    ParamDescriptor::new(
        "color_weight",
        DEFAULT_WEIGHT,
        WEIGHT_RANGE,
        0.01,
        "Weight of color features",
    ),
    ParamDescriptor::new(
        "content_weight",
        DEFAULT_WEIGHT,
        WEIGHT_RANGE,
        0.01,
        "Weight of content semantics",
    ),
    ParamDescriptor::new(
        "structure_weight",
        DEFAULT_WEIGHT,
        WEIGHT_RANGE,
        0.01,
        "Weight of structural layout",
    ),
    ParamDescriptor::new(
        "texture_weight",
        DEFAULT_WEIGHT,
        WEIGHT_RANGE,
        0.01,
        "Weight of texture detail",
    ),
    ParamDescriptor::new(
        "similarity_threshold",
        DEFAULT_SIMILARITY_THRESHOLD,
        THRESHOLD_RANGE,
        0.01,
        "Composite text/image similarity above which a band is replaced",
    ),
    ParamDescriptor::new(
        "enhancement_base",
        DEFAULT_ENHANCEMENT_BASE,
        ENHANCEMENT_BASE_RANGE,
        0.01,
        "Base multiplier for replaced or fused bands",
    ),
    ParamDescriptor::new(
        "enhancement_factors.*",
        DEFAULT_ENHANCEMENT_FACTOR,
        ENHANCEMENT_FACTOR_RANGE,
        0.01,
        "Per-band multiplier applied when a band is replaced",
    ),
];

/// Returns the declared schema for every composition parameter.
pub fn param_schema() -> &'static [ParamDescriptor] {
    SCHEMA
}

/// Looks up a descriptor by parameter name.
pub fn descriptor(name: &str) -> Option<&'static ParamDescriptor> {
    SCHEMA.iter().find(|d| d.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::band::BandName;
    use crate::params::ComposeParams;

    #[test]
    fn test_schema_covers_every_weight() {
        for band in BandName::ALL {
            let d = descriptor(band.weight_param()).expect("weight descriptor");
            assert_eq!(d.min, 0.0);
            assert_eq!(d.max, 10.0);
        }
    }

    #[test]
    fn test_schema_defaults_match_params_defaults() {
        let params = ComposeParams::default();
        let value = serde_json::to_value(&params).unwrap();
        for d in param_schema().iter().filter(|d| !d.name.contains('.')) {
            assert_eq!(value[d.name].as_f64(), Some(d.default), "{}", d.name);
        }
    }

    #[test]
    fn test_defaults_inside_ranges() {
        for d in param_schema() {
            assert!(d.contains(d.default), "{} default outside range", d.name);
        }
    }

    #[test]
    fn test_contains_rejects_non_finite() {
        let d = descriptor("similarity_threshold").unwrap();
        assert!(!d.contains(f64::NAN));
        assert!(d.contains(1.0));
        assert!(!d.contains(1.0001));
    }
}
