//! stylemix job and parameter library
//!
//! This crate provides the document side of stylemix: composition parameters
//! and their declared ranges, job documents carrying tensor payloads,
//! validation, and canonical hashing. It has no numeric code of its own; the
//! composition engine lives in `stylemix-engine`.
//!
//! # Example
//!
//! ```
//! use stylemix_spec::{ComposeParams, BandName};
//! use stylemix_spec::validation::validate_params;
//! use stylemix_spec::hash::canonical_params_hash;
//!
//! let params = ComposeParams::default().with_weight(BandName::Color, 2.0);
//! assert!(validate_params(&params).is_ok());
//!
//! let hash = canonical_params_hash(&params).unwrap();
//! println!("params hash: {}", hash);
//! ```
//!
//! # Modules
//!
//! - [`band`]: The five semantic bands and a per-band container
//! - [`params`]: Composition parameters and mode selection
//! - [`schema`]: Declared parameter ranges for hosts and validation
//! - [`tensor`]: Shape-plus-data tensor payloads
//! - [`job`]: Job documents
//! - [`validation`]: Parameter and job validation
//! - [`hash`]: Canonical hashing and seed derivation
//! - [`error`]: Error and warning types

pub mod band;
pub mod error;
pub mod hash;
pub mod job;
pub mod params;
pub mod schema;
pub mod tensor;
pub mod validation;

pub use band::{BandMap, BandName, BAND_COUNT};
pub use error::{
    BackendError, ErrorCode, SpecError, ValidationError, ValidationResult, ValidationWarning,
    WarningCode,
};
pub use hash::{canonical_params_hash, derive_band_seed, f32_slice_hash};
pub use job::{AuxiliarySpec, ConditioningSpec, JobSpec, LinearSpec, ProjectorSpec, JOB_VERSION};
pub use params::{ComposeParams, CompositionMode, EnhancementFactors};
pub use schema::{param_schema, ParamDescriptor};
pub use tensor::TensorData;
pub use validation::{is_valid_job_id, validate_job, validate_params};
