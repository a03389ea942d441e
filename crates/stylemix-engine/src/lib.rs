//! stylemix composition engine
//!
//! Turns an image-encoder style embedding into extra conditioning tokens. The
//! embedding is cut into five positional bands (style, color, content,
//! structure, texture); each band is weighted, optionally replaced by a
//! text-derived substitute or fused with auxiliary embeddings, and the bands
//! are recombined and appended to every entry of a conditioning sequence.
//!
//! # Determinism
//!
//! Every operation is a pure function of its inputs. Seeded projection tables
//! draw weights from per-band PCG32 streams, so a given seed always yields the
//! same table.
//!
//! # Example
//!
//! ```
//! use stylemix_engine::{BatchedEmbedding, ConditioningEntry, SequenceTensor, StyleComposer};
//! use stylemix_spec::{BandName, ComposeParams};
//!
//! let style = BatchedEmbedding::from_vector(vec![0.5; 10]).unwrap();
//! let entry = ConditioningEntry::new(
//!     SequenceTensor::new(1, 4, 10, vec![0.0; 40]).unwrap(),
//!     serde_json::Map::new(),
//! );
//!
//! let composer = StyleComposer::weighted(ComposeParams::default().with_weight(BandName::Color, 2.0));
//! let applied = composer.apply(&style, &[entry], None).unwrap();
//! assert_eq!(applied.conditioning[0].embedding.shape(), [1, 5, 10]);
//! ```
//!
//! # Crate Structure
//!
//! - [`tensor`] - `[batch, dim]` and `[groups, sequence, dim]` tensors
//! - [`split`] - Positional band splitting
//! - [`score`] - Composite similarity scoring
//! - [`project`] - Per-band projection and auxiliary fusion
//! - [`policy`] - Keep/replace decisions
//! - [`recombine`] - Concatenation and mean-fusion recombination
//! - [`compose`] - Appending composed tokens to conditioning entries
//! - [`pipeline`] - The [`StyleComposer`] that ties it together
//! - [`rng`] - Deterministic RNG for seeded projections

pub mod compose;
pub mod error;
pub mod pipeline;
pub mod policy;
pub mod project;
pub mod recombine;
pub mod rng;
pub mod score;
pub mod split;
pub mod tensor;

pub use compose::{ConditioningComposer, ConditioningEntry};
pub use error::{ComposeError, ComposeResult};
pub use pipeline::{Applied, BandTrace, Composition, StyleComposer};
pub use policy::BandDecision;
pub use project::{AuxiliaryEncoder, CrossModalProjector, Linear, ProjectionTable};
pub use recombine::{ConcatRecombiner, MeanFusionRecombiner, Recombiner};
pub use score::{MetricWeights, SimilarityBreakdown, SimilarityScorer};
pub use split::BandSplitter;
pub use tensor::{broadcast_batch, BatchedEmbedding, SequenceTensor};
