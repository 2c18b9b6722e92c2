//! Connection synthesis between mapped nodes.
//!
//! Provides:
//! - [`synthesizer::ConnectionSynthesizer`]: edges, flow hints and motifs to
//!   scored connections
//! - [`optimize`]: duplicate removal and per-node caps
//! - [`validate::ConnectionValidator`]: self-loop, endpoint and matrix checks
//! - [`patterns`]: the motif catalogue

pub mod model;
pub mod optimize;
pub mod patterns;
pub mod synthesizer;
pub mod validate;

pub use model::{ConnectionCheck, ConnectionIssue, ConnectionMapping, ConnectionOrigin, Synthesis};
pub use optimize::{deduplicate, enforce_node_cap};
pub use patterns::{standard_patterns, MotifMatch, PatternRule};
pub use synthesizer::{
    ConfidenceParams, ConnectionSynthesizer, SynthesisOptions, LOW_CONFIDENCE_THRESHOLD,
};
pub use validate::{ConnectionValidator, INVALID_CONNECTION_PENALTY};
