//! Pipeline orchestration.
//!
//! Provides:
//! - [`interpreter::StrategyInterpreter`]: sequences every stage and
//!   aggregates the run confidence
//! - [`collaborators`]: async seams for blueprint generation and node mapping
//! - [`options::InterpretOptions`]: the configuration surface
//! - [`error::PipelineError`]: stage-tagged failures

pub mod collaborators;
pub mod error;
pub mod interpreter;
pub mod options;

pub use collaborators::{
    BlueprintGenerator, IdentityNodeMapper, InterpretRequest, NodeMapper,
    StaticBlueprintGenerator, IDENTITY_MAPPING_CONFIDENCE,
};
pub use error::{PipelineError, Stage};
pub use interpreter::{
    average_mapping_confidence, flows_from_connections, InterpretationResult, StrategyInterpreter,
};
pub use options::{ConfidenceWeights, InterpretOptions};
