//! Dependency graph construction over strategy components.
//!
//! Provides:
//! - [`builder::DependencyGraphBuilder`]: rule-driven edge selection, cycle
//!   detection, leveling and execution ordering
//! - [`model::DependencyGraph`]: the immutable result and its query helpers
//! - [`traversal`]: iterative DFS cycle search and postorder

pub mod builder;
pub mod model;
pub mod traversal;

pub use builder::{
    CandidateWeights, DependencyGraphBuilder, DependencyReport, GraphBuild, MissingDependency,
    DEFAULT_MAX_LEVEL_ITERATIONS, EXPLICIT_FALLBACK_WEIGHT,
};
pub use model::{DependencyEdge, DependencyGraph, DependencyNode, EdgeOrigin, UNRESOLVED_LEVEL};
pub use traversal::{find_cycles, postorder};
