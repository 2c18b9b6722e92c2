//! Stratify Core Library
//!
//! Interprets typed trading-strategy components into a validated, ordered,
//! connected graph. Re-exports the analytical stages and the orchestrator
//! for programmatic access.

pub mod connection;
pub mod domain;
pub mod graph;
pub mod obs;
pub mod pipeline;
pub mod telemetry;
pub mod validation;

pub use domain::{
    blueprint_digest, canonical_json, Blueprint, CompatibilityMatrix, ComponentNodeMapping,
    ComponentType, ConnectionKind, DependencyKind, DependencyRule, ErrorKind, InterpretError,
    InterpretResult, Position, RiskProfile, RuleTable, StrategyComponent, StrategyFlow,
    DEFAULT_RULE_PRIORITY,
};

pub use graph::{
    find_cycles, postorder, CandidateWeights, DependencyEdge, DependencyGraph,
    DependencyGraphBuilder, DependencyNode, DependencyReport, EdgeOrigin, GraphBuild,
    MissingDependency, DEFAULT_MAX_LEVEL_ITERATIONS,
};

pub use connection::{
    standard_patterns, ConfidenceParams, ConnectionCheck, ConnectionIssue, ConnectionMapping,
    ConnectionOrigin, ConnectionSynthesizer, ConnectionValidator, PatternRule, Synthesis,
    SynthesisOptions, INVALID_CONNECTION_PENALTY,
};

pub use validation::{
    compute_score, BestPracticeCheck, FindingKind, Impact, Importance, PerformanceMetrics,
    PerformanceThresholds, ScoringWeights, Severity, ValidationEngine, ValidationError,
    ValidationOptions, ValidationResult, ValidationWarning,
};

pub use pipeline::{
    BlueprintGenerator, ConfidenceWeights, IdentityNodeMapper, InterpretOptions,
    InterpretRequest, InterpretationResult, NodeMapper, PipelineError, Stage,
    StaticBlueprintGenerator, StrategyInterpreter,
};

pub use telemetry::init_tracing;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
