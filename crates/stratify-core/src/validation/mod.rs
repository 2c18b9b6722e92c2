//! Validation and scoring of interpreted strategies.
//!
//! Independent check families (components, flows, structure, risk policy,
//! best practices, performance) feed one additive score in `[0, 100]`.
//! Validity is decided separately: a strategy is valid iff it has no
//! critical error.

pub mod checks;
pub mod engine;
pub mod model;
pub mod options;
pub mod performance;

pub use engine::{compute_score, score, ValidationEngine, MAX_SCORE};
pub use model::{
    BestPracticeCheck, FindingKind, Findings, Impact, Importance, PerformanceMetrics, Severity,
    ValidationError, ValidationResult, ValidationWarning,
};
pub use options::{
    PerformanceModel, PerformanceThresholds, ScoringWeights, ValidationOptions,
    DEFAULT_MAX_COMPONENTS, DEFAULT_MAX_RISK_PERCENT,
};
pub use performance::estimate;
