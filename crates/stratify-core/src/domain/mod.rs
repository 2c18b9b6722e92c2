//! Domain model for strategy interpretation.
//!
//! - `StrategyComponent` / `Blueprint`: the upstream generator's output
//! - `RuleTable` / `CompatibilityMatrix`: fixed per-category rule tables
//! - `InterpretError`: typed hard failures shared by every stage

pub mod component;
pub mod digest;
pub mod error;
pub mod rules;

pub use component::{
    Blueprint, ComponentNodeMapping, ComponentType, Position, RiskProfile, StrategyComponent,
    StrategyFlow,
};
pub use digest::{blueprint_digest, canonical_json};
pub use error::{ErrorKind, InterpretError, InterpretResult};
pub use rules::{
    CompatibilityMatrix, ConnectionKind, DependencyKind, DependencyRule, RuleTable,
    DEFAULT_RULE_PRIORITY,
};
