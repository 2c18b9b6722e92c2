//! Interpretation options.
//!
//! Every field has a default, so partial TOML or JSON documents are accepted.

use serde::{Deserialize, Serialize};

use crate::connection::synthesizer::{ConfidenceParams, SynthesisOptions};
use crate::graph::builder::{CandidateWeights, DEFAULT_MAX_LEVEL_ITERATIONS};
use crate::validation::options::{
    PerformanceModel, PerformanceThresholds, ScoringWeights, ValidationOptions,
    DEFAULT_MAX_COMPONENTS, DEFAULT_MAX_RISK_PERCENT,
};

/// Weights of the aggregate run confidence.
///
/// `confidence = blueprint * w.blueprint + avg_mapping * w.node_mapping
///             + avg_connection * w.connection + score / 100 * w.validation`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceWeights {
    pub blueprint: f64,
    pub node_mapping: f64,
    pub connection: f64,
    pub validation: f64,
}

impl Default for ConfidenceWeights {
    fn default() -> Self {
        Self {
            blueprint: 0.3,
            node_mapping: 0.25,
            connection: 0.25,
            validation: 0.2,
        }
    }
}

impl ConfidenceWeights {
    /// Weighted sum, clamped to `[0, 1]`.
    pub fn aggregate(
        &self,
        blueprint: f64,
        avg_node_mapping: f64,
        avg_connection: f64,
        score: u8,
    ) -> f64 {
        let total = blueprint * self.blueprint
            + avg_node_mapping * self.node_mapping
            + avg_connection * self.connection
            + f64::from(score) / 100.0 * self.validation;
        total.clamp(0.0, 1.0)
    }
}

/// Configuration surface of one interpretation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterpretOptions {
    pub strict_mode: bool,
    pub check_best_practices: bool,
    pub check_performance: bool,
    /// Risk profiles above this percentage draw a warning.
    pub max_risk_percent: f64,
    /// Component count allowed by the size best practice.
    pub max_components: usize,
    pub max_connections_per_node: usize,
    /// Leveling pass cap; exhausting it fails the graph stage.
    pub max_level_iterations: usize,
    pub optimize_connections: bool,
    pub validate_connections: bool,
    pub candidates: CandidateWeights,
    pub synthesis: ConfidenceParams,
    pub scoring: ScoringWeights,
    pub thresholds: PerformanceThresholds,
    pub performance_model: PerformanceModel,
    pub confidence: ConfidenceWeights,
}

impl Default for InterpretOptions {
    fn default() -> Self {
        Self {
            strict_mode: false,
            check_best_practices: true,
            check_performance: true,
            max_risk_percent: DEFAULT_MAX_RISK_PERCENT,
            max_components: DEFAULT_MAX_COMPONENTS,
            max_connections_per_node: 8,
            max_level_iterations: DEFAULT_MAX_LEVEL_ITERATIONS,
            optimize_connections: true,
            validate_connections: true,
            candidates: CandidateWeights::default(),
            synthesis: ConfidenceParams::default(),
            scoring: ScoringWeights::default(),
            thresholds: PerformanceThresholds::default(),
            performance_model: PerformanceModel::default(),
            confidence: ConfidenceWeights::default(),
        }
    }
}

impl InterpretOptions {
    /// Parse an options document.
    pub fn from_toml_str(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }

    pub fn with_strict_mode(mut self, strict: bool) -> Self {
        self.strict_mode = strict;
        self
    }

    pub fn with_best_practices(mut self, enabled: bool) -> Self {
        self.check_best_practices = enabled;
        self
    }

    pub fn with_performance(mut self, enabled: bool) -> Self {
        self.check_performance = enabled;
        self
    }

    pub fn with_max_connections_per_node(mut self, max: usize) -> Self {
        self.max_connections_per_node = max;
        self
    }

    pub fn with_max_level_iterations(mut self, cap: usize) -> Self {
        self.max_level_iterations = cap;
        self
    }

    pub fn with_optimization(mut self, enabled: bool) -> Self {
        self.optimize_connections = enabled;
        self
    }

    pub fn with_connection_validation(mut self, enabled: bool) -> Self {
        self.validate_connections = enabled;
        self
    }

    pub fn synthesis_options(&self) -> SynthesisOptions {
        SynthesisOptions {
            optimize: self.optimize_connections,
            validate: self.validate_connections,
            max_connections_per_node: self.max_connections_per_node,
        }
    }

    pub fn validation_options(&self) -> ValidationOptions {
        ValidationOptions {
            strict_mode: self.strict_mode,
            check_best_practices: self.check_best_practices,
            check_performance: self.check_performance,
            scoring: self.scoring.clone(),
            thresholds: self.thresholds.clone(),
            max_risk_percent: self.max_risk_percent,
            max_components: self.max_components,
            model: self.performance_model.clone(),
        }
    }
}
