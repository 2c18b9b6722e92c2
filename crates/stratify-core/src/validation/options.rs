//! Scoring weights, performance thresholds and validation toggles.

use serde::{Deserialize, Serialize};

use crate::validation::model::{Impact, Importance, Severity};

/// Deductions from the starting score of 100.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    pub critical_error: f64,
    pub high_error: f64,
    pub medium_error: f64,
    pub low_error: f64,
    pub high_warning: f64,
    pub medium_warning: f64,
    pub low_warning: f64,
    pub critical_practice: f64,
    pub important_practice: f64,
    pub recommended_practice: f64,
    /// Flat deduction per breached performance threshold.
    pub performance_breach: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            critical_error: 25.0,
            high_error: 15.0,
            medium_error: 10.0,
            low_error: 5.0,
            high_warning: 8.0,
            medium_warning: 5.0,
            low_warning: 2.0,
            critical_practice: 15.0,
            important_practice: 10.0,
            recommended_practice: 5.0,
            performance_breach: 10.0,
        }
    }
}

impl ScoringWeights {
    pub fn for_severity(&self, severity: Severity) -> f64 {
        match severity {
            Severity::Critical => self.critical_error,
            Severity::High => self.high_error,
            Severity::Medium => self.medium_error,
            Severity::Low => self.low_error,
        }
    }

    pub fn for_impact(&self, impact: Impact) -> f64 {
        match impact {
            Impact::High => self.high_warning,
            Impact::Medium => self.medium_warning,
            Impact::Low => self.low_warning,
        }
    }

    pub fn for_importance(&self, importance: Importance) -> f64 {
        match importance {
            Importance::Critical => self.critical_practice,
            Importance::Important => self.important_practice,
            Importance::Recommended => self.recommended_practice,
        }
    }
}

/// Limits the performance estimate is checked against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceThresholds {
    pub max_complexity: usize,
    pub max_latency_ms: f64,
    pub min_scalability: f64,
    pub min_maintainability: f64,
}

impl Default for PerformanceThresholds {
    fn default() -> Self {
        Self {
            max_complexity: 50,
            max_latency_ms: 100.0,
            min_scalability: 0.5,
            min_maintainability: 0.3,
        }
    }
}

/// Linear cost coefficients of the performance estimate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceModel {
    pub latency_per_component_ms: f64,
    pub latency_per_flow_ms: f64,
    pub memory_per_component_kb: f64,
    pub memory_per_flow_kb: f64,
    pub execution_per_component_ms: f64,
    pub execution_per_flow_ms: f64,
    /// Complexity at which scalability reaches zero.
    pub scalability_horizon: f64,
    /// Connections per component that alone exhaust maintainability.
    pub connection_density_limit: f64,
    /// Distinct types that alone exhaust maintainability.
    pub type_variety_limit: f64,
}

impl Default for PerformanceModel {
    fn default() -> Self {
        Self {
            latency_per_component_ms: 5.0,
            latency_per_flow_ms: 1.0,
            memory_per_component_kb: 64.0,
            memory_per_flow_kb: 8.0,
            execution_per_component_ms: 2.0,
            execution_per_flow_ms: 0.5,
            scalability_horizon: 200.0,
            connection_density_limit: 5.0,
            type_variety_limit: 10.0,
        }
    }
}

/// Risk percentage above which an explicit risk profile draws a warning.
pub const DEFAULT_MAX_RISK_PERCENT: f64 = 5.0;

/// Component count allowed by the size best practice.
pub const DEFAULT_MAX_COMPONENTS: usize = 15;

/// Validation toggles and tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationOptions {
    /// Missing risk management becomes a critical error.
    pub strict_mode: bool,
    pub check_best_practices: bool,
    pub check_performance: bool,
    /// Maximum risk per trade, in percent, before a warning.
    pub max_risk_percent: f64,
    /// Component count above which the size best practice fails.
    pub max_components: usize,
    pub scoring: ScoringWeights,
    pub thresholds: PerformanceThresholds,
    pub model: PerformanceModel,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self {
            strict_mode: false,
            check_best_practices: true,
            check_performance: true,
            max_risk_percent: DEFAULT_MAX_RISK_PERCENT,
            max_components: DEFAULT_MAX_COMPONENTS,
            scoring: ScoringWeights::default(),
            thresholds: PerformanceThresholds::default(),
            model: PerformanceModel::default(),
        }
    }
}

impl ValidationOptions {
    pub fn strict() -> Self {
        Self {
            strict_mode: true,
            ..Self::default()
        }
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

    pub fn with_thresholds(mut self, thresholds: PerformanceThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }
}
