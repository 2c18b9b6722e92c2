//! Validation findings and the scored verdict.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Error severity, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

/// Warning impact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Impact {
    Low,
    Medium,
    High,
}

/// Best-practice importance tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Importance {
    Recommended,
    Important,
    Critical,
}

/// Stable tag of a validation finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingKind {
    MissingDataSource,
    MissingAction,
    DuplicateComponentId,
    InvalidParameter,
    FlowCycle,
    SelfLoopFlow,
    UnknownFlowEndpoint,
    IncompatibleFlow,
    OrphanedComponent,
    MissingEntryCondition,
    MissingExitCondition,
    MissingRiskManagement,
    ExcessiveRisk,
}

impl FindingKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MissingDataSource => "missing_data_source",
            Self::MissingAction => "missing_action",
            Self::DuplicateComponentId => "duplicate_component_id",
            Self::InvalidParameter => "invalid_parameter",
            Self::FlowCycle => "flow_cycle",
            Self::SelfLoopFlow => "self_loop_flow",
            Self::UnknownFlowEndpoint => "unknown_flow_endpoint",
            Self::IncompatibleFlow => "incompatible_flow",
            Self::OrphanedComponent => "orphaned_component",
            Self::MissingEntryCondition => "missing_entry_condition",
            Self::MissingExitCondition => "missing_exit_condition",
            Self::MissingRiskManagement => "missing_risk_management",
            Self::ExcessiveRisk => "excessive_risk",
        }
    }
}

impl fmt::Display for FindingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationError {
    pub kind: FindingKind,
    pub severity: Severity,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_id: Option<String>,
    /// Whether an editor could repair this automatically.
    pub fixable: bool,
}

impl ValidationError {
    pub fn new(kind: FindingKind, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity,
            message: message.into(),
            component_id: None,
            connection_id: None,
            fixable: false,
        }
    }

    pub fn for_component(mut self, id: impl Into<String>) -> Self {
        self.component_id = Some(id.into());
        self
    }

    pub fn for_connection(mut self, id: impl Into<String>) -> Self {
        self.connection_id = Some(id.into());
        self
    }

    pub fn fixable(mut self) -> Self {
        self.fixable = true;
        self
    }

    pub fn is_critical(&self) -> bool {
        self.severity == Severity::Critical
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationWarning {
    pub kind: FindingKind,
    pub message: String,
    pub impact: Impact,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component_id: Option<String>,
}

impl ValidationWarning {
    pub fn new(kind: FindingKind, impact: Impact, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            impact,
            component_id: None,
        }
    }

    pub fn for_component(mut self, id: impl Into<String>) -> Self {
        self.component_id = Some(id.into());
        self
    }
}

/// Outcome of one named best-practice rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BestPracticeCheck {
    pub name: String,
    pub compliant: bool,
    pub importance: Importance,
}

/// Static cost estimates for a strategy. Not runtime measurements.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub complexity: usize,
    pub latency_ms: f64,
    pub memory_kb: f64,
    pub execution_time_ms: f64,
    /// In `[0, 1]`; higher is better.
    pub scalability: f64,
    /// In `[0, 1]`; higher is better.
    pub maintainability: f64,
    /// Thresholds this estimate breaches, by metric name.
    pub breaches: Vec<String>,
}

/// Error, warning and suggestion lists of one check family.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Findings {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
    pub suggestions: Vec<String>,
}

impl Findings {
    pub fn error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn warn(&mut self, warning: ValidationWarning) {
        self.warnings.push(warning);
    }

    pub fn suggest(&mut self, suggestion: impl Into<String>) {
        self.suggestions.push(suggestion.into());
    }

    pub fn merge(&mut self, other: Findings) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
        self.suggestions.extend(other.suggestions);
    }
}

/// The scored verdict.
///
/// `is_valid` is false whenever any error is critical, whatever the score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    /// In `[0, 100]`.
    pub score: u8,
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
    pub suggestions: Vec<String>,
    pub best_practices: Vec<BestPracticeCheck>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub performance: Option<PerformanceMetrics>,
}

impl ValidationResult {
    pub fn critical_errors(&self) -> impl Iterator<Item = &ValidationError> {
        self.errors.iter().filter(|e| e.is_critical())
    }

    pub fn has_error(&self, kind: FindingKind) -> bool {
        self.errors.iter().any(|e| e.kind == kind)
    }

    pub fn has_warning(&self, kind: FindingKind) -> bool {
        self.warnings.iter().any(|w| w.kind == kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_orders_critical_highest() {
        assert!(Severity::Critical > Severity::High);
        assert!(Severity::Low < Severity::Medium);
        assert_eq!(serde_json::to_string(&Severity::Critical).unwrap(), "\"critical\"");
    }

    #[test]
    fn test_finding_kind_serializes_as_str() {
        let s = serde_json::to_string(&FindingKind::MissingRiskManagement).unwrap();
        assert_eq!(s, format!("\"{}\"", FindingKind::MissingRiskManagement));
    }

    #[test]
    fn test_error_builder_sets_references() {
        let e = ValidationError::new(FindingKind::InvalidParameter, Severity::High, "bad")
            .for_component("d1")
            .fixable();
        assert_eq!(e.component_id.as_deref(), Some("d1"));
        assert!(e.fixable);
        assert!(!e.is_critical());
    }
}
