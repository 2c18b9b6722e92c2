//! Strategy component value types.
//!
//! A [`StrategyComponent`] is produced by an upstream blueprint generator and
//! is read-only inside the interpretation core.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Closed set of component categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ComponentType {
    DataSource,
    Indicator,
    Condition,
    Action,
    Risk,
    Timing,
    Math,
    Logic,
}

impl ComponentType {
    /// Every category, in declaration order.
    pub const ALL: [ComponentType; 8] = [
        ComponentType::DataSource,
        ComponentType::Indicator,
        ComponentType::Condition,
        ComponentType::Action,
        ComponentType::Risk,
        ComponentType::Timing,
        ComponentType::Math,
        ComponentType::Logic,
    ];

    /// Stable kebab-case name, identical to the serialized form.
    pub fn as_str(self) -> &'static str {
        match self {
            ComponentType::DataSource => "data-source",
            ComponentType::Indicator => "indicator",
            ComponentType::Condition => "condition",
            ComponentType::Action => "action",
            ComponentType::Risk => "risk",
            ComponentType::Timing => "timing",
            ComponentType::Math => "math",
            ComponentType::Logic => "logic",
        }
    }
}

impl fmt::Display for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Editor canvas position. Opaque to the core; carried through unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// A typed unit of a trading strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyComponent {
    /// Unique identifier within a blueprint.
    pub id: String,
    #[serde(rename = "type")]
    pub component_type: ComponentType,
    /// Free-form tag refining the category, e.g. `"rsi"` or `"entry_crossover"`.
    pub subtype: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub parameters: BTreeMap<String, serde_json::Value>,
    /// Lower runs earlier.
    #[serde(default)]
    pub priority: i32,
    /// Ids this component explicitly depends on.
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub optional: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
}

impl StrategyComponent {
    /// Create a component with no parameters or explicit dependencies.
    pub fn new(
        id: impl Into<String>,
        component_type: ComponentType,
        subtype: impl Into<String>,
    ) -> Self {
        let id = id.into();
        Self {
            label: id.clone(),
            id,
            component_type,
            subtype: subtype.into(),
            parameters: BTreeMap::new(),
            priority: 0,
            dependencies: Vec::new(),
            optional: false,
            position: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_param(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.parameters.insert(key.into(), value);
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_dependency(mut self, id: impl Into<String>) -> Self {
        self.dependencies.push(id.into());
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// String parameter, if present and a string.
    pub fn param_str(&self, key: &str) -> Option<&str> {
        self.parameters.get(key).and_then(|v| v.as_str())
    }

    /// Numeric parameter, if present and a number.
    pub fn param_f64(&self, key: &str) -> Option<f64> {
        self.parameters.get(key).and_then(|v| v.as_f64())
    }

    /// Lower-cased subtype tokens split on `_`, `-` and whitespace.
    pub fn subtype_tokens(&self) -> Vec<String> {
        self.subtype
            .split(|c: char| c == '_' || c == '-' || c.is_whitespace())
            .filter(|t| !t.is_empty())
            .map(|t| t.to_ascii_lowercase())
            .collect()
    }
}

/// A declared link between two components, either supplied by the caller as
/// an override or derived from synthesized connections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyFlow {
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(default)]
    pub kind: Option<crate::domain::rules::ConnectionKind>,
}

impl StrategyFlow {
    pub fn new(
        id: impl Into<String>,
        source: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
            kind: None,
        }
    }
}

/// Caller-declared risk limits for a blueprint.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RiskProfile {
    /// Maximum risk per trade, in percent of equity.
    #[serde(default)]
    pub max_risk_percent: Option<f64>,
    /// Stop loss distance, in percent.
    #[serde(default)]
    pub stop_loss_percent: Option<f64>,
    #[serde(default)]
    pub take_profit_percent: Option<f64>,
}

/// The upstream generator's output: components plus optional flow override.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Blueprint {
    #[serde(default)]
    pub name: String,
    pub components: Vec<StrategyComponent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flows: Option<Vec<StrategyFlow>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_profile: Option<RiskProfile>,
    /// Generator confidence in `[0, 1]`.
    #[serde(default)]
    pub confidence: f64,
}

/// Correspondence between a component and a rendered node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentNodeMapping {
    pub component_id: String,
    pub node_id: String,
    pub confidence: f64,
}
