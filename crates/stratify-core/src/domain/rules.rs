//! Fixed dependency rules and the directed type-compatibility matrix.
//!
//! Both tables are keyed by the closed [`ComponentType`] enum and resolved
//! with exhaustive matches, so adding a category without rules fails to
//! compile. Tables are constructed once and handed to each service; nothing
//! here is global or mutable.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::component::ComponentType;

/// Rule priority used when a component type has no dependency rule.
pub const DEFAULT_RULE_PRIORITY: u8 = 5;

/// The nature of a dependency between two components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DependencyKind {
    DataFlow,
    SignalFlow,
    TriggerFlow,
    ControlFlow,
    ValidationFlow,
}

impl DependencyKind {
    /// Fixed lookup from dependency kind to rendered connection kind.
    pub fn connection_kind(self) -> ConnectionKind {
        match self {
            DependencyKind::DataFlow => ConnectionKind::DataPipe,
            DependencyKind::SignalFlow => ConnectionKind::SignalWire,
            DependencyKind::TriggerFlow => ConnectionKind::TriggerLine,
            DependencyKind::ControlFlow => ConnectionKind::ControlFlow,
            DependencyKind::ValidationFlow => ConnectionKind::FeedbackLoop,
        }
    }
}

impl fmt::Display for DependencyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DependencyKind::DataFlow => "data-flow",
            DependencyKind::SignalFlow => "signal-flow",
            DependencyKind::TriggerFlow => "trigger-flow",
            DependencyKind::ControlFlow => "control-flow",
            DependencyKind::ValidationFlow => "validation-flow",
        };
        f.write_str(s)
    }
}

/// Kind of a synthesized connection between two rendered nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConnectionKind {
    DataPipe,
    SignalWire,
    TriggerLine,
    ControlFlow,
    FeedbackLoop,
}

/// One dependency rule of a component type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependencyRule {
    /// Short rule name used in diagnostics, e.g. `"indicator.input"`.
    pub name: String,
    /// Component types this rule may depend on.
    pub allowed_sources: Vec<ComponentType>,
    pub kind: DependencyKind,
    /// Weight in `[0, 1]`.
    pub weight: f64,
    pub required: bool,
    /// Lower is more important.
    pub priority: u8,
}

impl DependencyRule {
    pub fn new(
        name: impl Into<String>,
        allowed_sources: &[ComponentType],
        kind: DependencyKind,
        weight: f64,
        required: bool,
        priority: u8,
    ) -> Self {
        Self {
            name: name.into(),
            allowed_sources: allowed_sources.to_vec(),
            kind,
            weight: weight.clamp(0.0, 1.0),
            required,
            priority,
        }
    }

    /// Whether `source` satisfies this rule.
    pub fn admits(&self, source: ComponentType) -> bool {
        self.allowed_sources.contains(&source)
    }
}

/// Per-category dependency rules.
///
/// One field per [`ComponentType`]; [`RuleTable::rules_for`] matches
/// exhaustively over the enum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleTable {
    pub data_source: Vec<DependencyRule>,
    pub indicator: Vec<DependencyRule>,
    pub condition: Vec<DependencyRule>,
    pub action: Vec<DependencyRule>,
    pub risk: Vec<DependencyRule>,
    pub timing: Vec<DependencyRule>,
    pub math: Vec<DependencyRule>,
    pub logic: Vec<DependencyRule>,
}

impl RuleTable {
    /// The standard rule set.
    pub fn standard() -> Self {
        use ComponentType::*;
        use DependencyKind::*;

        Self {
            data_source: Vec::new(),
            indicator: vec![DependencyRule::new(
                "indicator.input",
                &[DataSource],
                DataFlow,
                1.0,
                true,
                1,
            )],
            condition: vec![
                DependencyRule::new(
                    "condition.signal",
                    &[Indicator, Math],
                    SignalFlow,
                    0.9,
                    true,
                    2,
                ),
                DependencyRule::new("condition.session", &[Timing], ControlFlow, 0.4, false, 4),
            ],
            action: vec![
                DependencyRule::new(
                    "action.trigger",
                    &[Condition, Logic],
                    TriggerFlow,
                    1.0,
                    true,
                    3,
                ),
                DependencyRule::new("action.session", &[Timing], ControlFlow, 0.4, false, 4),
            ],
            risk: vec![DependencyRule::new(
                "risk.guard",
                &[Action],
                ValidationFlow,
                0.8,
                true,
                2,
            )],
            timing: Vec::new(),
            math: vec![DependencyRule::new(
                "math.operand",
                &[Indicator],
                DataFlow,
                0.7,
                true,
                3,
            )],
            logic: vec![DependencyRule::new(
                "logic.operand",
                &[Condition],
                SignalFlow,
                0.8,
                true,
                3,
            )],
        }
    }

    /// An empty table; every category has no rules.
    pub fn empty() -> Self {
        Self {
            data_source: Vec::new(),
            indicator: Vec::new(),
            condition: Vec::new(),
            action: Vec::new(),
            risk: Vec::new(),
            timing: Vec::new(),
            math: Vec::new(),
            logic: Vec::new(),
        }
    }

    pub fn rules_for(&self, component_type: ComponentType) -> &[DependencyRule] {
        match component_type {
            ComponentType::DataSource => &self.data_source,
            ComponentType::Indicator => &self.indicator,
            ComponentType::Condition => &self.condition,
            ComponentType::Action => &self.action,
            ComponentType::Risk => &self.risk,
            ComponentType::Timing => &self.timing,
            ComponentType::Math => &self.math,
            ComponentType::Logic => &self.logic,
        }
    }

    fn rules_for_mut(&mut self, component_type: ComponentType) -> &mut Vec<DependencyRule> {
        match component_type {
            ComponentType::DataSource => &mut self.data_source,
            ComponentType::Indicator => &mut self.indicator,
            ComponentType::Condition => &mut self.condition,
            ComponentType::Action => &mut self.action,
            ComponentType::Risk => &mut self.risk,
            ComponentType::Timing => &mut self.timing,
            ComponentType::Math => &mut self.math,
            ComponentType::Logic => &mut self.logic,
        }
    }

    /// Replace the rules of one category (builder pattern).
    pub fn with_rules(mut self, component_type: ComponentType, rules: Vec<DependencyRule>) -> Self {
        *self.rules_for_mut(component_type) = rules;
        self
    }

    /// Priority of the primary (first) rule, or [`DEFAULT_RULE_PRIORITY`].
    pub fn priority_of(&self, component_type: ComponentType) -> u8 {
        self.rules_for(component_type)
            .first()
            .map(|r| r.priority)
            .unwrap_or(DEFAULT_RULE_PRIORITY)
    }
}

impl Default for RuleTable {
    fn default() -> Self {
        Self::standard()
    }
}

/// Directed compatibility matrix: which target types a source may feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompatibilityMatrix {
    targets: BTreeMap<ComponentType, Vec<ComponentType>>,
}

fn standard_targets(source: ComponentType) -> &'static [ComponentType] {
    use ComponentType::*;
    match source {
        DataSource => &[Indicator, Condition],
        Indicator => &[Condition, Math],
        Condition => &[Action, Logic],
        Action => &[Risk],
        Risk => &[],
        Timing => &[Condition, Action],
        Math => &[Condition, Indicator],
        Logic => &[Condition, Action],
    }
}

impl CompatibilityMatrix {
    pub fn standard() -> Self {
        let targets = ComponentType::ALL
            .iter()
            .map(|t| (*t, standard_targets(*t).to_vec()))
            .collect();
        Self { targets }
    }

    /// Replace the allowed targets of one source type (builder pattern).
    pub fn with_targets(mut self, source: ComponentType, targets: &[ComponentType]) -> Self {
        self.targets.insert(source, targets.to_vec());
        self
    }

    pub fn allowed_targets(&self, source: ComponentType) -> &[ComponentType] {
        self.targets.get(&source).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn allows(&self, source: ComponentType, target: ComponentType) -> bool {
        self.allowed_targets(source).contains(&target)
    }
}

impl Default for CompatibilityMatrix {
    fn default() -> Self {
        Self::standard()
    }
}
