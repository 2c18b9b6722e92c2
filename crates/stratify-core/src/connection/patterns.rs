//! Catalogue of named connection motifs.
//!
//! A motif proposes a supplementary connection between two components that
//! no dependency edge links directly. Every motif follows the compatibility
//! matrix, and its confidence sits below rule-derived connections.

use crate::domain::component::{ComponentType, StrategyComponent};
use crate::domain::rules::ConnectionKind;
use crate::graph::model::{DependencyGraph, DependencyNode};

/// Subtype tokens that mark a condition as comparing raw prices.
const PRICE_TOKENS: &[&str] = &["price", "close", "breakout", "level"];

/// Motif predicate over `(graph, source, target)`.
pub type MotifMatch = fn(&DependencyGraph, &DependencyNode, &DependencyNode) -> bool;

/// One named motif.
#[derive(Clone)]
pub struct PatternRule {
    pub name: &'static str,
    pub source_type: ComponentType,
    pub target_type: ComponentType,
    pub kind: ConnectionKind,
    /// Base confidence in `[0, 1]`.
    pub confidence: f64,
    pub reasoning: &'static str,
    pub matches: MotifMatch,
}

impl std::fmt::Debug for PatternRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PatternRule")
            .field("name", &self.name)
            .field("source_type", &self.source_type)
            .field("target_type", &self.target_type)
            .field("kind", &self.kind)
            .field("confidence", &self.confidence)
            .finish()
    }
}

/// The standard motif catalogue, in evaluation order.
pub fn standard_patterns() -> Vec<PatternRule> {
    vec![
        PatternRule {
            name: "indicator-confirmation",
            source_type: ComponentType::Indicator,
            target_type: ComponentType::Condition,
            kind: ConnectionKind::SignalWire,
            confidence: 0.7,
            reasoning: "condition references a second indicator beyond its primary signal",
            matches: references_indicator,
        },
        PatternRule {
            name: "price-threshold",
            source_type: ComponentType::DataSource,
            target_type: ComponentType::Condition,
            kind: ConnectionKind::DataPipe,
            confidence: 0.65,
            reasoning: "condition compares raw prices from an upstream data source",
            matches: compares_upstream_price,
        },
        PatternRule {
            name: "multi-condition-gate",
            source_type: ComponentType::Condition,
            target_type: ComponentType::Logic,
            kind: ConnectionKind::SignalWire,
            confidence: 0.6,
            reasoning: "dangling condition is combined through a logic gate",
            matches: dangling_condition,
        },
        PatternRule {
            name: "session-gate",
            source_type: ComponentType::Timing,
            target_type: ComponentType::Action,
            kind: ConnectionKind::ControlFlow,
            confidence: 0.6,
            reasoning: "timing window that gates no action is applied to order actions",
            matches: timing_gates_no_action,
        },
    ]
}

fn mentions(component: &StrategyComponent, other: &StrategyComponent) -> bool {
    let tokens = component.subtype_tokens();
    let other_tokens = other.subtype_tokens();
    let shares_token = other_tokens.iter().any(|t| tokens.contains(t));
    let named_in_params = component
        .parameters
        .values()
        .filter_map(|v| v.as_str())
        .any(|s| s.eq_ignore_ascii_case(&other.id) || s.eq_ignore_ascii_case(&other.subtype));
    shares_token || named_in_params
}

fn references_indicator(
    _: &DependencyGraph,
    source: &DependencyNode,
    target: &DependencyNode,
) -> bool {
    !target.dependencies.is_empty() && mentions(&target.component, &source.component)
}

fn compares_upstream_price(
    graph: &DependencyGraph,
    source: &DependencyNode,
    target: &DependencyNode,
) -> bool {
    let c = &target.component;
    let price_subtype = c
        .subtype_tokens()
        .iter()
        .any(|t| PRICE_TOKENS.contains(&t.as_str()));
    let price_param = c
        .param_str("source")
        .map(|s| PRICE_TOKENS.contains(&s.to_ascii_lowercase().as_str()))
        .unwrap_or(false);
    (price_subtype || price_param)
        && graph
            .transitive_dependents_of(&source.component_id)
            .contains(&target.component_id)
}

fn dangling_condition(
    _: &DependencyGraph,
    source: &DependencyNode,
    target: &DependencyNode,
) -> bool {
    source.dependents.is_empty() && !target.dependencies.contains(&source.component_id)
}

fn timing_gates_no_action(
    graph: &DependencyGraph,
    source: &DependencyNode,
    _: &DependencyNode,
) -> bool {
    !graph
        .dependents_of(&source.component_id)
        .iter()
        .any(|n| n.component.component_type == ComponentType::Action)
}
