//! Connection synthesis from a dependency graph.
//!
//! Emission order is fixed: dependency edges in graph order, then flow
//! hints in the order given, then pattern motifs in catalogue order. The
//! optional optimization and validation passes run afterwards, in that order.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::connection::model::{ConnectionMapping, ConnectionOrigin, Synthesis};
use crate::connection::optimize::{deduplicate, enforce_node_cap};
use crate::connection::patterns::{standard_patterns, PatternRule};
use crate::connection::validate::{ConnectionValidator, INVALID_CONNECTION_PENALTY};
use crate::domain::component::{ComponentNodeMapping, ComponentType, StrategyFlow};
use crate::domain::error::{InterpretError, InterpretResult};
use crate::domain::rules::{CompatibilityMatrix, ConnectionKind, DependencyKind, RuleTable};
use crate::graph::model::{DependencyEdge, DependencyGraph};

/// Connections below this confidence produce a review suggestion.
pub const LOW_CONFIDENCE_THRESHOLD: f64 = 0.6;

/// Confidence terms for synthesized connections.
///
/// Rule-derived: `min(1, base + edge_weight * weight_factor + compatibility_bonus?)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceParams {
    pub base: f64,
    pub weight_factor: f64,
    pub compatibility_bonus: f64,
    /// Confidence of a connection copied from a flow hint.
    pub hint: f64,
    pub invalid_penalty: f64,
}

impl Default for ConfidenceParams {
    fn default() -> Self {
        Self {
            base: 0.5,
            weight_factor: 0.3,
            compatibility_bonus: 0.2,
            hint: 0.8,
            invalid_penalty: INVALID_CONNECTION_PENALTY,
        }
    }
}

/// Pass toggles and limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesisOptions {
    pub optimize: bool,
    pub validate: bool,
    pub max_connections_per_node: usize,
}

impl Default for SynthesisOptions {
    fn default() -> Self {
        Self {
            optimize: true,
            validate: true,
            max_connections_per_node: 8,
        }
    }
}

/// Turns dependency edges, flow hints and motifs into scored connections.
#[derive(Debug, Clone)]
pub struct ConnectionSynthesizer {
    rules: RuleTable,
    matrix: CompatibilityMatrix,
    patterns: Vec<PatternRule>,
    params: ConfidenceParams,
    options: SynthesisOptions,
}

impl Default for ConnectionSynthesizer {
    fn default() -> Self {
        Self::new(RuleTable::standard(), CompatibilityMatrix::standard())
    }
}

/// Per-run lookup state.
struct Context<'a> {
    graph: &'a DependencyGraph,
    node_of: BTreeMap<&'a str, &'a str>,
}

impl<'a> Context<'a> {
    fn type_of(&self, component_id: &str) -> Option<ComponentType> {
        self.graph
            .node(component_id)
            .map(|n| n.component.component_type)
    }

    fn node_id(&self, component_id: &str) -> InterpretResult<&'a str> {
        self.node_of
            .get(component_id)
            .copied()
            .ok_or_else(|| InterpretError::MissingNodeMapping {
                component_id: component_id.to_string(),
            })
    }
}

impl ConnectionSynthesizer {
    pub fn new(rules: RuleTable, matrix: CompatibilityMatrix) -> Self {
        Self {
            rules,
            matrix,
            patterns: standard_patterns(),
            params: ConfidenceParams::default(),
            options: SynthesisOptions::default(),
        }
    }

    pub fn with_patterns(mut self, patterns: Vec<PatternRule>) -> Self {
        self.patterns = patterns;
        self
    }

    pub fn with_params(mut self, params: ConfidenceParams) -> Self {
        self.params = params;
        self
    }

    pub fn with_options(mut self, options: SynthesisOptions) -> Self {
        self.options = options;
        self
    }

    /// Synthesize connections for `graph`.
    ///
    /// Dependency edges whose endpoint types the matrix rules out only
    /// order execution and are not drawn.
    ///
    /// Fails with [`InterpretError::MissingNodeMapping`] when a dependency
    /// edge touches an unmapped component, and, when validation is enabled,
    /// with [`InterpretError::InvalidConnection`] for the first connection
    /// that fails its check.
    pub fn synthesize(
        &self,
        graph: &DependencyGraph,
        mappings: &[ComponentNodeMapping],
        hints: Option<&[StrategyFlow]>,
    ) -> InterpretResult<Synthesis> {
        let mut node_of: BTreeMap<&str, &str> = BTreeMap::new();
        for m in mappings {
            node_of
                .entry(m.component_id.as_str())
                .or_insert(m.node_id.as_str());
        }
        let ctx = Context { graph, node_of };

        let mut warnings = Vec::new();
        let mut connections = Vec::new();

        for edge in &graph.edges {
            let connection = self.from_edge(&ctx, edge, connections.len())?;
            // The builder already warned about ordering-only edges.
            if self.forbidden(&ctx, &edge.from, &edge.to) {
                debug!(from = %edge.from, to = %edge.to, "ordering-only edge not rendered");
                continue;
            }
            connections.push(connection);
        }

        for hint in hints.unwrap_or(&[]) {
            match self.from_hint(&ctx, hint, connections.len()) {
                Some(conn) => connections.push(conn),
                None => warnings.push(format!(
                    "flow hint {} ({} -> {}) skipped: endpoint not mapped",
                    hint.id, hint.source, hint.target
                )),
            }
        }

        self.apply_patterns(&ctx, &mut connections);

        if self.options.optimize {
            connections = deduplicate(connections, &mut warnings);
            connections = enforce_node_cap(
                connections,
                self.options.max_connections_per_node,
                &mut warnings,
            );
        }

        if self.options.validate {
            let validator = self.validator(&ctx);
            for conn in &mut connections {
                conn.validation = Some(validator.check(conn));
            }
            if let Some(bad) = connections
                .iter()
                .find(|c| c.validation.as_ref().is_some_and(|v| !v.passed))
            {
                validator.ensure_valid(bad)?;
            }
        }

        let suggestions = suggestions(graph, &connections);
        Ok(Synthesis {
            connections,
            warnings,
            suggestions,
        })
    }

    /// A validator over the graph's mapped nodes.
    fn validator(&self, ctx: &Context<'_>) -> ConnectionValidator {
        let endpoints = ctx
            .node_of
            .iter()
            .filter_map(|(component, node)| ctx.type_of(component).map(|t| (node.to_string(), t)))
            .collect();
        ConnectionValidator::new(self.matrix.clone(), endpoints)
            .with_invalid_penalty(self.params.invalid_penalty)
    }

    fn types_compatible(&self, ctx: &Context<'_>, source: &str, target: &str) -> bool {
        match (ctx.type_of(source), ctx.type_of(target)) {
            (Some(s), Some(t)) => self.matrix.allows(s, t),
            _ => false,
        }
    }

    /// Both endpoint types are known and the matrix rules the pair out.
    fn forbidden(&self, ctx: &Context<'_>, source: &str, target: &str) -> bool {
        match (ctx.type_of(source), ctx.type_of(target)) {
            (Some(s), Some(t)) => !self.matrix.allows(s, t),
            _ => false,
        }
    }

    fn priority(&self, ctx: &Context<'_>, source: &str, target: &str) -> f64 {
        let p = |id: &str| {
            ctx.type_of(id)
                .map(|t| self.rules.priority_of(t))
                .unwrap_or(crate::domain::rules::DEFAULT_RULE_PRIORITY)
        };
        (f64::from(p(source)) + f64::from(p(target))) / 2.0
    }

    fn edge_confidence(&self, weight: f64, compatible: bool) -> f64 {
        let p = &self.params;
        let bonus = if compatible { p.compatibility_bonus } else { 0.0 };
        (p.base + weight * p.weight_factor + bonus).clamp(0.0, 1.0)
    }

    fn from_edge(
        &self,
        ctx: &Context<'_>,
        edge: &DependencyEdge,
        index: usize,
    ) -> InterpretResult<ConnectionMapping> {
        let source_node = ctx.node_id(&edge.from)?;
        let target_node = ctx.node_id(&edge.to)?;
        let compatible = self.types_compatible(ctx, &edge.from, &edge.to);
        let reasoning = match &edge.rule {
            Some(rule) => format!("{} dependency via rule {}", edge.kind, rule),
            None => format!("explicit {} dependency", edge.kind),
        };
        Ok(ConnectionMapping {
            id: connection_id(index),
            source_node: source_node.to_string(),
            target_node: target_node.to_string(),
            source_component: edge.from.clone(),
            target_component: edge.to.clone(),
            kind: edge.kind.connection_kind(),
            confidence: self.edge_confidence(edge.weight, compatible),
            priority: self.priority(ctx, &edge.from, &edge.to),
            origin: ConnectionOrigin::Dependency,
            reasoning,
            validation: None,
        })
    }

    fn from_hint(
        &self,
        ctx: &Context<'_>,
        hint: &StrategyFlow,
        index: usize,
    ) -> Option<ConnectionMapping> {
        let source_node = ctx.node_id(&hint.source).ok()?;
        let target_node = ctx.node_id(&hint.target).ok()?;
        let kind = hint
            .kind
            .unwrap_or_else(|| self.default_kind(ctx, &hint.source, &hint.target));
        Some(ConnectionMapping {
            id: connection_id(index),
            source_node: source_node.to_string(),
            target_node: target_node.to_string(),
            source_component: hint.source.clone(),
            target_component: hint.target.clone(),
            kind,
            confidence: self.params.hint.clamp(0.0, 1.0),
            priority: self.priority(ctx, &hint.source, &hint.target),
            origin: ConnectionOrigin::Hint,
            reasoning: format!("explicit flow hint {}", hint.id),
            validation: None,
        })
    }

    /// Kind of the target's rule admitting the source type, else control flow.
    fn default_kind(&self, ctx: &Context<'_>, source: &str, target: &str) -> ConnectionKind {
        let (Some(s), Some(t)) = (ctx.type_of(source), ctx.type_of(target)) else {
            return ConnectionKind::ControlFlow;
        };
        self.rules
            .rules_for(t)
            .iter()
            .find(|r| r.admits(s))
            .map(|r| r.kind)
            .unwrap_or(DependencyKind::ControlFlow)
            .connection_kind()
    }

    fn apply_patterns(&self, ctx: &Context<'_>, connections: &mut Vec<ConnectionMapping>) {
        let graph = ctx.graph;
        let mut linked: BTreeSet<(String, String)> = connections
            .iter()
            .map(|c| (c.source_component.clone(), c.target_component.clone()))
            .collect();

        for pattern in &self.patterns {
            for source in graph
                .ordered_nodes()
                .filter(|n| n.component.component_type == pattern.source_type)
            {
                for target in graph
                    .ordered_nodes()
                    .filter(|n| n.component.component_type == pattern.target_type)
                {
                    let (s, t) = (&source.component_id, &target.component_id);
                    if s == t || linked.contains(&(s.clone(), t.clone())) {
                        continue;
                    }
                    // A motif never closes a loop through existing dependencies.
                    if graph.transitive_dependents_of(t).contains(s) {
                        continue;
                    }
                    if !(pattern.matches)(graph, source, target) {
                        continue;
                    }
                    let (Ok(source_node), Ok(target_node)) = (ctx.node_id(s), ctx.node_id(t))
                    else {
                        continue;
                    };
                    debug!(
                        pattern = pattern.name,
                        source = %s,
                        target = %t,
                        "pattern connection added"
                    );
                    linked.insert((s.clone(), t.clone()));
                    connections.push(ConnectionMapping {
                        id: connection_id(connections.len()),
                        source_node: source_node.to_string(),
                        target_node: target_node.to_string(),
                        source_component: s.clone(),
                        target_component: t.clone(),
                        kind: pattern.kind,
                        confidence: pattern.confidence.clamp(0.0, 1.0),
                        priority: self.priority(ctx, s, t),
                        origin: ConnectionOrigin::Pattern,
                        reasoning: format!("{}: {}", pattern.name, pattern.reasoning),
                        validation: None,
                    });
                }
            }
        }
    }
}

fn connection_id(index: usize) -> String {
    format!("conn-{index}")
}

fn suggestions(graph: &DependencyGraph, connections: &[ConnectionMapping]) -> Vec<String> {
    let mut out = Vec::new();
    let touched: BTreeSet<&str> = connections
        .iter()
        .flat_map(|c| [c.source_component.as_str(), c.target_component.as_str()])
        .collect();
    for node in graph.ordered_nodes() {
        if !touched.contains(node.component_id.as_str()) {
            out.push(format!(
                "component '{}' has no connections; wire it or remove it",
                node.component_id
            ));
        }
    }
    for c in connections {
        if c.confidence < LOW_CONFIDENCE_THRESHOLD {
            out.push(format!(
                "review low-confidence connection {} ({} -> {}, {:.2})",
                c.id, c.source_component, c.target_component, c.confidence
            ));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::component::ComponentType::*;
    use crate::domain::component::StrategyComponent;
    use crate::graph::builder::DependencyGraphBuilder;
    use serde_json::json;

    fn mappings(graph: &DependencyGraph) -> Vec<ComponentNodeMapping> {
        graph
            .node_order
            .iter()
            .map(|id| ComponentNodeMapping {
                component_id: id.clone(),
                node_id: format!("node-{id}"),
                confidence: 0.9,
            })
            .collect()
    }

    fn chain() -> DependencyGraph {
        DependencyGraphBuilder::default()
            .build(&[
                StrategyComponent::new("d1", DataSource, "ohlcv"),
                StrategyComponent::new("i1", Indicator, "rsi"),
                StrategyComponent::new("c1", Condition, "oversold"),
                StrategyComponent::new("a1", Action, "buy"),
            ])
            .unwrap()
            .graph
    }

    #[test]
    fn test_edges_become_typed_connections() {
        let g = chain();
        let out = ConnectionSynthesizer::default()
            .synthesize(&g, &mappings(&g), None)
            .unwrap();
        let kinds: Vec<ConnectionKind> = out.connections.iter().map(|c| c.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ConnectionKind::DataPipe,
                ConnectionKind::SignalWire,
                ConnectionKind::TriggerLine
            ]
        );
        assert_eq!(out.connections[0].source_node, "node-d1");
        assert_eq!(out.connections[0].target_node, "node-i1");
        assert!(out.connections.iter().all(|c| c.validation.as_ref().unwrap().passed));
    }

    #[test]
    fn test_edge_confidence_formula() {
        let g = chain();
        let out = ConnectionSynthesizer::default()
            .synthesize(&g, &mappings(&g), None)
            .unwrap();
        // d1 -> i1: weight 1.0, compatible → min(1, 0.5 + 0.3 + 0.2)
        assert!((out.connections[0].confidence - 1.0).abs() < 1e-9);
        // i1 -> c1: weight 0.9 → 0.5 + 0.27 + 0.2
        assert!((out.connections[1].confidence - 0.97).abs() < 1e-9);
    }

    #[test]
    fn test_priority_averages_rule_priorities() {
        let g = chain();
        let out = ConnectionSynthesizer::default()
            .synthesize(&g, &mappings(&g), None)
            .unwrap();
        // data-source has no rule (5), indicator primary rule priority 1
        assert_eq!(out.connections[0].priority, 3.0);
        // condition 2, action 3
        assert_eq!(out.connections[2].priority, 2.5);
    }

    #[test]
    fn test_missing_mapping_is_an_error() {
        let g = chain();
        let mut m = mappings(&g);
        m.retain(|x| x.component_id != "c1");
        let err = ConnectionSynthesizer::default()
            .synthesize(&g, &m, None)
            .unwrap_err();
        assert_eq!(
            err,
            InterpretError::MissingNodeMapping {
                component_id: "c1".into()
            }
        );
    }

    #[test]
    fn test_hint_from_risk_is_rejected() {
        let g = DependencyGraphBuilder::default()
            .build(&[
                StrategyComponent::new("d1", DataSource, "ohlcv"),
                StrategyComponent::new("i1", Indicator, "rsi"),
                StrategyComponent::new("c1", Condition, "oversold"),
                StrategyComponent::new("a1", Action, "buy"),
                StrategyComponent::new("r1", Risk, "stop_loss"),
            ])
            .unwrap()
            .graph;
        let hints = vec![StrategyFlow::new("h1", "r1", "a1")];
        let err = ConnectionSynthesizer::default()
            .synthesize(&g, &mappings(&g), Some(&hints))
            .unwrap_err();
        assert!(matches!(
            err,
            InterpretError::InvalidConnection { ref source_id, .. } if source_id == "r1"
        ));
    }

    #[test]
    fn test_duplicate_hint_is_dropped_with_warning() {
        let g = chain();
        let hints = vec![StrategyFlow::new("h1", "d1", "i1")];
        let out = ConnectionSynthesizer::default()
            .synthesize(&g, &mappings(&g), Some(&hints))
            .unwrap();
        assert_eq!(out.connections.len(), 3);
        assert!(out.warnings.iter().any(|w| w.contains("duplicate")));
    }

    #[test]
    fn test_duplicates_survive_without_optimization() {
        let g = chain();
        let hints = vec![StrategyFlow::new("h1", "d1", "i1")];
        let out = ConnectionSynthesizer::default()
            .with_options(SynthesisOptions {
                optimize: false,
                ..SynthesisOptions::default()
            })
            .synthesize(&g, &mappings(&g), Some(&hints))
            .unwrap();
        assert_eq!(out.connections.len(), 4);
        assert_eq!(out.connections[3].origin, ConnectionOrigin::Hint);
        assert_eq!(out.connections[3].kind, ConnectionKind::DataPipe);
    }

    #[test]
    fn test_unmapped_hint_is_skipped() {
        let g = chain();
        let hints = vec![StrategyFlow::new("h1", "d1", "ghost")];
        let out = ConnectionSynthesizer::default()
            .synthesize(&g, &mappings(&g), Some(&hints))
            .unwrap();
        assert_eq!(out.connections.len(), 3);
        assert!(out.warnings.iter().any(|w| w.contains("h1")));
    }

    #[test]
    fn test_price_threshold_pattern_adds_supplementary_connection() {
        let g = DependencyGraphBuilder::default()
            .build(&[
                StrategyComponent::new("d1", DataSource, "ohlcv"),
                StrategyComponent::new("i1", Indicator, "sma"),
                StrategyComponent::new("c1", Condition, "price_above")
                    .with_param("source", json!("close")),
                StrategyComponent::new("a1", Action, "buy"),
            ])
            .unwrap()
            .graph;
        let out = ConnectionSynthesizer::default()
            .synthesize(&g, &mappings(&g), None)
            .unwrap();
        let pattern: Vec<&ConnectionMapping> = out
            .connections
            .iter()
            .filter(|c| c.origin == ConnectionOrigin::Pattern)
            .collect();
        assert_eq!(pattern.len(), 1);
        assert_eq!(pattern[0].source_component, "d1");
        assert_eq!(pattern[0].target_component, "c1");
        assert_eq!(pattern[0].kind, ConnectionKind::DataPipe);
        assert!(pattern[0].reasoning.starts_with("price-threshold"));
        assert!(pattern[0].confidence < out.connections[0].confidence);
    }

    fn with_sessions(timings: &[&str]) -> DependencyGraph {
        let mut components = vec![
            StrategyComponent::new("d1", DataSource, "ohlcv"),
            StrategyComponent::new("i1", Indicator, "rsi"),
            StrategyComponent::new("c1", Condition, "oversold"),
            StrategyComponent::new("a1", Action, "buy"),
        ];
        for id in timings {
            components.push(StrategyComponent::new(*id, Timing, "window"));
        }
        DependencyGraphBuilder::default().build(&components).unwrap().graph
    }

    #[test]
    fn test_session_gate_pattern_wires_timing_that_gates_no_action() {
        // a1's session rule takes t1; t2 is left gating nothing.
        let g = with_sessions(&["t1", "t2"]);
        let out = ConnectionSynthesizer::default()
            .synthesize(&g, &mappings(&g), None)
            .unwrap();
        let gated: Vec<(&str, &str)> = out
            .connections
            .iter()
            .filter(|c| c.origin == ConnectionOrigin::Pattern)
            .map(|c| (c.source_component.as_str(), c.target_component.as_str()))
            .collect();
        assert_eq!(gated, vec![("t2", "a1")]);
        let conn = out
            .connections
            .iter()
            .find(|c| c.origin == ConnectionOrigin::Pattern)
            .unwrap();
        assert_eq!(conn.kind, ConnectionKind::ControlFlow);
        assert!(conn.reasoning.starts_with("session-gate"));
        assert!((conn.confidence - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_session_gate_skips_timing_already_gating_an_action() {
        let g = with_sessions(&["t1"]);
        let out = ConnectionSynthesizer::default()
            .synthesize(&g, &mappings(&g), None)
            .unwrap();
        assert!(out.connections.iter().all(|c| c.origin != ConnectionOrigin::Pattern));
        assert!(out
            .connections
            .iter()
            .any(|c| c.source_component == "t1" && c.target_component == "a1"));
    }

    #[test]
    fn test_node_cap_limits_hub() {
        let mut components = vec![StrategyComponent::new("d1", DataSource, "ohlcv")];
        for i in 0..4 {
            components.push(StrategyComponent::new(format!("i{i}"), Indicator, "sma"));
        }
        let g = DependencyGraphBuilder::default().build(&components).unwrap().graph;
        let out = ConnectionSynthesizer::default()
            .with_options(SynthesisOptions {
                max_connections_per_node: 2,
                ..SynthesisOptions::default()
            })
            .synthesize(&g, &mappings(&g), None)
            .unwrap();
        assert_eq!(out.connections.len(), 2);
        assert_eq!(out.warnings.len(), 2);
    }

    #[test]
    fn test_synthesis_is_deterministic() {
        let g = chain();
        let s = ConnectionSynthesizer::default();
        let a = s.synthesize(&g, &mappings(&g), None).unwrap();
        let b = s.synthesize(&g, &mappings(&g), None).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_unconnected_component_is_suggested() {
        let g = DependencyGraphBuilder::default()
            .build(&[
                StrategyComponent::new("d1", DataSource, "ohlcv"),
                StrategyComponent::new("m1", Math, "ratio").optional(),
            ])
            .unwrap()
            .graph;
        let out = ConnectionSynthesizer::default()
            .synthesize(&g, &mappings(&g), None)
            .unwrap();
        assert!(out.suggestions.iter().any(|s| s.contains("'d1'")));
        assert!(out.suggestions.iter().any(|s| s.contains("'m1'")));
    }
}
