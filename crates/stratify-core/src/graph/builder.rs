//! Dependency graph construction, cycle detection and leveling.
//!
//! [`DependencyGraphBuilder::build`] turns a component list into a
//! [`DependencyGraph`]:
//!
//! 1. one node per component;
//! 2. explicit dependency ids become edges, then every unsatisfied rule of
//!    the component's type selects its best-scoring candidate;
//! 3. cycles are detected with an iterative three-colour DFS;
//! 4. acyclic graphs are leveled under an iteration cap;
//! 5. the execution order is a DFS postorder re-sorted by level and priority.
//!
//! Finding a cycle is not an error here: the graph comes back with
//! `has_cycles = true` and the caller decides to abort.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::component::{ComponentType, StrategyComponent};
use crate::domain::error::{InterpretError, InterpretResult};
use crate::domain::rules::{CompatibilityMatrix, DependencyKind, DependencyRule, RuleTable};
use crate::graph::model::{DependencyEdge, DependencyGraph, DependencyNode, EdgeOrigin};
use crate::graph::traversal::{find_cycles, postorder};

/// Default cap on leveling passes.
pub const DEFAULT_MAX_LEVEL_ITERATIONS: usize = 100;

/// Weight of an explicit dependency no rule of the target admits.
pub const EXPLICIT_FALLBACK_WEIGHT: f64 = 0.5;

/// Scoring terms for choosing among several rule candidates.
///
/// `score = weight * rule_weight_factor + candidate.priority * priority_factor
///        + type_bonus + subtype_bonus + min(shared_params, max_param_overlap)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CandidateWeights {
    pub rule_weight_factor: f64,
    pub priority_factor: f64,
    pub type_bonus: f64,
    pub subtype_bonus: f64,
    pub max_param_overlap: usize,
}

impl Default for CandidateWeights {
    fn default() -> Self {
        Self {
            rule_weight_factor: 10.0,
            priority_factor: 2.0,
            type_bonus: 5.0,
            subtype_bonus: 3.0,
            max_param_overlap: 2,
        }
    }
}

/// Output of a graph build: the graph plus non-fatal findings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphBuild {
    pub graph: DependencyGraph,
    pub warnings: Vec<String>,
}

/// A required rule left unsatisfied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissingDependency {
    pub component_id: String,
    pub rule: String,
}

/// Findings of the post-build dependency check.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DependencyReport {
    pub missing: Vec<MissingDependency>,
    pub warnings: Vec<String>,
}

impl DependencyReport {
    /// `Err` with the first missing required dependency, if any.
    pub fn ensure_complete(&self) -> InterpretResult<()> {
        match self.missing.first() {
            Some(m) => Err(InterpretError::MissingRequiredDependency {
                component_id: m.component_id.clone(),
                rule: m.rule.clone(),
            }),
            None => Ok(()),
        }
    }
}

/// Builds dependency graphs against a fixed rule table.
#[derive(Debug, Clone)]
pub struct DependencyGraphBuilder {
    rules: RuleTable,
    matrix: CompatibilityMatrix,
    weights: CandidateWeights,
    max_level_iterations: usize,
}

impl Default for DependencyGraphBuilder {
    fn default() -> Self {
        Self::new(RuleTable::standard(), CompatibilityMatrix::standard())
    }
}

impl DependencyGraphBuilder {
    pub fn new(rules: RuleTable, matrix: CompatibilityMatrix) -> Self {
        Self {
            rules,
            matrix,
            weights: CandidateWeights::default(),
            max_level_iterations: DEFAULT_MAX_LEVEL_ITERATIONS,
        }
    }

    pub fn with_max_level_iterations(mut self, cap: usize) -> Self {
        self.max_level_iterations = cap;
        self
    }

    pub fn with_candidate_weights(mut self, weights: CandidateWeights) -> Self {
        self.weights = weights;
        self
    }

    pub fn rules(&self) -> &RuleTable {
        &self.rules
    }

    /// Build the graph for `components`.
    ///
    /// Returns [`InterpretError::UnresolvedAfterDepthCap`] when leveling an
    /// acyclic graph does not finish within the iteration cap.
    pub fn build(&self, components: &[StrategyComponent]) -> InterpretResult<GraphBuild> {
        let mut warnings = Vec::new();
        let mut graph = DependencyGraph::default();

        for component in components {
            if graph.nodes.contains_key(&component.id) {
                warnings.push(format!(
                    "duplicate component id '{}' ignored; first occurrence kept",
                    component.id
                ));
                continue;
            }
            graph.node_order.push(component.id.clone());
            graph
                .nodes
                .insert(component.id.clone(), DependencyNode::new(component.clone()));
        }

        let ordered: Vec<StrategyComponent> = graph
            .ordered_nodes()
            .map(|n| n.component.clone())
            .collect();

        for component in &ordered {
            self.resolve_component(component, &ordered, &mut graph, &mut warnings);
        }

        graph.cycles = find_cycles(&graph.node_order, &graph.dependents_adjacency());
        graph.has_cycles = !graph.cycles.is_empty();

        if graph.has_cycles {
            debug!(cycles = graph.cycles.len(), "dependency graph is cyclic; skipping leveling");
            return Ok(GraphBuild { graph, warnings });
        }

        self.assign_levels(&mut graph)?;
        graph.execution_order = execution_order(&graph);

        Ok(GraphBuild { graph, warnings })
    }

    /// Check required rules and orphans on a built graph.
    ///
    /// A required rule with no satisfying dependency is reported in
    /// `missing`, or as a warning when the component is optional.
    pub fn validate(&self, graph: &DependencyGraph) -> DependencyReport {
        let mut report = DependencyReport::default();

        for node in graph.ordered_nodes() {
            let dep_types: Vec<ComponentType> = graph
                .dependencies_of(&node.component_id)
                .iter()
                .map(|d| d.component.component_type)
                .collect();

            for rule in self.rules.rules_for(node.component.component_type) {
                if !rule.required || dep_types.iter().any(|t| rule.admits(*t)) {
                    continue;
                }
                if node.component.optional {
                    report.warnings.push(format!(
                        "optional component '{}' has no dependency for rule {}",
                        node.component_id, rule.name
                    ));
                } else {
                    report.missing.push(MissingDependency {
                        component_id: node.component_id.clone(),
                        rule: rule.name.clone(),
                    });
                }
            }

            if node.component.component_type != ComponentType::DataSource
                && node.dependencies.is_empty()
                && node.dependents.is_empty()
            {
                report
                    .warnings
                    .push(format!("orphaned component '{}'", node.component_id));
            }
        }

        report
    }

    fn resolve_component(
        &self,
        component: &StrategyComponent,
        all: &[StrategyComponent],
        graph: &mut DependencyGraph,
        warnings: &mut Vec<String>,
    ) {
        let rules = self.rules.rules_for(component.component_type);
        let mut satisfied = vec![false; rules.len()];

        for dep_id in &component.dependencies {
            if dep_id == &component.id {
                warnings.push(format!("component '{}' lists itself as a dependency", dep_id));
                continue;
            }
            let Some(source) = all.iter().find(|c| &c.id == dep_id) else {
                warnings.push(format!(
                    "component '{}' depends on unknown component '{}'",
                    component.id, dep_id
                ));
                continue;
            };

            if !self
                .matrix
                .allows(source.component_type, component.component_type)
            {
                warnings.push(format!(
                    "explicit dependency '{}' -> '{}' only orders execution ({} cannot feed {})",
                    source.id, component.id, source.component_type, component.component_type
                ));
            }

            let edge = match rules.iter().position(|r| r.admits(source.component_type)) {
                Some(idx) => {
                    satisfied[idx] = true;
                    rule_edge(&rules[idx], source, component, EdgeOrigin::Explicit)
                }
                None => DependencyEdge {
                    from: source.id.clone(),
                    to: component.id.clone(),
                    kind: DependencyKind::ControlFlow,
                    weight: EXPLICIT_FALLBACK_WEIGHT,
                    required: false,
                    rule: None,
                    origin: EdgeOrigin::Explicit,
                },
            };
            add_edge(graph, edge);
        }

        for (idx, rule) in rules.iter().enumerate() {
            if satisfied[idx] {
                continue;
            }
            match self.select_candidate(rule, component, all) {
                Some(source) => {
                    debug!(
                        component = %component.id,
                        rule = %rule.name,
                        selected = %source.id,
                        "dependency candidate selected"
                    );
                    add_edge(graph, rule_edge(rule, source, component, EdgeOrigin::Inferred));
                }
                None if rule.required => warnings.push(format!(
                    "no candidate for required rule {} of component '{}'",
                    rule.name, component.id
                )),
                None => {}
            }
        }
    }

    /// Highest-scoring candidate for `rule`; ties keep the first encountered.
    fn select_candidate<'a>(
        &self,
        rule: &DependencyRule,
        component: &StrategyComponent,
        all: &'a [StrategyComponent],
    ) -> Option<&'a StrategyComponent> {
        let mut best: Option<(&StrategyComponent, f64)> = None;
        for candidate in all
            .iter()
            .filter(|c| c.id != component.id && rule.admits(c.component_type))
        {
            let score = self.candidate_score(rule, candidate, component);
            match best {
                Some((_, best_score)) if score <= best_score => {}
                _ => best = Some((candidate, score)),
            }
        }
        best.map(|(c, _)| c)
    }

    fn candidate_score(
        &self,
        rule: &DependencyRule,
        candidate: &StrategyComponent,
        component: &StrategyComponent,
    ) -> f64 {
        let w = &self.weights;
        let mut score =
            rule.weight * w.rule_weight_factor + f64::from(candidate.priority) * w.priority_factor;
        if self
            .matrix
            .allows(candidate.component_type, component.component_type)
        {
            score += w.type_bonus;
        }
        if subtypes_compatible(candidate, component) {
            score += w.subtype_bonus;
        }
        let shared = candidate
            .parameters
            .keys()
            .filter(|k| component.parameters.contains_key(*k))
            .count();
        score + shared.min(w.max_param_overlap) as f64
    }

    fn assign_levels(&self, graph: &mut DependencyGraph) -> InterpretResult<()> {
        let mut level: BTreeMap<String, usize> = BTreeMap::new();
        for node in graph.ordered_nodes() {
            if node.dependencies.is_empty() {
                level.insert(node.component_id.clone(), 0);
            }
        }

        let mut iterations = 0usize;
        while level.len() < graph.nodes.len() {
            let unresolved = || -> Vec<String> {
                graph
                    .node_order
                    .iter()
                    .filter(|id| !level.contains_key(*id))
                    .cloned()
                    .collect()
            };
            if iterations >= self.max_level_iterations {
                return Err(InterpretError::UnresolvedAfterDepthCap {
                    unresolved: unresolved(),
                    cap: self.max_level_iterations,
                });
            }
            iterations += 1;

            let promoted: Vec<(String, usize)> = graph
                .ordered_nodes()
                .filter(|n| !level.contains_key(&n.component_id))
                .filter_map(|n| {
                    n.dependencies
                        .iter()
                        .map(|d| level.get(d).copied())
                        .collect::<Option<Vec<usize>>>()
                        .map(|lv| (n.component_id.clone(), lv.into_iter().max().unwrap_or(0) + 1))
                })
                .collect();

            if promoted.is_empty() {
                return Err(InterpretError::UnresolvedAfterDepthCap {
                    unresolved: unresolved(),
                    cap: self.max_level_iterations,
                });
            }
            level.extend(promoted);
        }

        let depth = level.values().copied().max().map(|m| m + 1).unwrap_or(0);
        let mut levels: Vec<Vec<String>> = vec![Vec::new(); depth];
        for id in &graph.node_order {
            if let Some(l) = level.get(id) {
                levels[*l].push(id.clone());
            }
        }
        let rank = input_rank(graph);
        for members in &mut levels {
            members.sort_by_key(|id| (priority_of(graph, id), rank.get(id.as_str()).copied()));
        }

        for (id, l) in &level {
            if let Some(node) = graph.nodes.get_mut(id) {
                node.level = *l as i32;
                node.resolved = true;
            }
        }
        graph.levels = levels;
        Ok(())
    }
}

fn rule_edge(
    rule: &DependencyRule,
    source: &StrategyComponent,
    target: &StrategyComponent,
    origin: EdgeOrigin,
) -> DependencyEdge {
    DependencyEdge {
        from: source.id.clone(),
        to: target.id.clone(),
        kind: rule.kind,
        weight: rule.weight,
        required: rule.required,
        rule: Some(rule.name.clone()),
        origin,
    }
}

/// Add `edge` unless an edge with the same endpoints and kind exists.
fn add_edge(graph: &mut DependencyGraph, edge: DependencyEdge) {
    if graph
        .edges
        .iter()
        .any(|e| e.from == edge.from && e.to == edge.to && e.kind == edge.kind)
    {
        return;
    }
    if let Some(from) = graph.nodes.get_mut(&edge.from) {
        if !from.dependents.contains(&edge.to) {
            from.dependents.push(edge.to.clone());
        }
    }
    if let Some(to) = graph.nodes.get_mut(&edge.to) {
        if !to.dependencies.contains(&edge.from) {
            to.dependencies.push(edge.from.clone());
        }
    }
    graph.edges.push(edge);
}

/// Subtype tokens overlap, or a string parameter of `component` names the
/// candidate's id or subtype.
fn subtypes_compatible(candidate: &StrategyComponent, component: &StrategyComponent) -> bool {
    let tokens: BTreeSet<String> = candidate.subtype_tokens().into_iter().collect();
    if component.subtype_tokens().iter().any(|t| tokens.contains(t)) {
        return true;
    }
    component.parameters.values().filter_map(|v| v.as_str()).any(|s| {
        s.eq_ignore_ascii_case(&candidate.id) || s.eq_ignore_ascii_case(&candidate.subtype)
    })
}

fn priority_of(graph: &DependencyGraph, id: &str) -> i32 {
    graph.nodes.get(id).map(|n| n.component.priority).unwrap_or(0)
}

fn input_rank(graph: &DependencyGraph) -> BTreeMap<&str, usize> {
    graph
        .node_order
        .iter()
        .enumerate()
        .map(|(i, id)| (id.as_str(), i))
        .collect()
}

/// DFS postorder, stably re-sorted by `(level, priority)`.
fn execution_order(graph: &DependencyGraph) -> Vec<String> {
    let topo = postorder(&graph.node_order, &graph.dependencies_adjacency());
    let position: BTreeMap<&str, usize> = topo
        .iter()
        .enumerate()
        .map(|(i, id)| (id.as_str(), i))
        .collect();

    let mut order = topo.clone();
    order.sort_by_key(|id| {
        (
            graph.level_of(id).unwrap_or(usize::MAX),
            priority_of(graph, id),
            position.get(id.as_str()).copied().unwrap_or(usize::MAX),
        )
    });
    order
}
