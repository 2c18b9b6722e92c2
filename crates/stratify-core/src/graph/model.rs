//! Dependency graph data types.
//!
//! An edge `A → B` means "B depends on A": A must resolve before B.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use serde::{Deserialize, Serialize};

use crate::domain::component::StrategyComponent;
use crate::domain::rules::DependencyKind;

/// Level of a node that has not been resolved.
pub const UNRESOLVED_LEVEL: i32 = -1;

/// One node per component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependencyNode {
    pub component_id: String,
    pub component: StrategyComponent,
    /// Ids this node depends on (edge sources).
    pub dependencies: Vec<String>,
    /// Ids depending on this node (edge targets).
    pub dependents: Vec<String>,
    pub level: i32,
    pub resolved: bool,
}

impl DependencyNode {
    pub fn new(component: StrategyComponent) -> Self {
        Self {
            component_id: component.id.clone(),
            component,
            dependencies: Vec::new(),
            dependents: Vec::new(),
            level: UNRESOLVED_LEVEL,
            resolved: false,
        }
    }
}

/// How an edge came to exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeOrigin {
    /// Listed in the component's explicit dependency ids.
    Explicit,
    /// Selected by a dependency rule.
    Inferred,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependencyEdge {
    pub from: String,
    pub to: String,
    pub kind: DependencyKind,
    pub weight: f64,
    pub required: bool,
    /// Name of the rule that produced the edge, if any.
    pub rule: Option<String>,
    pub origin: EdgeOrigin,
}

/// The resolved dependency graph of one interpretation run.
///
/// # Invariants
///
/// Every edge endpoint is a key of `nodes`. When `has_cycles` is true,
/// `levels` and `execution_order` are empty and must not be used.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DependencyGraph {
    pub nodes: BTreeMap<String, DependencyNode>,
    /// Component ids in input order; drives every deterministic traversal.
    pub node_order: Vec<String>,
    pub edges: Vec<DependencyEdge>,
    pub levels: Vec<Vec<String>>,
    pub has_cycles: bool,
    /// Each detected cycle as a closed path, e.g. `[X, Y, X]`.
    pub cycles: Vec<Vec<String>>,
    pub execution_order: Vec<String>,
}

impl DependencyGraph {
    pub fn node(&self, id: &str) -> Option<&DependencyNode> {
        self.nodes.get(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes in input order.
    pub fn ordered_nodes(&self) -> impl Iterator<Item = &DependencyNode> {
        self.node_order.iter().filter_map(|id| self.nodes.get(id))
    }

    /// Direct dependencies of `id` (components it depends on).
    pub fn dependencies_of(&self, id: &str) -> Vec<&DependencyNode> {
        self.nodes
            .get(id)
            .into_iter()
            .flat_map(|n| n.dependencies.iter())
            .filter_map(|d| self.nodes.get(d))
            .collect()
    }

    /// Direct dependents of `id` (components depending on it).
    pub fn dependents_of(&self, id: &str) -> Vec<&DependencyNode> {
        self.nodes
            .get(id)
            .into_iter()
            .flat_map(|n| n.dependents.iter())
            .filter_map(|d| self.nodes.get(d))
            .collect()
    }

    /// All transitive dependents of `id`, in BFS discovery order.
    pub fn transitive_dependents_of(&self, id: &str) -> Vec<String> {
        let mut seen = BTreeSet::new();
        let mut out = Vec::new();
        let mut queue = VecDeque::from([id.to_string()]);

        while let Some(current) = queue.pop_front() {
            if let Some(node) = self.nodes.get(&current) {
                for dep in &node.dependents {
                    if dep != id && seen.insert(dep.clone()) {
                        out.push(dep.clone());
                        queue.push_back(dep.clone());
                    }
                }
            }
        }
        out
    }

    /// Assigned level of `id`, if resolved.
    pub fn level_of(&self, id: &str) -> Option<usize> {
        self.nodes
            .get(id)
            .filter(|n| n.resolved)
            .and_then(|n| usize::try_from(n.level).ok())
    }

    /// Levels holding more than one component; their members can resolve
    /// concurrently.
    pub fn parallel_groups(&self) -> Vec<&[String]> {
        self.levels
            .iter()
            .filter(|l| l.len() > 1)
            .map(Vec::as_slice)
            .collect()
    }

    /// Edges leaving `id`.
    pub fn edges_from<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a DependencyEdge> {
        self.edges.iter().filter(move |e| e.from == id)
    }

    /// Downstream adjacency (`from → [to, ..]`) in edge order.
    pub fn dependents_adjacency(&self) -> BTreeMap<String, Vec<String>> {
        self.ordered_nodes()
            .map(|n| (n.component_id.clone(), n.dependents.clone()))
            .collect()
    }

    /// Upstream adjacency (`to → [from, ..]`) in edge order.
    pub fn dependencies_adjacency(&self) -> BTreeMap<String, Vec<String>> {
        self.ordered_nodes()
            .map(|n| (n.component_id.clone(), n.dependencies.clone()))
            .collect()
    }
}
