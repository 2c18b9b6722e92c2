//! Connection types produced by synthesis.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::component::ComponentType;
use crate::domain::rules::ConnectionKind;

/// Where a connection came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionOrigin {
    /// Derived from a dependency edge.
    Dependency,
    /// Taken from a caller-supplied flow hint.
    Hint,
    /// Added by a motif from the pattern catalogue.
    Pattern,
}

/// A synthesized link between two mapped nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionMapping {
    pub id: String,
    pub source_node: String,
    pub target_node: String,
    pub source_component: String,
    pub target_component: String,
    pub kind: ConnectionKind,
    /// In `[0, 1]`.
    pub confidence: f64,
    /// Mean of the endpoint types' rule priorities; lower is more important.
    pub priority: f64,
    pub origin: ConnectionOrigin,
    pub reasoning: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<ConnectionCheck>,
}

impl ConnectionMapping {
    pub fn is_self_loop(&self) -> bool {
        self.source_node == self.target_node
    }

    /// `(source_node, target_node)`.
    pub fn endpoints(&self) -> (&str, &str) {
        (&self.source_node, &self.target_node)
    }
}

/// A reason a connection fails validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "issue", rename_all = "snake_case")]
pub enum ConnectionIssue {
    SelfLoop,
    IncompatibleTypes {
        source_type: ComponentType,
        target_type: ComponentType,
    },
    MissingEndpoint { node_id: String },
}

impl fmt::Display for ConnectionIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionIssue::SelfLoop => f.write_str("source and target are the same node"),
            ConnectionIssue::IncompatibleTypes {
                source_type,
                target_type,
            } => write!(f, "{source_type} cannot connect to {target_type}"),
            ConnectionIssue::MissingEndpoint { node_id } => {
                write!(f, "endpoint node {node_id} does not exist")
            }
        }
    }
}

/// Outcome of validating one connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionCheck {
    pub passed: bool,
    pub issues: Vec<ConnectionIssue>,
    /// Confidence after validation; lowered when the check fails.
    pub confidence: f64,
}

/// Output of one synthesis run.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Synthesis {
    pub connections: Vec<ConnectionMapping>,
    pub warnings: Vec<String>,
    pub suggestions: Vec<String>,
}

impl Synthesis {
    /// Mean connection confidence; 0.0 when there are none.
    pub fn average_confidence(&self) -> f64 {
        if self.connections.is_empty() {
            return 0.0;
        }
        self.connections.iter().map(|c| c.confidence).sum::<f64>() / self.connections.len() as f64
    }
}
