//! Per-connection validity checks.

use std::collections::BTreeMap;

use crate::connection::model::{ConnectionCheck, ConnectionIssue, ConnectionMapping};
use crate::domain::component::ComponentType;
use crate::domain::error::{InterpretError, InterpretResult};
use crate::domain::rules::CompatibilityMatrix;

/// Confidence multiplier applied to a connection that fails validation.
pub const INVALID_CONNECTION_PENALTY: f64 = 0.3;

/// Validates connections against the compatibility matrix.
///
/// `endpoints` maps every known node id to the type of the component it
/// renders.
#[derive(Debug, Clone)]
pub struct ConnectionValidator {
    matrix: CompatibilityMatrix,
    endpoints: BTreeMap<String, ComponentType>,
    invalid_penalty: f64,
}

impl ConnectionValidator {
    pub fn new(matrix: CompatibilityMatrix, endpoints: BTreeMap<String, ComponentType>) -> Self {
        Self {
            matrix,
            endpoints,
            invalid_penalty: INVALID_CONNECTION_PENALTY,
        }
    }

    pub fn with_invalid_penalty(mut self, penalty: f64) -> Self {
        self.invalid_penalty = penalty.clamp(0.0, 1.0);
        self
    }

    /// Collect every issue of `connection`.
    pub fn issues(&self, connection: &ConnectionMapping) -> Vec<ConnectionIssue> {
        let mut issues = Vec::new();
        if connection.is_self_loop() {
            issues.push(ConnectionIssue::SelfLoop);
        }

        let source = self.endpoints.get(&connection.source_node);
        let target = self.endpoints.get(&connection.target_node);
        if source.is_none() {
            issues.push(ConnectionIssue::MissingEndpoint {
                node_id: connection.source_node.clone(),
            });
        }
        if target.is_none() && connection.target_node != connection.source_node {
            issues.push(ConnectionIssue::MissingEndpoint {
                node_id: connection.target_node.clone(),
            });
        }

        if let (Some(s), Some(t)) = (source, target) {
            if !connection.is_self_loop() && !self.matrix.allows(*s, *t) {
                issues.push(ConnectionIssue::IncompatibleTypes {
                    source_type: *s,
                    target_type: *t,
                });
            }
        }
        issues
    }

    pub fn check(&self, connection: &ConnectionMapping) -> ConnectionCheck {
        let issues = self.issues(connection);
        let passed = issues.is_empty();
        let confidence = if passed {
            connection.confidence
        } else {
            connection.confidence * self.invalid_penalty
        };
        ConnectionCheck {
            passed,
            issues,
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    /// Check every connection, in order.
    pub fn validate_all(&self, connections: &[ConnectionMapping]) -> Vec<ConnectionCheck> {
        connections.iter().map(|c| self.check(c)).collect()
    }

    /// `Err(InvalidConnection)` carrying the first issue, if any.
    pub fn ensure_valid(&self, connection: &ConnectionMapping) -> InterpretResult<()> {
        match self.issues(connection).first() {
            None => Ok(()),
            Some(issue) => Err(InterpretError::InvalidConnection {
                source_id: connection.source_component.clone(),
                target_id: connection.target_component.clone(),
                reason: issue.to_string(),
            }),
        }
    }
}
