//! Stage-tagged pipeline failures.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::error::InterpretError;

/// Pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    BlueprintGeneration,
    DependencyGraph,
    NodeMapping,
    ConnectionSynthesis,
    Validation,
}

impl Stage {
    pub const ALL: [Stage; 5] = [
        Stage::BlueprintGeneration,
        Stage::DependencyGraph,
        Stage::NodeMapping,
        Stage::ConnectionSynthesis,
        Stage::Validation,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::BlueprintGeneration => "blueprint_generation",
            Stage::DependencyGraph => "dependency_graph",
            Stage::NodeMapping => "node_mapping",
            Stage::ConnectionSynthesis => "connection_synthesis",
            Stage::Validation => "validation",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A hard failure, tagged with the stage that raised it.
///
/// `payload` is the stage's input as JSON, for reproduction.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{stage} stage failed: {source}")]
pub struct PipelineError {
    pub stage: Stage,
    #[source]
    pub source: InterpretError,
    pub payload: serde_json::Value,
}

impl PipelineError {
    pub fn new(stage: Stage, source: InterpretError, payload: serde_json::Value) -> Self {
        Self {
            stage,
            source,
            payload,
        }
    }

    pub fn kind(&self) -> crate::domain::error::ErrorKind {
        self.source.kind()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_display_names_stage_and_cause() {
        let err = PipelineError::new(
            Stage::DependencyGraph,
            InterpretError::CycleDetected {
                path: vec!["X".into(), "Y".into(), "X".into()],
            },
            json!({ "components": 2 }),
        );
        assert_eq!(
            err.to_string(),
            "dependency_graph stage failed: dependency cycle detected: X -> Y -> X"
        );
        assert_eq!(err.payload["components"], 2);
    }
}
