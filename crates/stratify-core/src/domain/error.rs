//! Error taxonomy for strategy interpretation.

use serde::{Deserialize, Serialize};
use serde_json::json;

/// Stable tag identifying an [`InterpretError`] variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    CycleDetected,
    MissingRequiredDependency,
    UnresolvedAfterDepthCap,
    InvalidConnection,
    MissingNodeMapping,
    InsufficientInformation,
}

/// Hard failures of an interpretation stage.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InterpretError {
    #[error("dependency cycle detected: {}", path.join(" -> "))]
    CycleDetected { path: Vec<String> },

    #[error("missing required dependency for component {component_id} (rule {rule})")]
    MissingRequiredDependency { component_id: String, rule: String },

    #[error("dependency resolution exceeded maximum depth of {cap} iterations: {unresolved:?}")]
    UnresolvedAfterDepthCap { unresolved: Vec<String>, cap: usize },

    #[error("invalid connection {source_id} -> {target_id}: {reason}")]
    InvalidConnection {
        source_id: String,
        target_id: String,
        reason: String,
    },

    #[error("no node mapping for component {component_id}")]
    MissingNodeMapping { component_id: String },

    #[error("insufficient information to build a strategy: {reason}")]
    InsufficientInformation { reason: String },
}

impl InterpretError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::CycleDetected { .. } => ErrorKind::CycleDetected,
            Self::MissingRequiredDependency { .. } => ErrorKind::MissingRequiredDependency,
            Self::UnresolvedAfterDepthCap { .. } => ErrorKind::UnresolvedAfterDepthCap,
            Self::InvalidConnection { .. } => ErrorKind::InvalidConnection,
            Self::MissingNodeMapping { .. } => ErrorKind::MissingNodeMapping,
            Self::InsufficientInformation { .. } => ErrorKind::InsufficientInformation,
        }
    }

    /// Structured payload for tooling.
    pub fn context(&self) -> serde_json::Value {
        match self {
            Self::CycleDetected { path } => json!({ "cycle_path": path }),
            Self::MissingRequiredDependency { component_id, rule } => {
                json!({ "component_id": component_id, "rule": rule })
            }
            Self::UnresolvedAfterDepthCap { unresolved, cap } => {
                json!({ "unresolved": unresolved, "cap": cap })
            }
            Self::InvalidConnection {
                source_id,
                target_id,
                reason,
            } => json!({ "source_id": source_id, "target_id": target_id, "reason": reason }),
            Self::MissingNodeMapping { component_id } => json!({ "component_id": component_id }),
            Self::InsufficientInformation { reason } => json!({ "reason": reason }),
        }
    }
}

/// Result type for interpretation stages.
pub type InterpretResult<T> = std::result::Result<T, InterpretError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_error_displays_path() {
        let err = InterpretError::CycleDetected {
            path: vec!["X".into(), "Y".into(), "X".into()],
        };
        assert_eq!(err.to_string(), "dependency cycle detected: X -> Y -> X");
        assert_eq!(err.kind(), ErrorKind::CycleDetected);
        assert_eq!(err.context()["cycle_path"][1], "Y");
    }

    #[test]
    fn test_depth_cap_error_message() {
        let err = InterpretError::UnresolvedAfterDepthCap {
            unresolved: vec!["a".into()],
            cap: 100,
        };
        assert!(err
            .to_string()
            .contains("dependency resolution exceeded maximum depth"));
        assert_eq!(err.context()["cap"], 100);
    }

    #[test]
    fn test_invalid_connection_context_carries_endpoints() {
        let err = InterpretError::InvalidConnection {
            source_id: "r1".into(),
            target_id: "a1".into(),
            reason: "incompatible".into(),
        };
        let ctx = err.context();
        assert_eq!(ctx["source_id"], "r1");
        assert_eq!(ctx["target_id"], "a1");
    }

    #[test]
    fn test_error_kind_serializes_snake_case() {
        let s = serde_json::to_string(&ErrorKind::MissingNodeMapping).unwrap();
        assert_eq!(s, "\"missing_node_mapping\"");
    }
}
