//! External collaborator seams: blueprint generation and node mapping.
//!
//! Both are async so implementations may call out to model or rendering
//! services. The built-in implementations are deterministic and local.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::component::{Blueprint, ComponentNodeMapping, StrategyComponent, StrategyFlow};
use crate::domain::error::{InterpretError, InterpretResult};

/// Input of one interpretation run.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct InterpretRequest {
    /// Natural-language description handed to the generator.
    #[serde(default)]
    pub prompt: String,
    /// Explicit flows; when set they replace connection-derived flows in
    /// validation and are offered to synthesis as hints.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flows_override: Option<Vec<StrategyFlow>>,
}

impl InterpretRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            flows_override: None,
        }
    }

    pub fn with_flows(mut self, flows: Vec<StrategyFlow>) -> Self {
        self.flows_override = Some(flows);
        self
    }
}

/// Produces a blueprint from a request.
#[async_trait]
pub trait BlueprintGenerator: Send + Sync {
    /// Returns [`InterpretError::InsufficientInformation`] when no usable
    /// strategy can be derived.
    async fn generate(&self, request: &InterpretRequest) -> InterpretResult<Blueprint>;
}

/// Maps components to rendered node ids.
#[async_trait]
pub trait NodeMapper: Send + Sync {
    async fn map_nodes(
        &self,
        components: &[StrategyComponent],
    ) -> InterpretResult<Vec<ComponentNodeMapping>>;
}

/// Returns one fixed blueprint for every request.
#[derive(Debug, Clone)]
pub struct StaticBlueprintGenerator {
    blueprint: Blueprint,
}

impl StaticBlueprintGenerator {
    pub fn new(blueprint: Blueprint) -> Self {
        Self { blueprint }
    }
}

#[async_trait]
impl BlueprintGenerator for StaticBlueprintGenerator {
    async fn generate(&self, _request: &InterpretRequest) -> InterpretResult<Blueprint> {
        if self.blueprint.components.is_empty() {
            return Err(InterpretError::InsufficientInformation {
                reason: "blueprint has no components".to_string(),
            });
        }
        Ok(self.blueprint.clone())
    }
}

/// Confidence reported by [`IdentityNodeMapper`] by default.
pub const IDENTITY_MAPPING_CONFIDENCE: f64 = 0.9;

/// Maps component `x` to node `node-x`.
#[derive(Debug, Clone)]
pub struct IdentityNodeMapper {
    confidence: f64,
}

impl Default for IdentityNodeMapper {
    fn default() -> Self {
        Self::new(IDENTITY_MAPPING_CONFIDENCE)
    }
}

impl IdentityNodeMapper {
    pub fn new(confidence: f64) -> Self {
        Self {
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    pub fn node_id(component_id: &str) -> String {
        format!("node-{component_id}")
    }
}

#[async_trait]
impl NodeMapper for IdentityNodeMapper {
    async fn map_nodes(
        &self,
        components: &[StrategyComponent],
    ) -> InterpretResult<Vec<ComponentNodeMapping>> {
        Ok(components
            .iter()
            .map(|c| ComponentNodeMapping {
                component_id: c.id.clone(),
                node_id: Self::node_id(&c.id),
                confidence: self.confidence,
            })
            .collect())
    }
}
