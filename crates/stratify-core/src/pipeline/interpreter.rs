//! The interpretation pipeline.
//!
//! Stage order: blueprint generation, dependency graph, node mapping,
//! connection synthesis, validation. The first hard failure aborts the run
//! and comes back as a [`PipelineError`] carrying the stage and its input;
//! no partial result is returned.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{warn, Instrument};
use uuid::Uuid;

use crate::connection::model::ConnectionMapping;
use crate::connection::synthesizer::{ConnectionSynthesizer, LOW_CONFIDENCE_THRESHOLD};
use crate::domain::component::{Blueprint, ComponentNodeMapping, StrategyFlow};
use crate::domain::digest::blueprint_digest;
use crate::domain::error::InterpretError;
use crate::domain::rules::{CompatibilityMatrix, RuleTable};
use crate::graph::builder::DependencyGraphBuilder;
use crate::graph::model::DependencyGraph;
use crate::obs;
use crate::pipeline::collaborators::{BlueprintGenerator, InterpretRequest, NodeMapper};
use crate::pipeline::error::{PipelineError, Stage};
use crate::pipeline::options::InterpretOptions;
use crate::validation::engine::ValidationEngine;
use crate::validation::model::ValidationResult;

/// Complete output of one successful run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterpretationResult {
    pub run_id: String,
    /// SHA-256 of the canonical component list.
    pub blueprint_digest: String,
    pub blueprint: Blueprint,
    pub graph: DependencyGraph,
    pub node_mappings: Vec<ComponentNodeMapping>,
    pub connections: Vec<ConnectionMapping>,
    pub validation: ValidationResult,
    pub warnings: Vec<String>,
    pub suggestions: Vec<String>,
    /// Aggregate confidence in `[0, 1]`.
    pub confidence: f64,
    pub completed_at: DateTime<Utc>,
}

/// Mean mapping confidence; 0.0 for no mappings.
pub fn average_mapping_confidence(mappings: &[ComponentNodeMapping]) -> f64 {
    if mappings.is_empty() {
        return 0.0;
    }
    mappings.iter().map(|m| m.confidence).sum::<f64>() / mappings.len() as f64
}

/// Flows implied by synthesized connections, one per connection.
pub fn flows_from_connections(connections: &[ConnectionMapping]) -> Vec<StrategyFlow> {
    connections
        .iter()
        .map(|c| StrategyFlow {
            id: c.id.clone(),
            source: c.source_component.clone(),
            target: c.target_component.clone(),
            kind: Some(c.kind),
        })
        .collect()
}

/// Stage input as JSON; `Null` (with a warning) when it cannot be serialized.
fn payload<T: Serialize + ?Sized>(value: &T) -> serde_json::Value {
    serde_json::to_value(value).unwrap_or_else(|e| {
        warn!(event = "payload.unserializable", error = %e);
        serde_json::Value::Null
    })
}

/// Sequences the collaborators and analytical stages of a run.
pub struct StrategyInterpreter {
    generator: Arc<dyn BlueprintGenerator>,
    mapper: Arc<dyn NodeMapper>,
    rules: RuleTable,
    matrix: CompatibilityMatrix,
    options: InterpretOptions,
}

impl StrategyInterpreter {
    pub fn new(
        generator: Arc<dyn BlueprintGenerator>,
        mapper: Arc<dyn NodeMapper>,
        options: InterpretOptions,
    ) -> Self {
        Self {
            generator,
            mapper,
            rules: RuleTable::standard(),
            matrix: CompatibilityMatrix::standard(),
            options,
        }
    }

    /// Substitute the rule table and compatibility matrix.
    pub fn with_tables(mut self, rules: RuleTable, matrix: CompatibilityMatrix) -> Self {
        self.rules = rules;
        self.matrix = matrix;
        self
    }

    pub fn options(&self) -> &InterpretOptions {
        &self.options
    }

    pub fn graph_builder(&self) -> DependencyGraphBuilder {
        DependencyGraphBuilder::new(self.rules.clone(), self.matrix.clone())
            .with_max_level_iterations(self.options.max_level_iterations)
            .with_candidate_weights(self.options.candidates.clone())
    }

    pub fn synthesizer(&self) -> ConnectionSynthesizer {
        ConnectionSynthesizer::new(self.rules.clone(), self.matrix.clone())
            .with_params(self.options.synthesis.clone())
            .with_options(self.options.synthesis_options())
    }

    pub fn validation_engine(&self) -> ValidationEngine {
        ValidationEngine::new(self.matrix.clone(), self.options.validation_options())
    }

    /// Run the full pipeline for `request`.
    pub async fn interpret(
        &self,
        request: &InterpretRequest,
    ) -> Result<InterpretationResult, PipelineError> {
        let run_id = Uuid::new_v4().to_string();
        let span = obs::interpret_span(&run_id);
        self.run(run_id, request).instrument(span).await
    }

    async fn run(
        &self,
        run_id: String,
        request: &InterpretRequest,
    ) -> Result<InterpretationResult, PipelineError> {
        let started = Instant::now();
        obs::emit_interpretation_started(&run_id, request.prompt.len());

        let outcome = self.stages(&run_id, request).await;
        let duration_ms = started.elapsed().as_millis() as u64;
        match &outcome {
            Ok(result) => {
                obs::emit_interpretation_finished(&run_id, duration_ms, result.confidence, true)
            }
            Err(_) => obs::emit_interpretation_finished(&run_id, duration_ms, 0.0, false),
        }
        outcome
    }

    async fn stages(
        &self,
        run_id: &str,
        request: &InterpretRequest,
    ) -> Result<InterpretationResult, PipelineError> {
        let fail = |stage: Stage, source: InterpretError, input: serde_json::Value| {
            obs::emit_stage_failed(run_id, stage.as_str(), &source);
            PipelineError::new(stage, source, input)
        };
        let done = |stage: Stage, t: Instant| {
            obs::emit_stage_completed(run_id, stage.as_str(), t.elapsed().as_millis() as u64);
        };
        let mut warnings = Vec::new();
        let mut suggestions = Vec::new();

        // Blueprint generation
        let t = Instant::now();
        let blueprint = self
            .generator
            .generate(request)
            .await
            .map_err(|e| fail(Stage::BlueprintGeneration, e, payload(request)))?;
        let components = &blueprint.components;
        done(Stage::BlueprintGeneration, t);

        // Dependency graph
        let t = Instant::now();
        let builder = self.graph_builder();
        let graph_input = || payload(components);
        let build = builder
            .build(components)
            .map_err(|e| fail(Stage::DependencyGraph, e, graph_input()))?;
        let graph = build.graph;
        obs::emit_graph_built(
            run_id,
            graph.len(),
            graph.edges.len(),
            graph.levels.len(),
            graph.has_cycles,
        );
        if let Some(path) = graph.cycles.first() {
            let err = InterpretError::CycleDetected { path: path.clone() };
            return Err(fail(Stage::DependencyGraph, err, graph_input()));
        }
        let report = builder.validate(&graph);
        report
            .ensure_complete()
            .map_err(|e| fail(Stage::DependencyGraph, e, graph_input()))?;
        warnings.extend(build.warnings);
        warnings.extend(report.warnings);
        done(Stage::DependencyGraph, t);

        // Node mapping
        let t = Instant::now();
        let mappings = self
            .mapper
            .map_nodes(components)
            .await
            .map_err(|e| fail(Stage::NodeMapping, e, payload(components)))?;
        let mapped: BTreeSet<&str> = mappings.iter().map(|m| m.component_id.as_str()).collect();
        if let Some(unmapped) = graph
            .node_order
            .iter()
            .find(|id| !mapped.contains(id.as_str()))
        {
            let err = InterpretError::MissingNodeMapping {
                component_id: unmapped.clone(),
            };
            return Err(fail(Stage::NodeMapping, err, payload(components)));
        }
        for m in mappings.iter().filter(|m| m.confidence < LOW_CONFIDENCE_THRESHOLD) {
            warnings.push(format!(
                "low-confidence node mapping {} -> {} ({:.2})",
                m.component_id, m.node_id, m.confidence
            ));
        }
        done(Stage::NodeMapping, t);

        // Connection synthesis
        let t = Instant::now();
        let explicit_flows = request
            .flows_override
            .as_deref()
            .or(blueprint.flows.as_deref());
        let synthesis = self
            .synthesizer()
            .synthesize(&graph, &mappings, explicit_flows)
            .map_err(|e| {
                fail(
                    Stage::ConnectionSynthesis,
                    e,
                    serde_json::json!({
                        "edges": payload(&graph.edges),
                        "node_mappings": payload(&mappings),
                        "flows": payload(&explicit_flows),
                    }),
                )
            })?;
        obs::emit_connections_synthesized(
            run_id,
            synthesis.connections.len(),
            synthesis.warnings.len(),
            synthesis.average_confidence(),
        );
        let avg_connection = synthesis.average_confidence();
        warnings.extend(synthesis.warnings);
        suggestions.extend(synthesis.suggestions);
        let connections = synthesis.connections;
        done(Stage::ConnectionSynthesis, t);

        // Validation
        let t = Instant::now();
        let flows = match explicit_flows {
            Some(flows) => flows.to_vec(),
            None => flows_from_connections(&connections),
        };
        let validation = self
            .validation_engine()
            .score(components, &flows, blueprint.risk_profile.as_ref());
        obs::emit_validation_scored(
            run_id,
            validation.score,
            validation.is_valid,
            validation.errors.len(),
        );
        suggestions.extend(validation.suggestions.iter().cloned());
        done(Stage::Validation, t);

        let confidence = self.options.confidence.aggregate(
            blueprint.confidence,
            average_mapping_confidence(&mappings),
            avg_connection,
            validation.score,
        );

        let digest = match blueprint_digest(components) {
            Ok(digest) => digest,
            Err(e) => {
                warn!(event = "digest.failed", run_id = %run_id, error = %e);
                warnings.push(format!("blueprint digest unavailable: {e}"));
                String::new()
            }
        };

        Ok(InterpretationResult {
            run_id: run_id.to_string(),
            blueprint_digest: digest,
            graph,
            node_mappings: mappings,
            connections,
            validation,
            warnings,
            suggestions,
            confidence,
            completed_at: Utc::now(),
            blueprint,
        })
    }
}
