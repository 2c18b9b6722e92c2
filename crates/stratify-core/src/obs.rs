//! Structured observability hooks for interpretation runs.
//!
//! This module provides:
//! - Run-scoped tracing spans via the `InterpretSpan` RAII guard
//! - Emission functions for lifecycle events: start, per-stage outcome,
//!   stage summaries and finish
//!
//! Events are emitted at `info!` level, failures at `warn!`. Every event
//! carries an `event = "<dotted.name>"` field.

use tracing::{info, warn};

/// The run-scoped span, for callers that instrument futures.
pub fn interpret_span(run_id: &str) -> tracing::Span {
    tracing::info_span!("stratify.interpret", run_id = %run_id)
}

/// RAII guard that enters a run-scoped tracing span.
///
/// # Example
///
/// ```ignore
/// let _span = InterpretSpan::enter("run-12345");
/// // every event below is tagged with run_id = "run-12345"
/// ```
pub struct InterpretSpan {
    _span: tracing::span::EnteredSpan,
}

impl InterpretSpan {
    pub fn enter(run_id: &str) -> Self {
        Self {
            _span: interpret_span(run_id).entered(),
        }
    }
}

pub fn emit_interpretation_started(run_id: &str, prompt_len: usize) {
    info!(event = "interpretation.started", run_id = %run_id, prompt_len = prompt_len);
}

/// A stage finished successfully.
pub fn emit_stage_completed(run_id: &str, stage: &str, duration_ms: u64) {
    info!(
        event = "stage.completed",
        run_id = %run_id,
        stage = %stage,
        duration_ms = duration_ms,
    );
}

/// A stage failed; the run aborts.
pub fn emit_stage_failed(run_id: &str, stage: &str, error: &dyn std::fmt::Display) {
    warn!(event = "stage.failed", run_id = %run_id, stage = %stage, error = %error);
}

pub fn emit_graph_built(run_id: &str, nodes: usize, edges: usize, levels: usize, has_cycles: bool) {
    info!(
        event = "graph.built",
        run_id = %run_id,
        nodes = nodes,
        edges = edges,
        levels = levels,
        has_cycles = has_cycles,
    );
}

pub fn emit_connections_synthesized(
    run_id: &str,
    connections: usize,
    warnings: usize,
    average_confidence: f64,
) {
    info!(
        event = "connections.synthesized",
        run_id = %run_id,
        connections = connections,
        warnings = warnings,
        average_confidence = average_confidence,
    );
}

pub fn emit_validation_scored(run_id: &str, score: u8, is_valid: bool, errors: usize) {
    info!(
        event = "validation.scored",
        run_id = %run_id,
        score = score,
        is_valid = is_valid,
        errors = errors,
    );
}

/// Emit event: run finished with duration, confidence and outcome.
pub fn emit_interpretation_finished(
    run_id: &str,
    duration_ms: u64,
    confidence: f64,
    success: bool,
) {
    info!(
        event = "interpretation.finished",
        run_id = %run_id,
        duration_ms = duration_ms,
        confidence = confidence,
        success = success,
    );
}
