//! Static performance estimators.

use std::collections::BTreeSet;

use crate::domain::component::{StrategyComponent, StrategyFlow};
use crate::validation::model::PerformanceMetrics;
use crate::validation::options::{PerformanceModel, PerformanceThresholds};

/// Estimate the cost of evaluating `components` wired by `flows`.
///
/// `complexity = 2 * components + flows`; latency, memory and execution time
/// are linear in both counts. Breached thresholds are listed by metric name.
pub fn estimate(
    components: &[StrategyComponent],
    flows: &[StrategyFlow],
    model: &PerformanceModel,
    thresholds: &PerformanceThresholds,
) -> PerformanceMetrics {
    let n = components.len();
    let f = flows.len();
    let (nf, ff) = (n as f64, f as f64);

    let complexity = 2 * n + f;
    let scalability = if model.scalability_horizon > 0.0 {
        (1.0 - complexity as f64 / model.scalability_horizon).max(0.0)
    } else {
        0.0
    };

    let density = if n == 0 { 0.0 } else { ff / nf };
    let distinct_types = components
        .iter()
        .map(|c| c.component_type)
        .collect::<BTreeSet<_>>()
        .len() as f64;
    let maintainability = (1.0
        - ratio(density, model.connection_density_limit)
        - ratio(distinct_types, model.type_variety_limit))
    .max(0.0);

    let mut metrics = PerformanceMetrics {
        complexity,
        latency_ms: nf * model.latency_per_component_ms + ff * model.latency_per_flow_ms,
        memory_kb: nf * model.memory_per_component_kb + ff * model.memory_per_flow_kb,
        execution_time_ms: nf * model.execution_per_component_ms
            + ff * model.execution_per_flow_ms,
        scalability,
        maintainability,
        breaches: Vec::new(),
    };

    if metrics.complexity > thresholds.max_complexity {
        metrics.breaches.push("complexity".into());
    }
    if metrics.latency_ms > thresholds.max_latency_ms {
        metrics.breaches.push("latency".into());
    }
    if metrics.scalability < thresholds.min_scalability {
        metrics.breaches.push("scalability".into());
    }
    if metrics.maintainability < thresholds.min_maintainability {
        metrics.breaches.push("maintainability".into());
    }
    metrics
}

fn ratio(value: f64, limit: f64) -> f64 {
    if limit > 0.0 {
        value / limit
    } else {
        0.0
    }
}
