//! Validation engine: runs every check family and reduces the findings to a
//! bounded score and a validity verdict.

use tracing::debug;

use crate::domain::component::{RiskProfile, StrategyComponent, StrategyFlow};
use crate::domain::rules::CompatibilityMatrix;
use crate::validation::checks::{
    best_practices, component_checks, flow_checks, risk_checks, structure_checks,
};
use crate::validation::model::{
    BestPracticeCheck, Findings, ValidationError, ValidationResult, ValidationWarning,
};
use crate::validation::options::{ScoringWeights, ValidationOptions};
use crate::validation::performance::estimate;

/// Score every strategy starts from.
pub const MAX_SCORE: f64 = 100.0;

/// Reduce findings to a score in `[0, 100]`.
///
/// Deductions are additive; adding a finding never raises the score.
pub fn compute_score(
    weights: &ScoringWeights,
    errors: &[ValidationError],
    warnings: &[ValidationWarning],
    practices: &[BestPracticeCheck],
    breaches: usize,
) -> u8 {
    let errors: f64 = errors.iter().map(|e| weights.for_severity(e.severity)).sum();
    let warnings: f64 = warnings.iter().map(|w| weights.for_impact(w.impact)).sum();
    let practices: f64 = practices
        .iter()
        .filter(|p| !p.compliant)
        .map(|p| weights.for_importance(p.importance))
        .sum();
    let performance = breaches as f64 * weights.performance_breach;

    let score = MAX_SCORE - errors - warnings - practices - performance;
    score.clamp(0.0, MAX_SCORE).round() as u8
}

/// Scores strategies against a fixed compatibility matrix and options.
#[derive(Debug, Clone)]
pub struct ValidationEngine {
    matrix: CompatibilityMatrix,
    options: ValidationOptions,
}

impl Default for ValidationEngine {
    fn default() -> Self {
        Self::new(CompatibilityMatrix::standard(), ValidationOptions::default())
    }
}

impl ValidationEngine {
    pub fn new(matrix: CompatibilityMatrix, options: ValidationOptions) -> Self {
        Self { matrix, options }
    }

    pub fn options(&self) -> &ValidationOptions {
        &self.options
    }

    /// Run every enabled check family over `components` and `flows`.
    pub fn score(
        &self,
        components: &[StrategyComponent],
        flows: &[StrategyFlow],
        profile: Option<&RiskProfile>,
    ) -> ValidationResult {
        let opts = &self.options;
        let mut findings = Findings::default();
        findings.merge(component_checks(components));
        findings.merge(flow_checks(components, flows, &self.matrix));
        findings.merge(structure_checks(components));
        findings.merge(risk_checks(components, profile, opts));

        let practices = if opts.check_best_practices {
            best_practices(components, flows, profile, opts)
        } else {
            Vec::new()
        };
        for p in practices.iter().filter(|p| !p.compliant) {
            findings.suggest(format!("follow best practice: {}", p.name));
        }

        let performance = opts
            .check_performance
            .then(|| estimate(components, flows, &opts.model, &opts.thresholds));
        let breaches = performance.as_ref().map_or(0, |m| m.breaches.len());
        if let Some(m) = &performance {
            for metric in &m.breaches {
                findings.suggest(format!("{metric} estimate breaches its threshold"));
            }
        }

        let score = compute_score(
            &opts.scoring,
            &findings.errors,
            &findings.warnings,
            &practices,
            breaches,
        );
        let is_valid = !findings.errors.iter().any(ValidationError::is_critical);
        debug!(
            score,
            is_valid,
            errors = findings.errors.len(),
            warnings = findings.warnings.len(),
            "strategy scored"
        );

        ValidationResult {
            is_valid,
            score,
            errors: findings.errors,
            warnings: findings.warnings,
            suggestions: findings.suggestions,
            best_practices: practices,
            performance,
        }
    }
}

/// Score with the standard compatibility matrix.
///
/// The risk profile is not consulted; use [`ValidationEngine::score`] to pass one.
pub fn score(
    components: &[StrategyComponent],
    flows: &[StrategyFlow],
    options: &ValidationOptions,
) -> ValidationResult {
    ValidationEngine::new(CompatibilityMatrix::standard(), options.clone()).score(
        components,
        flows,
        None,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::component::ComponentType::{self, *};
    use crate::validation::model::{FindingKind, Impact, Importance, Severity};
    use serde_json::json;

    fn c(id: &str, t: ComponentType, subtype: &str) -> StrategyComponent {
        StrategyComponent::new(id, t, subtype).with_label(format!("{subtype} step"))
    }

    fn complete() -> (Vec<StrategyComponent>, Vec<StrategyFlow>) {
        let components = vec![
            c("d1", DataSource, "ohlcv").with_param("symbol", json!("BTCUSD")),
            c("d2", DataSource, "funding").with_param("symbol", json!("BTCUSD-PERP")),
            c("i1", Indicator, "rsi"),
            c("c1", Condition, "entry_oversold"),
            c("c2", Condition, "exit_overbought"),
            c("a1", Action, "buy"),
            c("r1", Risk, "stop_loss").with_param("stop_loss_percent", json!(2.0)),
        ];
        let flows = vec![
            StrategyFlow::new("f1", "d1", "i1"),
            StrategyFlow::new("f2", "i1", "c1"),
            StrategyFlow::new("f3", "i1", "c2"),
            StrategyFlow::new("f4", "c1", "a1"),
            StrategyFlow::new("f5", "c2", "a1"),
            StrategyFlow::new("f6", "a1", "r1"),
        ];
        (components, flows)
    }

    #[test]
    fn test_complete_strategy_scores_full_marks() {
        let (components, flows) = complete();
        let result = ValidationEngine::default().score(&components, &flows, None);
        assert!(result.is_valid);
        assert!(result.errors.is_empty(), "{:?}", result.errors);
        assert!(result.warnings.is_empty(), "{:?}", result.warnings);
        assert!(result.best_practices.iter().all(|p| p.compliant));
        assert_eq!(result.score, 100);
        assert!(result.performance.is_some());
    }

    #[test]
    fn test_score_deductions_follow_ladders() {
        let w = ScoringWeights::default();
        let errors = vec![
            ValidationError::new(FindingKind::MissingAction, Severity::Critical, "x"),
            ValidationError::new(FindingKind::InvalidParameter, Severity::Low, "y"),
        ];
        let warnings = vec![ValidationWarning::new(
            FindingKind::OrphanedComponent,
            Impact::Medium,
            "z",
        )];
        let practices = vec![BestPracticeCheck {
            name: "uses stop loss".into(),
            compliant: false,
            importance: Importance::Recommended,
        }];
        // 100 - 25 - 5 - 5 - 5 - 10
        assert_eq!(compute_score(&w, &errors, &warnings, &practices, 1), 50);
    }

    #[test]
    fn test_score_is_clamped_at_zero() {
        let errors: Vec<ValidationError> = (0..10)
            .map(|_| ValidationError::new(FindingKind::FlowCycle, Severity::Critical, "c"))
            .collect();
        assert_eq!(
            compute_score(&ScoringWeights::default(), &errors, &[], &[], 4),
            0
        );
    }

    #[test]
    fn test_low_score_without_critical_errors_stays_valid() {
        let (mut components, flows) = complete();
        components.retain(|c| c.id != "r1");
        for comp in &mut components {
            comp.label = comp.id.clone();
        }
        let result = score(&components, &flows, &ValidationOptions::default());
        assert!(result.is_valid);
        assert!(result.score < 100);
        assert!(result.has_warning(FindingKind::MissingRiskManagement));
    }

    #[test]
    fn test_disabled_families_are_skipped() {
        let (components, flows) = complete();
        let opts = ValidationOptions::default()
            .with_best_practices(false)
            .with_performance(false);
        let result = score(&components, &flows, &opts);
        assert!(result.best_practices.is_empty());
        assert!(result.performance.is_none());
    }

    #[test]
    fn test_performance_breaches_deduct_flat() {
        let (components, flows) = complete();
        let thresholds = crate::validation::options::PerformanceThresholds {
            max_complexity: 1,
            ..Default::default()
        };
        let result = score(
            &components,
            &flows,
            &ValidationOptions::default().with_thresholds(thresholds),
        );
        assert_eq!(result.score, 90);
        assert_eq!(
            result.performance.as_ref().map(|m| m.breaches.clone()),
            Some(vec!["complexity".to_string()])
        );
    }
}
