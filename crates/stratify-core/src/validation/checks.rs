//! Independent validation check families.
//!
//! Each family reads the component and flow lists and returns its own
//! [`Findings`]. Families never see each other's output.

use std::collections::{BTreeMap, BTreeSet};

use crate::domain::component::{ComponentType, RiskProfile, StrategyComponent, StrategyFlow};
use crate::domain::rules::CompatibilityMatrix;
use crate::graph::traversal::find_cycles;
use crate::validation::model::{
    BestPracticeCheck, FindingKind, Findings, Impact, Importance, Severity, ValidationError,
    ValidationWarning,
};
use crate::validation::options::ValidationOptions;

/// Role words only. Direction and price words (long, short, close) are
/// not roles.
const ENTRY_TOKENS: &[&str] = &["entry", "enter"];
const EXIT_TOKENS: &[&str] = &["exit"];
const STOP_TOKENS: &[&str] = &["stop", "stoploss", "sl"];
const STOP_PARAMS: &[&str] = &["stop_loss", "stop_loss_percent", "stop_percent"];
const RISK_PARAMS: &[&str] = &["max_risk_percent", "risk_percent"];

fn has_token(component: &StrategyComponent, tokens: &[&str]) -> bool {
    component
        .subtype_tokens()
        .iter()
        .any(|t| tokens.contains(&t.as_str()))
}

fn has_type(components: &[StrategyComponent], t: ComponentType) -> bool {
    components.iter().any(|c| c.component_type == t)
}

/// A `role` parameter wins over subtype tokens.
fn has_role(c: &StrategyComponent, role: &str, tokens: &[&str]) -> bool {
    if c.component_type != ComponentType::Condition {
        return false;
    }
    match c.param_str("role") {
        Some(declared) => declared.eq_ignore_ascii_case(role),
        None => has_token(c, tokens),
    }
}

pub(crate) fn is_entry_condition(c: &StrategyComponent) -> bool {
    has_role(c, "entry", ENTRY_TOKENS)
}

pub(crate) fn is_exit_condition(c: &StrategyComponent) -> bool {
    has_role(c, "exit", EXIT_TOKENS)
}

/// Whether any stop-loss value is declared, in the profile or on a risk component.
pub(crate) fn declares_stop_loss(
    components: &[StrategyComponent],
    profile: Option<&RiskProfile>,
) -> bool {
    if profile.and_then(|p| p.stop_loss_percent).is_some() {
        return true;
    }
    components
        .iter()
        .filter(|c| c.component_type == ComponentType::Risk)
        .any(|c| {
            has_token(c, STOP_TOKENS) || STOP_PARAMS.iter().any(|k| c.parameters.contains_key(*k))
        })
}

/// Components that no flow touches; data sources are exempt.
pub(crate) fn orphans<'a>(
    components: &'a [StrategyComponent],
    flows: &[StrategyFlow],
) -> Vec<&'a StrategyComponent> {
    let touched: BTreeSet<&str> = flows
        .iter()
        .flat_map(|f| [f.source.as_str(), f.target.as_str()])
        .collect();
    components
        .iter()
        .filter(|c| {
            c.component_type != ComponentType::DataSource && !touched.contains(c.id.as_str())
        })
        .collect()
}

/// Required categories, duplicate ids and per-type parameter sanity.
pub fn component_checks(components: &[StrategyComponent]) -> Findings {
    let mut out = Findings::default();

    if !has_type(components, ComponentType::DataSource) {
        out.error(
            ValidationError::new(
                FindingKind::MissingDataSource,
                Severity::Critical,
                "strategy has no data source",
            )
            .fixable(),
        );
    }
    if !has_type(components, ComponentType::Action) {
        out.error(
            ValidationError::new(
                FindingKind::MissingAction,
                Severity::Critical,
                "strategy has no action",
            )
            .fixable(),
        );
    }

    let mut seen = BTreeSet::new();
    for c in components {
        if !seen.insert(c.id.as_str()) {
            out.error(
                ValidationError::new(
                    FindingKind::DuplicateComponentId,
                    Severity::Critical,
                    format!("component id '{}' is used more than once", c.id),
                )
                .for_component(&c.id),
            );
        }
        for e in parameter_errors(c) {
            out.error(e);
        }
    }
    out
}

fn positive(c: &StrategyComponent, key: &str) -> Option<bool> {
    c.parameters.get(key).map(|v| v.as_f64().is_some_and(|n| n > 0.0))
}

fn parameter_error(c: &StrategyComponent, severity: Severity, message: String) -> ValidationError {
    ValidationError::new(FindingKind::InvalidParameter, severity, message)
        .for_component(&c.id)
        .fixable()
}

fn parameter_errors(c: &StrategyComponent) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    match c.component_type {
        ComponentType::DataSource => {
            let symbol = c.param_str("symbol").map(str::trim).unwrap_or("");
            if symbol.is_empty() {
                errors.push(parameter_error(
                    c,
                    Severity::High,
                    format!("data source '{}' must specify a non-empty symbol", c.id),
                ));
            }
        }
        ComponentType::Indicator => {
            if positive(c, "period") == Some(false) {
                errors.push(parameter_error(
                    c,
                    Severity::Medium,
                    format!("indicator '{}' period must be a positive number", c.id),
                ));
            }
        }
        ComponentType::Condition => {
            if let Some(v) = c.parameters.get("threshold") {
                if !v.is_number() {
                    errors.push(parameter_error(
                        c,
                        Severity::Medium,
                        format!("condition '{}' threshold must be numeric", c.id),
                    ));
                }
            }
        }
        ComponentType::Action => {
            for key in ["quantity", "size"] {
                if positive(c, key) == Some(false) {
                    errors.push(parameter_error(
                        c,
                        Severity::Medium,
                        format!("action '{}' {key} must be a positive number", c.id),
                    ));
                }
            }
        }
        ComponentType::Risk => {
            for key in RISK_PARAMS.iter().chain(STOP_PARAMS) {
                let Some(v) = c.parameters.get(*key) else {
                    continue;
                };
                if !v.as_f64().is_some_and(|p| p > 0.0 && p <= 100.0) {
                    errors.push(parameter_error(
                        c,
                        Severity::High,
                        format!("risk component '{}' {key} must be a percentage in (0, 100]", c.id),
                    ));
                }
            }
        }
        ComponentType::Timing | ComponentType::Math | ComponentType::Logic => {}
    }
    errors
}

/// Cycles, endpoint existence, type compatibility and orphans over `flows`.
///
/// Cycle detection runs directly on the flow list and does not depend on a
/// dependency graph having been built.
pub fn flow_checks(
    components: &[StrategyComponent],
    flows: &[StrategyFlow],
    matrix: &CompatibilityMatrix,
) -> Findings {
    let mut out = Findings::default();
    let mut types: BTreeMap<&str, ComponentType> = BTreeMap::new();
    let mut order: Vec<String> = Vec::new();
    for c in components {
        if types.insert(c.id.as_str(), c.component_type).is_none() {
            order.push(c.id.clone());
        }
    }

    let mut adjacency: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for flow in flows {
        let (Some(s), Some(t)) = (types.get(flow.source.as_str()), types.get(flow.target.as_str()))
        else {
            let missing = if types.contains_key(flow.source.as_str()) {
                &flow.target
            } else {
                &flow.source
            };
            out.error(
                ValidationError::new(
                    FindingKind::UnknownFlowEndpoint,
                    Severity::High,
                    format!("flow {} references unknown component '{}'", flow.id, missing),
                )
                .for_connection(&flow.id)
                .fixable(),
            );
            continue;
        };

        if flow.source == flow.target {
            out.error(
                ValidationError::new(
                    FindingKind::SelfLoopFlow,
                    Severity::High,
                    format!("flow {} connects '{}' to itself", flow.id, flow.source),
                )
                .for_component(&flow.source)
                .for_connection(&flow.id)
                .fixable(),
            );
            continue;
        }

        if !matrix.allows(*s, *t) {
            out.error(
                ValidationError::new(
                    FindingKind::IncompatibleFlow,
                    Severity::High,
                    format!(
                        "flow {}: {} '{}' cannot connect to {} '{}'",
                        flow.id, s, flow.source, t, flow.target
                    ),
                )
                .for_connection(&flow.id),
            );
        }

        let targets = adjacency.entry(flow.source.clone()).or_default();
        if !targets.contains(&flow.target) {
            targets.push(flow.target.clone());
        }
    }

    for cycle in find_cycles(&order, &adjacency) {
        out.error(
            ValidationError::new(
                FindingKind::FlowCycle,
                Severity::Critical,
                format!("flows form a cycle: {}", cycle.join(" -> ")),
            )
            .for_component(cycle.first().cloned().unwrap_or_default()),
        );
    }

    for c in orphans(components, flows) {
        out.warn(
            ValidationWarning::new(
                FindingKind::OrphanedComponent,
                Impact::Medium,
                format!("component '{}' is not connected to any flow", c.id),
            )
            .for_component(&c.id),
        );
    }
    out
}

/// Presence of explicit entry and exit conditions.
pub fn structure_checks(components: &[StrategyComponent]) -> Findings {
    let mut out = Findings::default();
    if !components.iter().any(is_entry_condition) {
        out.warn(ValidationWarning::new(
            FindingKind::MissingEntryCondition,
            Impact::Medium,
            "no explicit entry condition",
        ));
    }
    if !components.iter().any(is_exit_condition) {
        out.warn(ValidationWarning::new(
            FindingKind::MissingExitCondition,
            Impact::Medium,
            "no explicit exit condition",
        ));
    }
    out
}

/// Risk-management presence, per-trade risk limit and stop loss.
pub fn risk_checks(
    components: &[StrategyComponent],
    profile: Option<&RiskProfile>,
    options: &ValidationOptions,
) -> Findings {
    let mut out = Findings::default();

    if !has_type(components, ComponentType::Risk) {
        let message = "missing risk management";
        if options.strict_mode {
            out.error(
                ValidationError::new(
                    FindingKind::MissingRiskManagement,
                    Severity::Critical,
                    message,
                )
                .fixable(),
            );
        } else {
            out.warn(ValidationWarning::new(
                FindingKind::MissingRiskManagement,
                Impact::High,
                message,
            ));
        }
    }

    if let Some(max) = profile.and_then(|p| p.max_risk_percent) {
        if max > options.max_risk_percent {
            out.warn(ValidationWarning::new(
                FindingKind::ExcessiveRisk,
                Impact::High,
                format!(
                    "maximum risk of {max}% per trade exceeds {}%",
                    options.max_risk_percent
                ),
            ));
        }
    }

    if !declares_stop_loss(components, profile) {
        out.suggest("add a stop loss to cap the loss of each position");
    }
    out
}

/// The fixed ordered best-practice catalogue.
pub fn best_practices(
    components: &[StrategyComponent],
    flows: &[StrategyFlow],
    profile: Option<&RiskProfile>,
    options: &ValidationOptions,
) -> Vec<BestPracticeCheck> {
    let check = |name: &str, compliant: bool, importance: Importance| BestPracticeCheck {
        name: name.to_string(),
        compliant,
        importance,
    };
    let descriptive = components
        .iter()
        .all(|c| !c.label.trim().is_empty() && c.label != c.id);

    vec![
        check(
            "has risk management",
            has_type(components, ComponentType::Risk),
            Importance::Critical,
        ),
        check(
            "has data source",
            has_type(components, ComponentType::DataSource),
            Importance::Critical,
        ),
        check(
            "has entry and exit conditions",
            components.iter().any(is_entry_condition) && components.iter().any(is_exit_condition),
            Importance::Important,
        ),
        check(
            &format!("component count <= {}", options.max_components),
            components.len() <= options.max_components,
            Importance::Important,
        ),
        check(
            "no orphaned components",
            orphans(components, flows).is_empty(),
            Importance::Important,
        ),
        check(
            "uses stop loss",
            declares_stop_loss(components, profile),
            Importance::Recommended,
        ),
        check("descriptive labels", descriptive, Importance::Recommended),
    ]
}
