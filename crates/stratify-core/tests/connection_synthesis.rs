use std::collections::BTreeMap;

use stratify_core::{
    CompatibilityMatrix, ComponentNodeMapping, ComponentType, ConnectionIssue, ConnectionKind,
    ConnectionMapping, ConnectionOrigin, ConnectionSynthesizer, ConnectionValidator,
    DependencyGraph, DependencyGraphBuilder, InterpretError, StrategyComponent, StrategyFlow,
    SynthesisOptions,
};

fn c(id: &str, t: ComponentType, subtype: &str) -> StrategyComponent {
    StrategyComponent::new(id, t, subtype)
}

fn graph(components: &[StrategyComponent]) -> DependencyGraph {
    DependencyGraphBuilder::default()
        .build(components)
        .unwrap()
        .graph
}

fn identity(graph: &DependencyGraph) -> Vec<ComponentNodeMapping> {
    graph
        .node_order
        .iter()
        .map(|id| ComponentNodeMapping {
            component_id: id.clone(),
            node_id: format!("node-{id}"),
            confidence: 0.9,
        })
        .collect()
}

fn with_risk() -> Vec<StrategyComponent> {
    vec![
        c("d1", ComponentType::DataSource, "ohlcv"),
        c("i1", ComponentType::Indicator, "rsi"),
        c("c1", ComponentType::Condition, "oversold"),
        c("a1", ComponentType::Action, "buy"),
        c("r1", ComponentType::Risk, "stop_loss"),
    ]
}

// ── Scenario A ──────────────────────────────────────────────────────────

#[test]
fn scenario_a_connection_kinds() {
    let g = graph(&with_risk()[..4]);
    let out = ConnectionSynthesizer::default()
        .synthesize(&g, &identity(&g), None)
        .unwrap();
    let summary: Vec<(&str, &str, ConnectionKind)> = out
        .connections
        .iter()
        .map(|c| (c.source_node.as_str(), c.target_node.as_str(), c.kind))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("node-d1", "node-i1", ConnectionKind::DataPipe),
            ("node-i1", "node-c1", ConnectionKind::SignalWire),
            ("node-c1", "node-a1", ConnectionKind::TriggerLine),
        ]
    );
    let ids: Vec<&str> = out.connections.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, vec!["conn-0", "conn-1", "conn-2"]);
}

#[test]
fn risk_guard_becomes_feedback_loop() {
    let g = graph(&with_risk());
    let out = ConnectionSynthesizer::default()
        .synthesize(&g, &identity(&g), None)
        .unwrap();
    let last = out.connections.last().unwrap();
    assert_eq!(last.source_component, "a1");
    assert_eq!(last.target_component, "r1");
    assert_eq!(last.kind, ConnectionKind::FeedbackLoop);
    // weight 0.8: 0.5 + 0.24 + 0.2
    assert!((last.confidence - 0.94).abs() < 1e-9);
}

// ── Scenario D ──────────────────────────────────────────────────────────

#[test]
fn scenario_d_risk_cannot_be_a_source() {
    let g = graph(&with_risk());
    let mappings = identity(&g);
    for target in ["d1", "i1", "c1", "a1"] {
        let hints = vec![StrategyFlow::new("h", "r1", target)];
        let err = ConnectionSynthesizer::default()
            .synthesize(&g, &mappings, Some(&hints))
            .unwrap_err();
        match err {
            InterpretError::InvalidConnection {
                source_id,
                target_id,
                ..
            } => {
                assert_eq!(source_id, "r1");
                assert_eq!(target_id, target);
            }
            other => panic!("expected InvalidConnection, got {other:?}"),
        }
    }
}

#[test]
fn standalone_validator_rechecks_drawn_connections() {
    let endpoints: BTreeMap<String, ComponentType> = [
        ("node-r1".to_string(), ComponentType::Risk),
        ("node-a1".to_string(), ComponentType::Action),
    ]
    .into_iter()
    .collect();
    let validator = ConnectionValidator::new(CompatibilityMatrix::standard(), endpoints);
    let drawn = ConnectionMapping {
        id: "user-1".into(),
        source_node: "node-r1".into(),
        target_node: "node-a1".into(),
        source_component: "r1".into(),
        target_component: "a1".into(),
        kind: ConnectionKind::ControlFlow,
        confidence: 1.0,
        priority: 3.0,
        origin: ConnectionOrigin::Hint,
        reasoning: "drawn by hand".into(),
        validation: None,
    };
    let self_loop = ConnectionMapping {
        target_node: "node-r1".into(),
        target_component: "r1".into(),
        ..drawn.clone()
    };

    let checks = validator.validate_all(&[drawn, self_loop]);
    assert_eq!(
        checks[0].issues,
        vec![ConnectionIssue::IncompatibleTypes {
            source_type: ComponentType::Risk,
            target_type: ComponentType::Action,
        }]
    );
    assert!((checks[0].confidence - 0.3).abs() < 1e-9);
    assert_eq!(checks[1].issues, vec![ConnectionIssue::SelfLoop]);
}

// ── Options ─────────────────────────────────────────────────────────────

#[test]
fn validation_pass_can_be_disabled() {
    let g = graph(&with_risk());
    let hints = vec![StrategyFlow::new("h", "r1", "a1")];
    let out = ConnectionSynthesizer::default()
        .with_options(SynthesisOptions {
            validate: false,
            ..SynthesisOptions::default()
        })
        .synthesize(&g, &identity(&g), Some(&hints))
        .unwrap();
    assert!(out.connections.iter().all(|c| c.validation.is_none()));
    assert!(out
        .connections
        .iter()
        .any(|c| c.origin == ConnectionOrigin::Hint && c.source_component == "r1"));
}

#[test]
fn identical_inputs_yield_identical_connections() {
    let g = graph(&with_risk());
    let mappings = identity(&g);
    let hints = vec![StrategyFlow::new("h", "d1", "c1")];
    let synth = ConnectionSynthesizer::default();
    let first = synth.synthesize(&g, &mappings, Some(&hints)).unwrap();
    for _ in 0..5 {
        assert_eq!(synth.synthesize(&g, &mappings, Some(&hints)).unwrap(), first);
    }
    assert!(first
        .connections
        .iter()
        .all(|c| (0.0..=1.0).contains(&c.confidence)));
}

#[test]
fn hint_kind_defaults_to_admitting_rule() {
    let g = graph(&with_risk());
    let hints = vec![
        StrategyFlow::new("h1", "d1", "c1"),
        StrategyFlow {
            kind: Some(ConnectionKind::SignalWire),
            ..StrategyFlow::new("h2", "i1", "a1")
        },
    ];
    let out = ConnectionSynthesizer::default()
        .with_options(SynthesisOptions {
            validate: false,
            ..SynthesisOptions::default()
        })
        .synthesize(&g, &identity(&g), Some(&hints))
        .unwrap();
    let hinted: Vec<(&str, ConnectionKind)> = out
        .connections
        .iter()
        .filter(|c| c.origin == ConnectionOrigin::Hint)
        .map(|c| (c.target_component.as_str(), c.kind))
        .collect();
    // d1 is not admitted by any condition rule, so the hint falls back to control flow.
    assert_eq!(
        hinted,
        vec![
            ("c1", ConnectionKind::ControlFlow),
            ("a1", ConnectionKind::SignalWire)
        ]
    );
}
