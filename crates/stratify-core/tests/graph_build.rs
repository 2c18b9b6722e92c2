use serde_json::json;
use stratify_core::{
    ComponentType, DependencyGraphBuilder, DependencyKind, EdgeOrigin, InterpretError, RuleTable,
    StrategyComponent,
};

fn c(id: &str, t: ComponentType, subtype: &str) -> StrategyComponent {
    StrategyComponent::new(id, t, subtype)
}

fn scenario_a() -> Vec<StrategyComponent> {
    vec![
        c("d1", ComponentType::DataSource, "ohlcv"),
        c("i1", ComponentType::Indicator, "rsi"),
        c("c1", ComponentType::Condition, "rsi_oversold"),
        c("a1", ComponentType::Action, "buy"),
    ]
}

// ── Ordering and levels ─────────────────────────────────────────────────

#[test]
fn scenario_a_linear_chain() {
    let build = DependencyGraphBuilder::default().build(&scenario_a()).unwrap();
    let g = build.graph;
    assert!(!g.has_cycles);
    assert_eq!(g.execution_order, vec!["d1", "i1", "c1", "a1"]);

    let kinds: Vec<DependencyKind> = g.edges.iter().map(|e| e.kind).collect();
    assert_eq!(
        kinds,
        vec![
            DependencyKind::DataFlow,
            DependencyKind::SignalFlow,
            DependencyKind::TriggerFlow
        ]
    );
    for (i, id) in ["d1", "i1", "c1", "a1"].iter().enumerate() {
        assert_eq!(g.level_of(id), Some(i));
        assert!(g.node(id).unwrap().resolved);
    }
}

#[test]
fn input_order_does_not_change_execution_order() {
    let mut components = scenario_a();
    components.reverse();
    let g = DependencyGraphBuilder::default()
        .build(&components)
        .unwrap()
        .graph;
    assert_eq!(g.execution_order, vec!["d1", "i1", "c1", "a1"]);
}

#[test]
fn diamond_shares_a_level() {
    let components = vec![
        c("d1", ComponentType::DataSource, "ohlcv"),
        c("fast", ComponentType::Indicator, "ema"),
        c("slow", ComponentType::Indicator, "sma"),
        c("cross", ComponentType::Condition, "crossover")
            .with_dependency("fast")
            .with_dependency("slow"),
    ];
    let g = DependencyGraphBuilder::default()
        .build(&components)
        .unwrap()
        .graph;
    assert_eq!(g.parallel_groups(), vec![&["fast".to_string(), "slow".to_string()][..]]);
    assert_eq!(g.level_of("cross"), Some(2));
    assert_eq!(g.transitive_dependents_of("d1"), vec!["fast", "slow", "cross"]);
    let deps: Vec<&str> = g
        .dependencies_of("cross")
        .iter()
        .map(|n| n.component_id.as_str())
        .collect();
    assert_eq!(deps, vec!["fast", "slow"]);
}

// ── Cycles ──────────────────────────────────────────────────────────────

#[test]
fn scenario_b_mutual_dependency() {
    let components = vec![
        c("X", ComponentType::Indicator, "ema").with_dependency("Y"),
        c("Y", ComponentType::Indicator, "sma").with_dependency("X"),
    ];
    let g = DependencyGraphBuilder::default()
        .build(&components)
        .unwrap()
        .graph;
    assert!(g.has_cycles);
    assert_eq!(g.cycles, vec![vec!["X", "Y", "X"]]);
    assert!(g.execution_order.is_empty());
    assert!(g.nodes.values().all(|n| !n.resolved));
}

#[test]
fn cycle_in_one_component_of_a_disconnected_graph_is_found() {
    let components = vec![
        c("d1", ComponentType::DataSource, "ohlcv"),
        c("i1", ComponentType::Indicator, "rsi"),
        c("l1", ComponentType::Logic, "and").with_dependency("c1"),
        c("c1", ComponentType::Condition, "gate").with_dependency("l1"),
    ];
    let g = DependencyGraphBuilder::default()
        .build(&components)
        .unwrap()
        .graph;
    assert!(g.has_cycles);
    let cycle = &g.cycles[0];
    assert_eq!(cycle.first(), cycle.last());
    assert!(cycle.contains(&"l1".to_string()) && cycle.contains(&"c1".to_string()));
}

// ── Depth cap ───────────────────────────────────────────────────────────

#[test]
fn depth_cap_is_a_hard_error() {
    let err = DependencyGraphBuilder::default()
        .with_max_level_iterations(2)
        .build(&scenario_a())
        .unwrap_err();
    assert!(err
        .to_string()
        .contains("dependency resolution exceeded maximum depth"));
    match err {
        InterpretError::UnresolvedAfterDepthCap { unresolved, cap } => {
            assert_eq!(cap, 2);
            assert_eq!(unresolved, vec!["a1"]);
        }
        other => panic!("unexpected error {other:?}"),
    }
}

// ── Dependency validation ───────────────────────────────────────────────

#[test]
fn missing_required_dependency_is_reported() {
    let b = DependencyGraphBuilder::default();
    let components = vec![
        c("d1", ComponentType::DataSource, "ohlcv"),
        c("a1", ComponentType::Action, "buy"),
    ];
    let g = b.build(&components).unwrap().graph;
    let report = b.validate(&g);
    assert_eq!(report.missing.len(), 1);
    assert_eq!(report.missing[0].component_id, "a1");
    assert_eq!(report.missing[0].rule, "action.trigger");
    let err = report.ensure_complete().unwrap_err();
    assert_eq!(err.context()["rule"], "action.trigger");
}

#[test]
fn substituted_rule_table_changes_inference() {
    let rules = RuleTable::standard().with_rules(ComponentType::Indicator, Vec::new());
    let b = DependencyGraphBuilder::new(rules, Default::default());
    let g = b.build(&scenario_a()[..2]).unwrap().graph;
    assert!(g.edges.is_empty());
    assert!(b.validate(&g).missing.is_empty());
}

#[test]
fn explicit_edges_precede_inferred_ones() {
    let components = vec![
        c("d1", ComponentType::DataSource, "ohlcv"),
        c("t1", ComponentType::Timing, "session"),
        c("c1", ComponentType::Condition, "entry")
            .with_dependency("t1")
            .with_param("reference", json!("rsi")),
        c("i1", ComponentType::Indicator, "rsi"),
    ];
    let g = DependencyGraphBuilder::default()
        .build(&components)
        .unwrap()
        .graph;
    let into_c1: Vec<(&str, EdgeOrigin)> = g
        .edges
        .iter()
        .filter(|e| e.to == "c1")
        .map(|e| (e.from.as_str(), e.origin))
        .collect();
    assert_eq!(
        into_c1,
        vec![("t1", EdgeOrigin::Explicit), ("i1", EdgeOrigin::Inferred)]
    );
}
