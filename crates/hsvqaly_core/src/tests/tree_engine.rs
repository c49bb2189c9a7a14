//! Tests for the decision tree engine
//!
//! These tests verify:
//! - Expected values and component breakdowns of small hand-built trees
//! - Bit-for-bit determinism of repeated evaluation
//! - Integrity failures surface before any value is produced
//! - The designated root must be a decision node

use crate::error::GraphIntegrityError;
use crate::model::{Component, NodeId, components};
use crate::tree::{DecisionGraph, Node, Payoff, evaluate, validate};

fn id(name: &'static str) -> NodeId {
    NodeId::from_static(name)
}

/// d1 -> c0 [0.3, 0.7] -> t1 (10), t2 (20)
#[test]
fn test_three_node_scenario() {
    let graph = DecisionGraph::new("d1")
        .with("d1", Node::decision("c0"))
        .with("c0", Node::chance(Payoff::default(), ["t1", "t2"], vec![0.3, 0.7]))
        .with("t1", Node::terminal(Payoff::loss(10.0)))
        .with("t2", Node::terminal(Payoff::loss(20.0)));

    let evaluated = evaluate(&graph).unwrap();
    assert!((evaluated.value(&id("c0")).unwrap() - 17.0).abs() < 1e-12);
    assert!((evaluated.value(&id("d1")).unwrap() - 17.0).abs() < 1e-12);
}

fn layered_graph() -> DecisionGraph {
    DecisionGraph::new("d1")
        .with("d1", Node::decision("c0"))
        .with(
            "c0",
            Node::chance(
                Payoff::attributed(Component::Primary, 0.25),
                ["c1", "c2", "t3"],
                vec![0.2, 0.5, 0.3],
            ),
        )
        .with(
            "c1",
            Node::chance(
                Payoff::attributed(Component::AsepticMeningitis, 0.5),
                ["t1", "t2"],
                vec![0.4, 0.6],
            ),
        )
        .with("c2", Node::chance(Payoff::default(), ["t2"], vec![1.0]))
        .with(
            "t1",
            Node::terminal(Payoff::loss(3.0).with_components(components([
                (Component::Recurrence, 2.0),
                (Component::Psychosocial, 1.0),
            ]))),
        )
        .with("t2", Node::terminal(Payoff::attributed(Component::Psychosocial, 1.5)))
        .with("t3", Node::terminal(Payoff::default()))
}

#[test]
fn test_evaluation_is_deterministic() {
    let graph = layered_graph();
    let first = evaluate(&graph).unwrap();
    for _ in 0..10 {
        let again = evaluate(&graph).unwrap();
        assert_eq!(
            again.root_outcome().value.to_bits(),
            first.root_outcome().value.to_bits()
        );
        assert_eq!(again.root_outcome().components, first.root_outcome().components);
    }
}

#[test]
fn test_chance_value_is_base_plus_weighted_children() {
    let graph = layered_graph();
    let evaluated = evaluate(&graph).unwrap();

    for (node_id, node) in &graph.nodes {
        let Node::Chance {
            payoff,
            children,
            probabilities,
        } = node
        else {
            continue;
        };
        let expected = payoff.value
            + children
                .iter()
                .zip(probabilities)
                .map(|(child, p)| p * evaluated.value(child).unwrap())
                .sum::<f64>();
        let actual = evaluated.value(node_id).unwrap();
        assert!((actual - expected).abs() < 1e-9, "{node_id:?}: {actual} != {expected}");
    }
}

#[test]
fn test_components_add_up_to_value() {
    let evaluated = evaluate(&layered_graph()).unwrap();
    let root = evaluated.root_outcome();
    let breakdown: f64 = root.components.values().sum();
    assert!((breakdown - root.value).abs() < 1e-12);

    // 0.2 * 0.4 * 2.0 reaches the recurrence component only through t1
    assert!((root.components[&Component::Recurrence] - 0.16).abs() < 1e-12);
}

#[test]
fn test_single_certain_child_equals_substitution() {
    let evaluated = evaluate(&layered_graph()).unwrap();
    let c2 = evaluated.value(&id("c2")).unwrap();
    let t2 = evaluated.value(&id("t2")).unwrap();
    assert_eq!(c2, t2);
    assert_eq!(evaluated.components(&id("c2")), evaluated.components(&id("t2")));
}

#[test]
fn test_integrity_checked_before_evaluation() {
    let graph = layered_graph().with(
        "c1",
        Node::chance(Payoff::default(), ["t1", "t2"], vec![0.4, 0.6000011]),
    );
    assert!(matches!(
        validate(&graph),
        Err(GraphIntegrityError::ProbabilitySum { .. })
    ));
    assert!(matches!(
        evaluate(&graph),
        Err(GraphIntegrityError::ProbabilitySum { .. })
    ));
}

#[test]
fn test_unreachable_nodes_are_still_validated() {
    let graph = layered_graph().with("orphan", Node::decision("missing"));
    assert!(matches!(
        validate(&graph),
        Err(GraphIntegrityError::MissingNode { .. })
    ));
}

#[test]
fn test_root_must_be_a_decision_node() {
    let chance_root = DecisionGraph::new("c0")
        .with(
            "c0",
            Node::chance(Payoff::default(), ["t1", "t2"], vec![0.3, 0.7]),
        )
        .with("t1", Node::terminal(Payoff::loss(10.0)))
        .with("t2", Node::terminal(Payoff::loss(20.0)));
    assert_eq!(
        validate(&chance_root),
        Err(GraphIntegrityError::RootNotDecision(id("c0")))
    );
    assert!(evaluate(&chance_root).is_err());

    let terminal_root = DecisionGraph::new("t1").with("t1", Node::terminal(Payoff::loss(1.0)));
    assert!(matches!(
        evaluate(&terminal_root),
        Err(GraphIntegrityError::RootNotDecision(_))
    ));
}
