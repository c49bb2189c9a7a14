//! Backward induction over a decision graph
//!
//! Every chance node folds in the probability-weighted outcomes of its
//! children, decision nodes fold in their single successor, and terminals
//! return their own payoff. The whole graph is validated before any value is
//! computed, so an integrity failure never yields a partial evaluation.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::GraphIntegrityError;
use crate::model::{ComponentMap, NodeId, merge_weighted};

use super::node::{DecisionGraph, Node};

/// Allowed deviation of a chance node's probability sum from one
pub const PROBABILITY_TOLERANCE: f64 = 1e-6;

/// Accumulated outcome of a node: own payoff plus expected successor payoff
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeOutcome {
    pub cost: f64,
    pub value: f64,
    pub components: ComponentMap,
}

/// Outcome of every node in an evaluated graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluatedGraph {
    pub root: NodeId,
    pub outcomes: FxHashMap<NodeId, NodeOutcome>,
}

impl EvaluatedGraph {
    #[must_use]
    pub fn outcome(&self, id: &NodeId) -> Option<&NodeOutcome> {
        self.outcomes.get(id)
    }

    /// Accumulated expected value of a node
    #[must_use]
    pub fn value(&self, id: &NodeId) -> Option<f64> {
        self.outcomes.get(id).map(|o| o.value)
    }

    #[must_use]
    pub fn components(&self, id: &NodeId) -> Option<&ComponentMap> {
        self.outcomes.get(id).map(|o| &o.components)
    }

    /// Outcome of the root decision node
    #[must_use]
    pub fn root_outcome(&self) -> &NodeOutcome {
        // evaluate() always populates the root
        &self.outcomes[&self.root]
    }
}

/// Check every structural invariant of the graph
pub fn validate(graph: &DecisionGraph) -> Result<(), GraphIntegrityError> {
    match graph.nodes.get(&graph.root) {
        None => return Err(GraphIntegrityError::MissingRoot(graph.root.clone())),
        Some(Node::Decision { .. }) => {}
        Some(_) => return Err(GraphIntegrityError::RootNotDecision(graph.root.clone())),
    }

    // Sorted for a stable choice of reported error
    let mut ids: Vec<&NodeId> = graph.nodes.keys().collect();
    ids.sort();

    for id in ids {
        let node = &graph.nodes[id];
        for child in node.children() {
            if !graph.nodes.contains_key(child) {
                return Err(GraphIntegrityError::MissingNode {
                    parent: id.clone(),
                    child: child.clone(),
                });
            }
        }

        if let Node::Chance {
            children,
            probabilities,
            ..
        } = node
        {
            if children.len() != probabilities.len() {
                return Err(GraphIntegrityError::ProbabilityCountMismatch {
                    node: id.clone(),
                    children: children.len(),
                    probabilities: probabilities.len(),
                });
            }
            if let Some(&p) = probabilities.iter().find(|p| !(**p >= 0.0)) {
                return Err(GraphIntegrityError::NegativeProbability {
                    node: id.clone(),
                    probability: p,
                });
            }
            let sum: f64 = probabilities.iter().sum();
            if (sum - 1.0).abs() > PROBABILITY_TOLERANCE {
                return Err(GraphIntegrityError::ProbabilitySum {
                    node: id.clone(),
                    sum,
                });
            }
        }
    }

    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Visit {
    InProgress,
    Done,
}

struct Evaluator<'g> {
    graph: &'g DecisionGraph,
    state: FxHashMap<&'g NodeId, Visit>,
    outcomes: FxHashMap<NodeId, NodeOutcome>,
}

impl<'g> Evaluator<'g> {
    fn visit(&mut self, id: &'g NodeId) -> Result<(), GraphIntegrityError> {
        match self.state.get(id) {
            Some(Visit::Done) => return Ok(()),
            Some(Visit::InProgress) => {
                return Err(GraphIntegrityError::Cycle { node: id.clone() });
            }
            None => {}
        }
        self.state.insert(id, Visit::InProgress);

        let graph = self.graph;
        let node = graph
            .nodes
            .get(id)
            .ok_or_else(|| GraphIntegrityError::MissingRoot(id.clone()))?;

        for child in node.children() {
            self.visit(child)?;
        }

        let payoff = node.payoff();
        let mut outcome = NodeOutcome {
            cost: payoff.cost,
            value: payoff.value,
            components: payoff.components.clone(),
        };

        match node {
            Node::Terminal { .. } => {}
            Node::Decision { child, .. } => {
                self.fold_child(&mut outcome, child, 1.0);
            }
            Node::Chance {
                children,
                probabilities,
                ..
            } => {
                for (child, p) in children.iter().zip(probabilities) {
                    self.fold_child(&mut outcome, child, *p);
                }
            }
        }

        self.outcomes.insert(id.clone(), outcome);
        self.state.insert(id, Visit::Done);
        Ok(())
    }

    fn fold_child(&self, outcome: &mut NodeOutcome, child: &NodeId, weight: f64) {
        let child_outcome = &self.outcomes[child];
        outcome.cost += weight * child_outcome.cost;
        outcome.value += weight * child_outcome.value;
        merge_weighted(&mut outcome.components, &child_outcome.components, weight);
    }
}

/// Evaluate every node of the graph by backward induction.
///
/// Pure and deterministic: identical graphs produce bit-identical outcomes.
pub fn evaluate(graph: &DecisionGraph) -> Result<EvaluatedGraph, GraphIntegrityError> {
    validate(graph)?;

    let mut evaluator = Evaluator {
        graph,
        state: FxHashMap::default(),
        outcomes: FxHashMap::default(),
    };

    evaluator.visit(&graph.root)?;

    // Unreachable nodes are evaluated too so every id has an outcome
    let mut rest: Vec<&NodeId> = graph.nodes.keys().collect();
    rest.sort();
    for id in rest {
        evaluator.visit(id)?;
    }

    Ok(EvaluatedGraph {
        root: graph.root.clone(),
        outcomes: evaluator.outcomes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Component;
    use crate::tree::Payoff;

    fn three_node_graph() -> DecisionGraph {
        DecisionGraph::new("d1")
            .with("d1", Node::decision("c0"))
            .with(
                "c0",
                Node::chance(Payoff::default(), ["t1", "t2"], vec![0.3, 0.7]),
            )
            .with("t1", Node::terminal(Payoff::loss(10.0)))
            .with("t2", Node::terminal(Payoff::loss(20.0)))
    }

    #[test]
    fn test_minimal_tree_expected_value() {
        let evaluated = evaluate(&three_node_graph()).unwrap();

        let c0 = evaluated.value(&NodeId::from("c0")).unwrap();
        assert!((c0 - 17.0).abs() < 1e-12, "chance node value {c0}");
        assert!((evaluated.root_outcome().value - 17.0).abs() < 1e-12);
    }

    #[test]
    fn test_probability_sum_rejected() {
        let graph = three_node_graph().with(
            "c0",
            Node::chance(Payoff::default(), ["t1", "t2"], vec![0.3, 0.6]),
        );

        match evaluate(&graph) {
            Err(GraphIntegrityError::ProbabilitySum { node, sum }) => {
                assert_eq!(node, NodeId::from("c0"));
                assert!((sum - 0.9).abs() < 1e-12);
            }
            other => panic!("expected probability sum error, got {other:?}"),
        }
    }

    #[test]
    fn test_probability_within_tolerance_accepted() {
        let graph = three_node_graph().with(
            "c0",
            Node::chance(Payoff::default(), ["t1", "t2"], vec![0.3, 0.7 + 5e-7]),
        );
        assert!(evaluate(&graph).is_ok());
    }

    #[test]
    fn test_count_mismatch_rejected() {
        let graph = three_node_graph().with(
            "c0",
            Node::chance(Payoff::default(), ["t1", "t2"], vec![1.0]),
        );
        assert!(matches!(
            evaluate(&graph),
            Err(GraphIntegrityError::ProbabilityCountMismatch {
                children: 2,
                probabilities: 1,
                ..
            })
        ));
    }

    #[test]
    fn test_missing_child_rejected() {
        let mut graph = three_node_graph();
        graph.nodes.remove(&NodeId::from("t2"));
        assert!(matches!(
            evaluate(&graph),
            Err(GraphIntegrityError::MissingNode { .. })
        ));
    }

    #[test]
    fn test_negative_probability_rejected() {
        let graph = three_node_graph().with(
            "c0",
            Node::chance(Payoff::default(), ["t1", "t2"], vec![-0.5, 1.5]),
        );
        assert!(matches!(
            evaluate(&graph),
            Err(GraphIntegrityError::NegativeProbability { .. })
        ));
    }

    #[test]
    fn test_cycle_rejected() {
        let graph = DecisionGraph::new("d1")
            .with("d1", Node::decision("c0"))
            .with("c0", Node::chance(Payoff::default(), ["c1"], vec![1.0]))
            .with("c1", Node::chance(Payoff::default(), ["c0"], vec![1.0]));
        assert!(matches!(
            evaluate(&graph),
            Err(GraphIntegrityError::Cycle { .. })
        ));
    }

    #[test]
    fn test_components_merge_by_key() {
        let graph = DecisionGraph::new("d1")
            .with("d1", Node::decision("c0"))
            .with(
                "c0",
                Node::chance(
                    Payoff::attributed(Component::Primary, 1.0),
                    ["t1", "t2"],
                    vec![0.25, 0.75],
                ),
            )
            .with(
                "t1",
                Node::terminal(Payoff::attributed(Component::Psychosocial, 4.0)),
            )
            .with(
                "t2",
                Node::terminal(Payoff::attributed(Component::Primary, 2.0)),
            );

        let evaluated = evaluate(&graph).unwrap();
        let components = evaluated.components(&NodeId::from("d1")).unwrap();

        assert!((components[&Component::Primary] - 2.5).abs() < 1e-12);
        assert!((components[&Component::Psychosocial] - 1.0).abs() < 1e-12);
        assert!((evaluated.root_outcome().value - 3.5).abs() < 1e-12);
    }
}
