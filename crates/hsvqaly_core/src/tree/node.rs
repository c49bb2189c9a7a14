//! Decision graph node types
//!
//! A graph is a flat map from `NodeId` to `Node` plus a designated root. Nodes
//! reference their successors by id, so builders can wire shared subtrees
//! (HSV-2 routes two chance nodes into the recurrent-meningitis split).

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::model::{Component, ComponentMap, NodeId};

/// A node's own contribution, before any successor is folded in
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Payoff {
    pub cost: f64,
    /// QALY loss attributed to reaching this node
    pub value: f64,
    /// Breakdown of `value` by disutility category (reporting only)
    #[serde(default)]
    pub components: ComponentMap,
}

impl Payoff {
    #[must_use]
    pub fn loss(value: f64) -> Self {
        Self {
            value,
            ..Default::default()
        }
    }

    /// Loss whose whole value is attributed to a single component
    #[must_use]
    pub fn attributed(component: Component, value: f64) -> Self {
        let mut components = ComponentMap::new();
        components.insert(component, value);
        Self {
            cost: 0.0,
            value,
            components,
        }
    }

    #[must_use]
    pub fn with_components(mut self, components: ComponentMap) -> Self {
        self.components = components;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Node {
    /// Degenerate decision: "model this cohort", always one successor
    Decision { payoff: Payoff, child: NodeId },
    Chance {
        payoff: Payoff,
        children: Vec<NodeId>,
        probabilities: Vec<f64>,
    },
    Terminal { payoff: Payoff },
}

impl Node {
    #[must_use]
    pub fn decision(child: impl Into<NodeId>) -> Self {
        Node::Decision {
            payoff: Payoff::default(),
            child: child.into(),
        }
    }

    #[must_use]
    pub fn chance<I, C>(payoff: Payoff, children: I, probabilities: Vec<f64>) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<NodeId>,
    {
        Node::Chance {
            payoff,
            children: children.into_iter().map(Into::into).collect(),
            probabilities,
        }
    }

    #[must_use]
    pub fn terminal(payoff: Payoff) -> Self {
        Node::Terminal { payoff }
    }

    #[must_use]
    pub fn payoff(&self) -> &Payoff {
        match self {
            Node::Decision { payoff, .. }
            | Node::Chance { payoff, .. }
            | Node::Terminal { payoff } => payoff,
        }
    }

    /// Successor ids in branch order
    #[must_use]
    pub fn children(&self) -> &[NodeId] {
        match self {
            Node::Decision { child, .. } => std::slice::from_ref(child),
            Node::Chance { children, .. } => children,
            Node::Terminal { .. } => &[],
        }
    }
}

/// Expected-value decision graph rooted at a single decision node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionGraph {
    pub root: NodeId,
    pub nodes: FxHashMap<NodeId, Node>,
}

impl DecisionGraph {
    #[must_use]
    pub fn new(root: impl Into<NodeId>) -> Self {
        Self {
            root: root.into(),
            nodes: FxHashMap::default(),
        }
    }

    /// Insert or replace a node, builder style
    #[must_use]
    pub fn with(mut self, id: impl Into<NodeId>, node: Node) -> Self {
        self.nodes.insert(id.into(), node);
        self
    }

    pub fn insert(&mut self, id: impl Into<NodeId>, node: Node) {
        self.nodes.insert(id.into(), node);
    }

    #[must_use]
    pub fn get(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
