//! Generic expected-value decision tree engine

mod evaluate;
mod node;

pub use evaluate::{EvaluatedGraph, NodeOutcome, PROBABILITY_TOLERANCE, evaluate, validate};
pub use node::{DecisionGraph, Node, Payoff};
