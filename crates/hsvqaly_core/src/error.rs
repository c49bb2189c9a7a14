use std::fmt;

use crate::model::NodeId;

/// Errors raised while validating or evaluating a decision graph
#[derive(Debug, Clone, PartialEq)]
pub enum GraphIntegrityError {
    /// The designated root is not present in the graph
    MissingRoot(NodeId),
    /// The designated root is a chance or terminal node
    RootNotDecision(NodeId),
    /// A node references a child id that does not exist
    MissingNode { parent: NodeId, child: NodeId },
    /// Chance node has a different number of children and probabilities
    ProbabilityCountMismatch {
        node: NodeId,
        children: usize,
        probabilities: usize,
    },
    NegativeProbability { node: NodeId, probability: f64 },
    /// Chance node probabilities do not sum to one within tolerance
    ProbabilitySum { node: NodeId, sum: f64 },
    /// A node was reached again while its own subtree was being evaluated
    Cycle { node: NodeId },
}

impl fmt::Display for GraphIntegrityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphIntegrityError::MissingRoot(id) => write!(f, "root node {id} not found"),
            GraphIntegrityError::RootNotDecision(id) => {
                write!(f, "root node {id} is not a decision node")
            }
            GraphIntegrityError::MissingNode { parent, child } => {
                write!(f, "node {parent} references missing child {child}")
            }
            GraphIntegrityError::ProbabilityCountMismatch {
                node,
                children,
                probabilities,
            } => write!(
                f,
                "chance node {node} has {children} children but {probabilities} probabilities"
            ),
            GraphIntegrityError::NegativeProbability { node, probability } => {
                write!(f, "chance node {node} has negative probability {probability}")
            }
            GraphIntegrityError::ProbabilitySum { node, sum } => {
                write!(f, "probabilities of chance node {node} sum to {sum}, expected 1")
            }
            GraphIntegrityError::Cycle { node } => write!(f, "cycle detected at node {node}"),
        }
    }
}

impl std::error::Error for GraphIntegrityError {}

/// Errors related to table and category lookups
#[derive(Debug, Clone, PartialEq)]
pub enum LookupError {
    AgeOutOfRange { age: f64, min: u8, max: u8 },
    UnknownSex(String),
    UnknownRecurrenceType(String),
    UnknownSequelae(String),
    UnknownComponent(String),
    /// Pre-sampled PSA matrix has fewer rows than the requested iteration
    MissingPsaRow { row: usize, rows: usize },
}

impl fmt::Display for LookupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LookupError::AgeOutOfRange { age, min, max } => {
                write!(f, "age {age} outside life table range [{min}, {max}]")
            }
            LookupError::UnknownSex(s) => write!(f, "unknown sex tag {s:?}"),
            LookupError::UnknownRecurrenceType(s) => write!(f, "unknown recurrence type {s:?}"),
            LookupError::UnknownSequelae(s) => write!(f, "unknown sequelae category {s:?}"),
            LookupError::UnknownComponent(s) => write!(f, "unknown loss component {s:?}"),
            LookupError::MissingPsaRow { row, rows } => {
                write!(f, "PSA row {row} requested but only {rows} rows were sampled")
            }
        }
    }
}

impl std::error::Error for LookupError {}

/// Errors related to parameter values and distribution fitting
#[derive(Debug, Clone, PartialEq)]
pub enum ParameterError {
    InvalidDistribution {
        distribution: &'static str,
        mean: f64,
        std_dev: f64,
        reason: &'static str,
    },
    InvalidValue {
        name: &'static str,
        value: f64,
        reason: &'static str,
    },
    ShapeMismatch {
        name: &'static str,
        expected: (usize, usize),
        found: (usize, usize),
    },
    /// Target correlation matrix could not be Cholesky-factored
    NotPositiveDefinite,
}

impl fmt::Display for ParameterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterError::InvalidDistribution {
                distribution,
                mean,
                std_dev,
                reason,
            } => write!(
                f,
                "invalid {distribution} parameters (mean={mean}, std_dev={std_dev}): {reason}"
            ),
            ParameterError::InvalidValue {
                name,
                value,
                reason,
            } => write!(f, "invalid value {value} for {name}: {reason}"),
            ParameterError::ShapeMismatch {
                name,
                expected,
                found,
            } => write!(
                f,
                "{name} has shape {}x{}, expected {}x{}",
                found.0, found.1, expected.0, expected.1
            ),
            ParameterError::NotPositiveDefinite => {
                write!(f, "correlation matrix is not positive definite")
            }
        }
    }
}

impl std::error::Error for ParameterError {}

/// Any failure that aborts a single PSA iteration
#[derive(Debug, Clone, PartialEq)]
pub enum ModelError {
    Graph(GraphIntegrityError),
    Lookup(LookupError),
    Parameter(ParameterError),
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelError::Graph(e) => write!(f, "{e}"),
            ModelError::Lookup(e) => write!(f, "{e}"),
            ModelError::Parameter(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for ModelError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ModelError::Graph(e) => Some(e),
            ModelError::Lookup(e) => Some(e),
            ModelError::Parameter(e) => Some(e),
        }
    }
}

impl From<GraphIntegrityError> for ModelError {
    fn from(err: GraphIntegrityError) -> Self {
        ModelError::Graph(err)
    }
}

impl From<LookupError> for ModelError {
    fn from(err: LookupError) -> Self {
        ModelError::Lookup(err)
    }
}

impl From<ParameterError> for ModelError {
    fn from(err: ParameterError) -> Self {
        ModelError::Parameter(err)
    }
}

/// A PSA iteration that failed, tagged with its seed
#[derive(Debug, Clone, PartialEq)]
pub struct IterationError {
    pub iteration: usize,
    pub error: ModelError,
}

impl fmt::Display for IterationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PSA iteration {} failed: {}", self.iteration, self.error)
    }
}

impl std::error::Error for IterationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// Failure of a whole PSA run
#[derive(Debug, Clone, PartialEq)]
pub enum PsaError {
    /// Inputs shared by every iteration could not be prepared
    Setup(ModelError),
    Iteration(IterationError),
}

impl fmt::Display for PsaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PsaError::Setup(e) => write!(f, "PSA setup failed: {e}"),
            PsaError::Iteration(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for PsaError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PsaError::Setup(e) => Some(e),
            PsaError::Iteration(e) => Some(e),
        }
    }
}

impl From<IterationError> for PsaError {
    fn from(err: IterationError) -> Self {
        PsaError::Iteration(err)
    }
}

pub type Result<T> = std::result::Result<T, ModelError>;
