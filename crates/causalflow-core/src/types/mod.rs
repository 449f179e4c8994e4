//! # Core Type Definitions
//!
//! This module contains the closed record types shared by every part of the
//! workbench core:
//! - Graph entities (`Node`, `Edge`, `EdgeId`, `Position`, `NodeOrigin`)
//! - Probability mappings (`Distribution`)
//! - Imported dataset summary (`Metadata`)
//! - Remote-operation selectors (`Scoring`, `Estimator`)
//! - Payload views (`NodeDefinition`)
//! - Error types (`CausalFlowError`)
//!
//! Node names are the only node identifiers. Edges are identified by their
//! ordered `(source, target)` pair.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// =============================================================================
// LAYOUT POSITION
// =============================================================================

/// 2D canvas position of a node.
///
/// Owned by the layout collaborator; the store only keeps the value.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    /// Create a new position.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

// =============================================================================
// NODE
// =============================================================================

/// Where a node's definition came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeOrigin {
    /// Created from a column of an imported dataset.
    Imported,
    /// Defined by hand on the canvas.
    Manual,
}

/// A discrete random variable.
///
/// The current posterior is not stored here; it lives in the session's
/// distribution map (`Session::posterior`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Unique name; the node's only identifier.
    pub name: String,
    /// Ordered discrete state labels.
    pub states: Vec<String>,
    pub origin: NodeOrigin,
    /// User-supplied prior, if any.
    pub prior: Option<Distribution>,
    pub position: Position,
}

impl Node {
    /// Create a node with no prior.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        states: Vec<String>,
        origin: NodeOrigin,
        position: Position,
    ) -> Self {
        Self {
            name: name.into(),
            states,
            origin,
            prior: None,
            position,
        }
    }

    /// Check whether `state` is one of this node's labels.
    #[must_use]
    pub fn has_state(&self, state: &str) -> bool {
        self.states.iter().any(|s| s == state)
    }

    /// A node with fewer than 2 states cannot take part in training.
    #[must_use]
    pub fn is_trainable(&self) -> bool {
        self.states.len() >= crate::primitives::MIN_STATES
    }

    /// Check if the node was defined by hand.
    #[must_use]
    pub fn is_manual(&self) -> bool {
        self.origin == NodeOrigin::Manual
    }
}

// =============================================================================
// EDGE
// =============================================================================

/// Synthesized edge identifier: `"source-target"`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EdgeId(pub String);

impl EdgeId {
    /// Get the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EdgeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A directed dependency `source -> target`.
///
/// Serializes as `{"source": .., "target": ..}`, the shape every remote
/// operation expects.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Edge {
    pub source: String,
    pub target: String,
}

impl Edge {
    /// Create a new edge.
    #[must_use]
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }

    /// The synthesized id, `"source-target"`.
    #[must_use]
    pub fn id(&self) -> EdgeId {
        EdgeId(format!("{}-{}", self.source, self.target))
    }

    /// Check whether the edge touches `name` at either end.
    #[must_use]
    pub fn touches(&self, name: &str) -> bool {
        self.source == name || self.target == name
    }

    #[must_use]
    pub fn is_self_loop(&self) -> bool {
        self.source == self.target
    }
}

// =============================================================================
// DISTRIBUTION
// =============================================================================

/// Probability mapping `state -> probability`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Distribution(pub BTreeMap<String, f64>);

impl Distribution {
    /// Create an empty distribution.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Probability assigned to `state`, if present.
    #[must_use]
    pub fn get(&self, state: &str) -> Option<f64> {
        self.0.get(state).copied()
    }

    /// Sum of all probabilities.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.0.values().sum()
    }

    /// Number of states with an entry.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Check the probabilities sum to 1 within `tolerance` (absolute).
    #[must_use]
    pub fn is_normalized(&self, tolerance: f64) -> bool {
        (self.total() - 1.0).abs() <= tolerance
    }

    /// Check the keys are exactly `states`.
    #[must_use]
    pub fn covers_exactly(&self, states: &[String]) -> bool {
        self.0.len() == states.len() && states.iter().all(|s| self.0.contains_key(s))
    }

    /// Check this is a probability mapping over exactly `states`: every value
    /// in [0, 1], summing to 1 within `tolerance`.
    #[must_use]
    pub fn is_valid_over(&self, states: &[String], tolerance: f64) -> bool {
        self.covers_exactly(states)
            && self.0.values().all(|p| (0.0..=1.0).contains(p))
            && self.is_normalized(tolerance)
    }

    /// Iterate `(state, probability)` pairs in state order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

impl<S: Into<String>> FromIterator<(S, f64)> for Distribution {
    fn from_iter<I: IntoIterator<Item = (S, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

// =============================================================================
// METADATA
// =============================================================================

/// Summary of an imported dataset.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Metadata {
    pub row_count: usize,
    pub column_count: usize,
    /// Per-column discrete value sets, as observed in the data.
    pub values: BTreeMap<String, Vec<String>>,
}

// =============================================================================
// REMOTE OPERATION SELECTORS
// =============================================================================

/// Scoring function used by remote structure learning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scoring {
    #[default]
    K2,
    Bdeu,
}

impl Scoring {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Scoring::K2 => "k2",
            Scoring::Bdeu => "bdeu",
        }
    }
}

impl FromStr for Scoring {
    type Err = CausalFlowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "k2" => Ok(Scoring::K2),
            "bdeu" => Ok(Scoring::Bdeu),
            other => Err(CausalFlowError::UnknownOption(other.to_string())),
        }
    }
}

impl fmt::Display for Scoring {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameter estimator used by remote parameter learning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Estimator {
    #[default]
    Mle,
    Bayes,
}

impl Estimator {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Estimator::Mle => "mle",
            Estimator::Bayes => "bayes",
        }
    }
}

impl FromStr for Estimator {
    type Err = CausalFlowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mle" => Ok(Estimator::Mle),
            "bayes" => Ok(Estimator::Bayes),
            other => Err(CausalFlowError::UnknownOption(other.to_string())),
        }
    }
}

impl fmt::Display for Estimator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// PAYLOAD VIEWS
// =============================================================================

/// Node definition as sent to prior-based model construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDefinition {
    pub name: String,
    pub states: Vec<String>,
    #[serde(default)]
    pub prior: Option<Distribution>,
}

impl From<&Node> for NodeDefinition {
    fn from(node: &Node) -> Self {
        Self {
            name: node.name.clone(),
            states: node.states.clone(),
            prior: node.prior.clone(),
        }
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors raised by the workbench core.
///
/// A returned error guarantees the state was not mutated.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CausalFlowError {
    /// A node with this name already exists.
    #[error("Node \"{0}\" already exists")]
    DuplicateName(String),

    /// Node names must be non-empty.
    #[error("Node name is required")]
    EmptyName,

    /// A node needs at least 2 states.
    #[error("Node \"{name}\" needs at least 2 states, got {count}")]
    InvalidStateCount { name: String, count: usize },

    /// A state label appears twice.
    #[error("Node \"{name}\" lists state \"{state}\" more than once")]
    DuplicateState { name: String, state: String },

    /// The prior is incomplete, has foreign states, or does not sum to 1.
    #[error("Invalid prior: {0}")]
    InvalidPrior(String),

    /// An edge from a node to itself.
    #[error("Self-loop on \"{0}\" is not allowed")]
    SelfLoop(String),

    /// The named node does not exist.
    #[error("Unknown node \"{0}\"")]
    UnknownNode(String),

    /// The node exists but has no such state.
    #[error("Node \"{node}\" has no state \"{state}\"")]
    UnknownState { node: String, state: String },

    /// The action is not legal in the current mode.
    #[error("{action} is not allowed while {mode}")]
    ActionNotPermitted {
        action: crate::mode::Action,
        mode: crate::mode::Mode,
    },

    /// Training requires at least one edge.
    #[error("Please add edges first")]
    EmptyStructure,

    /// Some nodes cannot take part in training.
    #[error("Nodes need at least 2 states to be trained: {0}")]
    TooFewStates(String),

    /// The operation needs imported data.
    #[error("Please upload data first")]
    MissingData,

    /// A training pipeline is already running.
    #[error("A training run is already in progress")]
    PipelineBusy,

    /// Illegal training-pipeline transition.
    #[error("Invalid pipeline transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    /// The graph changed while a pipeline was waiting on the server.
    #[error("The graph changed during training; train again")]
    StaleGraph,

    /// Unrecognized option value (scoring, estimator).
    #[error("Unknown option \"{0}\"")]
    UnknownOption(String),
}

// =============================================================================
// TESTS
// =============================================================================
