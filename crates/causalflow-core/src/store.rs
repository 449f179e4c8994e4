//! # Entity Store
//!
//! The canonical collections of nodes and edges, plus dataset metadata and
//! the trained flag. Pure data with mutation operations; no I/O.
//!
//! Every topology mutation clears the trained flag. A mutation that returns
//! an error leaves the store untouched.

use crate::layout;
use crate::primitives::{MIN_STATES, PRIOR_TOLERANCE};
use crate::{
    CausalFlowError, Distribution, Edge, EdgeId, Metadata, Node, NodeDefinition, NodeOrigin,
    Position,
};
use std::collections::{BTreeMap, BTreeSet};

/// Owner of node/edge identity and the trained flag.
///
/// Nodes and edges are kept in insertion order; placement and remote payloads
/// depend on it.
#[derive(Debug, Clone, Default)]
pub struct EntityStore {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    metadata: Option<Metadata>,
    trained: bool,
    /// Incremented whenever nodes, edges, priors or metadata change.
    revision: u64,
    /// Observed by the layout collaborator; incremented to request a relayout.
    layout_generation: u64,
}

impl EntityStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // -------------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------------

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.iter()
    }

    #[must_use]
    pub fn node(&self, name: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.name == name)
    }

    #[must_use]
    pub fn contains_node(&self, name: &str) -> bool {
        self.node(name).is_some()
    }

    #[must_use]
    pub fn contains_edge(&self, source: &str, target: &str) -> bool {
        self.edges
            .iter()
            .any(|e| e.source == source && e.target == target)
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    #[must_use]
    pub fn metadata(&self) -> Option<&Metadata> {
        self.metadata.as_ref()
    }

    #[must_use]
    pub fn is_trained(&self) -> bool {
        self.trained
    }

    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    #[must_use]
    pub fn layout_generation(&self) -> u64 {
        self.layout_generation
    }

    /// Edge list in the `{source, target}` form remote operations take.
    #[must_use]
    pub fn edge_list(&self) -> Vec<Edge> {
        self.edges.clone()
    }

    /// Node definitions for prior-based model construction.
    #[must_use]
    pub fn node_definitions(&self) -> Vec<NodeDefinition> {
        self.nodes.iter().map(NodeDefinition::from).collect()
    }

    #[must_use]
    pub fn has_manual_nodes(&self) -> bool {
        self.nodes.iter().any(Node::is_manual)
    }

    // -------------------------------------------------------------------------
    // Validation
    // -------------------------------------------------------------------------

    /// Check a manual node definition without inserting it.
    ///
    /// Order of checks: name, duplicate name, state count, duplicate states,
    /// prior.
    pub fn validate_definition(
        &self,
        name: &str,
        states: &[String],
        prior: Option<&Distribution>,
    ) -> Result<(), CausalFlowError> {
        if name.trim().is_empty() {
            return Err(CausalFlowError::EmptyName);
        }
        if self.contains_node(name) {
            return Err(CausalFlowError::DuplicateName(name.to_string()));
        }
        validate_states(name, states)?;
        if let Some(prior) = prior {
            validate_prior(states, prior)?;
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Mutations
    // -------------------------------------------------------------------------

    /// Replace the whole graph with one node per imported column.
    ///
    /// Columns are laid out on a grid; states come from `states_by_column`
    /// (a column with no entry gets no states). Edges are cleared and the
    /// trained flag is reset. The caller guarantees non-empty, unique columns.
    pub fn replace_all_from_import(
        &mut self,
        columns: &[String],
        states_by_column: &BTreeMap<String, Vec<String>>,
        row_count: usize,
    ) {
        self.nodes = columns
            .iter()
            .zip(layout::import_grid(columns.len()))
            .map(|(column, position)| {
                let states = states_by_column.get(column).cloned().unwrap_or_default();
                Node::new(column.clone(), states, NodeOrigin::Imported, position)
            })
            .collect();
        self.edges.clear();
        self.metadata = Some(Metadata {
            row_count,
            column_count: columns.len(),
            values: states_by_column.clone(),
        });
        self.invalidate();
    }

    /// Append a manually defined node at the next grid slot.
    pub fn add_manual_node(
        &mut self,
        name: &str,
        states: Vec<String>,
        prior: Option<Distribution>,
    ) -> Result<(), CausalFlowError> {
        self.validate_definition(name, &states, prior.as_ref())?;

        let position = layout::next_manual_slot(self.nodes.len());
        let mut node = Node::new(name, states, NodeOrigin::Manual, position);
        node.prior = prior;
        self.nodes.push(node);
        self.invalidate();
        Ok(())
    }

    /// Remove a node and every edge touching it.
    ///
    /// Returns `false` (and changes nothing) if the node does not exist.
    pub fn remove_node(&mut self, name: &str) -> bool {
        let before = self.nodes.len();
        self.nodes.retain(|n| n.name != name);
        if self.nodes.len() == before {
            return false;
        }
        self.edges.retain(|e| !e.touches(name));
        self.invalidate();
        true
    }

    /// Add `source -> target`.
    ///
    /// Adding an existing pair is idempotent but still counts as a topology
    /// edit. Returns whether a new edge was inserted.
    pub fn add_edge(&mut self, source: &str, target: &str) -> Result<bool, CausalFlowError> {
        let edge = Edge::new(source, target);
        self.check_edge(&edge)?;

        let inserted = if self.contains_edge(source, target) {
            false
        } else {
            self.edges.push(edge);
            true
        };
        self.invalidate();
        Ok(inserted)
    }

    /// Remove the edge with the given id. Returns whether one was removed.
    pub fn remove_edge(&mut self, id: &EdgeId) -> bool {
        let before = self.edges.len();
        self.edges.retain(|e| &e.id() != id);
        if self.edges.len() == before {
            return false;
        }
        self.invalidate();
        true
    }

    /// Bulk-replace the edge set with remotely learned edges.
    ///
    /// All edges are checked first; any self-loop or unknown endpoint rejects
    /// the whole batch. Duplicates are collapsed. Requests a relayout.
    pub fn replace_edges_from_learned(
        &mut self,
        learned: &[Edge],
    ) -> Result<usize, CausalFlowError> {
        for edge in learned {
            self.check_edge(edge)?;
        }

        let mut seen = BTreeSet::new();
        self.edges = learned
            .iter()
            .filter(|e| seen.insert((e.source.as_str(), e.target.as_str())))
            .cloned()
            .collect();
        self.invalidate();
        self.request_layout();
        Ok(self.edges.len())
    }

    /// Remove all edges.
    pub fn clear_edges(&mut self) {
        self.edges.clear();
        self.invalidate();
    }

    /// Replace a node's prior. Prior-only change: the trained flag is kept.
    pub fn update_prior(
        &mut self,
        name: &str,
        prior: Option<Distribution>,
    ) -> Result<(), CausalFlowError> {
        let node = self
            .nodes
            .iter_mut()
            .find(|n| n.name == name)
            .ok_or_else(|| CausalFlowError::UnknownNode(name.to_string()))?;
        if let Some(prior) = prior.as_ref() {
            validate_prior(&node.states, prior)?;
        }
        node.prior = prior;
        self.revision = self.revision.saturating_add(1);
        Ok(())
    }

    /// Store a position written by the layout collaborator.
    pub fn move_node(&mut self, name: &str, position: Position) -> Result<(), CausalFlowError> {
        let node = self
            .nodes
            .iter_mut()
            .find(|n| n.name == name)
            .ok_or_else(|| CausalFlowError::UnknownNode(name.to_string()))?;
        node.position = position;
        Ok(())
    }

    /// Ask the layout collaborator to recompute positions.
    pub fn request_layout(&mut self) {
        self.layout_generation = self.layout_generation.saturating_add(1);
    }

    /// Set the trained flag.
    ///
    /// Setting it true requires a non-empty edge list; acyclicity must have
    /// been verified remotely by the caller.
    pub fn set_trained(&mut self, trained: bool) -> Result<(), CausalFlowError> {
        if trained && self.edges.is_empty() {
            return Err(CausalFlowError::EmptyStructure);
        }
        self.trained = trained;
        Ok(())
    }

    /// Reset to the initial empty state.
    ///
    /// The layout counter keeps counting so observers never see it go back.
    pub fn clear_all(&mut self) {
        let layout_generation = self.layout_generation;
        let revision = self.revision.saturating_add(1);
        *self = Self {
            revision,
            layout_generation,
            ..Self::default()
        };
    }

    fn check_edge(&self, edge: &Edge) -> Result<(), CausalFlowError> {
        if edge.is_self_loop() {
            return Err(CausalFlowError::SelfLoop(edge.source.clone()));
        }
        for end in [&edge.source, &edge.target] {
            if !self.contains_node(end) {
                return Err(CausalFlowError::UnknownNode(end.clone()));
            }
        }
        Ok(())
    }

    fn invalidate(&mut self) {
        self.trained = false;
        self.revision = self.revision.saturating_add(1);
    }
}

/// At least `MIN_STATES` labels, no duplicates.
fn validate_states(name: &str, states: &[String]) -> Result<(), CausalFlowError> {
    if states.len() < MIN_STATES {
        return Err(CausalFlowError::InvalidStateCount {
            name: name.to_string(),
            count: states.len(),
        });
    }
    let mut seen = BTreeSet::new();
    for state in states {
        if !seen.insert(state.as_str()) {
            return Err(CausalFlowError::DuplicateState {
                name: name.to_string(),
                state: state.clone(),
            });
        }
    }
    Ok(())
}

/// Complete over `states`, each value in [0, 1], sum within tolerance of 1.
fn validate_prior(states: &[String], prior: &Distribution) -> Result<(), CausalFlowError> {
    if !prior.covers_exactly(states) {
        return Err(CausalFlowError::InvalidPrior(format!(
            "prior must assign a probability to exactly the states [{}]",
            states.join(", ")
        )));
    }
    if let Some((state, p)) = prior.iter().find(|(_, p)| !(0.0..=1.0).contains(p)) {
        return Err(CausalFlowError::InvalidPrior(format!(
            "probability {p} for \"{state}\" is outside [0, 1]"
        )));
    }
    if !prior.is_normalized(PRIOR_TOLERANCE) {
        return Err(CausalFlowError::InvalidPrior(format!(
            "probabilities sum to {:.3}, expected 1.0",
            prior.total()
        )));
    }
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================
