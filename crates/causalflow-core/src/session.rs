//! # Session Module
//!
//! The single mutable resource of the workbench: the Entity Store, the
//! Evidence Synchronizer, the training pipeline and the loading flags.
//!
//! Store mutations go through the session so that leaving trained mode always
//! invalidates evidence and distributions in the same step. A concurrent host
//! must serialize access (one mutex around the whole session); every method
//! here is a complete read-then-write with no suspension point.

use crate::evidence::{
    DistributionMap, EvidenceMap, EvidenceSynchronizer, InferenceOutcome, InferenceTicket,
    SequenceToken,
};
use crate::mode::Mode;
use crate::pipeline::{PipelineKind, PipelineState, TrainingPipeline, TrainingPlan};
use crate::primitives::PRIOR_TOLERANCE;
use crate::store::EntityStore;
use crate::{CausalFlowError, Distribution, Edge, EdgeId, Estimator, Position};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Remote work that shows a loading indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activity {
    Uploading,
    LearningStructure,
    Training,
    Inferring,
}

/// Graph, evidence and pipeline state behind one owner.
#[derive(Debug, Clone, Default)]
pub struct Session {
    store: EntityStore,
    sync: EvidenceSynchronizer,
    pipeline: TrainingPipeline,
    /// Activity -> number of outstanding operations.
    busy: BTreeMap<Activity, usize>,
}

impl Session {
    /// Create a new empty session.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // -------------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------------

    #[must_use]
    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    #[must_use]
    pub fn mode(&self) -> Mode {
        Mode::of(&self.store)
    }

    #[must_use]
    pub fn evidence(&self) -> &EvidenceMap {
        self.sync.evidence()
    }

    #[must_use]
    pub fn distributions(&self) -> &DistributionMap {
        self.sync.distributions()
    }

    /// Current posterior of `node`, once inference has run.
    #[must_use]
    pub fn posterior(&self, node: &str) -> Option<&Distribution> {
        self.sync.distribution(node)
    }

    #[must_use]
    pub fn synchronizer(&self) -> &EvidenceSynchronizer {
        &self.sync
    }

    #[must_use]
    pub fn pipeline_state(&self) -> &PipelineState {
        self.pipeline.state()
    }

    #[must_use]
    pub fn is_busy(&self, activity: Activity) -> bool {
        self.busy.get(&activity).is_some_and(|n| *n > 0)
    }

    // -------------------------------------------------------------------------
    // Loading flags
    // -------------------------------------------------------------------------

    pub fn begin_activity(&mut self, activity: Activity) {
        let count = self.busy.entry(activity).or_default();
        *count = count.saturating_add(1);
    }

    pub fn end_activity(&mut self, activity: Activity) {
        if let Some(count) = self.busy.get_mut(&activity) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                self.busy.remove(&activity);
            }
        }
    }

    // -------------------------------------------------------------------------
    // Topology mutations
    // -------------------------------------------------------------------------

    pub fn replace_all_from_import(
        &mut self,
        columns: &[String],
        states_by_column: &BTreeMap<String, Vec<String>>,
        row_count: usize,
    ) {
        self.store
            .replace_all_from_import(columns, states_by_column, row_count);
        self.sync.invalidate();
    }

    pub fn add_manual_node(
        &mut self,
        name: &str,
        states: Vec<String>,
        prior: Option<Distribution>,
    ) -> Result<(), CausalFlowError> {
        self.store.add_manual_node(name, states, prior)?;
        self.sync.invalidate();
        Ok(())
    }

    pub fn remove_node(&mut self, name: &str) -> bool {
        let removed = self.store.remove_node(name);
        if removed {
            self.sync.invalidate();
        }
        removed
    }

    pub fn add_edge(&mut self, source: &str, target: &str) -> Result<bool, CausalFlowError> {
        let inserted = self.store.add_edge(source, target)?;
        self.sync.invalidate();
        Ok(inserted)
    }

    pub fn remove_edge(&mut self, id: &EdgeId) -> bool {
        let removed = self.store.remove_edge(id);
        if removed {
            self.sync.invalidate();
        }
        removed
    }

    pub fn replace_edges_from_learned(&mut self, edges: &[Edge]) -> Result<usize, CausalFlowError> {
        let applied = self.store.replace_edges_from_learned(edges)?;
        self.sync.invalidate();
        Ok(applied)
    }

    pub fn clear_edges(&mut self) {
        self.store.clear_edges();
        self.sync.invalidate();
    }

    /// Reset the graph, metadata, evidence and distributions.
    pub fn clear_all(&mut self) {
        self.store.clear_all();
        self.sync.invalidate();
        if !self.pipeline.state().is_running() {
            self.pipeline.reset();
        }
    }

    // -------------------------------------------------------------------------
    // Non-topology mutations
    // -------------------------------------------------------------------------

    pub fn update_prior(
        &mut self,
        name: &str,
        prior: Option<Distribution>,
    ) -> Result<(), CausalFlowError> {
        self.store.update_prior(name, prior)
    }

    pub fn move_node(&mut self, name: &str, position: Position) -> Result<(), CausalFlowError> {
        self.store.move_node(name, position)
    }

    pub fn request_layout(&mut self) {
        self.store.request_layout();
    }

    /// Set the trained flag.
    ///
    /// Entering trained mode returns the baseline (empty-evidence) ticket.
    /// Leaving it invalidates evidence and distributions.
    pub fn set_trained(
        &mut self,
        trained: bool,
    ) -> Result<Option<InferenceTicket>, CausalFlowError> {
        let was_trained = self.store.is_trained();
        self.store.set_trained(trained)?;
        match (was_trained, trained) {
            (false, true) => {
                self.sync.invalidate();
                Ok(Some(self.sync.issue()))
            }
            (true, false) => {
                self.sync.invalidate();
                Ok(None)
            }
            _ => Ok(None),
        }
    }

    // -------------------------------------------------------------------------
    // Evidence
    // -------------------------------------------------------------------------

    /// Toggle `node = state` while trained.
    ///
    /// Returns `Ok(None)` outside trained mode (no-op). Unknown nodes or states
    /// are rejected.
    pub fn toggle_evidence(
        &mut self,
        node: &str,
        state: &str,
    ) -> Result<Option<InferenceTicket>, CausalFlowError> {
        if self.mode() != Mode::Trained {
            return Ok(None);
        }
        let entry = self
            .store
            .node(node)
            .ok_or_else(|| CausalFlowError::UnknownNode(node.to_string()))?;
        if !entry.has_state(state) {
            return Err(CausalFlowError::UnknownState {
                node: node.to_string(),
                state: state.to_string(),
            });
        }
        Ok(Some(self.sync.toggle(node, state)))
    }

    /// Drop all evidence; while trained, returns a baseline ticket.
    pub fn clear_evidence(&mut self) -> Option<InferenceTicket> {
        if self.mode() != Mode::Trained {
            return None;
        }
        Some(self.sync.clear_evidence())
    }

    #[must_use]
    pub fn is_latest(&self, token: SequenceToken) -> bool {
        self.sync.is_latest(token)
    }

    /// Apply an inference response if it is still the latest.
    ///
    /// Entries for unknown nodes, or that are not a distribution over the
    /// node's states, are dropped.
    pub fn accept_inference(
        &mut self,
        token: SequenceToken,
        distributions: DistributionMap,
    ) -> InferenceOutcome {
        let store = &self.store;
        self.sync.accept(token, distributions, |name, dist| {
            store
                .node(name)
                .is_some_and(|node| dist.is_valid_over(&node.states, PRIOR_TOLERANCE))
        })
    }

    // -------------------------------------------------------------------------
    // Training pipeline
    // -------------------------------------------------------------------------

    /// Structure learning runs on the imported dataset.
    pub fn check_structure_learning(&self) -> Result<(), CausalFlowError> {
        if self.store.metadata().is_none() {
            return Err(CausalFlowError::MissingData);
        }
        Ok(())
    }

    /// Route for a model build: data training when the graph came entirely
    /// from an imported dataset, prior-based construction otherwise.
    #[must_use]
    pub fn preferred_pipeline(&self, estimator: Estimator) -> PipelineKind {
        if self.store.metadata().is_some() && !self.store.has_manual_nodes() {
            PipelineKind::FromData { estimator }
        } else {
            PipelineKind::FromPriors
        }
    }

    /// Start a run: check local preconditions and capture the plan.
    ///
    /// A failed precondition leaves the pipeline `Rejected` and the graph
    /// untouched.
    pub fn begin_training(&mut self, kind: PipelineKind) -> Result<TrainingPlan, CausalFlowError> {
        self.pipeline.begin()?;
        match self.plan(kind) {
            Ok(plan) => Ok(plan),
            Err(e) => {
                self.pipeline.reject(e.to_string())?;
                Err(e)
            }
        }
    }

    /// Remote validation accepted the structure.
    pub fn training_validated(&mut self) -> Result<(), CausalFlowError> {
        self.pipeline.validated()
    }

    /// Remote validation rejected the structure.
    pub fn reject_training(&mut self, reason: impl Into<String>) -> Result<(), CausalFlowError> {
        self.pipeline.reject(reason)
    }

    /// A remote step failed.
    pub fn fail_training(&mut self, reason: impl Into<String>) -> Result<(), CausalFlowError> {
        self.pipeline.fail(reason)
    }

    /// Mark the model trained, unless the graph changed since `plan` was taken.
    ///
    /// Returns the baseline ticket issued on entering trained mode.
    pub fn finish_training(
        &mut self,
        plan: &TrainingPlan,
    ) -> Result<Option<InferenceTicket>, CausalFlowError> {
        if self.store.revision() != plan.revision {
            let err = CausalFlowError::StaleGraph;
            self.pipeline.fail(err.to_string())?;
            return Err(err);
        }
        let ticket = match self.set_trained(true) {
            Ok(ticket) => ticket,
            Err(e) => {
                self.pipeline.fail(e.to_string())?;
                return Err(e);
            }
        };
        self.pipeline.finish()?;
        Ok(ticket)
    }

    fn plan(&self, kind: PipelineKind) -> Result<TrainingPlan, CausalFlowError> {
        let edges = self.store.edge_list();
        if edges.is_empty() {
            return Err(CausalFlowError::EmptyStructure);
        }

        let untrainable: Vec<&str> = match kind {
            PipelineKind::FromData { .. } => {
                if self.store.metadata().is_none() {
                    return Err(CausalFlowError::MissingData);
                }
                let mut names: Vec<&str> = Vec::new();
                for edge in &edges {
                    for end in [&edge.source, &edge.target] {
                        let trainable = self.store.node(end).is_some_and(|n| n.is_trainable());
                        if !trainable && !names.contains(&end.as_str()) {
                            names.push(end);
                        }
                    }
                }
                names
            }
            PipelineKind::FromPriors => self
                .store
                .nodes()
                .filter(|n| !n.is_trainable())
                .map(|n| n.name.as_str())
                .collect(),
        };
        if !untrainable.is_empty() {
            return Err(CausalFlowError::TooFewStates(untrainable.join(", ")));
        }

        let node_defs = match kind {
            PipelineKind::FromData { .. } => Vec::new(),
            PipelineKind::FromPriors => self.store.node_definitions(),
        };
        Ok(TrainingPlan {
            kind,
            edges,
            node_defs,
            revision: self.store.revision(),
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================
