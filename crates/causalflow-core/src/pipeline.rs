//! # Training Pipeline
//!
//! State machine shared by data-driven training and prior-based construction:
//!
//! ```text
//! Idle -> Validating -> Rejected(reason)
//!                    -> Estimating -> Trained
//!                                  -> Failed(reason)
//! ```
//!
//! `Rejected` and `Failed` are terminal for a run; the next run starts from
//! them as from `Idle`. A run never mutates nodes or edges; only a successful
//! finish marks the store trained.

use crate::{CausalFlowError, Edge, Estimator, NodeDefinition};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which model-construction route a run takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PipelineKind {
    /// Estimate parameters from the imported dataset.
    FromData { estimator: Estimator },
    /// Build from the nodes' user-supplied priors.
    FromPriors,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum PipelineState {
    #[default]
    Idle,
    Validating,
    Estimating,
    Trained,
    Rejected(String),
    Failed(String),
}

impl PipelineState {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            PipelineState::Idle => "idle",
            PipelineState::Validating => "validating",
            PipelineState::Estimating => "estimating",
            PipelineState::Trained => "trained",
            PipelineState::Rejected(_) => "rejected",
            PipelineState::Failed(_) => "failed",
        }
    }

    /// A run is in flight.
    #[must_use]
    pub fn is_running(&self) -> bool {
        matches!(self, PipelineState::Validating | PipelineState::Estimating)
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineState::Rejected(reason) | PipelineState::Failed(reason) => {
                write!(f, "{}: {}", self.name(), reason)
            }
            _ => f.write_str(self.name()),
        }
    }
}

/// Everything a run needs, captured when it starts.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingPlan {
    pub kind: PipelineKind,
    pub edges: Vec<Edge>,
    /// Empty for data-driven runs.
    pub node_defs: Vec<NodeDefinition>,
    /// Store revision at start; a mismatch at finish means the graph moved.
    pub revision: u64,
}

#[derive(Debug, Clone, Default)]
pub struct TrainingPipeline {
    state: PipelineState,
}

impl TrainingPipeline {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn state(&self) -> &PipelineState {
        &self.state
    }

    /// `Idle | Trained | Rejected | Failed -> Validating`.
    pub fn begin(&mut self) -> Result<(), CausalFlowError> {
        if self.state.is_running() {
            return Err(CausalFlowError::PipelineBusy);
        }
        self.state = PipelineState::Validating;
        Ok(())
    }

    /// `Validating -> Estimating`.
    pub fn validated(&mut self) -> Result<(), CausalFlowError> {
        self.transition(PipelineState::Estimating, |s| {
            matches!(s, PipelineState::Validating)
        })
    }

    /// `Validating -> Rejected(reason)`.
    pub fn reject(&mut self, reason: impl Into<String>) -> Result<(), CausalFlowError> {
        self.transition(PipelineState::Rejected(reason.into()), |s| {
            matches!(s, PipelineState::Validating)
        })
    }

    /// `Estimating -> Trained`.
    pub fn finish(&mut self) -> Result<(), CausalFlowError> {
        self.transition(PipelineState::Trained, |s| {
            matches!(s, PipelineState::Estimating)
        })
    }

    /// `Validating | Estimating -> Failed(reason)`.
    pub fn fail(&mut self, reason: impl Into<String>) -> Result<(), CausalFlowError> {
        self.transition(PipelineState::Failed(reason.into()), PipelineState::is_running)
    }

    /// Back to `Idle`, e.g. when the graph is cleared.
    pub fn reset(&mut self) {
        self.state = PipelineState::Idle;
    }

    fn transition(
        &mut self,
        to: PipelineState,
        allowed_from: impl Fn(&PipelineState) -> bool,
    ) -> Result<(), CausalFlowError> {
        if !allowed_from(&self.state) {
            return Err(CausalFlowError::InvalidTransition {
                from: self.state.name().to_string(),
                to: to.name().to_string(),
            });
        }
        self.state = to;
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================
