//! # Mode Controller
//!
//! The workflow phase is derived from store contents on every read and never
//! stored on its own:
//!
//! | Mode | Condition |
//! |------|-----------|
//! | `Empty` | no nodes |
//! | `Building` | nodes exist, model not trained |
//! | `Trained` | model trained; topology frozen, evidence editable |
//!
//! `Building -> Trained` happens only through `set_trained(true)`. Any
//! topology mutation drops `Trained` back to `Building`.

use crate::store::EntityStore;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Derived workflow phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Empty,
    Building,
    Trained,
}

impl Mode {
    /// Derive the mode from the store.
    #[must_use]
    pub fn of(store: &EntityStore) -> Self {
        if store.node_count() == 0 {
            Mode::Empty
        } else if store.is_trained() {
            Mode::Trained
        } else {
            Mode::Building
        }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Mode::Empty => "empty",
            Mode::Building => "building",
            Mode::Trained => "trained",
        }
    }

    /// Check whether `action` is legal in this mode.
    #[must_use]
    pub fn permits(&self, action: Action) -> bool {
        match action {
            Action::ImportData | Action::AddNode | Action::RemoveNode => true,
            Action::EditEdges | Action::LearnStructure | Action::Train => {
                matches!(self, Mode::Building)
            }
            Action::SetEvidence => matches!(self, Mode::Trained),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// User-facing actions gated by the mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    ImportData,
    AddNode,
    RemoveNode,
    EditEdges,
    LearnStructure,
    Train,
    SetEvidence,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Action::ImportData => "Data import",
            Action::AddNode => "Adding a node",
            Action::RemoveNode => "Removing a node",
            Action::EditEdges => "Editing edges",
            Action::LearnStructure => "Structure learning",
            Action::Train => "Training",
            Action::SetEvidence => "Setting evidence",
        };
        f.write_str(name)
    }
}

// =============================================================================
// TESTS
// =============================================================================
