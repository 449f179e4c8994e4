//! # causalflow-core
//!
//! The editing and synchronization core of a Bayesian-network workbench -
//! THE LOGIC.
//!
//! A user defines discrete variables (nodes) and directed dependencies
//! (edges), imports variable definitions from tabular data, has the model
//! learned or built remotely, and then fixes evidence to receive posterior
//! distributions. This crate owns every piece of state involved and the rules
//! for changing it; the network calls themselves live in the app layer.
//!
//! ## Components
//!
//! - `store` - nodes, edges, dataset metadata, trained flag
//! - `mode` - the derived `Empty | Building | Trained` phase and action gating
//! - `evidence` - evidence map, distribution map, sequence tokens
//! - `pipeline` - validate/estimate state machine for model construction
//! - `import` - payload adapters (dataset summary, learned edges, prior models)
//! - `notify` - the single transient message slot
//! - `session` - all of the above behind one owner
//!
//! ## Architectural Constraints
//!
//! - NO async, NO network dependencies, NO logging (pure Rust)
//! - A returned error means nothing was mutated
//! - Mode is computed, never stored

// =============================================================================
// MODULES
// =============================================================================

pub mod evidence;
pub mod import;
pub mod layout;
pub mod mode;
pub mod notify;
pub mod pipeline;
pub mod primitives;
pub mod session;
pub mod store;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{
    CausalFlowError, Distribution, Edge, EdgeId, Estimator, Metadata, Node, NodeDefinition,
    NodeOrigin, Position, Scoring,
};

// =============================================================================
// RE-EXPORTS: State
// =============================================================================

pub use evidence::{
    DistributionMap, EvidenceMap, EvidenceSynchronizer, InferenceOutcome, InferenceTicket,
    SequenceToken,
};
pub use mode::{Action, Mode};
pub use notify::{MessageId, Notification, NotificationChannel, NotificationKind};
pub use pipeline::{PipelineKind, PipelineState, TrainingPipeline, TrainingPlan};
pub use session::{Activity, Session};
pub use store::EntityStore;

// =============================================================================
// RE-EXPORTS: Adapters
// =============================================================================

pub use import::{DataImport, LearnedStructure, PriorModel};
