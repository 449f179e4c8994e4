//! # API Request/Response Types
//!
//! JSON bodies exchanged with the model service. Payloads the core already
//! understands ([`DataImport`], [`LearnedStructure`], [`PriorModel`],
//! [`NodeDefinition`]) are used as-is.

use causalflow_core::{DistributionMap, Edge, Estimator, EvidenceMap, Scoring};
use serde::{Deserialize, Serialize};

pub use causalflow_core::{DataImport, LearnedStructure, NodeDefinition, PriorModel};

// =============================================================================
// UPLOAD
// =============================================================================

/// `POST /upload_csv` response.
pub type UploadResponse = DataImport;

// =============================================================================
// STRUCTURE
// =============================================================================

/// `POST /validate_structure` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidateRequest {
    pub edges: Vec<Edge>,
}

/// `POST /validate_structure` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResponse {
    pub is_valid: bool,
    #[serde(default)]
    pub message: String,
}

/// `POST /learn_structure` request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LearnStructureRequest {
    pub scoring: Scoring,
}

/// `POST /learn_structure` response.
pub type LearnStructureResponse = LearnedStructure;

// =============================================================================
// MODEL CONSTRUCTION
// =============================================================================

/// `POST /learn_parameters` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LearnParametersRequest {
    pub edges: Vec<Edge>,
    pub estimator: Estimator,
}

/// Response of `learn_parameters` and `build_from_priors`.
///
/// Only `success` and `message` are interpreted; the rest is kept for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainResponse {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

// =============================================================================
// INFERENCE
// =============================================================================

/// `POST /infer` request: the full evidence map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InferRequest {
    pub evidence: EvidenceMap,
}

/// `POST /infer` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferResponse {
    #[serde(default = "default_true")]
    pub success: bool,
    #[serde(default)]
    pub distributions: DistributionMap,
}

fn default_true() -> bool {
    true
}
