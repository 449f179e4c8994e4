//! # Remote Contract
//!
//! The operations the workbench consumes from the model service, behind the
//! [`Backend`] trait. [`crate::client::CausalFlowClient`] is the HTTP
//! implementation; tests substitute scripted fakes.
//!
//! ## Endpoints
//!
//! - `GET  /` - Health check
//! - `POST {prefix}/upload_csv` - Upload a dataset (multipart `file`)
//! - `POST {prefix}/validate_structure` - Check that edges form a DAG
//! - `POST {prefix}/learn_structure` - Learn edges from the dataset
//! - `POST {prefix}/learn_parameters` - Estimate parameters from the dataset
//! - `POST {prefix}/build_from_priors` - Build a model from node priors
//! - `POST {prefix}/infer` - Posterior distributions for an evidence map
//! - `POST {prefix}/add_node` - Register a manual node

mod types;

pub use types::*;

use crate::client::ClientError;
use async_trait::async_trait;
use causalflow_core::{Edge, Estimator, EvidenceMap, Scoring};
use serde_json::Value;

/// The model service as seen by the workbench.
///
/// Every failure is already normalized to a human-readable message.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Arbitrary status payload.
    async fn health(&self) -> Result<Value, ClientError>;

    async fn upload_csv(
        &self,
        file_name: &str,
        contents: Vec<u8>,
    ) -> Result<UploadResponse, ClientError>;

    async fn validate_structure(&self, edges: &[Edge]) -> Result<ValidationResponse, ClientError>;

    async fn learn_structure(&self, scoring: Scoring)
    -> Result<LearnStructureResponse, ClientError>;

    async fn learn_parameters(
        &self,
        edges: &[Edge],
        estimator: Estimator,
    ) -> Result<TrainResponse, ClientError>;

    async fn build_from_priors(&self, model: &PriorModel) -> Result<TrainResponse, ClientError>;

    async fn infer(&self, evidence: &EvidenceMap) -> Result<InferResponse, ClientError>;

    /// Server echo of the registered node.
    async fn add_node(&self, node: &NodeDefinition) -> Result<Value, ClientError>;
}
