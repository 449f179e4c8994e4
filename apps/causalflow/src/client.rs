//! # Model Service HTTP Client
//!
//! reqwest implementation of [`Backend`]. Every non-2xx response is reduced to
//! one human-readable message: the body's string `detail` field, or a
//! per-operation fallback when there is none.

use crate::api::{
    Backend, InferRequest, InferResponse, LearnParametersRequest, LearnStructureRequest,
    LearnStructureResponse, NodeDefinition, PriorModel, TrainResponse, UploadResponse,
    ValidateRequest, ValidationResponse,
};
use crate::config::Config;
use async_trait::async_trait;
use causalflow_core::{Edge, Estimator, EvidenceMap, Scoring};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

/// Errors from the HTTP client layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// Cannot reach the model service.
    #[error("Cannot connect to the model service at {url}: {reason}")]
    Connection { url: String, reason: String },
    /// Non-2xx response; `detail` is the normalized message.
    #[error("{detail}")]
    Api { status: u16, detail: String },
    /// 2xx response with an unexpected body.
    #[error("Invalid response from the model service: {0}")]
    Parse(String),
}

/// Remote operations, for routing and fallback messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Health,
    Upload,
    Validate,
    LearnStructure,
    LearnParameters,
    BuildFromPriors,
    Infer,
    AddNode,
}

impl Operation {
    /// Path below the API prefix. Health lives at the service root.
    #[must_use]
    pub fn path(self) -> &'static str {
        match self {
            Operation::Health => "/",
            Operation::Upload => "/upload_csv",
            Operation::Validate => "/validate_structure",
            Operation::LearnStructure => "/learn_structure",
            Operation::LearnParameters => "/learn_parameters",
            Operation::BuildFromPriors => "/build_from_priors",
            Operation::Infer => "/infer",
            Operation::AddNode => "/add_node",
        }
    }

    /// Message used when a failure response carries no `detail`.
    #[must_use]
    pub fn fallback(self) -> &'static str {
        match self {
            Operation::Health => "Health check failed",
            Operation::Upload => "Upload failed",
            Operation::Validate => "Validation failed",
            Operation::LearnStructure => "Structure learning failed",
            Operation::LearnParameters => "Parameter learning failed",
            Operation::BuildFromPriors => "Build from priors failed",
            Operation::Infer => "Inference failed",
            Operation::AddNode => "Add node failed",
        }
    }
}

/// Extract a string `detail` field from a failure body.
#[must_use]
pub fn error_detail(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    value
        .get("detail")
        .and_then(Value::as_str)
        .filter(|d| !d.trim().is_empty())
        .map(str::to_string)
}

/// HTTP client for the model service.
#[derive(Debug, Clone)]
pub struct CausalFlowClient {
    http: reqwest::Client,
    base_url: String,
    api_prefix: String,
}

impl CausalFlowClient {
    /// Create a client for `base_url`, with operations under `api_prefix`.
    pub fn new(base_url: impl Into<String>, api_prefix: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let prefix = api_prefix.into();
        let prefix = prefix.trim_matches('/');
        let api_prefix = if prefix.is_empty() {
            String::new()
        } else {
            format!("/{prefix}")
        };
        Self {
            http: reqwest::Client::new(),
            base_url,
            api_prefix,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.base_url.clone(), config.api_prefix.clone())
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Full URL of `op`.
    #[must_use]
    pub fn url(&self, op: Operation) -> String {
        match op {
            Operation::Health => format!("{}{}", self.base_url, op.path()),
            _ => format!("{}{}{}", self.base_url, self.api_prefix, op.path()),
        }
    }

    /// Send a request and handle connection errors.
    async fn send(
        &self,
        op: Operation,
        req: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, ClientError> {
        tracing::debug!(operation = ?op, "calling model service");
        req.send().await.map_err(|e| {
            tracing::warn!(operation = ?op, error = %e, "model service unreachable");
            ClientError::Connection {
                url: self.url(op),
                reason: e.to_string(),
            }
        })
    }

    /// Check the status code and parse the JSON body.
    async fn handle_response<T: DeserializeOwned>(
        &self,
        op: Operation,
        resp: reqwest::Response,
    ) -> Result<T, ClientError> {
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let detail = error_detail(&body).unwrap_or_else(|| op.fallback().to_string());
            tracing::warn!(operation = ?op, status = status.as_u16(), %detail, "model service error");
            return Err(ClientError::Api {
                status: status.as_u16(),
                detail,
            });
        }
        resp.json::<T>()
            .await
            .map_err(|e| ClientError::Parse(e.to_string()))
    }

    async fn post_json<B, T>(&self, op: Operation, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let req = self.http.post(self.url(op)).json(body);
        let resp = self.send(op, req).await?;
        self.handle_response(op, resp).await
    }
}

#[async_trait]
impl Backend for CausalFlowClient {
    async fn health(&self) -> Result<Value, ClientError> {
        let op = Operation::Health;
        let resp = self.send(op, self.http.get(self.url(op))).await?;
        self.handle_response(op, resp).await
    }

    async fn upload_csv(
        &self,
        file_name: &str,
        contents: Vec<u8>,
    ) -> Result<UploadResponse, ClientError> {
        let op = Operation::Upload;
        let part = reqwest::multipart::Part::bytes(contents).file_name(file_name.to_string());
        let form = reqwest::multipart::Form::new().part("file", part);
        let resp = self
            .send(op, self.http.post(self.url(op)).multipart(form))
            .await?;
        self.handle_response(op, resp).await
    }

    async fn validate_structure(&self, edges: &[Edge]) -> Result<ValidationResponse, ClientError> {
        let body = ValidateRequest {
            edges: edges.to_vec(),
        };
        self.post_json(Operation::Validate, &body).await
    }

    async fn learn_structure(
        &self,
        scoring: Scoring,
    ) -> Result<LearnStructureResponse, ClientError> {
        self.post_json(Operation::LearnStructure, &LearnStructureRequest { scoring })
            .await
    }

    async fn learn_parameters(
        &self,
        edges: &[Edge],
        estimator: Estimator,
    ) -> Result<TrainResponse, ClientError> {
        let body = LearnParametersRequest {
            edges: edges.to_vec(),
            estimator,
        };
        self.post_json(Operation::LearnParameters, &body).await
    }

    async fn build_from_priors(&self, model: &PriorModel) -> Result<TrainResponse, ClientError> {
        self.post_json(Operation::BuildFromPriors, model).await
    }

    async fn infer(&self, evidence: &EvidenceMap) -> Result<InferResponse, ClientError> {
        let body = InferRequest {
            evidence: evidence.clone(),
        };
        self.post_json(Operation::Infer, &body).await
    }

    async fn add_node(&self, node: &NodeDefinition) -> Result<Value, ClientError> {
        self.post_json(Operation::AddNode, node).await
    }
}

// =============================================================================
// TESTS
// =============================================================================
