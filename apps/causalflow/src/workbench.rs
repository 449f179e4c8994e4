//! # Workbench
//!
//! Async orchestration over one [`Session`]: gates user actions by mode, runs
//! remote calls with loading flags, drives the training pipeline and keeps
//! displayed distributions in step with the latest evidence.
//!
//! The session sits behind a single mutex. It is never held across a remote
//! call; every lock scope is a complete read-then-write.
//!
//! Every user-facing operation posts its failure to the [`Notifier`] before
//! returning it. Baseline prefetches and superseded inference requests fail
//! silently (logged only).

use crate::api::{Backend, PriorModel};
use crate::client::{ClientError, Operation};
use crate::config::{Config, ConfigError};
use crate::notifier::Notifier;
use causalflow_core::{
    Action, Activity, CausalFlowError, Distribution, DistributionMap, EdgeId, Estimator,
    EvidenceMap, InferenceOutcome, InferenceTicket, Mode, PipelineKind, PipelineState, Position,
    Scoring, Session, TrainingPlan,
};
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{Mutex, MutexGuard};

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, Error)]
pub enum WorkbenchError {
    #[error(transparent)]
    Core(#[from] CausalFlowError),
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The service refused the structure (e.g. it has a cycle).
    #[error("{0}")]
    Rejected(String),
    /// A remote construction step failed or the graph moved underneath it.
    #[error("{0}")]
    Failed(String),
    #[error("Only CSV files are supported")]
    UnsupportedFile(String),
    #[error("Cannot read {path}: {message}")]
    Io { path: String, message: String },
    #[error("Invalid model file {path}: {message}")]
    InvalidModel { path: String, message: String },
}

/// Gate `action` on the current mode.
fn permit(session: &Session, action: Action) -> Result<(), CausalFlowError> {
    let mode = session.mode();
    if mode.permits(action) {
        Ok(())
    } else {
        Err(CausalFlowError::ActionNotPermitted { action, mode })
    }
}

fn is_csv(file_name: &str) -> bool {
    Path::new(file_name)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
}

// =============================================================================
// WORKBENCH
// =============================================================================

pub struct Workbench<B> {
    backend: Arc<B>,
    session: Arc<Mutex<Session>>,
    notifier: Notifier,
    config: Config,
}

impl<B> Clone for Workbench<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            session: Arc::clone(&self.session),
            notifier: self.notifier.clone(),
            config: self.config.clone(),
        }
    }
}

impl<B: Backend> Workbench<B> {
    /// Must be created inside a tokio runtime.
    pub fn new(backend: B, config: Config) -> Self {
        Self {
            backend: Arc::new(backend),
            session: Arc::new(Mutex::new(Session::new())),
            notifier: Notifier::new(config.notification_ttl()),
            config,
        }
    }

    // -------------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------------

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run `f` against the session under the lock.
    pub async fn read<R>(&self, f: impl FnOnce(&Session) -> R) -> R {
        f(&*self.session.lock().await)
    }

    pub async fn mode(&self) -> Mode {
        self.read(Session::mode).await
    }

    pub async fn evidence(&self) -> EvidenceMap {
        self.read(|s| s.evidence().clone()).await
    }

    pub async fn distributions(&self) -> DistributionMap {
        self.read(|s| s.distributions().clone()).await
    }

    pub async fn distribution(&self, node: &str) -> Option<Distribution> {
        self.read(|s| s.distributions().get(node).cloned()).await
    }

    pub async fn pipeline_state(&self) -> PipelineState {
        self.read(|s| s.pipeline_state().clone()).await
    }

    pub async fn is_busy(&self, activity: Activity) -> bool {
        self.read(|s| s.is_busy(activity)).await
    }

    pub async fn health(&self) -> Result<serde_json::Value, WorkbenchError> {
        let result = self.backend.health().await.map_err(WorkbenchError::from);
        self.report(result).await
    }

    // -------------------------------------------------------------------------
    // Data import
    // -------------------------------------------------------------------------

    /// Upload a CSV file and replace the graph with its columns.
    pub async fn import_csv(&self, path: &Path) -> Result<usize, WorkbenchError> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if !is_csv(&file_name) {
            return self
                .report(Err(WorkbenchError::UnsupportedFile(file_name)))
                .await;
        }
        let contents = match std::fs::read(path) {
            Ok(contents) => contents,
            Err(e) => {
                let err = WorkbenchError::Io {
                    path: path.display().to_string(),
                    message: e.to_string(),
                };
                return self.report(Err(err)).await;
            }
        };
        self.import_bytes(&file_name, contents).await
    }

    /// Upload CSV contents under `file_name`.
    pub async fn import_bytes(
        &self,
        file_name: &str,
        contents: Vec<u8>,
    ) -> Result<usize, WorkbenchError> {
        let result = self.import_inner(file_name, contents).await;
        if let Ok(count) = &result {
            self.notifier
                .success(format!("Imported {count} columns"))
                .await;
        }
        self.report(result).await
    }

    async fn import_inner(
        &self,
        file_name: &str,
        contents: Vec<u8>,
    ) -> Result<usize, WorkbenchError> {
        if !is_csv(file_name) {
            return Err(WorkbenchError::UnsupportedFile(file_name.to_string()));
        }
        permit(&*self.lock().await, Action::ImportData)?;

        let import = self
            .remote(
                Activity::Uploading,
                self.backend.upload_csv(file_name, contents),
            )
            .await?;

        let mut session = self.lock().await;
        let count = import.apply(&mut session)?;
        tracing::info!(
            file = file_name,
            columns = count,
            rows = import.row_count,
            "dataset imported"
        );
        Ok(count)
    }

    // -------------------------------------------------------------------------
    // Nodes
    // -------------------------------------------------------------------------

    /// Add a manual node, registering it remotely first when configured.
    pub async fn add_node(
        &self,
        name: &str,
        states: Vec<String>,
        prior: Option<Distribution>,
    ) -> Result<(), WorkbenchError> {
        let result = self.add_node_inner(name, states, prior).await;
        if result.is_ok() {
            self.notifier.success(format!("Added node: {name}")).await;
        }
        self.report(result).await
    }

    async fn add_node_inner(
        &self,
        name: &str,
        states: Vec<String>,
        prior: Option<Distribution>,
    ) -> Result<(), WorkbenchError> {
        {
            let session = self.lock().await;
            permit(&session, Action::AddNode)?;
            session
                .store()
                .validate_definition(name, &states, prior.as_ref())?;
        }

        if self.config.register_manual_nodes {
            let def = causalflow_core::NodeDefinition {
                name: name.to_string(),
                states: states.clone(),
                prior: prior.clone(),
            };
            self.backend.add_node(&def).await?;
        }

        self.lock().await.add_manual_node(name, states, prior)?;
        tracing::info!(node = name, "node added");
        Ok(())
    }

    /// Load node definitions and edges from a model description.
    pub async fn load_model(&self, model: &PriorModel) -> Result<(), WorkbenchError> {
        let result = self.mutate(Action::AddNode, |s| model.apply(s)).await;
        if result.is_ok() {
            tracing::info!(
                nodes = model.node_defs.len(),
                edges = model.edges.len(),
                "model loaded"
            );
        }
        self.report(result).await
    }

    /// Remove a node and its edges. A missing name is a no-op; returns
    /// whether anything was removed.
    pub async fn remove_node(&self, name: &str) -> Result<bool, WorkbenchError> {
        let result = self
            .mutate(Action::RemoveNode, |s| Ok(s.remove_node(name)))
            .await;
        if let Ok(false) = result {
            tracing::debug!(node = name, "remove ignored, no such node");
        }
        self.report(result).await
    }

    pub async fn update_prior(
        &self,
        name: &str,
        prior: Option<Distribution>,
    ) -> Result<(), WorkbenchError> {
        let result = self.lock().await.update_prior(name, prior);
        self.report(result.map_err(WorkbenchError::from)).await
    }

    /// Layout collaborator write path.
    pub async fn move_node(&self, name: &str, position: Position) -> Result<(), WorkbenchError> {
        let result = self.lock().await.move_node(name, position);
        self.report(result.map_err(WorkbenchError::from)).await
    }

    pub async fn request_layout(&self) {
        self.lock().await.request_layout();
    }

    /// Reset everything.
    pub async fn clear_all(&self) {
        self.lock().await.clear_all();
        self.notifier.dismiss().await;
    }

    // -------------------------------------------------------------------------
    // Edges
    // -------------------------------------------------------------------------

    pub async fn add_edge(&self, source: &str, target: &str) -> Result<bool, WorkbenchError> {
        let result = self.mutate(Action::EditEdges, |s| s.add_edge(source, target));
        self.report(result.await).await
    }

    pub async fn remove_edge(&self, id: &EdgeId) -> Result<bool, WorkbenchError> {
        let result = self.mutate(Action::EditEdges, |s| Ok(s.remove_edge(id)));
        self.report(result.await).await
    }

    pub async fn clear_edges(&self) -> Result<(), WorkbenchError> {
        let result = self
            .mutate(Action::EditEdges, |s| {
                s.clear_edges();
                Ok(())
            })
            .await;
        if result.is_ok() {
            self.notifier.success("Edges cleared").await;
        }
        self.report(result).await
    }

    // -------------------------------------------------------------------------
    // Structure learning and training
    // -------------------------------------------------------------------------

    /// Replace the edges with remotely learned ones. Returns the edge count.
    pub async fn learn_structure(&self, scoring: Option<Scoring>) -> Result<usize, WorkbenchError> {
        let result = self.learn_structure_inner(scoring).await;
        if let Ok(count) = &result {
            self.notifier.success(format!("Learned {count} edges")).await;
        }
        self.report(result).await
    }

    async fn learn_structure_inner(
        &self,
        scoring: Option<Scoring>,
    ) -> Result<usize, WorkbenchError> {
        let scoring = scoring.unwrap_or(self.config.scoring);
        {
            let session = self.lock().await;
            permit(&session, Action::LearnStructure)?;
            session.check_structure_learning()?;
        }

        let learned = self
            .remote(
                Activity::LearningStructure,
                self.backend.learn_structure(scoring),
            )
            .await?;

        let count = learned.apply(&mut *self.lock().await)?;
        tracing::info!(%scoring, edges = count, "structure learned");
        Ok(count)
    }

    /// Validate remotely, estimate parameters from the dataset, mark trained.
    pub async fn train(&self, estimator: Option<Estimator>) -> Result<(), WorkbenchError> {
        let estimator = estimator.unwrap_or(self.config.estimator);
        self.run_pipeline(PipelineKind::FromData { estimator }, "Model trained successfully")
            .await
    }

    /// Validate remotely, build the model from node priors, mark trained.
    pub async fn build_from_priors(&self) -> Result<(), WorkbenchError> {
        self.run_pipeline(PipelineKind::FromPriors, "Model built from priors")
            .await
    }

    /// Train from data when every node came from the imported dataset,
    /// otherwise build from priors.
    pub async fn build_model(&self, estimator: Option<Estimator>) -> Result<(), WorkbenchError> {
        let estimator = estimator.unwrap_or(self.config.estimator);
        match self.read(|s| s.preferred_pipeline(estimator)).await {
            PipelineKind::FromData { estimator } => self.train(Some(estimator)).await,
            PipelineKind::FromPriors => self.build_from_priors().await,
        }
    }

    async fn run_pipeline(
        &self,
        kind: PipelineKind,
        success: &str,
    ) -> Result<(), WorkbenchError> {
        let plan = {
            let mut session = self.lock().await;
            permit(&session, Action::Train)
                .and_then(|()| session.begin_training(kind))
                .map_err(WorkbenchError::from)
        };
        let plan = match plan {
            Ok(plan) => plan,
            Err(e) => {
                tracing::info!(?kind, reason = %e, "pipeline not started");
                return self.report(Err(e)).await;
            }
        };
        tracing::info!(?kind, edges = plan.edges.len(), "pipeline validating");

        self.lock().await.begin_activity(Activity::Training);
        let result = self.drive(&plan).await;
        self.lock().await.end_activity(Activity::Training);

        match result {
            Ok(baseline) => {
                tracing::info!(?kind, "pipeline trained");
                self.notifier.success(success).await;
                if let Some(ticket) = baseline {
                    self.prefetch_baseline(ticket).await;
                }
                Ok(())
            }
            Err(e) => {
                tracing::info!(?kind, reason = %e, "pipeline stopped");
                self.report(Err(e)).await
            }
        }
    }

    /// Validate -> estimate/build -> mark trained. The store is only touched
    /// by the final step.
    async fn drive(&self, plan: &TrainingPlan) -> Result<Option<InferenceTicket>, WorkbenchError> {
        let validation = match self.backend.validate_structure(&plan.edges).await {
            Ok(validation) => validation,
            Err(e) => return self.fail_run(WorkbenchError::from(e)).await,
        };
        if !validation.is_valid {
            let reason = if validation.message.trim().is_empty() {
                "Invalid network structure".to_string()
            } else {
                validation.message
            };
            self.lock().await.reject_training(reason.clone())?;
            return Err(WorkbenchError::Rejected(reason));
        }
        self.lock().await.training_validated()?;
        tracing::info!(kind = ?plan.kind, "pipeline estimating");

        let (response, fallback) = match plan.kind {
            PipelineKind::FromData { estimator } => (
                self.backend.learn_parameters(&plan.edges, estimator).await,
                Operation::LearnParameters.fallback(),
            ),
            PipelineKind::FromPriors => {
                let model = PriorModel {
                    node_defs: plan.node_defs.clone(),
                    edges: plan.edges.clone(),
                };
                (
                    self.backend.build_from_priors(&model).await,
                    Operation::BuildFromPriors.fallback(),
                )
            }
        };
        match response {
            Err(e) => return self.fail_run(WorkbenchError::from(e)).await,
            Ok(r) if !r.success => {
                let reason = r.message.unwrap_or_else(|| fallback.to_string());
                return self.fail_run(WorkbenchError::Failed(reason)).await;
            }
            Ok(_) => {}
        }

        self.lock()
            .await
            .finish_training(plan)
            .map_err(|e| WorkbenchError::Failed(e.to_string()))
    }

    async fn fail_run<T>(&self, err: WorkbenchError) -> Result<T, WorkbenchError> {
        self.lock().await.fail_training(err.to_string())?;
        Err(err)
    }

    // -------------------------------------------------------------------------
    // Evidence and inference
    // -------------------------------------------------------------------------

    /// Toggle `node = state` and refresh distributions for the new evidence.
    ///
    /// Outside trained mode nothing happens and `Skipped` is returned.
    pub async fn toggle_evidence(
        &self,
        node: &str,
        state: &str,
    ) -> Result<InferenceOutcome, WorkbenchError> {
        let ticket = self.lock().await.toggle_evidence(node, state);
        match ticket {
            Ok(Some(ticket)) => self.dispatch(ticket).await,
            Ok(None) => Ok(InferenceOutcome::Skipped),
            Err(e) => self.report(Err(e.into())).await,
        }
    }

    /// Drop all evidence and restore baseline distributions.
    pub async fn clear_evidence(&self) -> Result<InferenceOutcome, WorkbenchError> {
        let ticket = self.lock().await.clear_evidence();
        let Some(ticket) = ticket else {
            return Ok(InferenceOutcome::Skipped);
        };
        self.notifier.success("Evidence cleared").await;
        self.dispatch(ticket).await
    }

    /// Send `ticket` and apply the response if it is still the latest.
    ///
    /// A failure is reported only while its request is still the latest.
    async fn dispatch(&self, ticket: InferenceTicket) -> Result<InferenceOutcome, WorkbenchError> {
        match self.infer(&ticket).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                if self.lock().await.is_latest(ticket.token) {
                    self.report(Err(e)).await
                } else {
                    tracing::debug!(token = ticket.token.0, error = %e, "superseded inference failed");
                    Ok(InferenceOutcome::Superseded)
                }
            }
        }
    }

    /// Empty-evidence request issued on entering trained mode. Best effort.
    async fn prefetch_baseline(&self, ticket: InferenceTicket) {
        match self.infer(&ticket).await {
            Ok(outcome) => tracing::debug!(?outcome, "baseline distributions"),
            Err(e) => tracing::warn!(error = %e, "baseline inference failed"),
        }
    }

    async fn infer(&self, ticket: &InferenceTicket) -> Result<InferenceOutcome, WorkbenchError> {
        let response = self
            .remote(Activity::Inferring, self.backend.infer(&ticket.evidence))
            .await?;
        if !response.success {
            return Err(WorkbenchError::Failed(
                Operation::Infer.fallback().to_string(),
            ));
        }

        let outcome = self
            .lock()
            .await
            .accept_inference(ticket.token, response.distributions);
        match outcome {
            InferenceOutcome::Superseded => {
                tracing::debug!(token = ticket.token.0, "discarded superseded inference response");
            }
            InferenceOutcome::Applied { discarded, .. } if discarded > 0 => {
                tracing::warn!(
                    token = ticket.token.0,
                    discarded,
                    "dropped malformed or unknown distributions from inference response"
                );
            }
            _ => {}
        }
        Ok(outcome)
    }

    // -------------------------------------------------------------------------
    // Helpers
    // -------------------------------------------------------------------------

    async fn lock(&self) -> MutexGuard<'_, Session> {
        self.session.lock().await
    }

    /// Gate `action`, then apply `f` under one lock.
    async fn mutate<T>(
        &self,
        action: Action,
        f: impl FnOnce(&mut Session) -> Result<T, CausalFlowError>,
    ) -> Result<T, WorkbenchError> {
        let mut session = self.lock().await;
        permit(&session, action)?;
        Ok(f(&mut session)?)
    }

    /// Run a remote call with `activity` flagged for its duration.
    async fn remote<T>(
        &self,
        activity: Activity,
        call: impl Future<Output = Result<T, ClientError>>,
    ) -> Result<T, ClientError> {
        self.lock().await.begin_activity(activity);
        let result = call.await;
        self.lock().await.end_activity(activity);
        result
    }

    /// Post a failure to the notifier and hand the result back.
    async fn report<T>(&self, result: Result<T, WorkbenchError>) -> Result<T, WorkbenchError> {
        if let Err(e) = &result {
            self.notifier.error(e.to_string()).await;
        }
        result
    }
}

// =============================================================================
// TESTS
// =============================================================================
