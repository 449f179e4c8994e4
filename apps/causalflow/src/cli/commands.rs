//! # CLI Command Implementations
//!
//! Each command drives one workbench workflow and prints the result.

use crate::api::{Backend, PriorModel};
use crate::workbench::{Workbench, WorkbenchError};
use causalflow_core::{DistributionMap, Edge, Estimator, Scoring, Session};
use std::path::Path;

// =============================================================================
// OUTPUT
// =============================================================================

fn graph_json(session: &Session) -> serde_json::Value {
    let nodes: Vec<serde_json::Value> = session
        .store()
        .nodes()
        .map(|n| serde_json::json!({ "name": n.name, "states": n.states }))
        .collect();
    serde_json::json!({
        "mode": session.mode(),
        "nodes": nodes,
        "edges": session.store().edge_list(),
    })
}

fn print_graph(session: &Session, json_mode: bool) {
    if json_mode {
        println!("{}", graph_json(session));
        return;
    }
    println!("Mode: {}", session.mode());
    println!("Variables ({}):", session.store().node_count());
    for node in session.store().nodes() {
        println!("  {:<20} {}", node.name, node.states.join(", "));
    }
    println!("Edges ({}):", session.store().edge_count());
    for edge in session.store().edges() {
        println!("  {} -> {}", edge.source, edge.target);
    }
}

fn print_distributions(distributions: &DistributionMap, json_mode: bool) {
    if json_mode {
        println!("{}", serde_json::json!({ "distributions": distributions }));
        return;
    }
    for (node, dist) in distributions {
        println!("{node}");
        for (state, p) in dist.iter() {
            println!("  {state:<16} {p:.4}");
        }
    }
}

/// Apply each `NODE=STATE` pair in order.
async fn apply_evidence<B: Backend>(
    workbench: &Workbench<B>,
    evidence: &[(String, String)],
) -> Result<(), WorkbenchError> {
    for (node, state) in evidence {
        let outcome = workbench.toggle_evidence(node, state).await?;
        tracing::debug!(node = %node, state = %state, ?outcome, "evidence applied");
    }
    Ok(())
}

// =============================================================================
// HEALTH COMMAND
// =============================================================================

pub async fn cmd_health<B: Backend>(
    workbench: &Workbench<B>,
    json_mode: bool,
) -> Result<(), WorkbenchError> {
    let status = workbench.health().await?;
    if json_mode {
        println!("{status}");
    } else {
        println!("Model service at {} is up", workbench.config().base_url);
        println!("{status:#}");
    }
    Ok(())
}

// =============================================================================
// UPLOAD COMMAND
// =============================================================================

pub async fn cmd_upload<B: Backend>(
    workbench: &Workbench<B>,
    json_mode: bool,
    file: &Path,
) -> Result<(), WorkbenchError> {
    workbench.import_csv(file).await?;
    workbench.read(|s| print_graph(s, json_mode)).await;
    Ok(())
}

// =============================================================================
// LEARN COMMAND
// =============================================================================

pub async fn cmd_learn<B: Backend>(
    workbench: &Workbench<B>,
    json_mode: bool,
    file: &Path,
    scoring: Option<Scoring>,
) -> Result<(), WorkbenchError> {
    workbench.import_csv(file).await?;
    workbench.learn_structure(scoring).await?;
    workbench.read(|s| print_graph(s, json_mode)).await;
    Ok(())
}

// =============================================================================
// QUERY COMMAND
// =============================================================================

pub async fn cmd_query<B: Backend>(
    workbench: &Workbench<B>,
    json_mode: bool,
    file: &Path,
    edges: &[Edge],
    scoring: Option<Scoring>,
    estimator: Option<Estimator>,
    evidence: &[(String, String)],
) -> Result<(), WorkbenchError> {
    workbench.import_csv(file).await?;
    if edges.is_empty() {
        workbench.learn_structure(scoring).await?;
    } else {
        for edge in edges {
            workbench.add_edge(&edge.source, &edge.target).await?;
        }
    }

    workbench.train(estimator).await?;
    apply_evidence(workbench, evidence).await?;

    print_distributions(&workbench.distributions().await, json_mode);
    Ok(())
}

// =============================================================================
// BUILD COMMAND
// =============================================================================

pub async fn cmd_build<B: Backend>(
    workbench: &Workbench<B>,
    json_mode: bool,
    model_path: &Path,
    evidence: &[(String, String)],
) -> Result<(), WorkbenchError> {
    let raw = std::fs::read_to_string(model_path).map_err(|e| WorkbenchError::Io {
        path: model_path.display().to_string(),
        message: e.to_string(),
    })?;
    let model: PriorModel = serde_json::from_str(&raw).map_err(|e| WorkbenchError::InvalidModel {
        path: model_path.display().to_string(),
        message: e.to_string(),
    })?;

    workbench.load_model(&model).await?;
    workbench.build_model(None).await?;
    apply_evidence(workbench, evidence).await?;

    print_distributions(&workbench.distributions().await, json_mode);
    Ok(())
}
