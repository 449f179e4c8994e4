//! # CausalFlow CLI Module
//!
//! ## Available Commands
//!
//! - `health` - Check that the model service is reachable
//! - `upload` - Upload a CSV file and show the imported variables
//! - `learn` - Upload a CSV file and learn its structure
//! - `query` - Upload, set edges (or learn them), train, apply evidence
//! - `build` - Build a model from a JSON prior model file and apply evidence

mod commands;

use crate::client::CausalFlowClient;
use crate::config::Config;
use crate::workbench::{Workbench, WorkbenchError};
use causalflow_core::{Edge, Estimator, Scoring};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// CausalFlow - Bayesian-network workbench client
///
/// Drives structure learning, training and inference on a remote model
/// service.
#[derive(Parser, Debug)]
#[command(name = "causalflow")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Model service URL (overrides config and CAUSALFLOW_URL)
    #[arg(short, long, global = true)]
    pub url: Option<String>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check the model service
    Health,

    /// Upload a CSV dataset and show the imported variables
    Upload {
        /// Path to the CSV file
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Upload a CSV dataset and learn its structure
    Learn {
        /// Path to the CSV file
        #[arg(short, long)]
        file: PathBuf,

        /// Scoring function (k2, bdeu)
        #[arg(short, long)]
        scoring: Option<Scoring>,
    },

    /// Train on a CSV dataset and query posteriors
    Query {
        /// Path to the CSV file
        #[arg(short, long)]
        file: PathBuf,

        /// Edge as SOURCE:TARGET (repeatable); learned when omitted
        #[arg(short, long = "edge", value_parser = parse_edge)]
        edges: Vec<Edge>,

        /// Scoring function when learning the structure (k2, bdeu)
        #[arg(short, long)]
        scoring: Option<Scoring>,

        /// Parameter estimator (mle, bayes)
        #[arg(short = 't', long)]
        estimator: Option<Estimator>,

        /// Evidence as NODE=STATE (repeatable)
        #[arg(short = 'E', long = "evidence", value_parser = parse_evidence)]
        evidence: Vec<(String, String)>,
    },

    /// Build a model from priors and query posteriors
    Build {
        /// JSON file with `node_defs` and `edges`
        #[arg(short, long)]
        model: PathBuf,

        /// Evidence as NODE=STATE (repeatable)
        #[arg(short = 'E', long = "evidence", value_parser = parse_evidence)]
        evidence: Vec<(String, String)>,
    },
}

/// Parse `SOURCE:TARGET`.
pub fn parse_edge(raw: &str) -> Result<Edge, String> {
    match raw.split_once(':') {
        Some((source, target)) if !source.trim().is_empty() && !target.trim().is_empty() => {
            Ok(Edge::new(source.trim(), target.trim()))
        }
        _ => Err(format!("expected SOURCE:TARGET, got {raw:?}")),
    }
}

/// Parse `NODE=STATE`.
pub fn parse_evidence(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((node, state)) if !node.trim().is_empty() && !state.trim().is_empty() => {
            Ok((node.trim().to_string(), state.trim().to_string()))
        }
        _ => Err(format!("expected NODE=STATE, got {raw:?}")),
    }
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub async fn execute(cli: Cli) -> Result<(), WorkbenchError> {
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(url) = cli.url {
        config.base_url = url;
        config.validate()?;
    }
    tracing::debug!(base_url = %config.base_url, "configuration loaded");

    let client = CausalFlowClient::from_config(&config);
    let workbench = Workbench::new(client, config);
    let json_mode = cli.json_mode;

    match cli.command {
        Commands::Health => cmd_health(&workbench, json_mode).await,
        Commands::Upload { file } => cmd_upload(&workbench, json_mode, &file).await,
        Commands::Learn { file, scoring } => {
            cmd_learn(&workbench, json_mode, &file, scoring).await
        }
        Commands::Query {
            file,
            edges,
            scoring,
            estimator,
            evidence,
        } => {
            cmd_query(
                &workbench, json_mode, &file, &edges, scoring, estimator, &evidence,
            )
            .await
        }
        Commands::Build { model, evidence } => {
            cmd_build(&workbench, json_mode, &model, &evidence).await
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
