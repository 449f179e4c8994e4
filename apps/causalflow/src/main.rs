//! # CausalFlow CLI
//!
//! Runs workbench workflows against a model service from the command line.
//!
//! ## Usage
//!
//! ```bash
//! # Is the service up?
//! causalflow health
//!
//! # Upload a dataset and learn its structure
//! causalflow learn -f weather.csv --scoring bdeu
//!
//! # Train on chosen edges and query with evidence
//! causalflow query -f weather.csv -e Rain:Sprinkler -E Rain=Yes
//!
//! # Build a model from priors and query it
//! causalflow build -m model.json -E Cloudy=T
//! ```
//!
//! Logs go to stderr (`RUST_LOG`, `CAUSALFLOW_LOG_FORMAT=json|text`);
//! results go to stdout.

use causalflow::cli;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    // CAUSALFLOW_LOG_FORMAT=json enables machine-parseable output.
    let log_format =
        std::env::var("CAUSALFLOW_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "causalflow=info,causalflow_core=info".into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    let cli = cli::Cli::parse();

    if let Err(e) = cli::execute(cli).await {
        tracing::error!("Error: {}", e);
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
