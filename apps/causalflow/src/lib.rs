//! # causalflow
//!
//! The workbench client: drives `causalflow-core` against the remote model
//! service.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                 apps/causalflow (THE CLIENT)              │
//! │                                                           │
//! │  ┌──────────┐    ┌─────────────┐    ┌──────────────────┐  │
//! │  │   CLI    │───▶│  Workbench  │───▶│ Backend (reqwest)│──┼──▶ model service
//! │  │  (clap)  │    │ + Notifier  │    └──────────────────┘  │
//! │  └──────────┘    └──────┬──────┘                          │
//! │                         ▼                                 │
//! │                 ┌─────────────────┐                       │
//! │                 │ causalflow-core │                       │
//! │                 │   (THE LOGIC)   │                       │
//! │                 └─────────────────┘                       │
//! └───────────────────────────────────────────────────────────┘
//! ```

pub mod api;
pub mod cli;
pub mod client;
pub mod config;
pub mod notifier;
pub mod workbench;

pub use api::Backend;
pub use client::{CausalFlowClient, ClientError, Operation};
pub use config::{Config, ConfigError};
pub use notifier::Notifier;
pub use workbench::{Workbench, WorkbenchError};
