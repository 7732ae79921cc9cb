//! Core library for teampulse.
//!
//! This crate implements the collection pipeline and metrics engine behind
//! the `teampulse` CLI: parallel collectors for the source-control host and
//! the issue tracker, the metrics engine (including the DORA four), and the
//! range-keyed snapshot store the dashboard reads.
//!
//! # Modules
//!
//! - [`config`] - Configuration loading, discovery, and validation
//! - [`error`] - Error taxonomy and result aliases
//! - [`events`] - Event bus for presentation-cache invalidation
//! - [`github`] - Source-control collector (GraphQL, dual-cursor paging)
//! - [`jira`] - Issue-tracker collector (adaptive pagination)
//! - [`mapper`] - PR → release → deployment mapping
//! - [`metrics`] - PR/review/commit, tracker, DORA, and score computations
//! - [`model`] - Domain records the collectors produce
//! - [`pipeline`] - Run orchestration: collect, compute, seal, publish
//! - [`range`] - Date-range spec parsing
//! - [`repo_cache`] - 24-hour disk cache of team repositories
//! - [`scheduler`] - Bounded-parallelism fan-out layers
//! - [`snapshot`] - Snapshot records and the range-keyed store
//!
//! # Quick Start
//!
//! ```no_run
//! use teampulse_core::{Config, ConfigLoader};
//!
//! let config = ConfigLoader::new()
//!     .with_user_config(true)
//!     .load()
//!     .expect("Failed to load configuration");
//!
//! println!("Teams configured: {}", config.teams.len());
//! ```
#![deny(unsafe_code)]

pub mod config;

pub mod error;

pub mod events;

pub mod github;

pub mod jira;

pub mod mapper;

pub mod metrics;

pub mod model;

pub mod pipeline;

pub mod range;

pub mod repo_cache;

pub mod scheduler;

pub mod snapshot;

pub use config::{Config, ConfigLoader, LogLevel};

pub use error::{ConfigError, ConfigResult, PipelineError};

pub use range::DateRange;

// Re-export the cancellation token so downstream crates don't need a
// direct tokio-util dependency.
pub use tokio_util::sync::CancellationToken;
