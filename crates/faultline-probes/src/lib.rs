// Allow unused assignments for diagnostic fields - they're used by the thiserror/miette macros
#![allow(unused_assignments)]

//! Faultline Probes - Probe orchestration and verdict tracking
//!
//! Resolves the probes declared for an experiment, runs them around the fault
//! through kind-specific checks, and decides each probe's verdict.

pub mod api_client;
pub mod check;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod mock;
pub mod report;
pub mod run;
pub mod sampler;
pub mod source;
pub mod template;
pub mod tracker;

// Re-export primary types
pub use api_client::EngineApiClient;
pub use check::{CheckRegistry, ProbeCheck};
pub use config::ProbeRunConfig;
pub use dispatcher::{DispatcherConfig, ProbeDispatcher, SharedDispatcher};
pub use error::{ProbeError, Result};
pub use mock::MockCheck;
pub use report::{decorate, FailureRecord, ProbeReport, ProbeReportRow};
pub use run::ProbeRun;
pub use sampler::{ContinuousSampler, SamplerConfig};
pub use source::{EngineApiSource, ManifestSource, ProbeSource};
pub use template::render_command;
pub use tracker::ProbeTracker;
