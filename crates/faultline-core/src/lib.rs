//! Faultline Core - Domain types for probe verdict tracking
//!
//! This crate provides:
//! - Probe declarations as found on a ChaosEngine resource
//! - Probe kinds, timing modes, phases and verdicts
//! - The per-run result set and its invariants
//! - Error types with miette diagnostics
//! - Serialization helpers

pub mod engine;
pub mod error;
pub mod result;
pub mod types;

// Re-export commonly used types
pub use engine::{ChaosEngine, ExperimentEntry, ProbeDeclaration, RunProperties};
pub use error::{CoreError, Result};
pub use result::{ExperimentVerdict, ProbeArtifact, ProbeRecord, ResultSet};
pub use types::{Checkpoint, Phase, ProbeKind, ProbeMode, Verdict, VerdictSlot};

/// Encode an engine manifest, result set or report as compact JSON
pub fn to_json<T: serde::Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(|e| codec_error("encode", "JSON", e))
}

/// Encode as indented JSON, for result files and CLI output
pub fn to_json_pretty<T: serde::Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).map_err(|e| codec_error("encode", "JSON", e))
}

/// Decode a result set, artifact register or engine from JSON
pub fn from_json<T: for<'de> serde::Deserialize<'de>>(data: &str) -> Result<T> {
    serde_json::from_str(data).map_err(|e| codec_error("decode", "JSON", e))
}

pub fn to_yaml<T: serde::Serialize>(value: &T) -> Result<String> {
    serde_yaml::to_string(value).map_err(|e| codec_error("encode", "YAML", e))
}

/// Decode a ChaosEngine manifest (or any other document) from YAML
pub fn from_yaml<T: for<'de> serde::Deserialize<'de>>(data: &str) -> Result<T> {
    serde_yaml::from_str(data).map_err(|e| codec_error("decode", "YAML", e))
}

fn codec_error<E>(action: &str, format: &str, e: E) -> CoreError
where
    E: std::error::Error + Send + Sync + 'static,
{
    CoreError::serialization_error(
        format!("Cannot {} {} document: {}", action, format, e),
        Some(Box::new(e)),
    )
}
