// Allow unused assignments for diagnostic fields - they're used by the macros
#![allow(unused_assignments)]

use miette::Diagnostic;
use thiserror::Error;

/// Core error type for Faultline operations
#[derive(Error, Debug, Diagnostic)]
pub enum CoreError {
    /// Unknown probe mode in a declaration
    #[error("Unknown probe mode: {mode}")]
    #[diagnostic(
        code(faultline::invalid_mode),
        help("Supported modes: SOT, EOT, Edge, Continuous, OnChaos (case-insensitive)")
    )]
    InvalidMode {
        #[allow(unused)]
        mode: String,
    },

    /// Two declarations share the same (name, type) identity
    #[error("Duplicate probe declaration: {name} ({probe_type})")]
    #[diagnostic(
        code(faultline::duplicate_probe),
        help("Probe names must be unique per probe type within one experiment. Rename one of the '{name}' probes")
    )]
    DuplicateProbe {
        #[allow(unused)]
        name: String,
        #[allow(unused)]
        probe_type: String,
    },

    /// A loaded result set breaks a record invariant
    #[error("Invalid result set: {message}")]
    #[diagnostic(
        code(faultline::invalid_result),
        help("Status keys are fixed by each probe's mode and the passed count cannot exceed the number of probes. Regenerate the result file instead of editing it")
    )]
    InvalidResult {
        #[allow(unused)]
        message: String,
    },

    /// Serialization error
    #[error("Serialization error: {message}")]
    #[diagnostic(
        code(faultline::serialization_error),
        help("Ensure the document is valid JSON or YAML and matches the expected schema")
    )]
    SerializationError {
        #[allow(unused)]
        message: String,
        #[source]
        #[allow(unused)]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

/// Result type alias for Faultline core operations
pub type Result<T> = std::result::Result<T, CoreError>;

impl CoreError {
    /// Create an InvalidMode error
    pub fn invalid_mode(mode: impl Into<String>) -> Self {
        Self::InvalidMode { mode: mode.into() }
    }

    /// Create a DuplicateProbe error
    pub fn duplicate_probe(name: impl Into<String>, probe_type: impl Into<String>) -> Self {
        Self::DuplicateProbe {
            name: name.into(),
            probe_type: probe_type.into(),
        }
    }

    /// Create an InvalidResult error
    pub fn invalid_result(message: impl Into<String>) -> Self {
        Self::InvalidResult {
            message: message.into(),
        }
    }

    /// Create a SerializationError
    pub fn serialization_error(
        message: impl Into<String>,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::SerializationError {
            message: message.into(),
            source,
        }
    }
}
