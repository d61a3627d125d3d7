use faultline_core::Phase;
use miette::Diagnostic;
use thiserror::Error;

/// Error type for probe resolution, dispatch and verdict tracking
#[derive(Error, Debug, Diagnostic)]
pub enum ProbeError {
    /// Probe declarations could not be fetched
    #[error("Failed to fetch probes from chaosengine '{engine}': {message}")]
    #[diagnostic(
        code(faultline::probes::fetch_failed),
        help("Verify the chaosengine exists in the chaos namespace and the API server is reachable. No verdicts are produced for this run")
    )]
    FetchFailed {
        #[allow(unused)]
        engine: String,
        #[allow(unused)]
        message: String,
    },

    /// Declared probe type has no registered check
    #[error("No supported probe type found for probe '{name}', type: {probe_type}")]
    #[diagnostic(
        code(faultline::probes::unsupported_kind),
        help("Supported types: k8sProbe, httpProbe, cmdProbe, promProbe. Remaining probes of this phase were not attempted")
    )]
    UnsupportedKind {
        #[allow(unused)]
        name: String,
        #[allow(unused)]
        probe_type: String,
    },

    /// A probe check returned an error
    #[error("Probe '{name}' ({probe_type}) failed during {phase}: {message}")]
    #[diagnostic(
        code(faultline::probes::check_failed),
        help("The success condition was not met within the probe's retry and timeout budget. Check the probe target and its inputs")
    )]
    CheckFailed {
        #[allow(unused)]
        name: String,
        #[allow(unused)]
        probe_type: String,
        #[allow(unused)]
        phase: Phase,
        #[allow(unused)]
        message: String,
    },

    /// A probe check exceeded its time budget
    #[error("Probe '{name}' ({probe_type}) timed out after {timeout_secs}s")]
    #[diagnostic(
        code(faultline::probes::check_timed_out),
        help("Raise runProperties.probeTimeout for this probe, or verify the target responds in time")
    )]
    CheckTimedOut {
        #[allow(unused)]
        name: String,
        #[allow(unused)]
        probe_type: String,
        #[allow(unused)]
        timeout_secs: u64,
    },

    /// Templated probe parameter could not be rendered
    #[error("Failed to render template '{template}': {message}")]
    #[diagnostic(
        code(faultline::probes::render_failed),
        help("Each reference names a probe and a field of its registered artifacts, e.g. .probe-name.field inside double braces. The probe must have run earlier in the experiment")
    )]
    RenderFailed {
        #[allow(unused)]
        template: String,
        #[allow(unused)]
        message: String,
    },

    /// One or more probes failed during a phase
    #[error("{count} probe(s) failed during {phase}")]
    #[diagnostic(
        code(faultline::probes::probes_failed),
        help("Every probe of the phase was attempted. See the related errors for each failing probe")
    )]
    ProbesFailed {
        #[allow(unused)]
        phase: Phase,
        #[allow(unused)]
        count: usize,
        #[related]
        failures: Vec<ProbeError>,
    },

    /// The fault-window sampler task died before it was stopped
    #[error("Probe sampler aborted: {message}")]
    #[diagnostic(
        code(faultline::probes::sampler_aborted),
        help("A check panicked or was cancelled while sampling. Continuous and OnChaos verdicts of this run are not trustworthy and were swept to Failed")
    )]
    SamplerAborted {
        #[allow(unused)]
        message: String,
    },

    /// No record is tracked for the probe
    #[error("Probe not tracked: {name} ({probe_type})")]
    #[diagnostic(
        code(faultline::probes::probe_not_found),
        help("Probes must be part of the list the tracker was initialized from")
    )]
    ProbeNotFound {
        #[allow(unused)]
        name: String,
        #[allow(unused)]
        probe_type: String,
    },

    /// Core library error
    #[error(transparent)]
    #[diagnostic(transparent)]
    CoreError(#[from] faultline_core::CoreError),
}

/// Result type alias for probe operations
pub type Result<T> = std::result::Result<T, ProbeError>;

impl ProbeError {
    pub fn fetch_failed(engine: impl Into<String>, message: impl Into<String>) -> Self {
        Self::FetchFailed {
            engine: engine.into(),
            message: message.into(),
        }
    }

    pub fn unsupported_kind(name: impl Into<String>, probe_type: impl Into<String>) -> Self {
        Self::UnsupportedKind {
            name: name.into(),
            probe_type: probe_type.into(),
        }
    }

    pub fn check_failed(
        name: impl Into<String>,
        probe_type: impl Into<String>,
        phase: Phase,
        message: impl Into<String>,
    ) -> Self {
        Self::CheckFailed {
            name: name.into(),
            probe_type: probe_type.into(),
            phase,
            message: message.into(),
        }
    }

    pub fn check_timed_out(
        name: impl Into<String>,
        probe_type: impl Into<String>,
        timeout_secs: u64,
    ) -> Self {
        Self::CheckTimedOut {
            name: name.into(),
            probe_type: probe_type.into(),
            timeout_secs,
        }
    }

    pub fn render_failed(template: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RenderFailed {
            template: template.into(),
            message: message.into(),
        }
    }

    pub fn probes_failed(phase: Phase, failures: Vec<ProbeError>) -> Self {
        Self::ProbesFailed {
            phase,
            count: failures.len(),
            failures,
        }
    }

    pub fn sampler_aborted(message: impl Into<String>) -> Self {
        Self::SamplerAborted {
            message: message.into(),
        }
    }

    pub fn probe_not_found(name: impl Into<String>, probe_type: impl Into<String>) -> Self {
        Self::ProbeNotFound {
            name: name.into(),
            probe_type: probe_type.into(),
        }
    }
}
