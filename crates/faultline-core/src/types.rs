use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Probe kinds understood by the dispatcher
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProbeKind {
    /// Reads a cluster resource and checks its state
    ClusterState,
    /// Issues an HTTP request
    Http,
    /// Runs a command, optionally in a helper pod
    Command,
    /// Queries a metrics backend
    MetricsQuery,
}

impl ProbeKind {
    pub const ALL: [ProbeKind; 4] = [
        ProbeKind::ClusterState,
        ProbeKind::Http,
        ProbeKind::Command,
        ProbeKind::MetricsQuery,
    ];

    /// Match a declared probe type, ignoring case
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "k8sprobe" => Some(ProbeKind::ClusterState),
            "httpprobe" => Some(ProbeKind::Http),
            "cmdprobe" => Some(ProbeKind::Command),
            "promprobe" => Some(ProbeKind::MetricsQuery),
            _ => None,
        }
    }

    /// Canonical declaration string
    pub fn as_str(&self) -> &'static str {
        match self {
            ProbeKind::ClusterState => "k8sProbe",
            ProbeKind::Http => "httpProbe",
            ProbeKind::Command => "cmdProbe",
            ProbeKind::MetricsQuery => "promProbe",
        }
    }
}

impl fmt::Display for ProbeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Experiment stage a dispatch belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    PreChaos,
    /// A sampling tick inside the fault window
    DuringChaos,
    PostChaos,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::PreChaos => "PreChaos",
            Phase::DuringChaos => "DuringChaos",
            Phase::PostChaos => "PostChaos",
        };
        write!(f, "{}", s)
    }
}

/// Status key of a probe record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum VerdictSlot {
    PreChaos,
    PostChaos,
    Continuous,
    OnChaos,
}

impl fmt::Display for VerdictSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            VerdictSlot::PreChaos => "PreChaos",
            VerdictSlot::PostChaos => "PostChaos",
            VerdictSlot::Continuous => "Continuous",
            VerdictSlot::OnChaos => "OnChaos",
        };
        write!(f, "{}", s)
    }
}

/// Verdict of one status slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Verdict {
    #[default]
    Awaited,
    Passed,
    Failed,
}

impl Verdict {
    pub fn is_resolved(&self) -> bool {
        !matches!(self, Verdict::Awaited)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Verdict::Awaited => "Awaited",
            Verdict::Passed => "Passed",
            Verdict::Failed => "Failed",
        };
        write!(f, "{}", s)
    }
}

/// Whether a check at a given phase settles the probe or only samples it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Checkpoint {
    Provisional,
    Terminal,
}

/// Timing policy of a probe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ProbeMode {
    /// Checked once before the fault (`SOT`)
    StartOfTest,
    /// Checked once after the fault (`EOT`)
    EndOfTest,
    /// Checked before and after the fault
    Edge,
    /// Sampled from before the fault until after it
    Continuous,
    /// Sampled during the fault window only (`OnChaos`)
    OnFault,
}

impl ProbeMode {
    /// Parse a declared mode, ignoring case. Long names are accepted as aliases.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "sot" | "startoftest" => Some(ProbeMode::StartOfTest),
            "eot" | "endoftest" => Some(ProbeMode::EndOfTest),
            "edge" => Some(ProbeMode::Edge),
            "continuous" => Some(ProbeMode::Continuous),
            "onchaos" | "onfault" => Some(ProbeMode::OnFault),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProbeMode::StartOfTest => "SOT",
            ProbeMode::EndOfTest => "EOT",
            ProbeMode::Edge => "Edge",
            ProbeMode::Continuous => "Continuous",
            ProbeMode::OnFault => "OnChaos",
        }
    }

    /// Status keys a record in this mode carries for its whole life
    pub fn seeded_slots(&self) -> &'static [VerdictSlot] {
        match self {
            ProbeMode::StartOfTest => &[VerdictSlot::PreChaos],
            ProbeMode::EndOfTest => &[VerdictSlot::PostChaos],
            ProbeMode::Edge => &[VerdictSlot::PreChaos, VerdictSlot::PostChaos],
            ProbeMode::Continuous => &[VerdictSlot::Continuous],
            ProbeMode::OnFault => &[VerdictSlot::OnChaos],
        }
    }

    /// Checkpoint this mode has at `phase`, or `None` if the probe is not
    /// dispatched in that phase.
    pub fn checkpoint(&self, phase: Phase) -> Option<Checkpoint> {
        use Checkpoint::*;
        match (self, phase) {
            (ProbeMode::StartOfTest, Phase::PreChaos) => Some(Terminal),
            (ProbeMode::EndOfTest, Phase::PostChaos) => Some(Terminal),
            (ProbeMode::Edge, Phase::PreChaos) => Some(Provisional),
            (ProbeMode::Edge, Phase::PostChaos) => Some(Terminal),
            (ProbeMode::Continuous, Phase::PreChaos | Phase::DuringChaos) => Some(Provisional),
            (ProbeMode::Continuous, Phase::PostChaos) => Some(Terminal),
            (ProbeMode::OnFault, Phase::DuringChaos) => Some(Provisional),
            (ProbeMode::OnFault, Phase::PostChaos) => Some(Terminal),
            _ => None,
        }
    }

    /// Status key written by a check at `phase`
    pub fn slot_for(&self, phase: Phase) -> Option<VerdictSlot> {
        match self {
            ProbeMode::StartOfTest | ProbeMode::EndOfTest | ProbeMode::Edge => match phase {
                Phase::PreChaos => Some(VerdictSlot::PreChaos),
                Phase::PostChaos => Some(VerdictSlot::PostChaos),
                Phase::DuringChaos => None,
            },
            ProbeMode::Continuous => Some(VerdictSlot::Continuous),
            ProbeMode::OnFault => Some(VerdictSlot::OnChaos),
        }
    }

    /// True when each phase writes its own status key. Continuous and OnChaos
    /// probes share one key across all their checks.
    pub fn is_phase_scoped(&self) -> bool {
        matches!(
            self,
            ProbeMode::StartOfTest | ProbeMode::EndOfTest | ProbeMode::Edge
        )
    }

    /// Whether a passing check at `phase` contributes to the passed count
    pub fn counts_at(&self, phase: Phase) -> bool {
        match self {
            ProbeMode::StartOfTest | ProbeMode::EndOfTest => true,
            ProbeMode::Edge | ProbeMode::Continuous => phase != Phase::PreChaos,
            ProbeMode::OnFault => phase != Phase::DuringChaos,
        }
    }

    /// Probes sampled repeatedly inside the fault window
    pub fn is_sampled(&self) -> bool {
        matches!(self, ProbeMode::Continuous | ProbeMode::OnFault)
    }
}

impl fmt::Display for ProbeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<String> for ProbeMode {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        ProbeMode::parse(&value).ok_or_else(|| CoreError::invalid_mode(value))
    }
}

impl From<ProbeMode> for String {
    fn from(mode: ProbeMode) -> Self {
        mode.as_str().to_string()
    }
}
