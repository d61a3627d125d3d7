use crate::check::{CheckRegistry, ProbeCheck};
use crate::error::{ProbeError, Result};
use crate::tracker::ProbeTracker;
use faultline_core::{Checkpoint, Phase, ProbeDeclaration};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Configuration for the probe dispatcher
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Time budget for a check whose probe declares no `probeTimeout`
    pub default_timeout: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            default_timeout: Duration::from_secs(180),
        }
    }
}

/// Runs the probes relevant to an experiment phase and records their verdicts
pub struct ProbeDispatcher {
    registry: CheckRegistry,
    tracker: ProbeTracker,
    config: DispatcherConfig,
}

impl ProbeDispatcher {
    pub fn new(registry: CheckRegistry, tracker: ProbeTracker, config: DispatcherConfig) -> Self {
        Self {
            registry,
            tracker,
            config,
        }
    }

    pub fn tracker(&self) -> &ProbeTracker {
        &self.tracker
    }

    /// Dispatch every probe of `probes` that takes part in `phase`, in order.
    ///
    /// A probe whose type has no registered check aborts the whole call before
    /// any later probe is attempted. Check failures do not stop the loop; they
    /// are collected and returned together once every probe has run.
    pub async fn dispatch(&self, phase: Phase, probes: &[ProbeDeclaration]) -> Result<()> {
        let mut failures = Vec::new();

        for probe in probes {
            let check = self
                .registry
                .resolve(probe)
                .ok_or_else(|| ProbeError::unsupported_kind(&probe.name, &probe.probe_type))?;

            let checkpoint = match probe.mode.checkpoint(phase) {
                Some(c) => c,
                None => continue,
            };

            let outcome = if probe.mode.is_sampled() && checkpoint == Checkpoint::Terminal {
                // Verdict comes from what the sampler saw during the fault window
                Ok(())
            } else {
                self.run_check(check.as_ref(), probe, phase).await
            };

            if let Err(e) = &outcome {
                if probe.mode.is_sampled() {
                    self.tracker
                        .record_continuous_error(&probe.name, &probe.probe_type, e.to_string())
                        .await;
                }
            }

            if let Err(e) = self.tracker.finalize(probe, phase, outcome).await {
                failures.push(e);
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(ProbeError::probes_failed(phase, failures))
        }
    }

    async fn run_check(
        &self,
        check: &dyn ProbeCheck,
        probe: &ProbeDeclaration,
        phase: Phase,
    ) -> Result<()> {
        let timeout = probe.timeout().unwrap_or(self.config.default_timeout);
        debug!(
            probe_name = %probe.name,
            probe_type = %probe.probe_type,
            probe_phase = %phase,
            "Running {} probe check (mode {}, timeout {:?})",
            probe.probe_type,
            probe.mode,
            timeout
        );

        match tokio::time::timeout(timeout, check.check(probe, &self.tracker, phase)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(ProbeError::check_timed_out(
                &probe.name,
                &probe.probe_type,
                timeout.as_secs(),
            )),
        }
    }
}

/// Dispatcher shared between the primary flow and the sampler
pub type SharedDispatcher = Arc<ProbeDispatcher>;
