use crate::error::{ProbeError, Result};
use crate::template::render_command;
use faultline_core::{
    Checkpoint, Phase, ProbeArtifact, ProbeDeclaration, ResultSet, Verdict, VerdictSlot,
};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

/// Shared verdict state for one experiment run
///
/// Cheap to clone; every clone points at the same result set. The primary
/// phase flow and the fault-window sampler both mutate it, always through the
/// write lock.
#[derive(Clone)]
pub struct ProbeTracker {
    result: Arc<RwLock<ResultSet>>,
}

impl ProbeTracker {
    /// Build one Awaited record per declared probe. Called once per run.
    pub fn initialize(probes: &[ProbeDeclaration]) -> Result<Self> {
        let result = ResultSet::initialize(probes)?;
        info!("Initialized verdict tracking for {} probe(s)", probes.len());
        Ok(Self {
            result: Arc::new(RwLock::new(result)),
        })
    }

    /// Wrap an existing result set, e.g. one loaded back from a report
    pub fn from_result(result: ResultSet) -> Self {
        Self {
            result: Arc::new(RwLock::new(result)),
        }
    }

    /// Increment and return the run count of the first probe called `name`.
    /// Returns 0 for an unknown probe.
    pub async fn increment_run_count(&self, name: &str) -> u32 {
        let mut result = self.result.write().await;
        match result.get_by_name_mut(name) {
            Some(record) => {
                record.run_count += 1;
                record.run_count
            }
            None => 0,
        }
    }

    /// Store the run ID of a probe, replacing any previous one
    pub async fn set_run_id(&self, name: &str, probe_type: &str, run_id: impl Into<String>) {
        let mut result = self.result.write().await;
        if let Some(record) = result.get_mut(name, probe_type) {
            record.run_id = run_id.into();
        }
    }

    /// Run ID of a probe, empty if never set
    pub async fn run_id(&self, name: &str, probe_type: &str) -> String {
        let result = self.result.read().await;
        result
            .get(name, probe_type)
            .map(|r| r.run_id.clone())
            .unwrap_or_default()
    }

    /// Generate a short random run ID, store it and return it
    pub async fn assign_run_id(&self, name: &str, probe_type: &str) -> String {
        let run_id = uuid::Uuid::new_v4().simple().to_string()[..8].to_string();
        self.set_run_id(name, probe_type, run_id.clone()).await;
        run_id
    }

    /// Register (or overwrite) the artifacts produced by `probe_name`
    pub async fn register_artifact(&self, probe_name: &str, artifact: ProbeArtifact) {
        let mut result = self.result.write().await;
        result
            .probe_artifacts
            .insert(probe_name.to_string(), artifact);
    }

    /// Render a templated probe parameter against the artifacts registered so far
    pub async fn render_command(&self, template: &str) -> Result<String> {
        let result = self.result.read().await;
        render_command(template, &result.probe_artifacts)
    }

    /// Record a fault-window sampling failure. The first error is kept.
    pub async fn record_continuous_error(
        &self,
        name: &str,
        probe_type: &str,
        message: impl Into<String>,
    ) {
        let mut result = self.result.write().await;
        if let Some(record) = result.get_mut(name, probe_type) {
            if record.continuous_error.is_none() {
                record.continuous_error = Some(message.into());
            }
        }
    }

    pub async fn continuous_error(&self, name: &str, probe_type: &str) -> Option<String> {
        let result = self.result.read().await;
        result
            .get(name, probe_type)
            .and_then(|r| r.continuous_error.clone())
    }

    /// Turn the outcome of one check into a verdict and, at the probe's
    /// terminal checkpoint, into a passed count.
    ///
    /// Failures mark the phase's slot Failed and are handed back to the caller.
    /// Continuous and OnChaos probes share a single slot across their samples,
    /// so a passing sample at a provisional checkpoint leaves that slot Awaited;
    /// at the terminal checkpoint the error recorded by the sampler, if any,
    /// decides the outcome.
    pub async fn finalize(
        &self,
        probe: &ProbeDeclaration,
        phase: Phase,
        outcome: Result<()>,
    ) -> Result<()> {
        let mode = probe.mode;
        let (slot, checkpoint) = match (mode.slot_for(phase), mode.checkpoint(phase)) {
            (Some(slot), Some(checkpoint)) => (slot, checkpoint),
            _ => return outcome,
        };

        let mut result = self.result.write().await;
        let record = result
            .get_mut(&probe.name, &probe.probe_type)
            .ok_or_else(|| ProbeError::probe_not_found(&probe.name, &probe.probe_type))?;

        let outcome = match outcome {
            Ok(()) if mode.is_sampled() && checkpoint == Checkpoint::Terminal => {
                if record.continuous_error.is_none() && !record.sampled {
                    record.continuous_error =
                        Some("no sample was taken while the fault was active".to_string());
                }
                match &record.continuous_error {
                    Some(message) => Err(ProbeError::check_failed(
                        &probe.name,
                        &probe.probe_type,
                        phase,
                        message.clone(),
                    )),
                    None => Ok(()),
                }
            }
            outcome => outcome,
        };

        if let Err(e) = outcome {
            record.resolve(slot, Verdict::Failed);
            error!(
                probe_name = %probe.name,
                probe_type = %probe.probe_type,
                probe_phase = %phase,
                probe_status = "Failed",
                "[Probe]: {} probe has been Failed: {}",
                probe.name,
                e
            );
            return Err(e);
        }

        if !mode.is_phase_scoped() && checkpoint == Checkpoint::Provisional {
            record.sampled = true;
            debug!(
                probe_name = %probe.name,
                probe_type = %probe.probe_type,
                probe_phase = %phase,
                "[Probe]: {} sample passed, verdict deferred to the end of the fault window",
                probe.name
            );
            return Ok(());
        }

        if !record.resolve(slot, Verdict::Passed) {
            debug!(
                "[Probe]: {} already has a {} verdict for {}, keeping it",
                probe.name,
                record.verdict(slot).unwrap_or_default(),
                slot
            );
            return Ok(());
        }

        if mode.counts_at(phase) {
            result.passed_probe_count += 1;
        }

        info!(
            probe_name = %probe.name,
            probe_type = %probe.probe_type,
            probe_phase = %phase,
            probe_status = "Passed",
            "[Probe]: {} probe has been Passed",
            probe.name
        );
        Ok(())
    }

    /// Fail every verdict still Awaited. Safe to call more than once.
    pub async fn sweep(&self) -> usize {
        let mut result = self.result.write().await;
        let swept = result.sweep();
        if swept > 0 {
            warn!("Marked {} unresolved probe verdict(s) as Failed", swept);
        }
        swept
    }

    pub async fn verdict(&self, name: &str, probe_type: &str, slot: VerdictSlot) -> Option<Verdict> {
        let result = self.result.read().await;
        result.get(name, probe_type).and_then(|r| r.verdict(slot))
    }

    pub async fn passed_probe_count(&self) -> u32 {
        self.result.read().await.passed_probe_count
    }

    /// Copy of the current result set for reporting
    pub async fn snapshot(&self) -> ResultSet {
        self.result.read().await.clone()
    }
}
