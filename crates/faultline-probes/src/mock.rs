use crate::check::ProbeCheck;
use crate::error::{ProbeError, Result};
use crate::tracker::ProbeTracker;
use async_trait::async_trait;
use faultline_core::{Phase, ProbeArtifact, ProbeDeclaration};
use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::debug;

/// Mock probe check for tests and dry runs
///
/// Passes by default. Failures can be queued per probe name, a delay can be
/// set per probe to exercise timeouts, and artifacts can be registered on
/// success so later probes can template against them. If the probe declares
/// `cmdProbe/inputs.command`, the command is rendered against the tracker
/// first and a render failure fails the check.
pub struct MockCheck {
    failures: RwLock<HashMap<String, VecDeque<String>>>,
    artifacts: HashMap<String, ProbeArtifact>,
    delays: HashMap<String, Duration>,
    calls: RwLock<Vec<(String, Phase)>>,
    rendered: RwLock<Vec<String>>,
}

impl MockCheck {
    pub fn new() -> Self {
        Self {
            failures: RwLock::new(HashMap::new()),
            artifacts: HashMap::new(),
            delays: HashMap::new(),
            calls: RwLock::new(Vec::new()),
            rendered: RwLock::new(Vec::new()),
        }
    }

    /// Register `artifact` under `probe_name` whenever that probe passes
    pub fn with_artifact(mut self, probe_name: &str, artifact: ProbeArtifact) -> Self {
        self.artifacts.insert(probe_name.to_string(), artifact);
        self
    }

    /// Sleep before answering for `probe_name`
    pub fn with_delay(mut self, probe_name: &str, delay: Duration) -> Self {
        self.delays.insert(probe_name.to_string(), delay);
        self
    }

    /// Queue a failure for the next check of `probe_name`
    pub async fn fail_next(&self, probe_name: &str, message: impl Into<String>) {
        self.failures
            .write()
            .await
            .entry(probe_name.to_string())
            .or_default()
            .push_back(message.into());
    }

    /// Total number of checks run
    pub async fn calls(&self) -> usize {
        self.calls.read().await.len()
    }

    pub async fn calls_for(&self, probe_name: &str) -> usize {
        self.calls
            .read()
            .await
            .iter()
            .filter(|(name, _)| name == probe_name)
            .count()
    }

    pub async fn phases_for(&self, probe_name: &str) -> Vec<Phase> {
        self.calls
            .read()
            .await
            .iter()
            .filter(|(name, _)| name == probe_name)
            .map(|(_, phase)| *phase)
            .collect()
    }

    /// Commands rendered so far, in order
    pub async fn rendered(&self) -> Vec<String> {
        self.rendered.read().await.clone()
    }
}

impl Default for MockCheck {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProbeCheck for MockCheck {
    async fn check(
        &self,
        probe: &ProbeDeclaration,
        tracker: &ProbeTracker,
        phase: Phase,
    ) -> Result<()> {
        self.calls.write().await.push((probe.name.clone(), phase));
        let run = tracker.increment_run_count(&probe.name).await;
        debug!("Mock: {} check #{} during {}", probe.name, run, phase);

        if let Some(delay) = self.delays.get(&probe.name) {
            tokio::time::sleep(*delay).await;
        }

        let command = probe
            .inputs
            .get("cmdProbe/inputs")
            .and_then(|inputs| inputs.get("command"))
            .and_then(|c| c.as_str());
        if let Some(template) = command {
            let rendered = tracker.render_command(template).await?;
            self.rendered.write().await.push(rendered);
        }

        let failure = self
            .failures
            .write()
            .await
            .get_mut(&probe.name)
            .and_then(|queue| queue.pop_front());
        if let Some(message) = failure {
            return Err(ProbeError::check_failed(
                &probe.name,
                &probe.probe_type,
                phase,
                message,
            ));
        }

        if let Some(artifact) = self.artifacts.get(&probe.name) {
            tracker.register_artifact(&probe.name, artifact.clone()).await;
        }
        Ok(())
    }
}
