use crate::check::CheckRegistry;
use crate::config::ProbeRunConfig;
use crate::dispatcher::{ProbeDispatcher, SharedDispatcher};
use crate::error::{ProbeError, Result};
use crate::report::ProbeReport;
use crate::sampler::{ContinuousSampler, SamplerConfig};
use crate::source::ProbeSource;
use crate::tracker::ProbeTracker;
use faultline_core::{Phase, ProbeDeclaration};
use std::future::Future;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Probe lifecycle of one experiment run
///
/// Drives the declared probes through the pre-chaos checks, the fault-window
/// sampler and the post-chaos checks, then sweeps what is left unresolved.
pub struct ProbeRun {
    experiment: String,
    probes: Vec<ProbeDeclaration>,
    dispatcher: SharedDispatcher,
    sampler_config: SamplerConfig,
}

impl ProbeRun {
    /// Resolve the experiment's probes and initialize verdict tracking.
    ///
    /// A fetch failure is fatal: no tracker is built and nothing is reported.
    pub async fn prepare(
        source: &dyn ProbeSource,
        registry: CheckRegistry,
        config: &ProbeRunConfig,
    ) -> Result<Self> {
        let probes = source.fetch(&config.experiment_name).await?;
        let tracker = ProbeTracker::initialize(&probes)?;
        let dispatcher = Arc::new(ProbeDispatcher::new(
            registry,
            tracker,
            config.dispatcher_config(),
        ));

        Ok(Self {
            experiment: config.experiment_name.clone(),
            probes,
            dispatcher,
            sampler_config: config.sampler_config(),
        })
    }

    pub fn probes(&self) -> &[ProbeDeclaration] {
        &self.probes
    }

    pub fn tracker(&self) -> &ProbeTracker {
        self.dispatcher.tracker()
    }

    /// Checks before the fault: SOT, Edge and the first Continuous sample
    pub async fn pre_chaos(&self) -> Result<()> {
        self.dispatcher.dispatch(Phase::PreChaos, &self.probes).await
    }

    /// Spawn the fault-window sampler; it stops when `token` is cancelled
    pub fn start_sampler(&self, token: CancellationToken) -> JoinHandle<Result<()>> {
        let sampler = ContinuousSampler::new(
            self.dispatcher.clone(),
            &self.probes,
            self.sampler_config.clone(),
        );
        tokio::spawn(async move { sampler.run(token).await })
    }

    /// Checks after the fault: EOT, Edge, and the verdicts of sampled probes
    pub async fn post_chaos(&self) -> Result<()> {
        self.dispatcher.dispatch(Phase::PostChaos, &self.probes).await
    }

    /// Fail whatever is still Awaited and report the run
    pub async fn finish(&self) -> ProbeReport {
        self.tracker().sweep().await;
        let report = ProbeReport::from_result(&self.experiment, &self.tracker().snapshot().await);
        info!("{}", report.summary());
        report
    }

    /// Run the whole probe lifecycle around `fault`.
    ///
    /// Failing probes only shape the verdict. An unsupported probe type or a
    /// crashed sampler stops the run; verdicts are swept before the error is
    /// returned.
    pub async fn execute<F>(&self, fault: F) -> Result<ProbeReport>
    where
        F: Future<Output = ()>,
    {
        if let Err(e) = tolerate_probe_failures(self.pre_chaos().await) {
            self.finish().await;
            return Err(e);
        }

        let token = CancellationToken::new();
        let sampler = self.start_sampler(token.clone());

        fault.await;

        token.cancel();
        let sampled = match sampler.await {
            Ok(result) => result,
            Err(e) => {
                error!("Probe sampler task failed: {}", e);
                Err(ProbeError::sampler_aborted(e.to_string()))
            }
        };
        let post = match sampled {
            Ok(()) => tolerate_probe_failures(self.post_chaos().await),
            Err(e) => Err(e),
        };

        let report = self.finish().await;
        post.map(|_| report)
    }
}

/// Per-probe failures are already recorded as verdicts; anything else is fatal
fn tolerate_probe_failures(result: Result<()>) -> Result<()> {
    match result {
        Err(ProbeError::ProbesFailed { phase, count, .. }) => {
            warn!("{} probe(s) failed during {}", count, phase);
            Ok(())
        }
        other => other,
    }
}
