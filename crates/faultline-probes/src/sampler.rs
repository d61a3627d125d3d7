use crate::dispatcher::SharedDispatcher;
use crate::error::{ProbeError, Result};
use faultline_core::{Phase, ProbeDeclaration};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Configuration for the fault-window sampler
#[derive(Debug, Clone)]
pub struct SamplerConfig {
    /// Interval between sampling ticks
    pub interval: Duration,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
        }
    }
}

/// Samples Continuous and OnChaos probes while the fault is being injected
///
/// Each tick dispatches `DuringChaos` for the sampled probes that have not
/// failed yet. Failures land in the tracker's continuous-error channel and
/// decide the probe's verdict at the end of the fault window.
pub struct ContinuousSampler {
    dispatcher: SharedDispatcher,
    probes: Vec<ProbeDeclaration>,
    config: SamplerConfig,
}

impl ContinuousSampler {
    pub fn new(
        dispatcher: SharedDispatcher,
        probes: &[ProbeDeclaration],
        config: SamplerConfig,
    ) -> Self {
        Self {
            dispatcher,
            probes: probes
                .iter()
                .filter(|p| p.mode.is_sampled())
                .cloned()
                .collect(),
            config,
        }
    }

    /// Run the sampling loop until `token` is cancelled.
    ///
    /// Returns early with an error only if a sampled probe has an unsupported
    /// type.
    pub async fn run(&self, token: CancellationToken) -> Result<()> {
        if self.probes.is_empty() {
            debug!("No continuous or on-chaos probes to sample");
            return Ok(());
        }

        info!(
            "Starting probe sampler for {} probe(s) (interval: {:?})",
            self.probes.len(),
            self.config.interval
        );

        let mut interval = tokio::time::interval(self.config.interval);

        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => {
                    info!("Probe sampler shutting down");
                    return Ok(());
                }
                _ = interval.tick() => {
                    tokio::select! {
                        biased;
                        _ = token.cancelled() => {
                            info!("Probe sampler cancelled mid-sample");
                            return Ok(());
                        }
                        result = self.sample_once() => result?,
                    }
                }
            }
        }
    }

    /// Run one sampling tick
    pub async fn sample_once(&self) -> Result<()> {
        let tracker = self.dispatcher.tracker();
        let mut pending = Vec::with_capacity(self.probes.len());
        for probe in &self.probes {
            if tracker
                .continuous_error(&probe.name, &probe.probe_type)
                .await
                .is_none()
            {
                pending.push(probe.clone());
            }
        }

        if pending.is_empty() {
            debug!("Every sampled probe has already failed, skipping tick");
            return Ok(());
        }

        match self.dispatcher.dispatch(Phase::DuringChaos, &pending).await {
            Ok(()) => Ok(()),
            Err(ProbeError::ProbesFailed { count, .. }) => {
                warn!("{} sampled probe(s) failed during the fault window", count);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::check::CheckRegistry;
    use crate::dispatcher::{DispatcherConfig, ProbeDispatcher};
    use crate::mock::MockCheck;
    use crate::tracker::ProbeTracker;
    use faultline_core::{ProbeMode, Verdict, VerdictSlot};
    use std::sync::Arc;

    fn setup(
        probes: &[ProbeDeclaration],
        check: Arc<MockCheck>,
    ) -> (SharedDispatcher, ContinuousSampler) {
        let tracker = ProbeTracker::initialize(probes).unwrap();
        let registry = CheckRegistry::new().with_all(check);
        let dispatcher = Arc::new(ProbeDispatcher::new(
            registry,
            tracker,
            DispatcherConfig::default(),
        ));
        let sampler = ContinuousSampler::new(
            dispatcher.clone(),
            probes,
            SamplerConfig {
                interval: Duration::from_secs(1),
            },
        );
        (dispatcher, sampler)
    }

    #[tokio::test(start_paused = true)]
    async fn test_many_samples_count_once() {
        let probes = vec![
            ProbeDeclaration::new("cont", "httpProbe", ProbeMode::Continuous),
            ProbeDeclaration::new("sot", "httpProbe", ProbeMode::StartOfTest),
        ];
        let check = Arc::new(MockCheck::new());
        let (dispatcher, sampler) = setup(&probes, check.clone());

        dispatcher.dispatch(Phase::PreChaos, &probes).await.unwrap();
        assert_eq!(dispatcher.tracker().passed_probe_count().await, 1);

        let token = CancellationToken::new();
        let sampler_token = token.clone();
        let handle = tokio::spawn(async move { sampler.run(sampler_token).await });

        tokio::time::sleep(Duration::from_millis(4500)).await;
        token.cancel();
        handle.await.unwrap().unwrap();

        // One PreChaos check plus at least a few fault-window samples
        assert!(check.calls_for("cont").await >= 4);
        // The SOT probe is never sampled
        assert_eq!(check.calls_for("sot").await, 1);
        assert_eq!(dispatcher.tracker().passed_probe_count().await, 1);

        dispatcher.dispatch(Phase::PostChaos, &probes).await.unwrap();
        assert_eq!(dispatcher.tracker().passed_probe_count().await, 2);
        assert_eq!(
            dispatcher
                .tracker()
                .verdict("cont", "httpProbe", VerdictSlot::Continuous)
                .await,
            Some(Verdict::Passed)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_probe_stops_being_sampled() {
        let probes = vec![ProbeDeclaration::new("onchaos", "cmdProbe", ProbeMode::OnFault)];
        let check = Arc::new(MockCheck::new());
        check.fail_next("onchaos", "pod not ready").await;
        let (dispatcher, sampler) = setup(&probes, check.clone());

        sampler.sample_once().await.unwrap();
        sampler.sample_once().await.unwrap();
        sampler.sample_once().await.unwrap();
        assert_eq!(check.calls_for("onchaos").await, 1);
        assert!(dispatcher
            .tracker()
            .continuous_error("onchaos", "cmdProbe")
            .await
            .is_some());

        let result = dispatcher.dispatch(Phase::PostChaos, &probes).await;
        assert!(result.is_err());
        assert_eq!(
            dispatcher
                .tracker()
                .verdict("onchaos", "cmdProbe", VerdictSlot::OnChaos)
                .await,
            Some(Verdict::Failed)
        );
        assert_eq!(dispatcher.tracker().passed_probe_count().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unsupported_kind_stops_sampler() {
        let probes = vec![ProbeDeclaration::new("odd", "xProbe", ProbeMode::Continuous)];
        let (_dispatcher, sampler) = setup(&probes, Arc::new(MockCheck::new()));

        let result = sampler.run(CancellationToken::new()).await;
        assert!(matches!(result, Err(ProbeError::UnsupportedKind { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_interrupts_slow_sample() {
        let probes = vec![ProbeDeclaration::new("slow", "httpProbe", ProbeMode::OnFault)];
        let check = Arc::new(MockCheck::new().with_delay("slow", Duration::from_secs(3600)));
        let (dispatcher, sampler) = setup(&probes, check);

        let token = CancellationToken::new();
        let sampler_token = token.clone();
        let handle = tokio::spawn(async move { sampler.run(sampler_token).await });

        tokio::time::sleep(Duration::from_secs(5)).await;
        token.cancel();
        handle.await.unwrap().unwrap();

        assert_eq!(dispatcher.tracker().sweep().await, 1);
        assert_eq!(
            dispatcher
                .tracker()
                .verdict("slow", "httpProbe", VerdictSlot::OnChaos)
                .await,
            Some(Verdict::Failed)
        );
    }
}
