use crate::dispatcher::DispatcherConfig;
use crate::sampler::SamplerConfig;
use std::time::Duration;

/// Settings for one probe run of an experiment
#[derive(Debug, Clone)]
pub struct ProbeRunConfig {
    /// Experiment whose probes are resolved from the engine
    pub experiment_name: String,
    /// Namespace holding the ChaosEngine
    pub chaos_namespace: String,
    /// Name of the ChaosEngine resource
    pub engine_name: String,
    /// Default per-check budget when a probe does not set `probeTimeout`
    pub probe_timeout: Duration,
    /// Delay between fault-window samples
    pub sampling_interval: Duration,
}

impl Default for ProbeRunConfig {
    fn default() -> Self {
        Self {
            experiment_name: "node-drain".to_string(),
            chaos_namespace: "litmus".to_string(),
            engine_name: String::new(),
            probe_timeout: Duration::from_secs(180),
            sampling_interval: Duration::from_secs(2),
        }
    }
}

impl ProbeRunConfig {
    pub fn dispatcher_config(&self) -> DispatcherConfig {
        DispatcherConfig {
            default_timeout: self.probe_timeout,
        }
    }

    pub fn sampler_config(&self) -> SamplerConfig {
        SamplerConfig {
            interval: self.sampling_interval,
        }
    }
}
