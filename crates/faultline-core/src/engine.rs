use crate::types::{ProbeKind, ProbeMode};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// The declarative resource that attaches probes to experiments
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChaosEngine {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: ChaosEngineSpec,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChaosEngineSpec {
    #[serde(default)]
    pub experiments: Vec<ExperimentEntry>,
}

/// One experiment listed in an engine
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExperimentEntry {
    pub name: String,
    #[serde(default)]
    pub spec: ExperimentAttributes,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExperimentAttributes {
    #[serde(default)]
    pub probe: Vec<ProbeDeclaration>,
}

impl ChaosEngine {
    /// Probes declared for `experiment`. If the experiment is listed more than
    /// once the last entry wins; an unlisted experiment has no probes.
    pub fn probes_for(&self, experiment: &str) -> Vec<ProbeDeclaration> {
        self.spec
            .experiments
            .iter()
            .rev()
            .find(|e| e.name == experiment)
            .map(|e| e.spec.probe.clone())
            .unwrap_or_default()
    }
}

/// A user-declared probe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeDeclaration {
    pub name: String,
    /// Declared kind, kept verbatim; matched case-insensitively at dispatch
    #[serde(rename = "type")]
    pub probe_type: String,
    pub mode: ProbeMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_properties: Option<RunProperties>,
    /// Kind-specific configuration (`httpProbe/inputs`, `cmdProbe/inputs`, ...)
    #[serde(flatten)]
    pub inputs: BTreeMap<String, serde_json::Value>,
}

impl ProbeDeclaration {
    pub fn new(name: impl Into<String>, probe_type: impl Into<String>, mode: ProbeMode) -> Self {
        Self {
            name: name.into(),
            probe_type: probe_type.into(),
            mode,
            run_properties: None,
            inputs: BTreeMap::new(),
        }
    }

    /// Recognized kind, or `None` for an unsupported type string
    pub fn kind(&self) -> Option<ProbeKind> {
        ProbeKind::parse(&self.probe_type)
    }

    /// Per-check time budget, when the declaration sets one
    pub fn timeout(&self) -> Option<Duration> {
        self.run_properties
            .as_ref()
            .and_then(|p| p.probe_timeout)
            .map(Duration::from_secs)
    }
}

/// Retry and timing budgets handed to the kind-specific check.
/// All durations are in seconds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probe_timeout: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probe_polling_interval: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_delay_seconds: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const ENGINE: &str = r#"
apiVersion: litmuschaos.io/v1alpha1
kind: ChaosEngine
metadata:
  name: nginx-chaos
  namespace: litmus
spec:
  experiments:
    - name: pod-io-stress
      spec:
        probe:
          - name: check-frontend
            type: httpProbe
            mode: Continuous
            httpProbe/inputs:
              url: http://frontend:8080/healthz
            runProperties:
              probeTimeout: 5
              interval: 2
              retry: 1
          - name: count-replicas
            type: cmdProbe
            mode: edge
            cmdProbe/inputs:
              command: "kubectl get deploy nginx -o jsonpath={.status.readyReplicas}"
    - name: node-drain
      spec:
        probe: []
"#;

    #[test]
    fn test_parse_engine_manifest() {
        let engine: ChaosEngine = serde_yaml::from_str(ENGINE).unwrap();
        assert_eq!(engine.metadata.name.as_deref(), Some("nginx-chaos"));
        assert_eq!(engine.spec.experiments.len(), 2);

        let probes = engine.probes_for("pod-io-stress");
        assert_eq!(probes.len(), 2);
        assert_eq!(probes[0].name, "check-frontend");
        assert_eq!(probes[0].kind(), Some(ProbeKind::Http));
        assert_eq!(probes[0].mode, ProbeMode::Continuous);
        assert_eq!(probes[0].timeout(), Some(Duration::from_secs(5)));
        assert!(probes[0].inputs.contains_key("httpProbe/inputs"));
        assert_eq!(probes[1].mode, ProbeMode::Edge);
        assert_eq!(probes[1].timeout(), None);
    }

    #[test]
    fn test_probes_for_unlisted_or_empty_experiment() {
        let engine: ChaosEngine = serde_yaml::from_str(ENGINE).unwrap();
        assert!(engine.probes_for("node-drain").is_empty());
        assert!(engine.probes_for("pod-delete").is_empty());
    }

    #[test]
    fn test_last_listed_experiment_wins() {
        let mut engine = ChaosEngine::default();
        for probe in ["first", "second"] {
            engine.spec.experiments.push(ExperimentEntry {
                name: "node-drain".to_string(),
                spec: ExperimentAttributes {
                    probe: vec![ProbeDeclaration::new(probe, "k8sProbe", ProbeMode::EndOfTest)],
                },
            });
        }

        let probes = engine.probes_for("node-drain");
        assert_eq!(probes.len(), 1);
        assert_eq!(probes[0].name, "second");
    }

    #[test]
    fn test_unknown_type_is_kept_verbatim() {
        let yaml = "name: odd\ntype: xProbe\nmode: SOT\n";
        let probe: ProbeDeclaration = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(probe.probe_type, "xProbe");
        assert_eq!(probe.kind(), None);
    }

    #[test]
    fn test_unknown_mode_is_rejected() {
        let yaml = "name: odd\ntype: httpProbe\nmode: sometimes\n";
        assert!(serde_yaml::from_str::<ProbeDeclaration>(yaml).is_err());
    }
}
