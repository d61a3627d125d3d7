use crate::api_client::EngineApiClient;
use crate::error::{ProbeError, Result};
use async_trait::async_trait;
use faultline_core::{ChaosEngine, ProbeDeclaration};
use std::path::Path;
use tracing::{debug, info};

/// Where probe declarations come from
#[async_trait]
pub trait ProbeSource: Send + Sync {
    /// Probes declared for `experiment`
    ///
    /// An experiment with no declared probes yields an empty list. An
    /// unreachable or malformed store is a `FetchFailed` error.
    async fn fetch(&self, experiment: &str) -> Result<Vec<ProbeDeclaration>>;
}

/// Reads the ChaosEngine from the API server on every fetch
pub struct EngineApiSource {
    client: EngineApiClient,
    namespace: String,
    engine_name: String,
}

impl EngineApiSource {
    pub fn new(client: EngineApiClient, namespace: &str, engine_name: &str) -> Self {
        Self {
            client,
            namespace: namespace.to_string(),
            engine_name: engine_name.to_string(),
        }
    }
}

#[async_trait]
impl ProbeSource for EngineApiSource {
    async fn fetch(&self, experiment: &str) -> Result<Vec<ProbeDeclaration>> {
        debug!(
            "Fetching chaosengine {}/{} from {}",
            self.namespace,
            self.engine_name,
            self.client.base_url()
        );
        let engine = self
            .client
            .get_chaos_engine(&self.namespace, &self.engine_name)
            .await?;
        let probes = engine.probes_for(experiment);
        info!(
            "Resolved {} probe(s) for experiment {} from chaosengine {}",
            probes.len(),
            experiment,
            self.engine_name
        );
        Ok(probes)
    }
}

/// A ChaosEngine manifest loaded up front
pub struct ManifestSource {
    engine: ChaosEngine,
}

impl ManifestSource {
    pub fn new(engine: ChaosEngine) -> Self {
        Self { engine }
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let engine: ChaosEngine = faultline_core::from_yaml(yaml)
            .map_err(|e| ProbeError::fetch_failed("manifest", e.to_string()))?;
        Ok(Self::new(engine))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|e| {
            ProbeError::fetch_failed(
                path.display().to_string(),
                format!("Failed to read manifest: {}", e),
            )
        })?;
        let engine: ChaosEngine = faultline_core::from_yaml(&yaml)
            .map_err(|e| ProbeError::fetch_failed(path.display().to_string(), e.to_string()))?;
        Ok(Self::new(engine))
    }

    pub fn engine(&self) -> &ChaosEngine {
        &self.engine
    }
}

#[async_trait]
impl ProbeSource for ManifestSource {
    async fn fetch(&self, experiment: &str) -> Result<Vec<ProbeDeclaration>> {
        Ok(self.engine.probes_for(experiment))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use faultline_core::ProbeMode;
    use std::io::Write;

    const MANIFEST: &str = r#"
apiVersion: litmuschaos.io/v1alpha1
kind: ChaosEngine
metadata:
  name: nginx-chaos
  namespace: litmus
spec:
  experiments:
    - name: node-drain
      spec:
        probe:
          - name: check-frontend
            type: httpProbe
            mode: Continuous
            runProperties:
              probeTimeout: 5
              interval: 2
          - name: check-pods
            type: k8sProbe
            mode: EOT
    - name: pod-delete
      spec:
        probe: []
"#;

    #[tokio::test]
    async fn test_manifest_source_fetch() {
        let source = ManifestSource::from_yaml_str(MANIFEST).unwrap();

        let probes = source.fetch("node-drain").await.unwrap();
        assert_eq!(probes.len(), 2);
        assert_eq!(probes[0].name, "check-frontend");
        assert_eq!(probes[0].mode, ProbeMode::Continuous);
        assert_eq!(probes[1].mode, ProbeMode::EndOfTest);

        assert!(source.fetch("pod-delete").await.unwrap().is_empty());
        assert!(source.fetch("not-listed").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_manifest_source_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(MANIFEST.as_bytes()).unwrap();

        let source = ManifestSource::from_file(file.path()).unwrap();
        assert_eq!(
            source.engine().metadata.name.as_deref(),
            Some("nginx-chaos")
        );
        assert_eq!(source.fetch("node-drain").await.unwrap().len(), 2);
    }

    #[test]
    fn test_malformed_manifest_is_fetch_error() {
        let bad = "spec:\n  experiments:\n    - name: x\n      spec:\n        probe:\n          - name: p\n            type: httpProbe\n            mode: Sometimes\n";
        let result = ManifestSource::from_yaml_str(bad);
        assert!(matches!(result, Err(ProbeError::FetchFailed { .. })));

        let missing = ManifestSource::from_file("/nonexistent/engine.yaml");
        assert!(matches!(missing, Err(ProbeError::FetchFailed { .. })));
    }

    #[tokio::test]
    async fn test_api_source_unreachable() {
        let source = EngineApiSource::new(
            EngineApiClient::new("http://127.0.0.1:1"),
            "litmus",
            "nginx-chaos",
        );
        let result = source.fetch("node-drain").await;
        assert!(matches!(result, Err(ProbeError::FetchFailed { .. })));
    }
}
