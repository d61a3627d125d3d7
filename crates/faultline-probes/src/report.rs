use chrono::{DateTime, Utc};
use faultline_core::{ExperimentVerdict, ProbeMode, ResultSet, Verdict, VerdictSlot};
use serde::Serialize;
use std::collections::BTreeMap;

/// Human-facing rendering of a slot verdict
pub fn decorate(verdict: Verdict) -> &'static str {
    match verdict {
        Verdict::Passed => "Passed 👍",
        Verdict::Failed => "Better Luck Next Time 👎",
        Verdict::Awaited => "Awaited",
    }
}

/// One probe as shown to the user
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeReportRow {
    pub name: String,
    #[serde(rename = "type")]
    pub probe_type: String,
    pub mode: ProbeMode,
    pub run_count: u32,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub run_id: String,
    pub status: BTreeMap<VerdictSlot, &'static str>,
}

/// A failed slot and, for sampled probes, the error that failed it
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureRecord {
    pub probe_name: String,
    pub probe_type: String,
    pub slot: VerdictSlot,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Summary of a probe run
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeReport {
    pub experiment: String,
    pub generated_at: DateTime<Utc>,
    pub probes: Vec<ProbeReportRow>,
    pub passed_probe_count: u32,
    pub probe_success_percentage: u32,
    pub verdict: ExperimentVerdict,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<FailureRecord>,
}

impl ProbeReport {
    pub fn from_result(experiment: &str, result: &ResultSet) -> Self {
        let mut failures = Vec::new();
        let probes = result
            .probe_details
            .iter()
            .map(|record| {
                for (slot, verdict) in &record.status {
                    if *verdict == Verdict::Failed {
                        failures.push(FailureRecord {
                            probe_name: record.name.clone(),
                            probe_type: record.probe_type.clone(),
                            slot: *slot,
                            message: record.continuous_error.clone(),
                        });
                    }
                }
                ProbeReportRow {
                    name: record.name.clone(),
                    probe_type: record.probe_type.clone(),
                    mode: record.mode,
                    run_count: record.run_count,
                    run_id: record.run_id.clone(),
                    status: record
                        .status
                        .iter()
                        .map(|(slot, verdict)| (*slot, decorate(*verdict)))
                        .collect(),
                }
            })
            .collect();

        Self {
            experiment: experiment.to_string(),
            generated_at: Utc::now(),
            probes,
            passed_probe_count: result.passed_probe_count,
            probe_success_percentage: result.probe_success_percentage(),
            verdict: result.verdict(),
            failures,
        }
    }

    /// Compact one-line summary for logs
    pub fn summary(&self) -> String {
        format!(
            "experiment {}: {}/{} probe(s) passed ({}%), verdict {}",
            self.experiment,
            self.passed_probe_count,
            self.probes.len(),
            self.probe_success_percentage,
            self.verdict
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use faultline_core::ProbeDeclaration;

    fn result_set() -> ResultSet {
        let probes = vec![
            ProbeDeclaration::new("pods-ready", "k8sProbe", ProbeMode::StartOfTest),
            ProbeDeclaration::new("frontend", "httpProbe", ProbeMode::Continuous),
        ];
        let mut set = ResultSet::initialize(&probes).unwrap();
        set.probe_details[0].resolve(VerdictSlot::PreChaos, Verdict::Passed);
        set.probe_details[0].run_count = 1;
        set.passed_probe_count = 1;
        set.probe_details[1].resolve(VerdictSlot::Continuous, Verdict::Failed);
        set.probe_details[1].continuous_error = Some("HTTP 503".to_string());
        set
    }

    #[test]
    fn test_decorate() {
        assert_eq!(decorate(Verdict::Passed), "Passed 👍");
        assert_eq!(decorate(Verdict::Failed), "Better Luck Next Time 👎");
        assert_eq!(decorate(Verdict::Awaited), "Awaited");
    }

    #[test]
    fn test_report_from_result() {
        let report = ProbeReport::from_result("node-drain", &result_set());

        assert_eq!(report.probes.len(), 2);
        assert_eq!(report.passed_probe_count, 1);
        assert_eq!(report.probe_success_percentage, 50);
        assert_eq!(report.verdict, ExperimentVerdict::Fail);
        assert_eq!(
            report.probes[0].status.get(&VerdictSlot::PreChaos),
            Some(&"Passed 👍")
        );

        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].probe_name, "frontend");
        assert_eq!(report.failures[0].slot, VerdictSlot::Continuous);
        assert_eq!(report.failures[0].message.as_deref(), Some("HTTP 503"));

        assert_eq!(
            report.summary(),
            "experiment node-drain: 1/2 probe(s) passed (50%), verdict Fail"
        );
    }

    #[test]
    fn test_report_serializes_decorated_statuses() {
        let report = ProbeReport::from_result("node-drain", &result_set());
        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(json["probes"][0]["type"], "k8sProbe");
        assert_eq!(json["probes"][0]["mode"], "SOT");
        assert_eq!(
            json["probes"][1]["status"]["Continuous"],
            "Better Luck Next Time 👎"
        );
        assert_eq!(json["probeSuccessPercentage"], 50);
        assert!(json.get("generatedAt").is_some());
    }

    #[test]
    fn test_empty_run_reports_full_success() {
        let report = ProbeReport::from_result("node-drain", &ResultSet::default());
        assert_eq!(report.probe_success_percentage, 100);
        assert!(report.failures.is_empty());
    }
}
