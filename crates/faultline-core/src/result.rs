use crate::engine::ProbeDeclaration;
use crate::error::{CoreError, Result};
use crate::types::{ProbeMode, Verdict, VerdictSlot};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Key/value bundle a probe registers for later probes to template against
pub type ProbeArtifact = BTreeMap<String, serde_json::Value>;

/// Verdict tracking for one declared probe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeRecord {
    pub name: String,
    #[serde(rename = "type")]
    pub probe_type: String,
    pub mode: ProbeMode,
    #[serde(default)]
    pub run_count: u32,
    #[serde(default)]
    pub run_id: String,
    pub status: BTreeMap<VerdictSlot, Verdict>,
    /// First failure seen by the fault-window sampler
    #[serde(skip)]
    pub continuous_error: Option<String>,
    /// Set once a Continuous or OnChaos sample has passed
    #[serde(skip)]
    pub sampled: bool,
}

impl ProbeRecord {
    /// Fresh record with every status key of the probe's mode Awaited
    pub fn new(probe: &ProbeDeclaration) -> Self {
        Self {
            name: probe.name.clone(),
            probe_type: probe.probe_type.clone(),
            mode: probe.mode,
            run_count: 0,
            run_id: String::new(),
            status: probe
                .mode
                .seeded_slots()
                .iter()
                .map(|slot| (*slot, Verdict::Awaited))
                .collect(),
            continuous_error: None,
            sampled: false,
        }
    }

    pub fn verdict(&self, slot: VerdictSlot) -> Option<Verdict> {
        self.status.get(&slot).copied()
    }

    /// Move `slot` from Awaited to `verdict`. Returns false, leaving the record
    /// untouched, if the slot is not seeded or already resolved.
    pub fn resolve(&mut self, slot: VerdictSlot, verdict: Verdict) -> bool {
        if !verdict.is_resolved() {
            return false;
        }
        match self.status.get_mut(&slot) {
            Some(current) if !current.is_resolved() => {
                *current = verdict;
                true
            }
            _ => false,
        }
    }

    /// Fail every Awaited slot, returning how many were resolved
    pub fn sweep(&mut self) -> usize {
        let mut swept = 0;
        for verdict in self.status.values_mut() {
            if *verdict == Verdict::Awaited {
                *verdict = Verdict::Failed;
                swept += 1;
            }
        }
        swept
    }
}

/// Overall outcome derived from all probe records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExperimentVerdict {
    Pass,
    Fail,
    Awaited,
}

impl fmt::Display for ExperimentVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ExperimentVerdict::Pass => "Pass",
            ExperimentVerdict::Fail => "Fail",
            ExperimentVerdict::Awaited => "Awaited",
        };
        write!(f, "{}", s)
    }
}

/// Probe verdicts for one experiment run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "ResultSetFields")]
pub struct ResultSet {
    pub probe_details: Vec<ProbeRecord>,
    pub passed_probe_count: u32,
    pub probe_artifacts: BTreeMap<String, ProbeArtifact>,
    /// (name, type) -> position in `probe_details`
    #[serde(skip)]
    index: HashMap<(String, String), usize>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResultSetFields {
    #[serde(default)]
    probe_details: Vec<ProbeRecord>,
    #[serde(default)]
    passed_probe_count: u32,
    #[serde(default)]
    probe_artifacts: BTreeMap<String, ProbeArtifact>,
}

impl TryFrom<ResultSetFields> for ResultSet {
    type Error = CoreError;

    fn try_from(fields: ResultSetFields) -> Result<Self> {
        for record in &fields.probe_details {
            let keys: Vec<VerdictSlot> = record.status.keys().copied().collect();
            let mut expected = record.mode.seeded_slots().to_vec();
            expected.sort();
            if keys != expected {
                return Err(CoreError::invalid_result(format!(
                    "probe '{}' ({}) in mode {} has status keys {:?}, expected {:?}",
                    record.name, record.probe_type, record.mode, keys, expected
                )));
            }
        }
        if fields.passed_probe_count as usize > fields.probe_details.len() {
            return Err(CoreError::invalid_result(format!(
                "passedProbeCount {} exceeds the {} declared probe(s)",
                fields.passed_probe_count,
                fields.probe_details.len()
            )));
        }

        let mut set = Self::from_records(fields.probe_details)?;
        set.passed_probe_count = fields.passed_probe_count;
        set.probe_artifacts = fields.probe_artifacts;
        Ok(set)
    }
}

impl ResultSet {
    /// One Awaited record per declaration, in declaration order
    pub fn initialize(probes: &[ProbeDeclaration]) -> Result<Self> {
        Self::from_records(probes.iter().map(ProbeRecord::new).collect())
    }

    fn from_records(records: Vec<ProbeRecord>) -> Result<Self> {
        let mut index = HashMap::with_capacity(records.len());
        for (i, record) in records.iter().enumerate() {
            let key = (record.name.clone(), record.probe_type.clone());
            if index.insert(key, i).is_some() {
                return Err(CoreError::duplicate_probe(&record.name, &record.probe_type));
            }
        }

        Ok(Self {
            probe_details: records,
            passed_probe_count: 0,
            probe_artifacts: BTreeMap::new(),
            index,
        })
    }

    pub fn get(&self, name: &str, probe_type: &str) -> Option<&ProbeRecord> {
        self.index
            .get(&(name.to_string(), probe_type.to_string()))
            .map(|&i| &self.probe_details[i])
    }

    pub fn get_mut(&mut self, name: &str, probe_type: &str) -> Option<&mut ProbeRecord> {
        match self.index.get(&(name.to_string(), probe_type.to_string())) {
            Some(&i) => self.probe_details.get_mut(i),
            None => None,
        }
    }

    /// First record with this name, whatever its type
    pub fn get_by_name_mut(&mut self, name: &str) -> Option<&mut ProbeRecord> {
        self.probe_details.iter_mut().find(|r| r.name == name)
    }

    /// Fail every Awaited slot of every record
    pub fn sweep(&mut self) -> usize {
        self.probe_details.iter_mut().map(ProbeRecord::sweep).sum()
    }

    /// Share of declared probes that passed, as an integer percentage.
    /// A run without probes scores 100.
    pub fn probe_success_percentage(&self) -> u32 {
        if self.probe_details.is_empty() {
            return 100;
        }
        let percentage =
            u64::from(self.passed_probe_count) * 100 / self.probe_details.len() as u64;
        percentage.min(100) as u32
    }

    pub fn verdict(&self) -> ExperimentVerdict {
        let verdicts = self.probe_details.iter().flat_map(|r| r.status.values());
        let mut awaited = false;
        for verdict in verdicts {
            match verdict {
                Verdict::Failed => return ExperimentVerdict::Fail,
                Verdict::Awaited => awaited = true,
                Verdict::Passed => {}
            }
        }
        if awaited {
            ExperimentVerdict::Awaited
        } else {
            ExperimentVerdict::Pass
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn probe(name: &str, probe_type: &str, mode: ProbeMode) -> ProbeDeclaration {
        ProbeDeclaration::new(name, probe_type, mode)
    }

    #[test]
    fn test_initialize_seeds_status_per_mode() {
        let probes = vec![
            probe("sot", "httpProbe", ProbeMode::StartOfTest),
            probe("eot", "httpProbe", ProbeMode::EndOfTest),
            probe("edge", "httpProbe", ProbeMode::Edge),
            probe("cont", "httpProbe", ProbeMode::Continuous),
            probe("onchaos", "httpProbe", ProbeMode::OnFault),
        ];
        let set = ResultSet::initialize(&probes).unwrap();

        let keys = |name: &str| -> Vec<VerdictSlot> {
            set.get(name, "httpProbe").unwrap().status.keys().copied().collect()
        };
        assert_eq!(keys("sot"), vec![VerdictSlot::PreChaos]);
        assert_eq!(keys("eot"), vec![VerdictSlot::PostChaos]);
        assert_eq!(keys("edge"), vec![VerdictSlot::PreChaos, VerdictSlot::PostChaos]);
        assert_eq!(keys("cont"), vec![VerdictSlot::Continuous]);
        assert_eq!(keys("onchaos"), vec![VerdictSlot::OnChaos]);

        for record in &set.probe_details {
            assert_eq!(record.run_count, 0);
            assert!(record.status.values().all(|v| *v == Verdict::Awaited));
        }
        assert_eq!(set.passed_probe_count, 0);
        assert!(set.probe_artifacts.is_empty());
    }

    #[test]
    fn test_initialize_preserves_declaration_order() {
        let probes = vec![
            probe("b", "cmdProbe", ProbeMode::EndOfTest),
            probe("a", "cmdProbe", ProbeMode::EndOfTest),
        ];
        let set = ResultSet::initialize(&probes).unwrap();
        let names: Vec<_> = set.probe_details.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["b", "a"]);
    }

    #[test]
    fn test_same_name_different_type_is_allowed() {
        let probes = vec![
            probe("check", "cmdProbe", ProbeMode::EndOfTest),
            probe("check", "httpProbe", ProbeMode::StartOfTest),
        ];
        let set = ResultSet::initialize(&probes).unwrap();
        assert_eq!(set.get("check", "httpProbe").unwrap().mode, ProbeMode::StartOfTest);
    }

    #[test]
    fn test_duplicate_identity_is_rejected() {
        let probes = vec![
            probe("check", "cmdProbe", ProbeMode::EndOfTest),
            probe("check", "cmdProbe", ProbeMode::Edge),
        ];
        let result = ResultSet::initialize(&probes);
        assert!(matches!(result, Err(CoreError::DuplicateProbe { .. })));
    }

    #[test]
    fn test_resolve_is_monotonic() {
        let mut record = ProbeRecord::new(&probe("edge", "httpProbe", ProbeMode::Edge));
        assert!(record.resolve(VerdictSlot::PreChaos, Verdict::Passed));
        assert!(!record.resolve(VerdictSlot::PreChaos, Verdict::Failed));
        assert_eq!(record.verdict(VerdictSlot::PreChaos), Some(Verdict::Passed));

        // Keys are never added after seeding
        assert!(!record.resolve(VerdictSlot::Continuous, Verdict::Failed));
        assert_eq!(record.verdict(VerdictSlot::Continuous), None);

        // Awaited is not a resolution
        assert!(!record.resolve(VerdictSlot::PostChaos, Verdict::Awaited));
    }

    #[test]
    fn test_sweep_is_idempotent() {
        let probes = vec![probe("edge", "httpProbe", ProbeMode::Edge)];
        let mut set = ResultSet::initialize(&probes).unwrap();
        set.get_mut("edge", "httpProbe")
            .unwrap()
            .resolve(VerdictSlot::PreChaos, Verdict::Passed);

        assert_eq!(set.sweep(), 1);
        let record = set.get("edge", "httpProbe").unwrap();
        assert_eq!(record.verdict(VerdictSlot::PreChaos), Some(Verdict::Passed));
        assert_eq!(record.verdict(VerdictSlot::PostChaos), Some(Verdict::Failed));

        let before = set.probe_details.clone();
        assert_eq!(set.sweep(), 0);
        assert_eq!(set.probe_details, before);
    }

    #[test]
    fn test_success_percentage_and_verdict() {
        let empty = ResultSet::default();
        assert_eq!(empty.probe_success_percentage(), 100);
        assert_eq!(empty.verdict(), ExperimentVerdict::Pass);

        let probes = vec![
            probe("a", "cmdProbe", ProbeMode::StartOfTest),
            probe("b", "cmdProbe", ProbeMode::StartOfTest),
            probe("c", "cmdProbe", ProbeMode::StartOfTest),
        ];
        let mut set = ResultSet::initialize(&probes).unwrap();
        assert_eq!(set.verdict(), ExperimentVerdict::Awaited);

        set.get_mut("a", "cmdProbe")
            .unwrap()
            .resolve(VerdictSlot::PreChaos, Verdict::Passed);
        set.passed_probe_count = 1;
        set.sweep();
        assert_eq!(set.probe_success_percentage(), 33);
        assert_eq!(set.verdict(), ExperimentVerdict::Fail);
    }

    #[test]
    fn test_result_set_json_shape() {
        let probes = vec![probe("check-app", "httpProbe", ProbeMode::Edge)];
        let mut set = ResultSet::initialize(&probes).unwrap();
        set.get_mut("check-app", "httpProbe").unwrap().continuous_error =
            Some("boom".to_string());

        let json = serde_json::to_value(&set).unwrap();
        assert_eq!(json["passedProbeCount"], 0);
        assert_eq!(json["probeDetails"][0]["type"], "httpProbe");
        assert_eq!(json["probeDetails"][0]["mode"], "Edge");
        assert_eq!(json["probeDetails"][0]["status"]["PreChaos"], "Awaited");
        assert!(json["probeDetails"][0].get("continuousError").is_none());

        let back: ResultSet = serde_json::from_value(json).unwrap();
        assert!(back.get("check-app", "httpProbe").is_some());
        assert_eq!(back.get("check-app", "httpProbe").unwrap().continuous_error, None);
    }

    #[test]
    fn test_loaded_status_keys_must_match_mode() {
        let json = serde_json::json!({
            "probeDetails": [{
                "name": "check-app",
                "type": "httpProbe",
                "mode": "SOT",
                "status": {"PreChaos": "Passed", "OnChaos": "Awaited"}
            }],
            "passedProbeCount": 1
        });
        let result: std::result::Result<ResultSet, _> = serde_json::from_value(json);
        let err = result.unwrap_err().to_string();
        assert!(err.contains("status keys"), "unexpected error: {}", err);
    }

    #[test]
    fn test_loaded_passed_count_is_bounded() {
        let mut set = ResultSet::initialize(&[probe("a", "cmdProbe", ProbeMode::EndOfTest)]).unwrap();
        set.passed_probe_count = 7;
        let json = serde_json::to_value(&set).unwrap();

        let result: std::result::Result<ResultSet, _> = serde_json::from_value(json);
        assert!(result.is_err());
    }

    #[test]
    fn test_success_percentage_does_not_overflow() {
        let probes = vec![
            probe("a", "cmdProbe", ProbeMode::StartOfTest),
            probe("b", "cmdProbe", ProbeMode::StartOfTest),
        ];
        let mut set = ResultSet::initialize(&probes).unwrap();
        set.passed_probe_count = u32::MAX;
        assert_eq!(set.probe_success_percentage(), 100);
    }
}
