use crate::error::Result;
use crate::tracker::ProbeTracker;
use async_trait::async_trait;
use faultline_core::{Phase, ProbeDeclaration, ProbeKind};
use std::collections::HashMap;
use std::sync::Arc;

/// Kind-specific probe check
///
/// Implementations perform the actual request, command or query for one
/// probe kind. They get the tracker so they can bump the run count, store a
/// run ID, render templated inputs and register artifacts for later probes.
/// A check must honour its own retry budget and return within the time the
/// dispatcher allows it; an `Err` fails the probe for `phase`.
#[async_trait]
pub trait ProbeCheck: Send + Sync {
    async fn check(
        &self,
        probe: &ProbeDeclaration,
        tracker: &ProbeTracker,
        phase: Phase,
    ) -> Result<()>;
}

/// Lookup table from probe kind to its check
#[derive(Clone, Default)]
pub struct CheckRegistry {
    checks: HashMap<ProbeKind, Arc<dyn ProbeCheck>>,
}

impl CheckRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `check` for `kind`, replacing any previous one
    pub fn register(&mut self, kind: ProbeKind, check: Arc<dyn ProbeCheck>) {
        self.checks.insert(kind, check);
    }

    pub fn with(mut self, kind: ProbeKind, check: Arc<dyn ProbeCheck>) -> Self {
        self.register(kind, check);
        self
    }

    /// Use the same check for every kind
    pub fn with_all(mut self, check: Arc<dyn ProbeCheck>) -> Self {
        for kind in ProbeKind::ALL {
            self.register(kind, check.clone());
        }
        self
    }

    pub fn get(&self, kind: ProbeKind) -> Option<Arc<dyn ProbeCheck>> {
        self.checks.get(&kind).cloned()
    }

    /// Resolve a declared type string to its check
    pub fn resolve(&self, probe: &ProbeDeclaration) -> Option<Arc<dyn ProbeCheck>> {
        probe.kind().and_then(|kind| self.get(kind))
    }
}
