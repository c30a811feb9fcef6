//! tally — pass/fail counters per scope kind

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use crate::error::ReportError;
use crate::failure::Failure;
use crate::reporter::{BoxedReporter, Observer, StepReporter};
use crate::scope::ScopeKind;

/// Counters for one scope kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counts {
    pub started: usize,
    pub passed: usize,
    pub failed: usize,
}

impl Counts {
    /// Started but never terminated
    pub fn abandoned(&self) -> usize {
        self.started.saturating_sub(self.passed + self.failed)
    }
}

/// Counts scope outcomes. Assertions are the unit reported in [`Tally::summary`].
#[derive(Debug, Default)]
pub struct Tally {
    counts: Arc<Mutex<BTreeMap<ScopeKind, Counts>>>,
}

impl Tally {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn counts(&self, kind: ScopeKind) -> Counts {
        self.lock().get(&kind).copied().unwrap_or_default()
    }

    /// Number of assertions that completed
    pub fn passed_count(&self) -> usize {
        self.counts(ScopeKind::Assertion).passed
    }

    /// Number of failed scopes of any kind
    pub fn failed_count(&self) -> usize {
        self.lock().values().map(|c| c.failed).sum()
    }

    /// True if no scope of any kind failed
    pub fn all_passed(&self) -> bool {
        self.failed_count() == 0
    }

    /// Format a summary line
    pub fn summary(&self) -> String {
        let counts = self.lock();
        let get = |kind: ScopeKind| counts.get(&kind).copied().unwrap_or_default();
        let assertions = get(ScopeKind::Assertion);
        let setup_failed = get(ScopeKind::Precondition).failed + get(ScopeKind::Action).failed;
        let abandoned: usize = counts.values().map(Counts::abandoned).sum();

        let mut line = format!("{} passed, {} failed", assertions.passed, assertions.failed);
        if setup_failed > 0 {
            line.push_str(&format!(", {} setup failures", setup_failed));
        }
        if abandoned > 0 {
            line.push_str(&format!(", {} abandoned", abandoned));
        }
        line
    }

    pub fn reset(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<ScopeKind, Counts>> {
        self.counts.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn step(&self, kind: ScopeKind) -> Result<BoxedReporter, ReportError> {
        Ok(Box::new(TallyStep {
            kind,
            counts: Arc::clone(&self.counts),
        }))
    }
}

impl Observer for Tally {
    fn for_precondition(
        &self,
        _subject: &str,
        _precondition: &str,
    ) -> Result<BoxedReporter, ReportError> {
        self.step(ScopeKind::Precondition)
    }

    fn for_action(
        &self,
        _subject: &str,
        _precondition: &str,
        _action: &str,
    ) -> Result<BoxedReporter, ReportError> {
        self.step(ScopeKind::Action)
    }

    fn for_assertion(
        &self,
        _subject: &str,
        _precondition: &str,
        _action: &str,
        _assertion: &str,
    ) -> Result<BoxedReporter, ReportError> {
        self.step(ScopeKind::Assertion)
    }

    fn name(&self) -> &str {
        "tally"
    }
}

struct TallyStep {
    kind: ScopeKind,
    counts: Arc<Mutex<BTreeMap<ScopeKind, Counts>>>,
}

impl TallyStep {
    fn bump(&self, f: impl FnOnce(&mut Counts)) {
        let mut counts = self.counts.lock().unwrap_or_else(|e| e.into_inner());
        f(counts.entry(self.kind).or_default());
    }
}

impl StepReporter for TallyStep {
    fn started(&mut self) {
        self.bump(|c| c.started += 1);
    }

    fn completed(self: Box<Self>) {
        self.bump(|c| c.passed += 1);
    }

    fn failed(self: Box<Self>, _cause: &Failure) {
        self.bump(|c| c.failed += 1);
    }
}
