//! recorder — in-memory notification journal
//!
//! [`Recorder`] keeps every factory call and lifecycle notification it sees, in
//! order. It serves both as a test-result collector and as a spy in tests of
//! code that drives observers.

use std::fmt;
use std::sync::{Arc, Mutex};

use crate::error::ReportError;
use crate::failure::Failure;
use crate::reporter::{BoxedReporter, Observer, StepReporter};
use crate::scope::{ScopeDescriptor, ScopeKind};

/// One recorded call
#[derive(Debug, Clone)]
pub enum Notification {
    /// A factory was asked for a reporter
    Enter(ScopeDescriptor),
    Started(ScopeDescriptor),
    Completed(ScopeDescriptor),
    Failed(ScopeDescriptor, Failure),
}

impl Notification {
    pub fn scope(&self) -> &ScopeDescriptor {
        match self {
            Notification::Enter(s)
            | Notification::Started(s)
            | Notification::Completed(s)
            | Notification::Failed(s, _) => s,
        }
    }

    /// Event name: `enter`, `started`, `completed` or `failed`
    pub fn event(&self) -> &'static str {
        match self {
            Notification::Enter(_) => "enter",
            Notification::Started(_) => "started",
            Notification::Completed(_) => "completed",
            Notification::Failed(..) => "failed",
        }
    }
}

/// Failures compare by identity: two `Failed` entries are equal only if they
/// carry the same failure instance.
impl PartialEq for Notification {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Notification::Failed(a, fa), Notification::Failed(b, fb)) => a == b && fa.ptr_eq(fb),
            (Notification::Failed(..), _) | (_, Notification::Failed(..)) => false,
            _ => self.event() == other.event() && self.scope() == other.scope(),
        }
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notification::Failed(s, cause) => write!(f, "failed {} ({})", s, cause),
            other => write!(f, "{} {}", other.event(), other.scope()),
        }
    }
}

#[derive(Debug, Default)]
struct Journal {
    notifications: Vec<Notification>,
    violations: Vec<String>,
}

/// Observer that records everything it is told
#[derive(Debug, Clone)]
pub struct Recorder {
    name: String,
    journal: Arc<Mutex<Journal>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::named("recorder")
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            journal: Arc::new(Mutex::new(Journal::default())),
        }
    }

    /// All notifications so far, oldest first
    pub fn notifications(&self) -> Vec<Notification> {
        self.lock().notifications.clone()
    }

    /// Notifications rendered as text, oldest first
    pub fn lines(&self) -> Vec<String> {
        self.lock().notifications.iter().map(|n| n.to_string()).collect()
    }

    /// Scopes the factories were asked for, in order
    pub fn scopes(&self) -> Vec<ScopeDescriptor> {
        self.lock()
            .notifications
            .iter()
            .filter_map(|n| match n {
                Notification::Enter(s) => Some(s.clone()),
                _ => None,
            })
            .collect()
    }

    /// Lifecycle notifications received for `scope` (factory calls excluded)
    pub fn events_for(&self, scope: &ScopeDescriptor) -> Vec<&'static str> {
        self.lock()
            .notifications
            .iter()
            .filter(|n| !matches!(n, Notification::Enter(_)) && n.scope() == scope)
            .map(Notification::event)
            .collect()
    }

    /// Failure instances received, in order
    pub fn failures(&self) -> Vec<Failure> {
        self.lock()
            .notifications
            .iter()
            .filter_map(|n| match n {
                Notification::Failed(_, f) => Some(f.clone()),
                _ => None,
            })
            .collect()
    }

    /// Count of `event` notifications for scopes of `kind`
    pub fn count(&self, kind: ScopeKind, event: &str) -> usize {
        self.lock()
            .notifications
            .iter()
            .filter(|n| n.scope().kind() == kind && n.event() == event)
            .count()
    }

    /// Lifecycle misuse observed (double `started`, terminal before `started`)
    pub fn violations(&self) -> Vec<String> {
        self.lock().violations.clone()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().notifications.is_empty()
    }

    pub fn clear(&self) {
        let mut journal = self.lock();
        journal.notifications.clear();
        journal.violations.clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Journal> {
        self.journal.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn enter(&self, scope: ScopeDescriptor) -> Result<BoxedReporter, ReportError> {
        self.lock().notifications.push(Notification::Enter(scope.clone()));
        Ok(Box::new(RecorderStep {
            scope,
            started: false,
            journal: Arc::clone(&self.journal),
        }))
    }
}

impl Default for Recorder {
    fn default() -> Self {
        Self::new()
    }
}

impl Observer for Recorder {
    fn for_precondition(
        &self,
        subject: &str,
        precondition: &str,
    ) -> Result<BoxedReporter, ReportError> {
        self.enter(ScopeDescriptor::precondition(subject, precondition))
    }

    fn for_action(
        &self,
        subject: &str,
        precondition: &str,
        action: &str,
    ) -> Result<BoxedReporter, ReportError> {
        self.enter(ScopeDescriptor::action(subject, precondition, action))
    }

    fn for_assertion(
        &self,
        subject: &str,
        precondition: &str,
        action: &str,
        assertion: &str,
    ) -> Result<BoxedReporter, ReportError> {
        self.enter(ScopeDescriptor::assertion(subject, precondition, action, assertion))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

struct RecorderStep {
    scope: ScopeDescriptor,
    started: bool,
    journal: Arc<Mutex<Journal>>,
}

impl RecorderStep {
    fn push(&self, n: Notification) {
        let mut journal = self.journal.lock().unwrap_or_else(|e| e.into_inner());
        let event = n.event();
        if event == "started" && self.started {
            journal.violations.push(format!("started twice: {}", self.scope));
        } else if event != "started" && !self.started {
            journal.violations.push(format!("{} before started: {}", event, self.scope));
        }
        journal.notifications.push(n);
    }
}

impl StepReporter for RecorderStep {
    fn started(&mut self) {
        self.push(Notification::Started(self.scope.clone()));
        self.started = true;
    }

    fn completed(self: Box<Self>) {
        self.push(Notification::Completed(self.scope.clone()));
    }

    fn failed(self: Box<Self>, cause: &Failure) {
        self.push(Notification::Failed(self.scope.clone(), cause.clone()));
    }
}
