//! Broadcast dispatcher
//!
//! [`Dispatcher`] holds an ordered list of observers and is itself an
//! [`Observer`]: every scope-enter call is fanned out to all members, and the
//! returned [`CompositeReporter`] forwards each lifecycle notification to the
//! member reporters in registration order.
//!
//! ```text
//! for_action(s, p, a)
//!     │
//!     ├──► observer 1 ──► reporter 1 ─┐
//!     ├──► observer 2 ──► reporter 2 ─┼──► CompositeReporter
//!     └──► observer N ──► reporter N ─┘
//! ```
//!
//! ## Fault policy
//! Catch, continue, aggregate:
//! - A factory that returns `Err` or panics is skipped for that scope only.
//! - A member reporter that panics during a notification is skipped for that
//!   notification only; the remaining members still receive it.
//! - Every fault is recorded in the dispatcher's [`FaultLog`] and logged.
//!
//! Since a dispatcher is an observer, dispatchers nest: registering one inside
//! another yields a fan-out tree.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use crate::error::{panic_message, FaultLog, ReportError};
use crate::failure::Failure;
use crate::reporter::{BoxedReporter, Observer, StepReporter};
use crate::scope::ScopeDescriptor;

/// Fan-out over an ordered list of observers
pub struct Dispatcher {
    name: String,
    observers: Vec<Arc<dyn Observer>>,
    faults: FaultLog,
}

impl Dispatcher {
    /// Create an empty dispatcher with its own fault log
    pub fn new() -> Self {
        Self::with_fault_log(FaultLog::new())
    }

    /// Create an empty dispatcher recording faults into `faults`.
    ///
    /// Lets nested dispatchers share their parent's log.
    pub fn with_fault_log(faults: FaultLog) -> Self {
        Self {
            name: "dispatcher".into(),
            observers: Vec::new(),
            faults,
        }
    }

    /// Set the name reported when this dispatcher is nested in another one
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Append an observer. Registering the same observer twice notifies it twice.
    pub fn register(&mut self, observer: Arc<dyn Observer>) {
        tracing::debug!(
            observer = observer.name(),
            position = self.observers.len(),
            "register observer"
        );
        self.observers.push(observer);
    }

    /// Builder-style [`register`](Self::register)
    pub fn with_observer(mut self, observer: Arc<dyn Observer>) -> Self {
        self.register(observer);
        self
    }

    /// Number of registered observers
    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    /// Names of the registered observers, in registration order
    pub fn observer_names(&self) -> Vec<&str> {
        self.observers.iter().map(|o| o.name()).collect()
    }

    /// Faults caught while fanning out
    pub fn faults(&self) -> &FaultLog {
        &self.faults
    }

    /// Ask every member for its reporter and wrap them in one composite.
    fn dispatch(&self, scope: ScopeDescriptor) -> CompositeReporter {
        let mut members = Vec::with_capacity(self.observers.len());

        for observer in &self.observers {
            let name = observer.name();
            let made = panic::catch_unwind(AssertUnwindSafe(|| observer.for_scope(&scope)));
            match made {
                Ok(Ok(reporter)) => members.push(Member {
                    name: name.to_string(),
                    reporter,
                }),
                Ok(Err(mut err)) => {
                    if err.observer.is_none() {
                        err.observer = Some(name.to_string());
                    }
                    if err.scope.is_none() {
                        err.scope = Some(scope.to_string());
                    }
                    self.faults.record(err);
                }
                Err(payload) => {
                    self.faults.record(
                        ReportError::panicked(format!(
                            "factory panicked: {}",
                            panic_message(payload.as_ref())
                        ))
                        .with_observer(name)
                        .with_scope(&scope),
                    );
                }
            }
        }

        tracing::trace!(scope = %scope, members = members.len(), "dispatch");

        CompositeReporter {
            members,
            scope,
            faults: self.faults.clone(),
        }
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("name", &self.name)
            .field("observers", &self.observer_names())
            .field("faults", &self.faults.len())
            .finish()
    }
}

impl Observer for Dispatcher {
    fn for_precondition(
        &self,
        subject: &str,
        precondition: &str,
    ) -> Result<BoxedReporter, ReportError> {
        Ok(Box::new(self.dispatch(ScopeDescriptor::precondition(subject, precondition))))
    }

    fn for_action(
        &self,
        subject: &str,
        precondition: &str,
        action: &str,
    ) -> Result<BoxedReporter, ReportError> {
        Ok(Box::new(self.dispatch(ScopeDescriptor::action(subject, precondition, action))))
    }

    fn for_assertion(
        &self,
        subject: &str,
        precondition: &str,
        action: &str,
        assertion: &str,
    ) -> Result<BoxedReporter, ReportError> {
        Ok(Box::new(self.dispatch(ScopeDescriptor::assertion(
            subject,
            precondition,
            action,
            assertion,
        ))))
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn for_scope(&self, scope: &ScopeDescriptor) -> Result<BoxedReporter, ReportError> {
        Ok(Box::new(self.dispatch(scope.clone())))
    }
}

struct Member {
    name: String,
    reporter: BoxedReporter,
}

/// Step reporter forwarding to one reporter per member observer
pub struct CompositeReporter {
    members: Vec<Member>,
    scope: ScopeDescriptor,
    faults: FaultLog,
}

impl CompositeReporter {
    /// Number of member reporters this composite forwards to
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn scope(&self) -> &ScopeDescriptor {
        &self.scope
    }
}

/// Run one member notification, recording a panic instead of unwinding.
fn isolate(
    faults: &FaultLog,
    scope: &ScopeDescriptor,
    observer: &str,
    event: &str,
    f: impl FnOnce(),
) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(f)) {
        let msg = format!("{} panicked: {}", event, panic_message(payload.as_ref()));
        faults.record(
            ReportError::panicked(msg)
                .with_observer(observer)
                .with_scope(scope),
        );
    }
}

impl StepReporter for CompositeReporter {
    fn started(&mut self) {
        for m in &mut self.members {
            let reporter = &mut m.reporter;
            isolate(&self.faults, &self.scope, &m.name, "started", || reporter.started());
        }
    }

    fn completed(self: Box<Self>) {
        let CompositeReporter { members, scope, faults } = *self;
        for m in members {
            let reporter = m.reporter;
            isolate(&faults, &scope, &m.name, "completed", move || reporter.completed());
        }
    }

    fn failed(self: Box<Self>, cause: &Failure) {
        let CompositeReporter { members, scope, faults } = *self;
        for m in members {
            let reporter = m.reporter;
            isolate(&faults, &scope, &m.name, "failed", move || reporter.failed(cause));
        }
    }
}
