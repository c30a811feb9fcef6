//! Observer and step reporter contracts
//!
//! The scheduler asks an [`Observer`] for a [`StepReporter`] each time it
//! enters a scope, then drives that reporter through the lifecycle:
//!
//! ```text
//! observer.for_action("Calculator", "a calculator", "addition")
//!     └─► reporter.started()
//!             ├─► ... child scopes ...
//!             └─► reporter.completed()   or   reporter.failed(&cause)
//! ```
//!
//! The terminal calls consume the reporter, so a scope cannot be both
//! completed and failed, or terminated twice.

use crate::error::ReportError;
use crate::failure::Failure;
use crate::scope::ScopeDescriptor;

/// Per-scope lifecycle handle
pub trait StepReporter: Send {
    /// The scope began executing
    fn started(&mut self);

    /// The scope (and all its children) finished without failure
    fn completed(self: Box<Self>);

    /// The scope did not complete normally
    fn failed(self: Box<Self>, cause: &Failure);
}

/// A boxed step reporter
pub type BoxedReporter = Box<dyn StepReporter>;

/// Produces a fresh step reporter for each scope entered.
///
/// Implementations must not reuse a returned reporter across scopes.
/// Returning `Err` refuses the scope; a dispatcher skips the observer for that
/// scope and records the error in its fault log.
pub trait Observer: Send + Sync {
    /// `given` scope
    fn for_precondition(
        &self,
        subject: &str,
        precondition: &str,
    ) -> Result<BoxedReporter, ReportError>;

    /// `on` scope
    fn for_action(
        &self,
        subject: &str,
        precondition: &str,
        action: &str,
    ) -> Result<BoxedReporter, ReportError>;

    /// `it` scope
    fn for_assertion(
        &self,
        subject: &str,
        precondition: &str,
        action: &str,
        assertion: &str,
    ) -> Result<BoxedReporter, ReportError>;

    /// Name used in faults and logs.
    ///
    /// The default uses `type_name::<Self>()`; override it with something short.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Route a descriptor to the matching factory
    fn for_scope(&self, scope: &ScopeDescriptor) -> Result<BoxedReporter, ReportError> {
        match scope {
            ScopeDescriptor::Precondition { subject, precondition } => {
                self.for_precondition(subject, precondition)
            }
            ScopeDescriptor::Action { subject, precondition, action } => {
                self.for_action(subject, precondition, action)
            }
            ScopeDescriptor::Assertion { subject, precondition, action, assertion } => {
                self.for_assertion(subject, precondition, action, assertion)
            }
        }
    }
}

/// Reporter that ignores every notification
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopReporter;

impl NoopReporter {
    pub fn boxed() -> BoxedReporter {
        Box::new(NoopReporter)
    }
}

impl StepReporter for NoopReporter {
    fn started(&mut self) {}

    fn completed(self: Box<Self>) {}

    fn failed(self: Box<Self>, _cause: &Failure) {}
}

/// Observer built from a single closure over [`ScopeDescriptor`]s.
///
/// Handy for small adapters and tests that only need to see the descriptor.
pub struct ScopeFn<F> {
    name: String,
    f: F,
}

impl<F> ScopeFn<F>
where
    F: Fn(&ScopeDescriptor) -> Result<BoxedReporter, ReportError> + Send + Sync,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self { name: name.into(), f }
    }
}

impl<F> Observer for ScopeFn<F>
where
    F: Fn(&ScopeDescriptor) -> Result<BoxedReporter, ReportError> + Send + Sync,
{
    fn for_precondition(
        &self,
        subject: &str,
        precondition: &str,
    ) -> Result<BoxedReporter, ReportError> {
        (self.f)(&ScopeDescriptor::precondition(subject, precondition))
    }

    fn for_action(
        &self,
        subject: &str,
        precondition: &str,
        action: &str,
    ) -> Result<BoxedReporter, ReportError> {
        (self.f)(&ScopeDescriptor::action(subject, precondition, action))
    }

    fn for_assertion(
        &self,
        subject: &str,
        precondition: &str,
        action: &str,
        assertion: &str,
    ) -> Result<BoxedReporter, ReportError> {
        (self.f)(&ScopeDescriptor::assertion(subject, precondition, action, assertion))
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn for_scope(&self, scope: &ScopeDescriptor) -> Result<BoxedReporter, ReportError> {
        (self.f)(scope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_noop_reporter_accepts_full_lifecycle() {
        let mut r = NoopReporter::boxed();
        r.started();
        r.failed(&Failure::panic("ignored"));
    }

    #[test]
    fn test_for_scope_routes_by_kind() {
        let seen = std::sync::Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let obs = ScopeFn::new("seen", move |d: &ScopeDescriptor| {
            sink.lock().unwrap().push(d.clone());
            Ok(NoopReporter::boxed())
        });

        let scopes = [
            ScopeDescriptor::precondition("Stack", "an empty stack"),
            ScopeDescriptor::action("Stack", "an empty stack", "push"),
            ScopeDescriptor::assertion("Stack", "an empty stack", "push", "grows"),
        ];
        for s in &scopes {
            obs.for_scope(s).unwrap().completed();
        }
        obs.for_action("Stack", "an empty stack", "pop").unwrap().completed();

        let seen = seen.lock().unwrap();
        assert_eq!(&seen[..3], &scopes[..]);
        assert_eq!(seen[3], ScopeDescriptor::action("Stack", "an empty stack", "pop"));
        assert_eq!(obs.name(), "seen");
    }
}
