//! log — structured `tracing` events per notification

use std::time::Instant;

use crate::error::ReportError;
use crate::failure::Failure;
use crate::reporter::{BoxedReporter, Observer, StepReporter};
use crate::scope::ScopeDescriptor;

/// Emits one `tracing` event per lifecycle notification.
///
/// `started` and `completed` are logged at debug level, `failed` at warn level.
/// Every event carries `kind` and `scope` fields; terminal events also carry
/// `elapsed_ms` when `started` was seen.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl LogObserver {
    pub fn new() -> Self {
        Self
    }

    fn step(&self, scope: ScopeDescriptor) -> Result<BoxedReporter, ReportError> {
        Ok(Box::new(LogStep { scope, started_at: None }))
    }
}

impl Observer for LogObserver {
    fn for_precondition(
        &self,
        subject: &str,
        precondition: &str,
    ) -> Result<BoxedReporter, ReportError> {
        self.step(ScopeDescriptor::precondition(subject, precondition))
    }

    fn for_action(
        &self,
        subject: &str,
        precondition: &str,
        action: &str,
    ) -> Result<BoxedReporter, ReportError> {
        self.step(ScopeDescriptor::action(subject, precondition, action))
    }

    fn for_assertion(
        &self,
        subject: &str,
        precondition: &str,
        action: &str,
        assertion: &str,
    ) -> Result<BoxedReporter, ReportError> {
        self.step(ScopeDescriptor::assertion(subject, precondition, action, assertion))
    }

    fn name(&self) -> &str {
        "log"
    }
}

struct LogStep {
    scope: ScopeDescriptor,
    started_at: Option<Instant>,
}

impl LogStep {
    fn elapsed_ms(&self) -> Option<u64> {
        self.started_at.map(|t| t.elapsed().as_millis() as u64)
    }
}

impl StepReporter for LogStep {
    fn started(&mut self) {
        self.started_at = Some(Instant::now());
        tracing::debug!(kind = %self.scope.kind(), scope = %self.scope, "scope started");
    }

    fn completed(self: Box<Self>) {
        tracing::debug!(
            kind = %self.scope.kind(),
            scope = %self.scope,
            elapsed_ms = ?self.elapsed_ms(),
            "scope completed"
        );
    }

    fn failed(self: Box<Self>, cause: &Failure) {
        tracing::warn!(
            kind = %self.scope.kind(),
            scope = %self.scope,
            elapsed_ms = ?self.elapsed_ms(),
            cause = %cause,
            "scope failed"
        );
    }
}
