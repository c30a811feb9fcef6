//! filter — forward only scopes whose path matches a pattern

use std::sync::Arc;

use regex::Regex;

use crate::error::ReportError;
use crate::reporter::{BoxedReporter, NoopReporter, Observer};
use crate::scope::ScopeDescriptor;

/// Wraps an observer; scopes whose path (`subject / precondition / ...`)
/// does not match the pattern get a no-op reporter instead.
pub struct Filtered {
    inner: Arc<dyn Observer>,
    pattern: Regex,
}

impl Filtered {
    /// Wrap `inner`. Fails with a `Config` error if `pattern` is not a valid regex.
    pub fn new(inner: Arc<dyn Observer>, pattern: &str) -> Result<Self, ReportError> {
        let pattern = compile_filter(pattern)?;
        Ok(Self::with_regex(inner, pattern))
    }

    /// Wrap `inner` with an already compiled pattern
    pub fn with_regex(inner: Arc<dyn Observer>, pattern: Regex) -> Self {
        Self { inner, pattern }
    }

    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    pub fn matches(&self, scope: &ScopeDescriptor) -> bool {
        self.pattern.is_match(&scope.path())
    }
}

/// Compile a scope filter pattern
pub(crate) fn compile_filter(pattern: &str) -> Result<Regex, ReportError> {
    regex::RegexBuilder::new(pattern)
        .build()
        .map_err(|e| ReportError::config(format!("invalid filter {:?}: {}", pattern, e)))
}

impl Observer for Filtered {
    fn for_precondition(
        &self,
        subject: &str,
        precondition: &str,
    ) -> Result<BoxedReporter, ReportError> {
        self.for_scope(&ScopeDescriptor::precondition(subject, precondition))
    }

    fn for_action(
        &self,
        subject: &str,
        precondition: &str,
        action: &str,
    ) -> Result<BoxedReporter, ReportError> {
        self.for_scope(&ScopeDescriptor::action(subject, precondition, action))
    }

    fn for_assertion(
        &self,
        subject: &str,
        precondition: &str,
        action: &str,
        assertion: &str,
    ) -> Result<BoxedReporter, ReportError> {
        self.for_scope(&ScopeDescriptor::assertion(subject, precondition, action, assertion))
    }

    fn name(&self) -> &str {
        self.inner.name()
    }

    fn for_scope(&self, scope: &ScopeDescriptor) -> Result<BoxedReporter, ReportError> {
        if self.matches(scope) {
            self.inner.for_scope(scope)
        } else {
            Ok(NoopReporter::boxed())
        }
    }
}
