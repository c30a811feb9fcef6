//! Reporting errors and the fault log
//!
//! [`ReportError`] covers failures of the reporting layer itself: an observer
//! refusing or panicking on a scope, bad configuration, malformed traces.
//! Scope failures forwarded to observers are [`Failure`](crate::Failure)s, not
//! errors.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

/// The kind of reporting error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// An observer's factory returned an error for a scope
    Refused,
    /// An observer or step reporter panicked
    Panicked,
    /// Invalid configuration (e.g. a bad filter pattern)
    Config,
    /// Malformed trace line or lifecycle misuse in a trace
    Syntax,
    /// IO error
    Io,
}

/// A reporting error with observer/scope/location context
#[derive(Debug, Clone)]
pub struct ReportError {
    pub kind: ErrorKind,
    pub message: String,
    pub observer: Option<String>,
    pub scope: Option<String>,
    pub file: Option<String>,
    pub line: Option<usize>,
}

impl ReportError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            observer: None,
            scope: None,
            file: None,
            line: None,
        }
    }

    pub fn with_observer(mut self, name: impl Into<String>) -> Self {
        self.observer = Some(name.into());
        self
    }

    pub fn with_scope(mut self, scope: impl fmt::Display) -> Self {
        self.scope = Some(scope.to_string());
        self
    }

    pub fn with_location(mut self, file: impl Into<String>, line: usize) -> Self {
        self.file = Some(file.into());
        self.line = Some(line);
        self
    }

    pub fn refused(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Refused, msg)
    }

    pub fn panicked(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Panicked, msg)
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Config, msg)
    }

    pub fn syntax(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Syntax, msg)
    }
}

impl fmt::Display for ReportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref file) = self.file {
            write!(f, "{}:", file)?;
        }
        if let Some(line) = self.line {
            write!(f, "{}:", line)?;
        }
        if self.file.is_some() || self.line.is_some() {
            write!(f, " ")?;
        }
        if let Some(ref observer) = self.observer {
            write!(f, "[{}] ", observer)?;
        }
        if let Some(ref scope) = self.scope {
            write!(f, "{}: ", scope)?;
        }
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ReportError {}

impl From<std::io::Error> for ReportError {
    fn from(e: std::io::Error) -> Self {
        Self::new(ErrorKind::Io, e.to_string())
    }
}

/// Render a caught panic payload as text.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Shared record of faults caught during fan-out.
///
/// Cloning yields another handle to the same log. Each fault is also emitted
/// as a `tracing` warning when recorded. An unbounded log grows by one entry
/// per fault for as long as it lives; long runs should either [`drain`] it
/// periodically or use [`FaultLog::bounded`], which keeps the first `limit`
/// faults and only counts the rest.
///
/// [`drain`]: FaultLog::drain
#[derive(Debug, Clone, Default)]
pub struct FaultLog {
    inner: Arc<Mutex<Faults>>,
}

#[derive(Debug, Default)]
struct Faults {
    entries: Vec<ReportError>,
    dropped: usize,
    limit: Option<usize>,
}

impl FaultLog {
    /// Unbounded log
    pub fn new() -> Self {
        Self::default()
    }

    /// Log that retains at most `limit` faults
    pub fn bounded(limit: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Faults {
                limit: Some(limit),
                ..Faults::default()
            })),
        }
    }

    pub fn record(&self, fault: ReportError) {
        tracing::warn!(
            kind = ?fault.kind,
            observer = fault.observer.as_deref().unwrap_or("-"),
            scope = fault.scope.as_deref().unwrap_or("-"),
            "{}",
            fault.message
        );
        let mut faults = self.lock();
        if faults.limit.map_or(false, |limit| faults.entries.len() >= limit) {
            faults.dropped += 1;
        } else {
            faults.entries.push(fault);
        }
    }

    /// Copy of the retained faults, oldest first
    pub fn snapshot(&self) -> Vec<ReportError> {
        self.lock().entries.clone()
    }

    /// Remove and return the retained faults, resetting the dropped count
    pub fn drain(&self) -> Vec<ReportError> {
        let mut faults = self.lock();
        faults.dropped = 0;
        std::mem::take(&mut faults.entries)
    }

    /// Number of retained faults
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    /// Faults recorded past the limit and not retained
    pub fn dropped(&self) -> usize {
        self.lock().dropped
    }

    /// Retained plus dropped faults
    pub fn total(&self) -> usize {
        let faults = self.lock();
        faults.entries.len() + faults.dropped
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    // Poisoned locks are recovered: updates never leave the log half-written.
    fn lock(&self) -> MutexGuard<'_, Faults> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}
