//! emx-specreport: scope lifecycle reporting for behavior-driven spec runners
//!
//! A spec runner walks a tree of scopes: a subject, its preconditions
//! (`given`), the actions performed on it (`on`) and the assertions checked
//! afterwards (`it`). For every scope it enters, the runner asks an
//! [`Observer`] for a [`StepReporter`] and drives it through
//! `started -> (completed | failed)`.
//!
//! # Overview
//!
//! ```text
//!                 ┌────────────┐
//!  scheduler ───▶ │ Dispatcher │ ── for_* ──▶ Console, Tally, Recorder, ...
//!                 └────────────┘
//!                       │ CompositeReporter
//!                       ▼
//!          started / completed / failed(&Failure) to every member
//! ```
//!
//! The [`Dispatcher`] fans every factory call and lifecycle notification out
//! to its registered observers in registration order. It is itself an
//! observer, so dispatchers nest. Observer faults (a refusing factory, a
//! panicking reporter) are recorded in a [`FaultLog`] and never stop the
//! remaining observers from being notified.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use emx_specreport::{Dispatcher, Failure, Observer, Recorder};
//!
//! let recorder = Arc::new(Recorder::new());
//! let mut dispatcher = Dispatcher::new();
//! dispatcher.register(recorder.clone());
//!
//! let mut step = dispatcher
//!     .for_assertion("Calculator", "a calculator", "addition", "sums")
//!     .unwrap();
//! step.started();
//! step.failed(&Failure::mismatch("4", "5"));
//!
//! assert_eq!(recorder.failures().len(), 1);
//! ```
//!
//! # Traces
//!
//! The [`trace`] module replays recorded scope events against any observer;
//! the `emx-specreport` binary uses it to render trace files on the console.

mod config;
mod dispatcher;
mod error;
mod failure;
mod reporter;
mod scope;

pub mod observers;
pub mod trace;

#[cfg(test)]
mod testing;

pub use config::{ReportConfig, Reporter, ReporterBuilder, DEFAULT_FAULT_LIMIT};
pub use dispatcher::{CompositeReporter, Dispatcher};
pub use error::{ErrorKind, FaultLog, ReportError};
pub use failure::{Cause, Failure};
pub use observers::{Console, Counts, Filtered, LogObserver, Notification, Recorder, Tally};
pub use reporter::{BoxedReporter, NoopReporter, Observer, ScopeFn, StepReporter};
pub use scope::{ScopeDescriptor, ScopeKind};
pub use trace::{replay, replay_file, ReplaySummary};
