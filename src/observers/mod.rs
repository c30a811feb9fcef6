//! Built-in observers
//!
//! Reporting backends that plug into a [`Dispatcher`](crate::Dispatcher):
//!
//! | Observer | Output |
//! |----------|--------|
//! | [`Console`] | indented scope tree with PASS/FAIL lines |
//! | [`LogObserver`] | `tracing` events |
//! | [`Tally`] | pass/fail counters and a summary line |
//! | [`Recorder`] | in-memory journal of every call |
//! | [`Filtered`] | wraps another observer, forwards matching scopes only |

mod console;
mod filter;
mod log;
mod recorder;
mod tally;

pub use console::Console;
pub use filter::Filtered;
pub use log::LogObserver;
pub use recorder::{Notification, Recorder};
pub use tally::{Counts, Tally};

pub(crate) use filter::compile_filter;
