//! Reporter configuration
//!
//! [`ReportConfig`] holds the knobs of the built-in observers;
//! [`ReporterBuilder`] assembles a [`Dispatcher`] from it.

use std::io::Write;
use std::sync::Arc;

use crate::dispatcher::Dispatcher;
use crate::error::{FaultLog, ReportError};
use crate::observers::{compile_filter, Console, Filtered, LogObserver, Tally};
use crate::reporter::Observer;

/// Configuration for the built-in observers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportConfig {
    /// Print `ok` lines for completed preconditions and actions
    pub verbose: bool,
    /// Render multi-line mismatches as a unified diff
    pub show_diff: bool,
    /// Only show scopes whose path matches this regex on the console
    pub filter: Option<String>,
    /// Spaces per nesting level on the console
    pub indent: usize,
    /// Emit `tracing` events for every notification
    pub log: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            show_diff: true,
            filter: None,
            indent: 2,
            log: false,
        }
    }
}

impl ReportConfig {
    /// Read overrides from the process environment.
    ///
    /// - `SPECREPORT_VERBOSE` — set to enable verbose output
    /// - `SPECREPORT_NO_DIFF` — set to disable mismatch diffs
    /// - `SPECREPORT_FILTER` — console filter regex
    /// - `SPECREPORT_INDENT` — spaces per level
    /// - `SPECREPORT_LOG` — set to enable the log observer
    pub fn from_env() -> Result<Self, ReportError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env) with a custom variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ReportError> {
        let mut config = Self::default();
        if lookup("SPECREPORT_VERBOSE").is_some() {
            config.verbose = true;
        }
        if lookup("SPECREPORT_NO_DIFF").is_some() {
            config.show_diff = false;
        }
        if lookup("SPECREPORT_LOG").is_some() {
            config.log = true;
        }
        if let Some(filter) = lookup("SPECREPORT_FILTER").filter(|f| !f.is_empty()) {
            config.filter = Some(filter);
        }
        if let Some(indent) = lookup("SPECREPORT_INDENT") {
            config.indent = indent.trim().parse().map_err(|_| {
                ReportError::config(format!("SPECREPORT_INDENT: not a number: {:?}", indent))
            })?;
        }
        Ok(config)
    }
}

/// A dispatcher wired with the built-in observers
pub struct Reporter {
    dispatcher: Arc<Dispatcher>,
    tally: Arc<Tally>,
}

impl Reporter {
    /// The dispatcher as a shareable observer handle for the scheduler
    pub fn observer(&self) -> Arc<dyn Observer> {
        self.dispatcher.clone()
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn tally(&self) -> &Tally {
        &self.tally
    }

    pub fn faults(&self) -> &FaultLog {
        self.dispatcher.faults()
    }

    /// True if no scope failed
    pub fn all_passed(&self) -> bool {
        self.tally.all_passed()
    }

    /// Tally summary, plus the number of observer faults if any
    pub fn summary(&self) -> String {
        let mut line = self.tally.summary();
        let faults = self.faults().total();
        if faults > 0 {
            line.push_str(&format!(" ({} observer faults)", faults));
        }
        line
    }
}

/// Faults a [`Reporter`] retains before it only counts them
pub const DEFAULT_FAULT_LIMIT: usize = 1000;

/// Builder for [`Reporter`]
///
/// Registration order: console, log observer, tally, then extra observers.
pub struct ReporterBuilder {
    config: ReportConfig,
    console: Option<Box<dyn Write + Send>>,
    observers: Vec<Arc<dyn Observer>>,
    fault_limit: usize,
}

impl ReporterBuilder {
    pub fn new() -> Self {
        Self::from_config(ReportConfig::default())
    }

    pub fn from_config(config: ReportConfig) -> Self {
        Self {
            config,
            console: None,
            observers: Vec::new(),
            fault_limit: DEFAULT_FAULT_LIMIT,
        }
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.config.verbose = verbose;
        self
    }

    pub fn show_diff(mut self, show_diff: bool) -> Self {
        self.config.show_diff = show_diff;
        self
    }

    /// Set the console filter regex
    pub fn filter(mut self, filter: impl Into<String>) -> Self {
        self.config.filter = Some(filter.into());
        self
    }

    pub fn indent(mut self, indent: usize) -> Self {
        self.config.indent = indent;
        self
    }

    pub fn log(mut self, log: bool) -> Self {
        self.config.log = log;
        self
    }

    /// Print the scope tree to `out`
    pub fn console(mut self, out: impl Write + Send + 'static) -> Self {
        self.console = Some(Box::new(out));
        self
    }

    /// Print the scope tree to stdout
    pub fn stdout(self) -> Self {
        self.console(std::io::stdout())
    }

    /// Retain at most `limit` observer faults; later ones are only counted
    pub fn fault_limit(mut self, limit: usize) -> Self {
        self.fault_limit = limit;
        self
    }

    /// Register an extra observer after the built-in ones
    pub fn observer(mut self, observer: Arc<dyn Observer>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Build the reporter. Fails if the filter is not a valid regex.
    pub fn build(self) -> Result<Reporter, ReportError> {
        let filter = match &self.config.filter {
            Some(pattern) => Some(compile_filter(pattern)?),
            None => None,
        };

        let faults = FaultLog::bounded(self.fault_limit);
        let mut dispatcher = Dispatcher::with_fault_log(faults).named("reporter");

        if let Some(out) = self.console {
            let console: Arc<dyn Observer> = Arc::new(Console::from_config(out, &self.config));
            match filter {
                Some(re) => dispatcher.register(Arc::new(Filtered::with_regex(console, re))),
                None => dispatcher.register(console),
            }
        }
        if self.config.log {
            dispatcher.register(Arc::new(LogObserver::new()));
        }
        let tally = Arc::new(Tally::new());
        dispatcher.register(tally.clone());
        for observer in self.observers {
            dispatcher.register(observer);
        }

        Ok(Reporter {
            dispatcher: Arc::new(dispatcher),
            tally,
        })
    }
}

impl Default for ReporterBuilder {
    fn default() -> Self {
        Self::new()
    }
}
