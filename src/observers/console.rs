//! console — human-readable tree printer

use std::io::Write;
use std::sync::{Arc, Mutex};

use similar::TextDiff;

use crate::config::ReportConfig;
use crate::error::ReportError;
use crate::failure::Failure;
use crate::reporter::{BoxedReporter, Observer, StepReporter};
use crate::scope::{ScopeDescriptor, ScopeKind};

/// Prints an indented scope tree to any writer.
///
/// ```text
/// Calculator
///   given a calculator
///     when addition
///       PASS  returns the sum
///       FAIL  is commutative
///             expected 4, got 5
/// ```
///
/// Ancestor headers are printed lazily, so a filtered console still shows
/// where a matching scope lives. Write errors are logged and otherwise ignored.
pub struct Console {
    settings: Settings,
    sink: Arc<Mutex<Sink>>,
}

#[derive(Debug, Clone, Copy)]
struct Settings {
    verbose: bool,
    show_diff: bool,
    indent: usize,
}

struct Sink {
    out: Box<dyn Write + Send>,
    /// Labels of the headers currently on screen, outermost first
    shown: Vec<String>,
}

impl Console {
    pub fn new(out: impl Write + Send + 'static) -> Self {
        Self {
            settings: Settings {
                verbose: false,
                show_diff: true,
                indent: 2,
            },
            sink: Arc::new(Mutex::new(Sink {
                out: Box::new(out),
                shown: Vec::new(),
            })),
        }
    }

    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }

    /// Console configured from `config` (filter is applied by the builder)
    pub fn from_config(out: impl Write + Send + 'static, config: &ReportConfig) -> Self {
        Self::new(out)
            .verbose(config.verbose)
            .show_diff(config.show_diff)
            .indent(config.indent)
    }

    /// Also print `ok` lines for completed preconditions and actions
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.settings.verbose = verbose;
        self
    }

    /// Render multi-line mismatches as a unified diff
    pub fn show_diff(mut self, show_diff: bool) -> Self {
        self.settings.show_diff = show_diff;
        self
    }

    pub fn indent(mut self, indent: usize) -> Self {
        self.settings.indent = indent;
        self
    }

    fn step(&self, scope: ScopeDescriptor) -> Result<BoxedReporter, ReportError> {
        Ok(Box::new(ConsoleStep {
            settings: self.settings,
            sink: Arc::clone(&self.sink),
            scope,
        }))
    }
}

impl Observer for Console {
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
        "console"
    }
}

struct ConsoleStep {
    settings: Settings,
    sink: Arc<Mutex<Sink>>,
    scope: ScopeDescriptor,
}

impl ConsoleStep {
    fn pad(&self, level: usize) -> String {
        " ".repeat(self.settings.indent * level)
    }

    /// Header line for an ancestor at `level`: the subject, then `given`
    /// for preconditions and `when` for actions. Assertions never head a
    /// block; they print as `PASS`/`FAIL` lines.
    fn header(level: usize, label: &str) -> String {
        match level {
            0 => label.to_string(),
            1 => format!("given {}", label),
            _ => format!("when {}", label),
        }
    }

    /// Make sure `labels` are the headers on screen, printing what is missing.
    fn show_headers(&self, sink: &mut Sink, labels: &[&str]) -> std::io::Result<()> {
        let common = sink
            .shown
            .iter()
            .zip(labels)
            .take_while(|(shown, label)| shown.as_str() == **label)
            .count();
        sink.shown.truncate(common);
        for (level, label) in labels.iter().enumerate().skip(common) {
            writeln!(sink.out, "{}{}", self.pad(level), Self::header(level, label))?;
            sink.shown.push(label.to_string());
        }
        Ok(())
    }

    fn write(&self, f: impl FnOnce(&Self, &mut Sink) -> std::io::Result<()>) {
        let mut sink = self.sink.lock().unwrap_or_else(|e| e.into_inner());
        if let Err(e) = f(self, &mut sink).and_then(|()| sink.out.flush()) {
            tracing::warn!(scope = %self.scope, "console write failed: {}", e);
        }
    }

    /// Print the terminal line for this scope (`PASS`, `FAIL` or `ok`).
    fn terminal(
        &self,
        sink: &mut Sink,
        status: &str,
        cause: Option<&Failure>,
    ) -> std::io::Result<()> {
        let labels = self.scope.labels();
        let (ancestors, level) = match self.scope.kind() {
            ScopeKind::Assertion => (&labels[..3], 3),
            kind => (&labels[..], kind.depth() + 1),
        };
        self.show_headers(sink, ancestors)?;

        let pad = self.pad(level);
        writeln!(sink.out, "{}{:<6}{}", pad, status, self.scope.label())?;
        if let Some(cause) = cause {
            let detail = format!("{}      ", pad);
            writeln!(sink.out, "{}{}", detail, cause.summary())?;
            if let Some((expected, actual)) = cause.as_mismatch() {
                if self.settings.show_diff && (expected.contains('\n') || actual.contains('\n')) {
                    let diff = TextDiff::from_lines(expected, actual);
                    let udiff = diff.unified_diff().header("expected", "actual").to_string();
                    for line in udiff.lines() {
                        writeln!(sink.out, "{}{}", detail, line)?;
                    }
                }
            }
        }
        // A finished non-leaf scope can no longer parent new output.
        if self.scope.kind() != ScopeKind::Assertion {
            sink.shown.truncate(labels.len() - 1);
        }
        Ok(())
    }
}

impl StepReporter for ConsoleStep {
    fn started(&mut self) {
        if self.scope.kind() == ScopeKind::Assertion {
            return;
        }
        self.write(|step, sink| {
            let labels = step.scope.labels();
            // Siblings may reuse a label; always print this scope's own header.
            let keep = sink.shown.len().min(labels.len() - 1);
            sink.shown.truncate(keep);
            step.show_headers(sink, &labels)
        });
    }

    fn completed(self: Box<Self>) {
        match self.scope.kind() {
            ScopeKind::Assertion => self.write(|step, sink| step.terminal(sink, "PASS", None)),
            _ if self.settings.verbose => self.write(|step, sink| step.terminal(sink, "ok", None)),
            _ => {
                let mut sink = self.sink.lock().unwrap_or_else(|e| e.into_inner());
                let keep = sink.shown.len().min(self.scope.labels().len() - 1);
                sink.shown.truncate(keep);
            }
        }
    }

    fn failed(self: Box<Self>, cause: &Failure) {
        self.write(|step, sink| step.terminal(sink, "FAIL", Some(cause)));
    }
}
