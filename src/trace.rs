//! Trace replay
//!
//! A trace is a line-oriented recording of the calls a scheduler makes while
//! walking a spec tree. Replaying it drives an [`Observer`] exactly as the
//! scheduler would, which is how the CLI and the integration tests exercise
//! reporting backends without a live runner.
//!
//! # Syntax
//!
//! ```text
//! # Calculator spec
//! given Calculator 'a calculator'
//! started
//! on Calculator 'a calculator' addition
//! started
//! it Calculator 'a calculator' addition 'returns the sum'
//! started
//! completed
//! it Calculator 'a calculator' addition 'is commutative'
//! started
//! mismatch 4 5
//! completed
//! completed
//! ```
//!
//! | Event | Args | Effect |
//! |-------|------|--------|
//! | `given` | subject precondition | enter a precondition scope |
//! | `on` | subject precondition action | enter an action scope |
//! | `it` | subject precondition action assertion | enter an assertion scope |
//! | `started` | | innermost open scope started |
//! | `completed` | | innermost open scope completed, closes it |
//! | `failed` | message | innermost open scope failed, closes it |
//! | `mismatch` | expected actual | failed with a mismatch (`\n` allowed) |
//! | `panic` | message | failed with a panic message |
//!
//! Quoting follows script lines: single quotes group words, `''` inside quotes
//! is a literal `'`, and an unquoted `#` starts a comment. Scopes still open at
//! the end of a trace are abandoned: they never get a terminal call.

use std::path::{Path, PathBuf};

use crate::error::{ErrorKind, ReportError};
use crate::failure::Failure;
use crate::reporter::{BoxedReporter, Observer};
use crate::scope::{ScopeDescriptor, ScopeKind};

/// File extension of trace files
pub const TRACE_EXTENSION: &str = ".trace";

/// Characters that separate arguments
const ARG_SEP_CHARS: &[char] = &[' ', '\t', '\r', '\n', '#'];

/// A parsed trace line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceLine {
    /// Event name (first word)
    pub event: String,
    /// Remaining words, quotes removed
    pub args: Vec<String>,
    /// Line number in the trace
    pub line_number: usize,
}

/// Parse a single trace line.
///
/// Returns `Ok(None)` for blank and comment-only lines, and a `Syntax` error
/// for an unterminated quote.
pub fn parse_line(line: &str, line_number: usize) -> Result<Option<TraceLine>, ReportError> {
    let mut words: Vec<String> = Vec::new();
    let mut current = String::new();
    // A quoted '' is still a word, so track presence separately from content.
    let mut in_word = false;
    let mut quoted = false;
    let mut chars = line.chars().peekable();

    loop {
        match chars.next() {
            None => {
                if quoted {
                    return Err(ReportError::syntax("unterminated quoted argument"));
                }
                if in_word {
                    words.push(current);
                }
                break;
            }
            Some('\'') => {
                if !quoted {
                    quoted = true;
                    in_word = true;
                } else if chars.peek() == Some(&'\'') {
                    chars.next();
                    current.push('\'');
                } else {
                    quoted = false;
                }
            }
            Some(c) if !quoted && ARG_SEP_CHARS.contains(&c) => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
                if c == '#' {
                    break;
                }
            }
            Some(c) => {
                current.push(c);
                in_word = true;
            }
        }
    }

    let mut words = words.into_iter();
    let event = match words.next() {
        Some(event) => event,
        None => return Ok(None),
    };

    Ok(Some(TraceLine {
        event,
        args: words.collect(),
        line_number,
    }))
}

/// Parse a whole trace, skipping blank and comment lines
pub fn parse_trace(text: &str, filename: &str) -> Result<Vec<TraceLine>, ReportError> {
    let mut lines = Vec::new();
    for (i, line) in text.lines().enumerate() {
        let line_number = i + 1;
        match parse_line(line, line_number) {
            Ok(Some(parsed)) => lines.push(parsed),
            Ok(None) => {}
            Err(e) => return Err(e.with_location(filename, line_number)),
        }
    }
    Ok(lines)
}

/// Outcome of replaying one trace
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    /// Scopes entered
    pub scopes: usize,
    /// Scopes terminated with `failed`, `mismatch` or `panic`
    pub failed: usize,
    /// Scopes still open at the end of the trace
    pub abandoned: usize,
}

struct OpenScope {
    scope: ScopeDescriptor,
    reporter: BoxedReporter,
    started: bool,
}

/// Drives an observer from trace lines
struct Replay<'a> {
    observer: &'a dyn Observer,
    stack: Vec<OpenScope>,
    summary: ReplaySummary,
}

impl<'a> Replay<'a> {
    fn new(observer: &'a dyn Observer) -> Self {
        Self {
            observer,
            stack: Vec::new(),
            summary: ReplaySummary::default(),
        }
    }

    fn event(&mut self, line: &TraceLine) -> Result<(), ReportError> {
        if let Some(kind) = ScopeKind::from_keyword(&line.event) {
            return self.enter(kind, &line.args);
        }

        match line.event.as_str() {
            "started" => {
                expect_args(line, 0, "started")?;
                let top = self.stack.last_mut().ok_or_else(|| {
                    ReportError::syntax("started: no open scope")
                })?;
                if top.started {
                    return Err(ReportError::syntax("started twice").with_scope(&top.scope));
                }
                top.reporter.started();
                top.started = true;
            }
            "completed" => {
                expect_args(line, 0, "completed")?;
                let top = self.close("completed")?;
                top.reporter.completed();
            }
            "failed" => {
                expect_args(line, 1, "failed message")?;
                let top = self.close("failed")?;
                self.summary.failed += 1;
                top.reporter.failed(&Failure::msg(line.args[0].clone()));
            }
            "mismatch" => {
                expect_args(line, 2, "mismatch expected actual")?;
                let top = self.close("mismatch")?;
                self.summary.failed += 1;
                let cause = Failure::mismatch(unescape(&line.args[0]), unescape(&line.args[1]));
                top.reporter.failed(&cause);
            }
            "panic" => {
                expect_args(line, 1, "panic message")?;
                let top = self.close("panic")?;
                self.summary.failed += 1;
                top.reporter.failed(&Failure::panic(line.args[0].clone()));
            }
            other => {
                return Err(ReportError::syntax(format!("unknown event: {}", other)));
            }
        }
        Ok(())
    }

    fn enter(&mut self, kind: ScopeKind, labels: &[String]) -> Result<(), ReportError> {
        let scope = ScopeDescriptor::from_labels(kind, labels).ok_or_else(|| {
            let names = ["subject", "precondition", "action", "assertion"];
            let usage = names[..kind.arity()].join(" ");
            ReportError::syntax(format!("usage: {} {}", kind.keyword(), usage))
        })?;
        if labels.iter().any(|l| l.is_empty()) {
            return Err(ReportError::syntax("empty scope label").with_scope(&scope));
        }

        // A child starts after its parent and extends the parent's labels.
        if let Some(parent) = self.stack.last() {
            if !parent.started {
                let msg = format!("entered before parent started: {}", parent.scope);
                return Err(ReportError::syntax(msg).with_scope(&scope));
            }
            let outer = parent.scope.labels();
            let extends = labels.len() > outer.len()
                && outer.iter().zip(labels).all(|(o, l)| *o == l.as_str());
            if !extends {
                let msg = format!("not nested in open scope: {}", parent.scope);
                return Err(ReportError::syntax(msg).with_scope(&scope));
            }
        }

        let reporter = self.observer.for_scope(&scope)?;
        self.stack.push(OpenScope {
            scope,
            reporter,
            started: false,
        });
        self.summary.scopes += 1;
        Ok(())
    }

    /// Pop the innermost scope for a terminal event
    fn close(&mut self, event: &str) -> Result<OpenScope, ReportError> {
        let top = self
            .stack
            .pop()
            .ok_or_else(|| ReportError::syntax(format!("{}: no open scope", event)))?;
        if !top.started {
            let msg = format!("{} before started", event);
            return Err(ReportError::syntax(msg).with_scope(&top.scope));
        }
        Ok(top)
    }

    fn finish(self) -> ReplaySummary {
        let mut summary = self.summary;
        summary.abandoned = self.stack.len();
        for open in self.stack.iter().rev() {
            tracing::warn!(scope = %open.scope, started = open.started, "scope abandoned");
        }
        summary
    }
}

fn expect_args(line: &TraceLine, n: usize, usage: &str) -> Result<(), ReportError> {
    if line.args.len() != n {
        return Err(ReportError::syntax(format!("usage: {}", usage)));
    }
    Ok(())
}

/// Expand `\n` and `\t` escapes in mismatch values
fn unescape(s: &str) -> String {
    s.replace("\\n", "\n").replace("\\t", "\t")
}

/// Replay trace text against `observer`.
///
/// Errors carry the file name and line number of the offending event.
pub fn replay(
    observer: &dyn Observer,
    text: &str,
    filename: &str,
) -> Result<ReplaySummary, ReportError> {
    let lines = parse_trace(text, filename)?;
    let mut replay = Replay::new(observer);
    for line in &lines {
        tracing::trace!(file = filename, line = line.line_number, event = %line.event, "replay");
        replay
            .event(line)
            .map_err(|e| e.with_location(filename, line.line_number))?;
    }
    Ok(replay.finish())
}

/// Read and replay a trace file
pub fn replay_file(observer: &dyn Observer, path: &Path) -> Result<ReplaySummary, ReportError> {
    let filename = path.to_string_lossy().to_string();
    let text = std::fs::read_to_string(path).map_err(|e| {
        ReportError::new(ErrorKind::Io, format!("failed to read trace: {}", e))
            .with_location(&filename, 0)
    })?;
    replay(observer, &text, &filename)
}

/// Collect trace files from files and directories.
///
/// Directories are scanned recursively for files ending in `extension`;
/// explicitly named files are taken as-is. The result is sorted.
pub fn discover(paths: &[PathBuf], extension: &str) -> Result<Vec<PathBuf>, std::io::Error> {
    let mut files = Vec::new();
    for path in paths {
        if !path.exists() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("trace path not found: {}", path.display()),
            ));
        }
        if path.is_dir() {
            scan_dir(path, extension, &mut files)?;
        } else {
            files.push(path.clone());
        }
    }
    files.sort();
    files.dedup();
    Ok(files)
}

fn scan_dir(dir: &Path, extension: &str, files: &mut Vec<PathBuf>) -> Result<(), std::io::Error> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            scan_dir(&path, extension, files)?;
        } else if path
            .file_name()
            .and_then(|n| n.to_str())
            .map_or(false, |n| n.ends_with(extension))
        {
            files.push(path);
        }
    }
    Ok(())
}
