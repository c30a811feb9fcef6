//! Integration tests: dispatcher fan-out with hand-written mocks, and
//! replay of the fixture traces in `tests/traces/`.
//!
//! Usage:
//!   cargo test --package emx-specreport --test integration

use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use emx_specreport::trace::{self, TRACE_EXTENSION};
use emx_specreport::{
    BoxedReporter, Dispatcher, ErrorKind, Failure, Observer, Recorder, ReportError,
    ReporterBuilder, ScopeDescriptor, ScopeFn, StepReporter,
};
use pretty_assertions::assert_eq;

fn traces_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/traces")
}

/// What one mock step reporter was told
#[derive(Debug, Default)]
struct StepLog {
    started: usize,
    completed: usize,
    failed: Vec<Failure>,
}

/// Mock observer: records factory arguments and hands out a distinct
/// reporter, with its own log, per call.
#[derive(Default)]
struct MockObserver {
    calls: Mutex<Vec<Vec<String>>>,
    steps: Mutex<Vec<Arc<Mutex<StepLog>>>>,
}

impl MockObserver {
    fn reporter(&self, labels: &[&str]) -> Result<BoxedReporter, ReportError> {
        self.calls
            .lock()
            .unwrap()
            .push(labels.iter().map(|s| s.to_string()).collect());
        let log = Arc::new(Mutex::new(StepLog::default()));
        self.steps.lock().unwrap().push(Arc::clone(&log));
        Ok(Box::new(MockStep { log }))
    }

    fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }

    fn step(&self, i: usize) -> Arc<Mutex<StepLog>> {
        Arc::clone(&self.steps.lock().unwrap()[i])
    }
}

impl Observer for MockObserver {
    fn for_precondition(
        &self,
        subject: &str,
        precondition: &str,
    ) -> Result<BoxedReporter, ReportError> {
        self.reporter(&[subject, precondition])
    }

    fn for_action(
        &self,
        subject: &str,
        precondition: &str,
        action: &str,
    ) -> Result<BoxedReporter, ReportError> {
        self.reporter(&[subject, precondition, action])
    }

    fn for_assertion(
        &self,
        subject: &str,
        precondition: &str,
        action: &str,
        assertion: &str,
    ) -> Result<BoxedReporter, ReportError> {
        self.reporter(&[subject, precondition, action, assertion])
    }

    fn name(&self) -> &str {
        "mock"
    }
}

struct MockStep {
    log: Arc<Mutex<StepLog>>,
}

impl StepReporter for MockStep {
    fn started(&mut self) {
        self.log.lock().unwrap().started += 1;
    }

    fn completed(self: Box<Self>) {
        self.log.lock().unwrap().completed += 1;
    }

    fn failed(self: Box<Self>, cause: &Failure) {
        self.log.lock().unwrap().failed.push(cause.clone());
    }
}

fn two_mocks() -> (Dispatcher, Arc<MockObserver>, Arc<MockObserver>) {
    let a = Arc::new(MockObserver::default());
    let b = Arc::new(MockObserver::default());
    let mut dispatcher = Dispatcher::new();
    dispatcher.register(a.clone());
    dispatcher.register(b.clone());
    (dispatcher, a, b)
}

#[test]
fn precondition_lifecycle_reaches_both_observers() {
    let (dispatcher, a, b) = two_mocks();

    let mut step = dispatcher.for_precondition("Calculator", "a calculator").unwrap();
    step.started();
    step.completed();

    for mock in [&a, &b] {
        assert_eq!(mock.calls(), vec![vec!["Calculator", "a calculator"]]);
        let step = mock.step(0);
        let log = step.lock().unwrap();
        assert_eq!(log.started, 1);
        assert_eq!(log.completed, 1);
        assert!(log.failed.is_empty());
    }
}

#[test]
fn action_descriptor_passes_through_unchanged() {
    let (dispatcher, a, b) = two_mocks();

    let mut step = dispatcher.for_action("Calculator", "a calculator", "addition").unwrap();
    step.started();
    step.completed();

    assert_eq!(a.calls(), vec![vec!["Calculator", "a calculator", "addition"]]);
    assert_eq!(b.calls(), a.calls());
    assert_eq!(b.step(0).lock().unwrap().completed, 1);
}

#[test]
fn failure_instance_is_shared_by_all_observers() {
    let (dispatcher, a, b) = two_mocks();
    let cause = Failure::error(std::io::Error::new(std::io::ErrorKind::Other, "test exception"));

    let mut step = dispatcher
        .for_assertion("Calculator", "a calculator", "addition", "returns the sum")
        .unwrap();
    step.started();
    step.failed(&cause);

    for mock in [&a, &b] {
        let step = mock.step(0);
        let log = step.lock().unwrap();
        assert_eq!(log.started, 1);
        assert_eq!(log.completed, 0);
        assert_eq!(log.failed.len(), 1);
        assert!(log.failed[0].ptr_eq(&cause));
    }
}

#[test]
fn observers_get_independent_reporters() {
    let (dispatcher, a, b) = two_mocks();

    let mut given = dispatcher.for_precondition("Stack", "an empty stack").unwrap();
    given.started();
    let mut on = dispatcher.for_action("Stack", "an empty stack", "push").unwrap();
    on.started();
    on.completed();
    given.completed();

    for mock in [&a, &b] {
        assert_eq!(mock.calls().len(), 2);
        for i in 0..2 {
            let step = mock.step(i);
            let log = step.lock().unwrap();
            assert_eq!((log.started, log.completed), (1, 1), "step {}", i);
        }
    }
    assert!(!Arc::ptr_eq(&a.step(0), &b.step(0)));
}

#[test]
fn fan_out_for_any_number_of_observers() {
    for n in 0..5 {
        let mocks: Vec<Arc<MockObserver>> =
            (0..n).map(|_| Arc::new(MockObserver::default())).collect();
        let mut dispatcher = Dispatcher::new();
        for mock in &mocks {
            dispatcher.register(mock.clone());
        }

        let mut step = dispatcher
            .for_assertion("Queue", "a full queue", "push", "rejects")
            .unwrap();
        step.started();
        step.completed();

        for mock in &mocks {
            assert_eq!(mock.calls().len(), 1, "n = {}", n);
            assert_eq!(mock.step(0).lock().unwrap().completed, 1, "n = {}", n);
        }
    }
}

#[test]
fn zero_observers_is_a_silent_composite() {
    let dispatcher = Dispatcher::new();
    let mut step = dispatcher.for_precondition("Calculator", "a calculator").unwrap();
    step.started();
    step.failed(&Failure::msg("ignored"));
    assert!(dispatcher.faults().is_empty());
}

#[test]
fn nested_dispatchers_form_a_tree() {
    let leaf = Arc::new(Recorder::named("leaf"));
    let top = Arc::new(Recorder::named("top"));
    let inner = Dispatcher::new().named("inner").with_observer(leaf.clone());
    let outer = Dispatcher::new()
        .with_observer(top.clone())
        .with_observer(Arc::new(inner));

    let cause = Failure::mismatch("4", "5");
    let mut step = outer.for_assertion("Calculator", "a calculator", "addition", "sums").unwrap();
    step.started();
    step.failed(&cause);

    assert_eq!(leaf.lines(), top.lines());
    assert!(leaf.failures()[0].ptr_eq(&top.failures()[0]));
}

#[test]
fn faulty_observer_does_not_stop_the_others() {
    let rec = Arc::new(Recorder::new());
    let refusing = ScopeFn::new("refusing", |scope: &ScopeDescriptor| {
        Err(ReportError::refused(format!("no slot for {}", scope.subject())))
    });
    let reporter = ReporterBuilder::new()
        .observer(Arc::new(refusing))
        .observer(rec.clone())
        .build()
        .unwrap();

    let observer = reporter.observer();
    let mut step = observer.for_precondition("Calculator", "a calculator").unwrap();
    step.started();
    step.completed();

    assert_eq!(rec.count(emx_specreport::ScopeKind::Precondition, "completed"), 1);
    let faults = reporter.faults().snapshot();
    assert_eq!(faults.len(), 1);
    assert_eq!(faults[0].kind, ErrorKind::Refused);
    assert_eq!(faults[0].observer.as_deref(), Some("refusing"));
    assert_eq!(reporter.summary(), "0 passed, 0 failed (1 observer faults)");
}

#[derive(Clone, Default)]
struct Buf(Arc<Mutex<Vec<u8>>>);

impl Write for Buf {
    fn write(&mut self, data: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(data);
        Ok(data.len())
    }
    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl Buf {
    fn text(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

#[test]
fn replay_calculator_to_console() {
    let buf = Buf::default();
    let reporter = ReporterBuilder::new().console(buf.clone()).build().unwrap();

    let calculator = traces_dir().join("calculator.trace");
    let summary = trace::replay_file(reporter.observer().as_ref(), &calculator).unwrap();
    assert_eq!(summary.scopes, 6);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.abandoned, 0);

    assert_eq!(
        buf.text(),
        "Calculator\n\
         \x20 given a calculator\n\
         \x20   when addition\n\
         \x20     PASS  returns the sum\n\
         \x20     FAIL  is commutative\n\
         \x20           expected 4, got 5\n\
         \x20   when division\n\
         \x20     PASS  rejects zero\n"
    );
    assert_eq!(reporter.summary(), "2 passed, 1 failed");
}

#[test]
fn replay_filtered_console_keeps_ancestor_headers() {
    let buf = Buf::default();
    let reporter = ReporterBuilder::new()
        .console(buf.clone())
        .filter("division")
        .build()
        .unwrap();

    let calculator = traces_dir().join("calculator.trace");
    trace::replay_file(reporter.observer().as_ref(), &calculator).unwrap();

    assert_eq!(
        buf.text(),
        "Calculator\n  given a calculator\n    when division\n      PASS  rejects zero\n"
    );
    // The tally is not filtered.
    assert_eq!(reporter.summary(), "2 passed, 1 failed");
}

#[test]
fn replay_directory_tallies_every_trace() {
    let files = trace::discover(&[traces_dir()], TRACE_EXTENSION).unwrap();
    let names: Vec<_> = files
        .iter()
        .filter_map(|p| p.file_name())
        .map(|n| n.to_string_lossy().to_string())
        .collect();
    assert_eq!(names, vec!["calculator.trace", "report.trace", "stack.trace"]);

    let rec = Arc::new(Recorder::new());
    let reporter = ReporterBuilder::new().observer(rec.clone()).build().unwrap();
    let observer = reporter.observer();
    let mut abandoned = 0;
    for file in &files {
        abandoned += trace::replay_file(observer.as_ref(), file).unwrap().abandoned;
    }

    assert_eq!(abandoned, 3);
    assert_eq!(
        reporter.summary(),
        "2 passed, 3 failed, 1 setup failures, 3 abandoned"
    );
    assert!(!reporter.all_passed());
    assert!(rec.violations().is_empty());

    let multiline = rec
        .failures()
        .into_iter()
        .find_map(|f| {
            f.as_mismatch()
                .filter(|(e, _)| e.contains('\n'))
                .map(|(e, a)| (e.to_string(), a.to_string()))
        });
    assert_eq!(
        multiline,
        Some(("total: 4\nok".to_string(), "total: 5\nok".to_string()))
    );
}

#[test]
fn invalid_trace_reports_file_and_line() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.trace");
    std::fs::write(&path, "# lone terminal\ngiven Stack 'an empty stack'\ncompleted\n").unwrap();

    let rec = Recorder::new();
    let err = trace::replay_file(&rec, &path).unwrap_err();
    assert_eq!(err.kind, ErrorKind::Syntax);
    assert_eq!(
        err.to_string(),
        format!("{}:3: Stack / an empty stack: completed before started", path.display())
    );
    // The factory call happened before the misuse was detected.
    assert_eq!(rec.lines(), vec!["enter Stack / an empty stack"]);
}

#[test]
fn missing_trace_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = trace::replay_file(&Recorder::new(), &dir.path().join("absent.trace")).unwrap_err();
    assert_eq!(err.kind, ErrorKind::Io);
}
