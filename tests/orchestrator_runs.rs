// tests/orchestrator_runs.rs

//! End-to-end dispatch tests against a scripted fake runner, a real
//! temporary workspace and the real artifact watcher.

mod common;
use crate::common::builders::{ArtifactBuilder, TestResultBuilder};
use crate::common::{init_tracing, RecordingSink};

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use runwatch::config::TaskDefinition;
use runwatch::correlate::MtimeCorrelator;
use runwatch::engine::{DispatchRequest, Orchestrator};
use runwatch::fs::RealFileSystem;
use runwatch::report::TestIdMatcher;
use runwatch::store::{record_key, FileRecordStore, RecordStore};
use runwatch::types::{RunSettings, RunStatus};
use runwatch_test_utils::fake_runner::{FakeInvocation, FakeRunner};

fn task(name: &str) -> TaskDefinition {
    TaskDefinition {
        name: name.to_string(),
        program: "testflow".to_string(),
        args: vec!["run".to_string(), "--suite".to_string(), name.to_string()],
    }
}

fn settings_for_tests() -> RunSettings {
    RunSettings {
        dispatch_timeout: Duration::from_secs(10),
        result_grace: Duration::from_millis(500),
        ..RunSettings::default()
    }
}

struct Fixture {
    orchestrator: Orchestrator<FakeRunner>,
    runner: Arc<FakeRunner>,
    store: FileRecordStore,
    root: std::path::PathBuf,
}

fn fixture(root: &Path, settings: RunSettings) -> Fixture {
    let fs = Arc::new(RealFileSystem);
    let runner = Arc::new(FakeRunner::new());
    let store = FileRecordStore::new(root.join(".runwatch/last-runs.json"), fs.clone());

    let orchestrator = Orchestrator::new(
        Arc::clone(&runner),
        fs.clone(),
        Arc::new(MtimeCorrelator::new(fs)),
        Arc::new(store.clone()),
        settings,
        root,
    );

    Fixture {
        orchestrator,
        runner,
        store,
        root: root.to_path_buf(),
    }
}

fn artifact_path(root: &Path) -> std::path::PathBuf {
    root.join(".testflow/results.json")
}

#[tokio::test]
async fn artifact_with_no_failures_reaches_passed() {
    init_tracing();

    let dir = tempfile::tempdir().expect("tempdir");
    let fx = fixture(dir.path(), settings_for_tests());

    let body = ArtifactBuilder::new()
        .with_test(TestResultBuilder::passing("t1").duration_ms(40).build())
        .with_test(TestResultBuilder::passing("t2").duration_ms(60).build())
        .build_json();
    fx.runner.push(FakeInvocation {
        artifact: Some((artifact_path(&fx.root), body, Duration::from_millis(50))),
        exit_delay: Duration::from_millis(100),
        ..FakeInvocation::default()
    });

    let the_task = task("e2e");
    let mut sink = RecordingSink::new();
    let request = DispatchRequest {
        task: &the_task,
        items: &[],
        matcher: &TestIdMatcher,
        debug: false,
    };

    let status = fx
        .orchestrator
        .dispatch(request, &mut sink)
        .await
        .expect("dispatch");

    assert_eq!(status, RunStatus::Passed);
    assert_eq!(
        sink.task_statuses,
        vec![
            ("e2e".to_string(), RunStatus::Running),
            ("e2e".to_string(), RunStatus::Passed),
        ]
    );

    // The completed run is persisted under the (workspace, task) key.
    let record = fx
        .store
        .get(&record_key(&fx.root, "e2e"))
        .expect("last-run record persisted");
    assert_eq!(record.passed, 2);
    assert_eq!(record.failed, 0);
    assert_eq!(record.duration_ms, 100);
    assert_eq!(record.task_name.as_deref(), Some("e2e"));
}

#[tokio::test]
async fn artifact_with_failures_reaches_failed() {
    init_tracing();

    let dir = tempfile::tempdir().expect("tempdir");
    let fx = fixture(dir.path(), settings_for_tests());

    let body = ArtifactBuilder::new()
        .with_test(
            TestResultBuilder::failing("t1")
                .assertion_failed("expected 200 got 404", "200", "404")
                .build(),
        )
        .build_json();
    fx.runner.push(FakeInvocation {
        artifact: Some((artifact_path(&fx.root), body, Duration::from_millis(30))),
        exit_code: 1,
        exit_delay: Duration::from_millis(80),
        ..FakeInvocation::default()
    });

    let the_task = task("e2e");
    let mut sink = RecordingSink::new();
    let status = fx
        .orchestrator
        .dispatch(
            DispatchRequest {
                task: &the_task,
                items: &[],
                matcher: &TestIdMatcher,
                debug: false,
            },
            &mut sink,
        )
        .await
        .expect("dispatch");

    assert_eq!(status, RunStatus::Failed);
    assert_eq!(sink.task_status_of("e2e"), Some(RunStatus::Failed));
}

/// Exit 1 with no artifact within the grace window -> errored, with a
/// message referencing the missing results.
#[tokio::test]
async fn nonzero_exit_without_artifact_reaches_errored() {
    init_tracing();

    let dir = tempfile::tempdir().expect("tempdir");
    let fx = fixture(dir.path(), settings_for_tests());

    fx.runner.push(FakeInvocation::exiting(1));

    let the_task = task("e2e");
    let mut sink = RecordingSink::new();
    let status = fx
        .orchestrator
        .dispatch(
            DispatchRequest {
                task: &the_task,
                items: &[],
                matcher: &TestIdMatcher,
                debug: false,
            },
            &mut sink,
        )
        .await
        .expect("dispatch");

    assert_eq!(status, RunStatus::Errored);
    assert!(
        sink.outputs
            .iter()
            .any(|o| o.contains("no result artifact")),
        "missing no-result message in {:?}",
        sink.outputs
    );

    // No record is persisted for a run with no results.
    assert!(fx.store.get(&record_key(&fx.root, "e2e")).is_none());
}

/// Artifacts may land after process exit; the grace window covers them.
#[tokio::test]
async fn artifact_arriving_after_exit_within_grace_is_applied() {
    init_tracing();

    let dir = tempfile::tempdir().expect("tempdir");
    let fx = fixture(dir.path(), settings_for_tests());

    let body = ArtifactBuilder::new()
        .with_test(TestResultBuilder::passing("t1").build())
        .build_json();
    // Exit immediately (non-zero), write the artifact 150ms later, well
    // inside the 500ms grace window.
    fx.runner.push(FakeInvocation {
        exit_code: 1,
        exit_delay: Duration::from_millis(0),
        artifact: Some((artifact_path(&fx.root), body, Duration::from_millis(150))),
        ..FakeInvocation::default()
    });

    let the_task = task("e2e");
    let mut sink = RecordingSink::new();
    let status = fx
        .orchestrator
        .dispatch(
            DispatchRequest {
                task: &the_task,
                items: &[],
                matcher: &TestIdMatcher,
                debug: false,
            },
            &mut sink,
        )
        .await
        .expect("dispatch");

    assert_eq!(status, RunStatus::Passed);
}

#[tokio::test]
async fn deadline_elapsing_reaches_timeout() {
    init_tracing();

    let dir = tempfile::tempdir().expect("tempdir");
    let mut settings = settings_for_tests();
    settings.dispatch_timeout = Duration::from_millis(200);
    let fx = fixture(dir.path(), settings);

    // The fake runner would run for a minute; the deadline fires first and
    // teardown cancels it.
    fx.runner.push(FakeInvocation {
        exit_delay: Duration::from_secs(60),
        ..FakeInvocation::default()
    });

    let the_task = task("e2e");
    let mut sink = RecordingSink::new();
    let started = std::time::Instant::now();
    let status = fx
        .orchestrator
        .dispatch(
            DispatchRequest {
                task: &the_task,
                items: &[],
                matcher: &TestIdMatcher,
                debug: false,
            },
            &mut sink,
        )
        .await
        .expect("dispatch");

    assert_eq!(status, RunStatus::Timeout);
    assert!(
        started.elapsed() < Duration::from_secs(10),
        "teardown must not wait for the scripted 60s"
    );
    assert!(sink.outputs.iter().any(|o| o.contains("timed out")));
}

/// Streamed runner output reaches the sink while the process is alive.
#[tokio::test]
async fn runner_output_is_forwarded() {
    init_tracing();

    let dir = tempfile::tempdir().expect("tempdir");
    let fx = fixture(dir.path(), settings_for_tests());

    let body = ArtifactBuilder::new()
        .with_test(TestResultBuilder::passing("t1").build())
        .build_json();
    fx.runner.push(FakeInvocation {
        stdout: "running 1 flow\n".to_string(),
        artifact: Some((artifact_path(&fx.root), body, Duration::from_millis(40))),
        exit_delay: Duration::from_millis(80),
        ..FakeInvocation::default()
    });

    let the_task = task("e2e");
    let mut sink = RecordingSink::new();
    fx.orchestrator
        .dispatch(
            DispatchRequest {
                task: &the_task,
                items: &[],
                matcher: &TestIdMatcher,
                debug: false,
            },
            &mut sink,
        )
        .await
        .expect("dispatch");

    assert!(
        sink.outputs.iter().any(|o| o.contains("running 1 flow")),
        "streamed output missing from {:?}",
        sink.outputs
    );
}

/// Debug dispatches allocate a port up front and hand it to the runner on
/// its argv. The inspector never answering only costs a warning; the run
/// itself still resolves through the artifact.
#[tokio::test]
async fn debug_dispatch_passes_inspector_port_to_the_runner() {
    init_tracing();

    let dir = tempfile::tempdir().expect("tempdir");
    let mut settings = settings_for_tests();
    settings.inspector_poll_timeout = Duration::from_millis(200);
    settings.inspector_poll_interval = Duration::from_millis(50);
    let fx = fixture(dir.path(), settings);

    let body = ArtifactBuilder::new()
        .with_test(TestResultBuilder::passing("t1").build())
        .build_json();
    fx.runner.push(FakeInvocation {
        artifact: Some((artifact_path(&fx.root), body, Duration::from_millis(50))),
        exit_delay: Duration::from_millis(300),
        ..FakeInvocation::default()
    });

    let the_task = task("e2e");
    let mut sink = RecordingSink::new();
    let status = fx
        .orchestrator
        .dispatch(
            DispatchRequest {
                task: &the_task,
                items: &[],
                matcher: &TestIdMatcher,
                debug: true,
            },
            &mut sink,
        )
        .await
        .expect("dispatch");

    assert_eq!(status, RunStatus::Passed);

    let executed = fx.runner.executed();
    let executed = executed.lock().unwrap();
    assert!(
        executed[0].contains("--inspect-port"),
        "debug argv missing inspector port: {executed:?}"
    );
}

/// A missing binary is a spawn failure: surfaced immediately, the run
/// never reaches Running.
#[tokio::test]
async fn spawn_failure_is_surfaced_immediately() {
    init_tracing();

    let dir = tempfile::tempdir().expect("tempdir");
    let fs = Arc::new(RealFileSystem);
    let store = FileRecordStore::new(dir.path().join(".runwatch/last-runs.json"), fs.clone());
    let orchestrator = Orchestrator::new(
        Arc::new(runwatch::exec::ProcessExecutor::new()),
        fs.clone(),
        Arc::new(MtimeCorrelator::new(fs)),
        Arc::new(store),
        settings_for_tests(),
        dir.path(),
    );

    let the_task = TaskDefinition {
        name: "e2e".to_string(),
        program: "definitely-not-a-real-binary-xyz".to_string(),
        args: vec![],
    };
    let mut sink = RecordingSink::new();
    let err = orchestrator
        .dispatch(
            DispatchRequest {
                task: &the_task,
                items: &[],
                matcher: &TestIdMatcher,
                debug: false,
            },
            &mut sink,
        )
        .await
        .expect_err("spawn must fail");

    assert!(matches!(err, runwatch::errors::RunwatchError::Spawn { .. }));
    assert!(
        !sink
            .task_statuses
            .iter()
            .any(|(_, s)| *s == RunStatus::Running),
        "run must never reach Running on spawn failure"
    );
}
