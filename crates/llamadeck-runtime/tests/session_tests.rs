//! End-to-end session tests against a fake `llama-cli`.
//!
//! Each test writes a small shell script standing in for the binary, a
//! placeholder shared library next to it and a models directory holding one
//! file with the GGUF magic.

#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use llamadeck_core::{BenchmarkResult, ModelOptions, StreamEvent};
use llamadeck_runtime::{
    EventBridge, EventReceiver, QueryError, RuntimeConfig, Session, run_benchmark,
};
use tempfile::TempDir;
use tokio::time::timeout;

const FULL_HELP: &str = "echo '  --top-p N'; echo '  --no-display-prompt'; echo '  --no-mmap'; \
                         echo '  --single-turn'; echo '  -no-cnv'";
const BARE_HELP: &str = "echo '  -m FNAME'; echo '  -p PROMPT'";

struct Fixture {
    dir: TempDir,
    binary: PathBuf,
}

impl Fixture {
    /// `help` runs for `--help`; `body` runs for a query, after the
    /// arguments are saved to `args.txt`.
    fn new(help: &str, body: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let binary = dir.path().join("llama-cli");
        let args_file = dir.path().join("args.txt");
        let script = format!(
            "#!/bin/sh\nif [ \"$1\" = \"--help\" ]; then\n{help}\nexit 0\nfi\n\
             printf '%s\\n' \"$@\" > '{}'\n{body}\n",
            args_file.display()
        );
        fs::write(&binary, script).unwrap();
        fs::set_permissions(&binary, fs::Permissions::from_mode(0o755)).unwrap();
        fs::write(dir.path().join("libllama.so"), b"").unwrap();

        let models = dir.path().join("models");
        fs::create_dir(&models).unwrap();
        fs::write(models.join("tiny-Q4_K_M.gguf"), b"GGUF\x03\x00\x00\x00").unwrap();
        fs::write(models.join("other-Q8_0.gguf"), b"GGUF\x03\x00\x00\x00").unwrap();

        Self { dir, binary }
    }

    fn config(&self) -> RuntimeConfig {
        let mut config = RuntimeConfig::new(&self.binary, self.dir.path().join("models"));
        config.kill_grace = Duration::from_millis(200);
        config
    }

    fn session(&self) -> (Session, EventBridge) {
        let bridge = EventBridge::new();
        let session = Session::new(self.config(), Arc::new(bridge.clone()));
        assert!(session.load_model("tiny"));
        (session, bridge)
    }

    fn recorded_args(&self) -> Vec<String> {
        fs::read_to_string(self.dir.path().join("args.txt"))
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }
}

/// Collect one query's events up to and including the terminal one.
async fn collect(rx: &mut EventReceiver) -> Vec<StreamEvent> {
    let mut events = Vec::new();
    loop {
        let event = timeout(Duration::from_secs(10), rx.recv())
            .await
            .expect("stream timed out")
            .unwrap();
        let terminal = event.is_terminal();
        events.push(event);
        if terminal {
            return events;
        }
    }
}

async fn wait_for_processes(session: &Session, count: usize) {
    timeout(Duration::from_secs(10), async {
        while session.active_process_count() < count {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("processes never registered");
}

fn model_path(fixture: &Fixture) -> String {
    std::path::absolute(fixture.path("models/tiny-Q4_K_M.gguf"))
        .unwrap()
        .display()
        .to_string()
}

#[tokio::test]
async fn test_query_returns_full_output() {
    let fixture = Fixture::new(FULL_HELP, "printf 'Hello, world!'");
    let (session, _bridge) = fixture.session();

    let text = session
        .query_model("Say hi", &ModelOptions::default())
        .await
        .unwrap();
    assert_eq!(text, "Hello, world!");
    assert_eq!(session.active_process_count(), 0);
}

#[tokio::test]
async fn test_full_capabilities_append_optional_flags() {
    let fixture = Fixture::new(FULL_HELP, "printf ok");
    let (session, _bridge) = fixture.session();

    session
        .query_model("hi", &ModelOptions::default().with_temperature(0.5))
        .await
        .unwrap();

    let args = fixture.recorded_args();
    assert_eq!(&args[..6], ["-m", &model_path(&fixture), "-p", "hi", "--temp", "0.5"]);
    assert_eq!(
        &args[14..],
        ["--top-p", "0.9", "--no-display-prompt", "--no-mmap", "--single-turn", "-no-cnv"]
    );
}

#[tokio::test]
async fn test_bare_help_yields_only_required_arguments() {
    let fixture = Fixture::new(BARE_HELP, "printf ok");
    let (session, _bridge) = fixture.session();

    session
        .query_model("hi", &ModelOptions::default())
        .await
        .unwrap();

    let args = fixture.recorded_args();
    assert_eq!(args.len(), 14);
    assert_eq!(
        &args[..12],
        [
            "-m",
            &model_path(&fixture),
            "-p",
            "hi",
            "--temp",
            "0.7",
            "--seed",
            "42",
            "-c",
            "2048",
            "-n",
            "512"
        ]
    );
    assert_eq!(args[12], "-t");
    assert!(args[13].parse::<usize>().unwrap() >= 1);
}

#[tokio::test]
async fn test_empty_output_is_error() {
    let fixture = Fixture::new(FULL_HELP, "exit 0");
    let (session, _bridge) = fixture.session();

    let err = session
        .query_model("hi", &ModelOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, QueryError::EmptyOutput));
}

#[tokio::test]
async fn test_nonzero_exit_is_process_error() {
    let fixture = Fixture::new(FULL_HELP, "printf partial; exit 3");
    let (session, _bridge) = fixture.session();

    let err = session
        .query_model("hi", &ModelOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, QueryError::Process { code: Some(3) }));
    assert_eq!(session.active_process_count(), 0);
}

#[tokio::test]
async fn test_registry_empties_after_every_terminal_state() {
    let fixture = Fixture::new(FULL_HELP, "printf ok");
    let (session, bridge) = fixture.session();
    let mut rx = bridge.subscribe();

    for _ in 0..3 {
        session
            .query_model("hi", &ModelOptions::default())
            .await
            .unwrap();
        assert_eq!(session.active_process_count(), 0);

        session.stream_query("hi", &ModelOptions::default());
        collect(&mut rx).await;
        assert_eq!(session.active_process_count(), 0);
    }
}

#[tokio::test]
async fn test_stream_events_in_order() {
    let fixture = Fixture::new(FULL_HELP, "printf 'one '; sleep 0.1; printf 'two'");
    let (session, bridge) = fixture.session();
    let mut rx = bridge.subscribe();

    let id = session.stream_query("hi", &ModelOptions::default());
    let events = collect(&mut rx).await;

    assert!(events.iter().all(|e| e.query_id() == &id));
    assert!(matches!(events.first(), Some(StreamEvent::Start { .. })));
    let chunks: String = events
        .iter()
        .filter_map(|e| match e {
            StreamEvent::Data { chunk, .. } => Some(chunk.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(chunks, "one two");
    match events.last() {
        Some(StreamEvent::End { full_response, .. }) => assert_eq!(full_response, "one two"),
        other => panic!("expected end, got {other:?}"),
    }
}

#[tokio::test]
async fn test_failing_stream_ends_with_error() {
    let fixture = Fixture::new(FULL_HELP, "printf partial; exit 2");
    let (session, bridge) = fixture.session();
    let mut rx = bridge.subscribe();

    session.stream_query("hi", &ModelOptions::default());
    let events = collect(&mut rx).await;

    assert!(matches!(events.first(), Some(StreamEvent::Start { .. })));
    assert!(matches!(events.last(), Some(StreamEvent::Error { .. })));
    assert_eq!(events.iter().filter(|e| e.is_terminal()).count(), 1);
}

#[tokio::test]
async fn test_stderr_error_line_fails_stream() {
    let fixture = Fixture::new(
        FULL_HELP,
        "echo 'loading model' >&2; echo 'error: failed to load model' >&2; exec sleep 5",
    );
    let (session, bridge) = fixture.session();
    let mut rx = bridge.subscribe();

    session.stream_query("hi", &ModelOptions::default());
    let events = collect(&mut rx).await;

    match events.last() {
        Some(StreamEvent::Error { message, .. }) => {
            assert!(message.contains("failed to load model"));
        }
        other => panic!("expected error, got {other:?}"),
    }
    timeout(Duration::from_secs(5), async {
        while session.active_process_count() > 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn test_stream_without_model_emits_start_then_error() {
    let fixture = Fixture::new(FULL_HELP, "printf ok");
    let bridge = EventBridge::new();
    let session = Session::new(fixture.config(), Arc::new(bridge.clone()));
    let mut rx = bridge.subscribe();

    session.stream_query("hi", &ModelOptions::default());
    let events = collect(&mut rx).await;

    assert_eq!(events.len(), 2);
    assert!(matches!(events[0], StreamEvent::Start { .. }));
    assert!(matches!(events[1], StreamEvent::Error { .. }));
}

#[tokio::test]
async fn test_stop_all_empties_registry_immediately() {
    let fixture = Fixture::new(FULL_HELP, "printf started; exec sleep 30");
    let (session, bridge) = fixture.session();
    let mut rx = bridge.subscribe();

    let first = session.stream_query("a", &ModelOptions::default());
    let second = session.stream_query("b", &ModelOptions::default());
    wait_for_processes(&session, 2).await;

    assert_eq!(session.stop_all_processes(), 2);
    assert_eq!(session.active_process_count(), 0);

    let mut terminal = Vec::new();
    timeout(Duration::from_secs(10), async {
        while terminal.len() < 2 {
            let event = rx.recv().await.unwrap();
            if event.is_terminal() {
                assert!(matches!(event, StreamEvent::Error { .. }));
                terminal.push(event.query_id().clone());
            }
        }
    })
    .await
    .unwrap();
    assert!(terminal.contains(&first));
    assert!(terminal.contains(&second));
}

#[tokio::test]
async fn test_stop_query_leaves_others_running() {
    let fixture = Fixture::new(FULL_HELP, "printf started; exec sleep 30");
    let (session, _bridge) = fixture.session();

    let first = session.stream_query("a", &ModelOptions::default());
    session.stream_query("b", &ModelOptions::default());
    wait_for_processes(&session, 2).await;

    assert!(session.stop_query(&first));
    assert!(!session.stop_query(&first));
    assert_eq!(session.active_process_count(), 1);
    assert_eq!(session.stop_all_processes(), 1);
}

#[tokio::test]
async fn test_abandoned_query_leaves_no_process() {
    let fixture = Fixture::new(FULL_HELP, "printf 'x'; exec sleep 30");
    let (session, _bridge) = fixture.session();

    let result = timeout(
        Duration::from_millis(1500),
        session.query_model("hi", &ModelOptions::default()),
    )
    .await;

    assert!(result.is_err());
    assert_eq!(session.active_process_count(), 0);
}

#[tokio::test]
async fn test_idle_subscriber_sees_whole_long_stream() {
    let fixture = Fixture::new(
        FULL_HELP,
        "i=0; while [ $i -lt 400 ]; do printf 'c%d ' $i; i=$((i+1)); done",
    );
    let (session, bridge) = fixture.session();
    let mut rx = bridge.subscribe();

    session.stream_query("hi", &ModelOptions::default());
    tokio::time::sleep(Duration::from_secs(1)).await;
    let events = collect(&mut rx).await;

    let expected: String = (0..400).map(|i| format!("c{i} ")).collect();
    assert!(matches!(events.first(), Some(StreamEvent::Start { .. })));
    let chunks: String = events
        .iter()
        .filter_map(|e| match e {
            StreamEvent::Data { chunk, .. } => Some(chunk.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(chunks, expected);
    match events.last() {
        Some(StreamEvent::End { full_response, .. }) => assert_eq!(full_response, &expected),
        other => panic!("expected end, got {other:?}"),
    }
}

#[tokio::test]
async fn test_benchmark_continues_past_failures() {
    let fixture = Fixture::new(FULL_HELP, "printf 'The answer is 42.'");
    let (session, _bridge) = fixture.session();

    let results = run_benchmark(
        &session,
        &["nonexistent".into(), "other".into()],
        &["q1".into(), "q2".into()],
        &ModelOptions::default(),
    )
    .await;

    assert_eq!(results.len(), 2);
    assert!(!results[0].is_success());
    match &results[1] {
        BenchmarkResult::Success {
            results, metrics, ..
        } => {
            assert_eq!(results.len(), 2);
            assert_eq!(results[0].response, "The answer is 42.");
            assert_eq!(metrics.total_tokens, 10);
        }
        other => panic!("expected success, got {other:?}"),
    }
    let active = session.active_model().unwrap();
    assert!(active.ends_with(Path::new("tiny-Q4_K_M.gguf")));
}
