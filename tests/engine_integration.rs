//! End-to-end runs of the speed test engine against a mock HTTP server
//!
//! The mock serves `GET /__down?bytes=N` with an N-byte body and accepts
//! `POST /__up`, the same endpoints the production transport talks to.

use network_speed_tester::{
    executor::{ProgressObserver, TestOrchestrator},
    models::{Config, ProgressSnapshot, TestOutcome, TestResult},
    output::{JsonLinesSink, OutputFormatterFactory},
    types::TestPhase,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, Request, Respond, ResponseTemplate,
};

/// Answers with as many bytes as the `bytes` query parameter asks for
struct SizedBody {
    /// Status for non-empty downloads; probes (`bytes=0`) always succeed
    download_status: u16,
}

impl Respond for SizedBody {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let bytes = request
            .url
            .query_pairs()
            .find(|(key, _)| key == "bytes")
            .and_then(|(_, value)| value.parse::<usize>().ok())
            .unwrap_or(0);

        if bytes == 0 {
            ResponseTemplate::new(200)
        } else if self.download_status == 200 {
            ResponseTemplate::new(200).set_body_bytes(vec![0x5a; bytes])
        } else {
            ResponseTemplate::new(self.download_status)
        }
    }
}

async fn start_server(download_status: u16) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/__down"))
        .respond_with(SizedBody { download_status })
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/__up"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    server
}

fn short_config(server: &MockServer) -> Config {
    Config {
        server_urls: vec![server.uri()],
        ping_count: 3,
        ping_timeout_ms: 1000,
        jitter_readings: 3,
        jitter_interval_ms: 5,
        download_duration_ms: 300,
        download_chunk_bytes: 64 * 1024,
        upload_duration_ms: 300,
        upload_chunk_bytes: 32 * 1024,
        chunk_timeout_ms: 2000,
        failure_backoff_ms: 20,
        enable_color: false,
        ..Config::default()
    }
}

#[derive(Default)]
struct PhaseRecorder {
    phases: Mutex<Vec<TestPhase>>,
    completed: Mutex<Option<TestResult>>,
}

impl ProgressObserver for PhaseRecorder {
    fn on_phase_change(&self, phase: TestPhase) {
        self.phases.lock().unwrap().push(phase);
    }

    fn on_progress(&self, snapshot: &ProgressSnapshot) {
        assert!((0.0..=100.0).contains(&snapshot.percent_complete));
    }

    fn on_complete(&self, result: &TestResult) {
        *self.completed.lock().unwrap() = Some(result.clone());
    }
}

#[tokio::test]
async fn test_full_run_against_mock_server() {
    let server = start_server(200).await;
    let recorder = Arc::new(PhaseRecorder::default());
    let orchestrator = TestOrchestrator::from_config(short_config(&server))
        .unwrap()
        .with_observer(recorder.clone());

    let outcome = orchestrator.run_test().await.unwrap();
    let result = outcome.into_result().expect("run should complete");

    assert_eq!(result.server, server.uri().trim_end_matches('/'));
    assert!(result.download_mbps > 0.0);
    assert!(result.upload_mbps > 0.0);
    assert!(result.ping_ms >= 0.0 && result.ping_ms < 1000.0);
    assert!(result.jitter_ms >= 0.0);

    assert_eq!(
        *recorder.phases.lock().unwrap(),
        vec![TestPhase::Ping, TestPhase::Download, TestPhase::Upload, TestPhase::Complete]
    );
    assert_eq!(recorder.completed.lock().unwrap().as_ref(), Some(&result));

    let snapshot = orchestrator.snapshot();
    assert_eq!(snapshot.phase, TestPhase::Complete);
    assert_eq!(snapshot.percent_complete, 100.0);
    assert!(!orchestrator.is_running());
}

#[tokio::test]
async fn test_failed_downloads_report_zero_and_complete() {
    let server = start_server(500).await;
    let orchestrator = TestOrchestrator::from_config(short_config(&server)).unwrap();

    let outcome = orchestrator.run_test().await.unwrap();
    let result = outcome.into_result().expect("run should still complete");

    assert_eq!(result.download_mbps, 0.0);
    assert!(result.upload_mbps > 0.0);
    assert_eq!(orchestrator.snapshot().phase, TestPhase::Complete);
}

#[tokio::test]
async fn test_results_file_receives_completed_run() {
    let server = start_server(200).await;
    let dir = tempfile::tempdir().unwrap();
    let results = dir.path().join("runs.jsonl");

    let orchestrator = TestOrchestrator::from_config(short_config(&server))
        .unwrap()
        .with_sink(Arc::new(JsonLinesSink::new(&results)));

    let result = orchestrator.run_test().await.unwrap().into_result().unwrap();

    let contents = std::fs::read_to_string(&results).unwrap();
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines.len(), 1);

    let recorded: TestResult = serde_json::from_str(lines[0]).unwrap();
    assert_eq!(recorded, result);

    let timestamp = regex::Regex::new(r#""timestamp":"\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}"#).unwrap();
    assert!(timestamp.is_match(lines[0]));
}

#[tokio::test]
async fn test_cancel_during_download_returns_partial() {
    let server = start_server(200).await;
    let config = Config {
        download_duration_ms: 10_000,
        ..short_config(&server)
    };
    let orchestrator = Arc::new(TestOrchestrator::from_config(config).unwrap());
    let mut progress = orchestrator.subscribe();

    let runner = {
        let orchestrator = Arc::clone(&orchestrator);
        tokio::spawn(async move { orchestrator.run_test().await })
    };

    tokio::time::timeout(Duration::from_secs(5), async {
        while progress.borrow_and_update().phase != TestPhase::Download {
            progress.changed().await.unwrap();
        }
    })
    .await
    .expect("download phase should start");

    assert!(orchestrator.cancel_test());

    let outcome = tokio::time::timeout(Duration::from_secs(5), runner)
        .await
        .expect("cancellation should be prompt")
        .unwrap()
        .unwrap();

    match outcome {
        TestOutcome::Cancelled(partial) => {
            assert!(partial.ping_ms.is_some());
            assert!(partial.jitter_ms.is_some());
            assert!(partial.download_mbps.is_none());
        }
        TestOutcome::Completed(_) => panic!("run should have been cancelled"),
    }
    assert_eq!(orchestrator.snapshot().phase, TestPhase::Idle);
    assert!(!orchestrator.cancel_test());
}

#[tokio::test]
async fn test_unreachable_candidate_is_skipped() {
    let server = start_server(200).await;
    let mut config = short_config(&server);
    // Nothing listens on port 9 of the loopback interface
    config.server_urls = vec!["http://127.0.0.1:9".to_string(), server.uri()];
    config.ping_timeout_ms = 500;

    let orchestrator = TestOrchestrator::from_config(config).unwrap();
    let result = orchestrator.run_test().await.unwrap().into_result().unwrap();

    assert_eq!(result.server, server.uri().trim_end_matches('/'));
}

#[tokio::test]
async fn test_json_output_for_completed_run() {
    let server = start_server(200).await;
    let config = short_config(&server);
    let orchestrator = TestOrchestrator::from_config(config.clone()).unwrap();

    let outcome = orchestrator.run_test().await.unwrap();
    let output = OutputFormatterFactory::from_config(&config, true)
        .format_outcome(&outcome)
        .unwrap();

    let value: serde_json::Value = serde_json::from_str(&output).unwrap();
    assert_eq!(value["status"], "completed");
    assert!(value["download_mbps"].as_f64().unwrap() > 0.0);
    assert!(value["run_id"].is_string());
}
