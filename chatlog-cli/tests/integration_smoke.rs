//! Smoke tests to verify command wiring

use assert_cmd::assert::OutputAssertExt;
use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// A `chatlog` invocation isolated from the developer's credentials and config.
fn chatlog(home: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("chatlog").unwrap();
    cmd.current_dir(home)
        .env("HOME", home)
        .env("CHATLOG_QUIET", "1")
        .env_remove("CHATLOG_APIKEY")
        .env_remove("CHATLOG_USERPASS")
        .env_remove("CHATLOG_URL")
        .env_remove("RUST_LOG");
    cmd
}

// === Help Tests ===

#[test]
fn test_export_help() {
    let dir = tempfile::tempdir().unwrap();
    chatlog(dir.path())
        .arg("export")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--logtype"))
        .stdout(predicate::str::contains("--filetype"))
        .stdout(predicate::str::contains("Remove line breaks from assistant output"));
}

#[test]
fn test_replay_help() {
    let dir = tempfile::tempdir().unwrap();
    chatlog(dir.path())
        .arg("replay")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--customer-id"))
        .stdout(predicate::str::contains("question"));
}

// === Configuration Errors ===

#[test]
fn test_export_requires_credentials() {
    let dir = tempfile::tempdir().unwrap();
    chatlog(dir.path())
        .args(["export", "ws-1", "out.csv", "--filetype", "CSV"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--userpass or --apikey"));

    assert!(!dir.path().join("out.csv").exists());
}

#[test]
fn test_export_rejects_both_credentials() {
    let dir = tempfile::tempdir().unwrap();
    chatlog(dir.path())
        .args(["export", "ws-1", "out.csv", "--apikey", "k", "--userpass", "u:p"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be used together"));
}

#[test]
fn test_export_rejects_unknown_logtype() {
    let dir = tempfile::tempdir().unwrap();
    chatlog(dir.path())
        .args(["export", "ws-1", "out.csv", "--apikey", "k", "--logtype", "TEAM"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown log type"));
}

#[test]
fn test_explicit_config_must_exist() {
    let dir = tempfile::tempdir().unwrap();
    chatlog(dir.path())
        .args(["--config", "missing.toml", "export", "ws-1", "out.csv", "--apikey", "k"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Config not found"));
}

// === End To End ===

#[tokio::test]
async fn test_export_csv_against_mock_service() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/logs"))
        .and(query_param("filter", "language::en,workspace_id::ws-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "logs": [{
                "request_timestamp": "2020-04-01T10:00:00.000Z",
                "response_timestamp": "2020-04-01T10:00:01.000Z",
                "response": {
                    "input": {"text": "hello"},
                    "output": {"text": ["Hi", "there"]},
                    "intents": [{"intent": "greet", "confidence": 0.9}],
                    "context": {"conversation_id": "c1"}
                }
            }],
            "pagination": {}
        })))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let home = dir.path().to_path_buf();
    let url = server.uri();

    let output = tokio::task::spawn_blocking(move || {
        chatlog(&home)
            .args(["export", "ws-1", "out.csv", "--apikey", "secret", "--filetype", "CSV"])
            .args(["--url", &url])
            .output()
            .unwrap()
    })
    .await
    .unwrap();

    output
        .assert()
        .success()
        .stdout(predicate::str::contains("Writing 1 records to: out.csv as file type: CSV"));

    let csv = std::fs::read_to_string(dir.path().join("out.csv")).unwrap();
    assert!(csv.starts_with("conversation_id,request_timestamp,response_timestamp,User Input"));
    assert!(csv.contains("c1,2020-04-01T10:00:00.000Z"));
    assert!(csv.contains("hello,Hi there,greet,0.9"));
}

#[tokio::test]
async fn test_export_reports_empty_result() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/logs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"logs": []})))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let home = dir.path().to_path_buf();
    let url = server.uri();

    let output = tokio::task::spawn_blocking(move || {
        chatlog(&home)
            .args(["export", "ws-1", "out.tsv", "--apikey", "secret", "--filetype", "TSV"])
            .args(["--url", &url])
            .output()
            .unwrap()
    })
    .await
    .unwrap();

    output
        .assert()
        .success()
        .stdout(predicate::str::contains("No logs found."));
    assert!(!dir.path().join("out.tsv").exists());
}
