//! End-to-end tests of the `rmq` binary.

use assert_cmd::Command;
use assert_cmd::assert::{Assert, OutputAssertExt};
use predicates::prelude::*;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn rmq(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("rmq").unwrap();
    cmd.arg("--no-color")
        .arg("--config")
        .arg(dir.path().join("rmq.toml"))
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG");
    for key in ["RMQ_HOST", "RMQ_API_PORT", "RMQ_USER", "RMQ_PASSWORD", "RMQ_VHOST"] {
        cmd.env_remove(key);
    }
    cmd
}

async fn server_with(status: u16, api_path: &str, body: serde_json::Value) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(api_path))
        .respond_with(ResponseTemplate::new(status).set_body_json(body))
        .mount(&server)
        .await;
    server
}

async fn run_against(server: &MockServer, dir: &TempDir, args: &[&str]) -> Assert {
    let mut cmd = rmq(dir);
    cmd.arg("--host")
        .arg(server.address().ip().to_string())
        .arg("--api-port")
        .arg(server.address().port().to_string())
        .args(args);
    let output = tokio::task::spawn_blocking(move || cmd.output().unwrap())
        .await
        .unwrap();
    output.assert()
}

// ============================================================================
// Config
// ============================================================================

#[test]
fn test_config_round_trip() {
    let dir = TempDir::new().unwrap();

    rmq(&dir).args(["config", "create"]).assert().success();
    rmq(&dir)
        .args(["config", "set", "host", "rabbit.internal"])
        .assert()
        .success();

    rmq(&dir)
        .args(["config", "show", "--file-only"])
        .assert()
        .success()
        .stdout(predicate::str::contains("host : rabbit.internal"));

    rmq(&dir)
        .args(["--host", "flag-host", "config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("host         : flag-host"));
}

#[test]
fn test_environment_layer() {
    let dir = TempDir::new().unwrap();
    rmq(&dir)
        .env("RMQ_VHOST", "orders")
        .args(["config", "show", "--env-only"])
        .assert()
        .success()
        .stdout(predicate::str::contains("vhost : orders"));
}

#[test]
fn test_config_commands_repair_invalid_file() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("rmq.toml");
    std::fs::write(&file, "api-port = \"not-a-port\"\nhost = \"rabbit\"\n").unwrap();

    rmq(&dir)
        .args(["list", "nodes"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("not a port number"));

    rmq(&dir)
        .args(["config", "unset", "api-port"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Ignoring invalid setting"));

    let content = std::fs::read_to_string(&file).unwrap();
    assert!(!content.contains("api-port"));
    assert!(content.contains("rabbit"));

    rmq(&dir)
        .args(["config", "show", "--file-only"])
        .assert()
        .success()
        .stdout(predicate::str::contains("host : rabbit"));
}

#[test]
fn test_usage_errors() {
    let dir = TempDir::new().unwrap();
    rmq(&dir)
        .args(["check", "certificate-expiration"])
        .assert()
        .failure();
    rmq(&dir)
        .args(["config", "set", "api-port", "lots"])
        .assert()
        .code(1)
        .stderr(predicate::str::starts_with("ERROR: "));
}

// ============================================================================
// API calls
// ============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn test_list_prints_json() {
    let server = server_with(200, "/api/queues/%2F", json!([{"name": "orders"}])).await;
    let dir = TempDir::new().unwrap();

    run_against(&server, &dir, &["--pretty-print", "list", "vhost-queues"])
        .await
        .success()
        .stdout("[\n  {\n    \"name\": \"orders\"\n  }\n]\n");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_error_status_exits_non_zero() {
    let server = server_with(
        404,
        "/api/vhosts/missing",
        json!({"error": "Object Not Found"}),
    )
    .await;
    let dir = TempDir::new().unwrap();

    run_against(&server, &dir, &["get", "vhosts/missing"])
        .await
        .code(1)
        .stdout(predicate::str::contains("Object Not Found"))
        .stderr(predicate::str::contains(
            "ERROR: request failed: 404 Not Found ( url: http://",
        ));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_generate_prints_digraph() {
    let server = server_with(
        200,
        "/api/definitions/%2F",
        json!({
            "rabbit_version": "3.12.0",
            "queues": [{"name": "orders"}],
            "exchanges": [{"name": "events", "type": "fanout"}],
            "bindings": [{"source": "events", "destination": "orders", "destination_type": "queue"}]
        }),
    )
    .await;
    let dir = TempDir::new().unwrap();

    run_against(&server, &dir, &["generate"])
        .await
        .success()
        .stdout(predicate::str::starts_with("// RabbitMQ version: 3.12.0\n"))
        .stdout(predicate::str::contains("E001->Q001 [ color=blue ];"));
}
