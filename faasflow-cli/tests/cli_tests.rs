//! End-to-end tests of the faasflow binary

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::process::Output;
use tempfile::TempDir;
use tokio::process::Command;
use warp::http::StatusCode;
use warp::Filter;

/// Mock gateway: `/function/<name>` answers `<name>:<body>;`, or 500 for
/// names starting with `fail`
fn spawn_gateway() -> SocketAddr {
    let route = warp::path!("function" / String)
        .and(warp::body::bytes())
        .map(|name: String, body: bytes::Bytes| {
            if name.starts_with("fail") {
                warp::reply::with_status("down".to_string(), StatusCode::INTERNAL_SERVER_ERROR)
            } else {
                let reply = format!("{}:{};", name, String::from_utf8_lossy(&body));
                warp::reply::with_status(reply, StatusCode::OK)
            }
        });

    let (addr, server) = warp::serve(route).bind_ephemeral(([127, 0, 0, 1], 0));
    tokio::spawn(server);
    addr
}

fn demo(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("demos")
        .join(name)
}

fn write_definition(dir: &TempDir, json: &str) -> PathBuf {
    let path = dir.path().join("flow.json");
    std::fs::write(&path, json).unwrap();
    path
}

async fn faasflow(args: &[&str], config_dir: &Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_faasflow"))
        .args(args)
        .env_remove("RUST_LOG")
        .env("XDG_CONFIG_HOME", config_dir)
        .env("HOME", config_dir)
        .output()
        .await
        .expect("failed to run faasflow")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

#[tokio::test]
async fn test_help_lists_commands() {
    let temp_dir = TempDir::new().unwrap();
    let output = faasflow(&["--help"], temp_dir.path()).await;

    assert!(output.status.success());
    let help = stdout(&output);
    assert!(help.contains("run"));
    assert!(help.contains("validate"));
    assert!(help.contains("config"));
}

#[tokio::test]
async fn test_validate_demo_definitions() {
    let temp_dir = TempDir::new().unwrap();
    for name in ["trip-saga.json", "approval.yaml"] {
        let path = demo(name);
        let output = faasflow(&["validate", path.to_str().unwrap()], temp_dir.path()).await;
        assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
        assert!(stdout(&output).contains("Definition is valid"));
    }
}

#[tokio::test]
async fn test_validate_json_reports_errors() {
    let temp_dir = TempDir::new().unwrap();
    let path = write_definition(
        &temp_dir,
        r#"{"StartFunction": "a", "States": {"a": {"Type": "Task", "Next": "ghost"}}}"#,
    );

    let output = faasflow(
        &["validate", path.to_str().unwrap(), "--json"],
        temp_dir.path(),
    )
    .await;

    assert!(!output.status.success());
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["valid"], false);
    assert_eq!(report["errors"][0]["field"], "States.a.Next");
}

#[tokio::test]
async fn test_run_streams_responses_to_stdout() {
    let addr = spawn_gateway();
    let temp_dir = TempDir::new().unwrap();
    let path = write_definition(
        &temp_dir,
        r#"{"StartFunction": "A", "States": {
            "A": {"Type": "Task", "Next": "B"},
            "B": {"Type": "Task", "End": true, "ResultPath": "$"}
        }}"#,
    );
    let gateway = format!("http://{}", addr);

    let output = faasflow(
        &["run", path.to_str().unwrap(), "--data", "x", "--gateway", &gateway],
        temp_dir.path(),
    )
    .await;

    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(stdout(&output), "A:x;B:A:x;;");
}

#[tokio::test]
async fn test_run_json_report_for_saga_rollback() {
    let addr = spawn_gateway();
    let temp_dir = TempDir::new().unwrap();
    let path = write_definition(
        &temp_dir,
        r#"{"StartFunction": "book-hotel", "States": {
            "book-hotel": {"Type": "Task", "Next": "fail-flight"},
            "fail-flight": {"Type": "Task", "End": true, "Catch": [{"Next": "cancel-hotel"}]},
            "cancel-hotel": {"Type": "Task", "Next": "aborted"},
            "aborted": {"Type": "Fail", "Error": "TripBookingFailed"}
        }}"#,
    );
    let gateway = format!("http://{}", addr);

    let output = faasflow(
        &[
            "run",
            path.to_str().unwrap(),
            "--data",
            "trip",
            "--gateway",
            &gateway,
            "--json",
        ],
        temp_dir.path(),
    )
    .await;

    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let result: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(result["report"]["termination"]["kind"], "fail");
    assert_eq!(result["report"]["termination"]["state"], "aborted");
    assert_eq!(result["report"]["termination"]["error"], "TripBookingFailed");
    assert_eq!(result["outputs"][0]["data"], "book-hotel:trip;");
    assert_eq!(result["outputs"][1]["state_name"], "cancel-hotel");
}

#[tokio::test]
async fn test_run_fails_without_catch() {
    let addr = spawn_gateway();
    let temp_dir = TempDir::new().unwrap();
    let path = write_definition(
        &temp_dir,
        r#"{"StartFunction": "fail-now", "States": {"fail-now": {"Type": "Task", "End": true}}}"#,
    );
    let gateway = format!("http://{}", addr);

    let output = faasflow(
        &["run", path.to_str().unwrap(), "--data", "x", "--gateway", &gateway],
        temp_dir.path(),
    )
    .await;

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("invocation of 'fail-now' failed"), "{}", stderr);
    assert!(output.stdout.is_empty());
}

#[tokio::test]
async fn test_run_json_keeps_outputs_of_aborted_run() {
    let addr = spawn_gateway();
    let temp_dir = TempDir::new().unwrap();
    let path = write_definition(
        &temp_dir,
        r#"{"StartFunction": "A", "States": {
            "A": {"Type": "Task", "Next": "fail-b"},
            "fail-b": {"Type": "Task", "End": true}
        }}"#,
    );
    let gateway = format!("http://{}", addr);

    let output = faasflow(
        &[
            "run",
            path.to_str().unwrap(),
            "--data",
            "x",
            "--gateway",
            &gateway,
            "--json",
        ],
        temp_dir.path(),
    )
    .await;

    assert!(!output.status.success());
    let result: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(result["outputs"][0]["state_name"], "A");
    assert_eq!(result["outputs"][0]["data"], "A:x;");
    assert_eq!(result["state"], "fail-b");
    assert!(result["error"]
        .as_str()
        .unwrap()
        .contains("invocation of 'fail-b' failed"));
}

#[tokio::test]
async fn test_run_rejects_invalid_config_file() {
    let temp_dir = TempDir::new().unwrap();
    let config = temp_dir.path().join("config.toml");
    std::fs::write(&config, "http_method = \"FETCH\"\n").unwrap();
    let path = write_definition(
        &temp_dir,
        r#"{"StartFunction": "A", "States": {"A": {"Type": "Task", "End": true}}}"#,
    );

    let output = faasflow(
        &[
            "run",
            path.to_str().unwrap(),
            "--data",
            "x",
            "--config",
            config.to_str().unwrap(),
        ],
        temp_dir.path(),
    )
    .await;

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Invalid configuration"));
}

#[tokio::test]
async fn test_config_init_writes_file() {
    let temp_dir = TempDir::new().unwrap();
    let config = temp_dir.path().join("faasflow.toml");

    let output = faasflow(
        &["config", "--init", "--config-file", config.to_str().unwrap()],
        temp_dir.path(),
    )
    .await;

    assert!(output.status.success());
    let content = std::fs::read_to_string(&config).unwrap();
    assert!(content.contains("http://127.0.0.1:8080"));
}
