//! CLI integration tests

use std::process::{Command, Output};

fn capctl(args: &[&str], home: &std::path::Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_capctl"))
        .args(args)
        .env("HOME", home)
        .env_remove("CAPCTL_API_URL")
        .output()
        .expect("Failed to execute command")
}

fn run(args: &[&str]) -> Output {
    let home = tempfile::TempDir::new().unwrap();
    capctl(args, home.path())
}

/// Test that the CLI shows help
#[test]
fn test_cli_help() {
    let output = run(&["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI help should succeed");
    assert!(
        stdout.contains("Storage Capacity Insights"),
        "Should show app name"
    );
    for command in ["report", "hierarchy", "tenants", "forecast", "alerts", "dates", "config"] {
        assert!(stdout.contains(command), "Should show {} command", command);
    }
}

/// Test that the CLI shows version
#[test]
fn test_cli_version() {
    let output = run(&["--version"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI version should succeed");
    assert!(stdout.contains("capctl"), "Should show binary name");
}

/// Test report options
#[test]
fn test_report_help() {
    let output = run(&["report", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Report help should succeed");
    assert!(stdout.contains("--date"), "Should show date option");
    assert!(stdout.contains("--tenant"), "Should show tenant option");
}

/// Test hierarchy level option
#[test]
fn test_hierarchy_help() {
    let output = run(&["hierarchy", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Hierarchy help should succeed");
    assert!(stdout.contains("--level"), "Should show level option");
    assert!(stdout.contains("pool"), "Should list pool level");
}

/// Test alerts severity option
#[test]
fn test_alerts_help() {
    let output = run(&["alerts", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Alerts help should succeed");
    assert!(stdout.contains("--severity"), "Should show severity option");
}

/// Test format and api-url options
#[test]
fn test_global_options() {
    let output = run(&["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(stdout.contains("--format"), "Should show format option");
    assert!(stdout.contains("table"), "Should show table format");
    assert!(stdout.contains("json"), "Should show json format");
    assert!(stdout.contains("--api-url"), "Should show api-url option");
    assert!(stdout.contains("CAPCTL_API_URL"), "Should show env var");
}

/// Test invalid command error handling
#[test]
fn test_invalid_command() {
    let output = run(&["invalid-command"]);
    assert!(!output.status.success(), "Invalid command should fail");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("error") || stderr.contains("invalid"),
        "Should show error message"
    );
}

/// Test invalid date error handling
#[test]
fn test_invalid_date() {
    let output = run(&["report", "--date", "30/06/2024"]);
    assert!(!output.status.success(), "Malformed date should fail");
}

/// Test config set and show round trip
#[test]
fn test_config_set_and_show() {
    let home = tempfile::TempDir::new().unwrap();

    let output = capctl(
        &[
            "config",
            "set",
            "--api-url",
            "http://capacity.internal:8080",
            "--default-tenant",
            "Finance",
        ],
        home.path(),
    );
    assert!(output.status.success(), "Config set should succeed");
    assert!(home
        .path()
        .join(".config/capctl/config.json")
        .exists());

    let output = capctl(&["--format", "json", "config", "show"], home.path());
    assert!(output.status.success(), "Config show should succeed");

    let config: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(config["api_url"], "http://capacity.internal:8080");
    assert_eq!(config["default_tenant"], "Finance");
}

/// Test listing dates against a mock server
#[test]
fn test_dates_as_json() {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("GET", "/api/v1/report-dates")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"latest": "2024-06-30", "report_dates": ["2024-06-30", "2024-06-01"]}"#)
        .create();

    let output = run(&["--api-url", &server.url(), "--format", "json", "dates"]);
    mock.assert();

    assert!(output.status.success(), "Dates should succeed");
    let body: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(body["latest"], "2024-06-30");
}

/// Test that a missing report date fails with the server message
#[test]
fn test_missing_report_date() {
    let mut server = mockito::Server::new();
    server
        .mock("GET", "/api/v1/report")
        .match_query(mockito::Matcher::Any)
        .with_status(404)
        .with_header("content-type", "application/json")
        .with_body(r#"{"error": "no capacity snapshot for 2024-05-31"}"#)
        .create();

    let output = run(&["--api-url", &server.url(), "report", "--date", "2024-05-31"]);

    assert!(!output.status.success(), "Missing date should fail");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("no capacity snapshot for 2024-05-31"));
}

/// Test trend range options
#[test]
fn test_trend_help() {
    let output = run(&["trend", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Trend help should succeed");
    assert!(stdout.contains("--from"), "Should show from option");
    assert!(stdout.contains("--to"), "Should show to option");
    assert!(stdout.contains("--tenant"), "Should show tenant option");
}

/// Test trend against a mock server
#[test]
fn test_trend_as_json() {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("GET", "/api/v1/trend")
        .match_query(mockito::Matcher::AllOf(vec![
            mockito::Matcher::UrlEncoded("start_date".into(), "2024-06-01".into()),
            mockito::Matcher::UrlEncoded("tenant".into(), "Finance".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{
                "start_date": "2024-06-01",
                "end_date": null,
                "tenant_filter": "Finance",
                "points": [
                    {"report_date": "2024-06-01", "total_capacity": 1000.0, "used_capacity": 500.0, "available_capacity": 500.0, "utilization_pct": 50.0},
                    {"report_date": "2024-06-30", "total_capacity": 1000.0, "used_capacity": 800.0, "available_capacity": 200.0, "utilization_pct": 80.0}
                ]
            }"#,
        )
        .create();

    let output = run(&[
        "--api-url",
        &server.url(),
        "--format",
        "json",
        "trend",
        "--from",
        "2024-06-01",
        "--tenant",
        "Finance",
    ]);
    mock.assert();

    assert!(output.status.success(), "Trend should succeed");
    let body: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(body["points"].as_array().unwrap().len(), 2);
    assert_eq!(body["points"][1]["utilization_pct"], 80.0);
}
