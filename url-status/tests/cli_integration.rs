// url-status/tests/cli_integration.rs

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::{NamedTempFile, TempDir};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Helper to create a test URL list
fn create_test_urls_file(urls: &[String]) -> NamedTempFile {
    let file = NamedTempFile::new().expect("Failed to create temp file");
    fs::write(file.path(), urls.join("\n")).expect("Failed to write to temp file");
    file
}

/// A command isolated from the user's config files and environment.
fn url_status(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("url-status").unwrap();
    cmd.current_dir(home.path())
        .env("HOME", home.path())
        .env("XDG_CONFIG_HOME", home.path().join(".config"))
        .env_remove("RUST_LOG");
    for var in [
        "URL_STATUS_CONCURRENCY",
        "URL_STATUS_TIMEOUT",
        "URL_STATUS_IGNORE_SSL_ERRORS",
        "URL_STATUS_RATE",
        "URL_STATUS_FORMAT",
        "URL_STATUS_CSV_HEADERS",
        "URL_STATUS_CONFIG",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

async fn mock_site() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/ok"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("HEAD"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(410))
        .mount(&server)
        .await;
    server
}

#[test]
fn test_help_lists_flags() {
    let home = TempDir::new().unwrap();
    url_status(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--concurrency"))
        .stdout(predicate::str::contains("--rate"))
        .stdout(predicate::str::contains("--ignore-ssl-errors"))
        .stdout(predicate::str::contains("--timeout"))
        .stdout(predicate::str::contains("--json"));
}

#[test]
fn test_missing_path_is_usage_error() {
    let home = TempDir::new().unwrap();
    url_status(&home).assert().failure();
}

#[test]
fn test_invalid_rate_fails_without_output() {
    let home = TempDir::new().unwrap();
    let file = create_test_urls_file(&["http://127.0.0.1:9/".to_string()]);

    url_status(&home)
        .arg(file.path())
        .args(["--rate", "example.com:often"])
        .assert()
        .failure()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains(
            "Invalid rate format: \"example.com:often\"",
        ));
}

#[test]
fn test_invalid_rate_in_config_file_leaves_no_output_file() {
    let home = TempDir::new().unwrap();
    let file = create_test_urls_file(&["http://127.0.0.1:9/".to_string()]);
    let config = home.path().join("custom.toml");
    fs::write(&config, "[defaults]\nrate = [\"example.com:-1\"]\n").unwrap();
    let output = home.path().join("out.csv");

    url_status(&home)
        .arg(file.path())
        .arg("--config")
        .arg(&config)
        .arg("--output")
        .arg(&output)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid rate format"));

    assert!(!output.exists());
}

#[test]
fn test_missing_input_file_fails() {
    let home = TempDir::new().unwrap();
    url_status(&home)
        .arg(home.path().join("no-such-list.txt"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("no-such-list.txt"));
}

#[test]
fn test_conflicting_formats_rejected() {
    let home = TempDir::new().unwrap();
    url_status(&home)
        .args(["urls.txt", "--json", "--csv"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("multiple output formats"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_csv_run_against_mock_server() {
    let server = mock_site().await;
    let home = TempDir::new().unwrap();
    let file = create_test_urls_file(&[
        format!("{}/ok", server.uri()),
        String::new(),
        format!("{}/gone", server.uri()),
        "malformed::url".to_string(),
    ]);

    let assert = url_status(&home)
        .arg(file.path())
        .args(["-c", "4", "--timeout", "5s", "--headers"])
        .assert()
        .success();

    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    let lines: Vec<&str> = stdout.lines().collect();

    assert_eq!(lines.len(), 4, "{}", stdout);
    assert_eq!(lines[0], "url,status");
    assert!(lines.contains(&format!("{}/ok,200", server.uri()).as_str()));
    assert!(lines.contains(&format!("{}/gone,410", server.uri()).as_str()));
    assert!(lines
        .iter()
        .any(|l| l.starts_with("malformed::url,ERROR: ")));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_json_run_writes_output_file() {
    let server = mock_site().await;
    let home = TempDir::new().unwrap();
    let file = create_test_urls_file(&[
        format!("{}/ok", server.uri()),
        format!("{}/gone", server.uri()),
    ]);
    let output = home.path().join("results.jsonl");

    url_status(&home)
        .arg(file.path())
        .arg("--json")
        .arg("--output")
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    let written = fs::read_to_string(&output).unwrap();
    let mut statuses: Vec<u64> = written
        .lines()
        .map(|line| {
            let value: serde_json::Value = serde_json::from_str(line).unwrap();
            value["status"].as_u64().unwrap()
        })
        .collect();
    statuses.sort_unstable();

    assert_eq!(statuses, vec![200, 410]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_stdin_input_and_env_format() {
    let server = mock_site().await;
    let home = TempDir::new().unwrap();

    url_status(&home)
        .arg("-")
        .env("URL_STATUS_FORMAT", "json")
        .write_stdin(format!("{}/ok\n", server.uri()))
        .assert()
        .success()
        .stdout(predicate::str::contains("\"status\":200"));
}
