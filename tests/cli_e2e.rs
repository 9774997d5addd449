//! End-to-end CLI tests for the fetcher binary.

use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;
use url::Url;

fn fetcher() -> Command {
    let mut cmd = Command::cargo_bin("fetcher").unwrap();
    // Keep the user's settings file out of the tests
    cmd.env("XDG_CONFIG_HOME", std::env::temp_dir().join("fetcher-e2e-no-config"));
    cmd.env_remove("RUST_LOG");
    cmd
}

/// Test that --help displays usage information and exits with code 0.
#[test]
fn test_binary_help_displays_usage() {
    fetcher()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Fetch URLs"));
}

/// Test that --version displays version and exits with code 0.
#[test]
fn test_binary_version_displays_version() {
    fetcher()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("fetcher"));
}

/// Test that a URL is required.
#[test]
fn test_binary_without_url_fails() {
    fetcher()
        .assert()
        .failure()
        .stderr(predicate::str::contains("URL"));
}

#[test]
fn test_binary_fetches_local_file_and_prints_summary() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("sample.txt");
    fs::write(&path, "hello").unwrap();
    let url = Url::from_file_path(&path).unwrap();

    fetcher()
        .args(["-q", url.as_str()])
        .assert()
        .success()
        .stdout(predicate::str::contains("200 text 5 bytes"));
}

#[test]
fn test_binary_json_output_reports_kind() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("data.json");
    fs::write(&path, r#"{"a":1}"#).unwrap();
    let url = Url::from_file_path(&path).unwrap();

    fetcher()
        .args(["-q", "--json", url.as_str()])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""kind":"json""#))
        .stdout(predicate::str::contains(r#""ok":true"#));
}

#[test]
fn test_binary_output_writes_body_to_file() {
    let dir = TempDir::new().unwrap();
    let source = dir.path().join("page.html");
    fs::write(&source, "<html></html>").unwrap();
    let target = dir.path().join("copy.html");
    let url = Url::from_file_path(&source).unwrap();

    fetcher()
        .args(["-q", "-o", target.to_str().unwrap(), url.as_str()])
        .assert()
        .success();

    assert_eq!(fs::read_to_string(&target).unwrap(), "<html></html>");
}

#[test]
fn test_binary_unsupported_scheme_exits_non_zero() {
    fetcher()
        .args(["-q", "ftp://example.com/file.txt"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("error[unsupported_scheme]"));
}

#[test]
fn test_binary_no_tls_rejects_https() {
    fetcher()
        .args(["-q", "--no-tls", "--json", "https://example.com/"])
        .assert()
        .failure()
        .stdout(predicate::str::contains(r#""error":"unsupported_transport""#));
}

#[test]
fn test_binary_partial_failure_reports_each_url() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("ok.txt");
    fs::write(&path, "fine").unwrap();
    let good = Url::from_file_path(&path).unwrap();
    let missing = Url::from_file_path(dir.path().join("missing.txt")).unwrap();

    fetcher()
        .args(["-q", good.as_str(), missing.as_str()])
        .assert()
        .failure()
        .stdout(predicate::str::contains("200 text 4 bytes"))
        .stdout(predicate::str::contains("error[file_access_failed]"));
}

#[test]
fn test_binary_invalid_config_fails() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("config.toml");
    fs::write(&config, "download_timeout_secs = 0\n").unwrap();

    fetcher()
        .args(["--config", config.to_str().unwrap(), "file:///dev/null"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("download_timeout_secs"));
}

#[test]
fn test_binary_output_with_multiple_urls_fails() {
    fetcher()
        .args(["-o", "out.bin", "file:///a", "file:///b"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("single URL"));
}
