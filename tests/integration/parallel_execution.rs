//! Integration tests for parallel pair execution
//!
//! These tests run the crossrunner binary against definitions whose clients
//! and servers are small `sh` scripts, so real processes are spawned for
//! every pair.

#![cfg(unix)]

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

/// Prefix of the first line of every failure record.
const RECORD_MARKER: &str = "######## ";

/// Build a definitions file with one `sh` server and one client per entry.
fn definitions(clients: &[(&str, &str)]) -> String {
    let mut languages = vec![serde_json::json!({
        "name": "srv",
        "protocols": ["binary"],
        "transports": ["http"],
        "server": {"command": ["sh", "-c", "sleep 5"]}
    })];
    for (name, script) in clients {
        languages.push(serde_json::json!({
            "name": name,
            "protocols": ["binary"],
            "transports": ["http"],
            "client": {"command": ["sh", "-c", script]}
        }));
    }
    serde_json::Value::Array(languages).to_string()
}

struct Workspace {
    temp_dir: TempDir,
}

impl Workspace {
    fn new(definitions: &str) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        fs::write(temp_dir.path().join("tests.json"), definitions)
            .expect("Failed to write test definitions");
        Self { temp_dir }
    }

    fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    fn failure_log(&self) -> PathBuf {
        self.path().join("log/unexpected_failures.log")
    }

    fn artifact(&self) -> PathBuf {
        self.path().join("artifacts/unexpected_failures.log")
    }

    fn command(&self) -> Command {
        self.command_with_workers(2)
    }

    fn command_with_workers(&self, workers: usize) -> Command {
        fs::create_dir_all(self.path().join("artifacts")).expect("artifact dir");
        let mut cmd = Command::cargo_bin("crossrunner").expect("Failed to find crossrunner binary");
        cmd.current_dir(self.path())
            .arg("tests.json")
            .arg("--work-dir")
            .arg(self.path())
            .arg("--artifact-path")
            .arg(self.artifact())
            .arg("--workers")
            .arg(workers.to_string())
            .arg("--no-color")
            .timeout(Duration::from_secs(30));
        cmd
    }
}

fn record_count(path: &Path) -> usize {
    fs::read_to_string(path)
        .expect("Failed to read failure log")
        .lines()
        .filter(|line| line.starts_with(RECORD_MARKER))
        .count()
}

/// Three clean pairs: exit 0, no failure log left anywhere.
#[test]
fn test_all_pairs_pass() {
    let ws = Workspace::new(&definitions(&[
        ("a", "exit 0"),
        ("b", "exit 0"),
        ("c", "exit 0"),
    ]));

    ws.command()
        .assert()
        .success()
        .stdout(predicate::str::contains("a-srv"))
        .stdout(predicate::str::contains("b-srv"))
        .stdout(predicate::str::contains("c-srv"))
        .stdout(predicate::str::contains("0 failed / 3 total"));

    assert!(!ws.failure_log().exists());
    assert!(!ws.artifact().exists());
    assert!(ws.path().join("log/a-srv_binary_http_client.log").exists());
}

/// One client exits nonzero: exit 1, log relocated with exactly one record.
#[test]
fn test_one_failing_pair() {
    let ws = Workspace::new(&definitions(&[
        ("a", "exit 0"),
        ("b", "echo boom >&2; exit 4"),
        ("c", "exit 0"),
    ]));

    ws.command()
        .assert()
        .code(1)
        .stdout(predicate::str::contains("FAILURE"))
        .stdout(predicate::str::contains("1 failed / 3 total"));

    assert!(!ws.failure_log().exists());
    assert_eq!(record_count(&ws.artifact()), 1);
    let record = fs::read_to_string(ws.artifact()).expect("artifact");
    assert!(record.contains("b-srv (binary, http)"));
    assert!(record.contains("exit code 4"));
    assert!(record.contains("boom"));
}

/// A client that cannot be spawned is a harness failure with explanatory text.
#[test]
fn test_unspawnable_client_is_harness_failure() {
    let mut languages: serde_json::Value =
        serde_json::from_str(&definitions(&[("a", "exit 0"), ("b", "exit 0")])).expect("json");
    languages[2]["client"]["command"] = serde_json::json!(["/nonexistent/crossrunner-client"]);
    let ws = Workspace::new(&languages.to_string());

    ws.command()
        .assert()
        .code(1)
        .stdout(predicate::str::contains("HARNESS FAILURE"))
        .stdout(predicate::str::contains("1 failed / 2 total"));

    let record = fs::read_to_string(ws.artifact()).expect("artifact");
    assert_eq!(record_count(&ws.artifact()), 1);
    assert!(record.contains("Unable to start client '/nonexistent/crossrunner-client'"));
}

/// Two clean runs in a row leave no residual failure log.
#[test]
fn test_repeated_clean_runs() {
    let ws = Workspace::new(&definitions(&[("a", "exit 0")]));

    for _ in 0..2 {
        ws.command().assert().success();
        assert!(!ws.failure_log().exists());
    }
}

/// Failures land in the log regardless of how many workers run them.
#[test]
fn test_many_pairs_with_one_worker() {
    let clients: Vec<(String, String)> = (0..12)
        .map(|i| {
            let script = if i % 4 == 0 { "exit 1" } else { "exit 0" };
            (format!("lang{}", i), script.to_string())
        })
        .collect();
    let refs: Vec<(&str, &str)> = clients
        .iter()
        .map(|(name, script)| (name.as_str(), script.as_str()))
        .collect();
    let ws = Workspace::new(&definitions(&refs));

    ws.command_with_workers(1)
        .assert()
        .code(1)
        .stdout(predicate::str::contains("3 failed / 12 total"));

    assert_eq!(record_count(&ws.artifact()), 3);
}

/// Malformed definitions abort before anything runs.
#[test]
fn test_bad_definitions_are_fatal() {
    let ws = Workspace::new("[{\"name\": ");

    ws.command()
        .assert()
        .code(2)
        .stdout(predicate::str::contains("total").not())
        .stderr(predicate::str::contains("Failed to load test definitions"));

    assert!(!ws.failure_log().exists());
}

/// The definitions path is required.
#[test]
fn test_missing_definitions_argument() {
    Command::cargo_bin("crossrunner")
        .expect("Failed to find crossrunner binary")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("<DEFINITIONS>"));
}

/// Help lists the run options.
#[test]
fn test_help_shows_options() {
    Command::cargo_bin("crossrunner")
        .expect("Failed to find crossrunner binary")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--workers"))
        .stdout(predicate::str::contains("--base-port"))
        .stdout(predicate::str::contains("--artifact-path"));
}
