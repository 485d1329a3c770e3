//! Integration tests for the stepwatch binary
//!
//! These tests drive the built binary end to end:
//! - Credential validation before any workflow runs
//! - Running workflows through a scripted engine
//! - Replaying a captured transcript into the markdown log
//! - The check command

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::TempDir;

const ALL_ENV: [(&str, &str); 3] = [
    ("OPENAI_API_BASE", "http://localhost:8080/v1"),
    ("OPENAI_API_KEY", "sk-test"),
    ("OPENAI_MODEL_NAME", "test-model"),
];

/// Helper to get the stepwatch binary path
fn stepwatch_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_stepwatch"))
}

/// Helper to run stepwatch isolated in `dir` with only the given variables set
fn run_stepwatch(dir: &Path, env: &[(&str, &str)], args: &[&str]) -> Output {
    let mut cmd = Command::new(stepwatch_binary());
    cmd.env_clear()
        .current_dir(dir)
        .env("HOME", dir)
        .env("XDG_CONFIG_HOME", dir.join("config"))
        .env("XDG_DATA_HOME", dir.join("data"))
        .env("NO_COLOR", "1")
        .env("PATH", std::env::var("PATH").unwrap_or_default());
    for (key, value) in env {
        cmd.env(key, value);
    }
    cmd.args(args).output().expect("Failed to execute stepwatch")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

/// Helper to write a config whose engine is a shell script
fn write_config(dir: &Path, engine_script: &str) -> PathBuf {
    let engine = dir.join("engine.sh");
    fs::write(&engine, engine_script).unwrap();

    let config = format!(
        r#"log_file: log.md
executor:
  command: sh
  args: ["{engine}"]
workflows:
  - name: broken
    steps_file: yaml/broken.yaml
  - name: complex schema retry
    steps_file: yaml/complex_schema_retry.yaml
    inputs:
      metrics: '{{"revenue": 1500000}}'
"#,
        engine = engine.display()
    );
    let path = dir.join("stepwatch.yaml");
    fs::write(&path, config).unwrap();
    path
}

const ENGINE: &str = r#"read request
case "$request" in
  *broken*)
    echo "broken.yaml: no such file" >&2
    exit 1
    ;;
esac
echo '{"type":"callback","notification":{"object":"input","message":"Analyze the metrics"},"step_name":"extract_metrics"}'
echo '{"type":"callback","notification":{"object":"input","message":"Retrying: schema mismatch","step_name":""},"step_name":"extract_metrics"}'
echo '{"type":"callback","notification":{"object":"step","message":"Step failed: validation error","step_name":"extract_metrics","code":{"content":"field '"'"'revenue'"'"' missing"}}}'
echo '{"type":"callback","notification":{"object":"output","message":"Success"},"step_name":"summarize"}'
echo '{"type":"result","value":"churn is high"}'
"#;

#[test]
fn test_missing_one_credential_is_fatal() {
    let temp = TempDir::new().unwrap();
    let config = write_config(temp.path(), ENGINE);

    let output = run_stepwatch(
        temp.path(),
        &ALL_ENV[..2],
        &["--config", config.to_str().unwrap(), "run"],
    );

    assert!(!output.status.success());
    assert_eq!(output.status.code(), Some(1));

    let err = stderr(&output);
    assert!(err.contains("Critical error:"));
    assert!(err.contains("Missing required environment variables: OPENAI_MODEL_NAME"));
    assert!(!err.contains("OPENAI_API_KEY"));
    assert!(!stdout(&output).contains("Running '"));
    assert!(!temp.path().join("log.md").exists());
}

#[test]
fn test_empty_credential_counts_as_missing() {
    let temp = TempDir::new().unwrap();
    let config = write_config(temp.path(), ENGINE);

    let env = [ALL_ENV[0], ("OPENAI_API_KEY", ""), ALL_ENV[2]];
    let output = run_stepwatch(temp.path(), &env, &["--config", config.to_str().unwrap(), "run"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("Missing required environment variables: OPENAI_API_KEY"));
}

#[test]
fn test_credentials_from_dotenv() {
    let temp = TempDir::new().unwrap();
    let config = write_config(temp.path(), ENGINE);
    fs::write(temp.path().join(".env"), "OPENAI_MODEL_NAME=from-dotenv\n").unwrap();

    let output = run_stepwatch(
        temp.path(),
        &ALL_ENV[..2],
        &["--config", config.to_str().unwrap(), "run", "-w", "complex schema retry"],
    );

    assert!(output.status.success(), "stderr: {}", stderr(&output));
}

#[test]
fn test_run_reports_progress_and_isolates_failures() {
    let temp = TempDir::new().unwrap();
    let config = write_config(temp.path(), ENGINE);
    fs::write(temp.path().join("log.md"), "stale content from an old run\n").unwrap();

    let output = run_stepwatch(temp.path(), &ALL_ENV, &["--config", config.to_str().unwrap(), "run"]);

    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let out = stdout(&output);
    assert!(out.contains("Starting new run at"));
    assert!(out.contains("Running 'broken' workflow..."));
    assert!(out.contains("Error in 'broken' workflow:"));
    assert!(out.contains("broken.yaml: no such file"));
    assert!(out.contains("Running 'complex schema retry' workflow..."));
    assert!(out.contains("Input: Analyze the metrics"));
    assert!(out.contains("===== RETRY ATTEMPT ====="));
    assert!(out.contains("Previous error: schema mismatch"));
    assert!(out.contains("Step Failed: Step failed: validation error"));
    assert!(out.contains("Error details: field 'revenue' missing"));
    assert!(out.contains("Success: Success"));
    assert!(!out.contains("Output:"));
    assert!(out.contains("Result: churn is high"));
    assert!(out.contains("Check markdown log:"));

    // Failure is reported before the next workflow starts
    let error_at = out.find("Error in 'broken'").unwrap();
    let next_at = out.find("Running 'complex schema retry'").unwrap();
    assert!(error_at < next_at);

    let log = fs::read_to_string(temp.path().join("log.md")).unwrap();
    assert!(!log.contains("stale content"));
    assert_eq!(log.matches("\n## ").count() + usize::from(log.starts_with("## ")), 4);
    assert!(log.contains("## input · `extract_metrics`"));
    assert!(log.contains("## output · `summarize`"));
    assert!(log.contains("```text\nfield 'revenue' missing\n```"));

    let retry_at = log.find("Retrying: schema mismatch").unwrap();
    let success_at = log.find("## output").unwrap();
    assert!(retry_at < success_at);
}

#[test]
fn test_run_without_markdown() {
    let temp = TempDir::new().unwrap();
    let config = write_config(temp.path(), ENGINE);

    let output = run_stepwatch(
        temp.path(),
        &ALL_ENV,
        &[
            "--config",
            config.to_str().unwrap(),
            "run",
            "-w",
            "complex schema retry",
            "--no-markdown",
        ],
    );

    assert!(output.status.success());
    assert!(stdout(&output).contains("RETRY ATTEMPT"));
    assert!(!stdout(&output).contains("Check markdown log"));
    assert!(!temp.path().join("log.md").exists());
}

#[test]
fn test_unknown_workflow_is_fatal() {
    let temp = TempDir::new().unwrap();
    let config = write_config(temp.path(), ENGINE);

    let output = run_stepwatch(
        temp.path(),
        &ALL_ENV,
        &["--config", config.to_str().unwrap(), "run", "-w", "nope"],
    );

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("Unknown workflow 'nope'"));
}

#[test]
fn test_missing_executor_is_not_fatal() {
    let temp = TempDir::new().unwrap();
    let config = temp.path().join("stepwatch.yaml");
    fs::write(
        &config,
        r#"executor:
  command: stepwatch-missing-engine
workflows:
  - name: first
    steps_file: a.yaml
  - name: second
    steps_file: b.yaml
"#,
    )
    .unwrap();

    let output = run_stepwatch(temp.path(), &ALL_ENV, &["--config", config.to_str().unwrap(), "run"]);

    assert!(output.status.success());
    let out = stdout(&output);
    assert!(out.contains("Error in 'first' workflow:"));
    assert!(out.contains("Error in 'second' workflow:"));
    assert!(out.contains("os error"));
}

#[test]
fn test_replay_transcript() {
    let temp = TempDir::new().unwrap();
    let transcript = temp.path().join("transcript.jsonl");
    fs::write(
        &transcript,
        r#"{"type":"callback","notification":{"kind":"input","message":"Retrying: schema mismatch","step_name":""},"step_name":"extract_metrics"}
{"kind":"output","message":"Success"}
garbage
"#,
    )
    .unwrap();

    let output = run_stepwatch(
        temp.path(),
        &[],
        &["replay", transcript.to_str().unwrap(), "--log-file", "replay.md"],
    );

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let out = stdout(&output);
    assert!(out.contains("RETRY ATTEMPT"));
    assert!(out.contains("schema mismatch"));
    assert!(out.contains("line 3"));

    let log = fs::read_to_string(temp.path().join("replay.md")).unwrap();
    assert!(log.starts_with("## input · `extract_metrics`"));
    assert!(log.contains("## output · -"));
}

#[test]
fn test_check_reports_missing_variable() {
    let temp = TempDir::new().unwrap();

    let output = run_stepwatch(temp.path(), &ALL_ENV[1..], &["check"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(stdout(&output).contains("OPENAI_API_BASE missing"));
    assert!(stdout(&output).contains("OPENAI_API_KEY set"));
    assert!(!stdout(&output).contains("sk-test"));
}

#[test]
fn test_check_all_set() {
    let temp = TempDir::new().unwrap();

    let output = run_stepwatch(temp.path(), &ALL_ENV, &["check"]);

    assert!(output.status.success());
    assert!(stdout(&output).contains("All required settings present"));
}
