//! Workflow executor boundary
//!
//! The workflow engine runs as an external process. It receives one JSON
//! request on stdin and streams JSON lines back on stdout:
//! - `{"type": "callback", "notification": {...}, "step_name": "..."}`
//! - `{"type": "result", "value": ...}`
//! - `{"type": "error", "message": "..."}`

use eyre::{Context, Result, bail, eyre};
use serde::{Deserialize, Serialize};
use std::io::{BufRead, BufReader, Read, Write};
use std::process::{Command, Stdio};
use std::thread;

use crate::config::{Config, Credentials, ExecutorConfig, WorkflowConfig};
use crate::notification::Notification;

/// A line emitted by the workflow engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExecutorMessage {
    Callback {
        notification: Notification,
        /// Step the engine was running when it raised the callback
        #[serde(default, skip_serializing_if = "Option::is_none")]
        step_name: Option<String>,
    },
    Result {
        #[serde(default)]
        value: serde_json::Value,
    },
    Error {
        message: String,
    },
}

impl ExecutorMessage {
    /// Parse one line; a bare notification object counts as a callback without a hint
    pub fn parse(line: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(line).context("Invalid JSON")?;
        if value.get("type").is_some() {
            return serde_json::from_value(value).context("Invalid executor message");
        }
        let notification: Notification = serde_json::from_value(value).context("Invalid notification")?;
        Ok(Self::Callback {
            notification,
            step_name: None,
        })
    }
}

/// Request written to the engine's stdin
#[derive(Debug, Serialize)]
struct RunRequest<'a> {
    steps_file: &'a std::path::Path,
    initial_inputs: &'a indexmap::IndexMap<String, serde_json::Value>,
}

/// Something that can run a workflow and call back with progress notifications
pub trait WorkflowExecutor {
    fn run(
        &self,
        workflow: &WorkflowConfig,
        credentials: &Credentials,
        on_event: &mut dyn FnMut(&Notification, Option<&str>),
    ) -> Result<serde_json::Value>;
}

/// Runs the workflow engine as a child process
pub struct ProcessExecutor {
    config: ExecutorConfig,
}

impl ProcessExecutor {
    pub fn new(config: ExecutorConfig) -> Self {
        Self { config }
    }
}

impl WorkflowExecutor for ProcessExecutor {
    fn run(
        &self,
        workflow: &WorkflowConfig,
        credentials: &Credentials,
        on_event: &mut dyn FnMut(&Notification, Option<&str>),
    ) -> Result<serde_json::Value> {
        let steps_file = Config::expand_path(&workflow.steps_file);
        let request = serde_json::to_string(&RunRequest {
            steps_file: &steps_file,
            initial_inputs: &workflow.inputs,
        })
        .context("Failed to serialize run request")?;

        log::info!(
            "Spawning executor '{}' for workflow '{}' ({})",
            self.config.command,
            workflow.name,
            steps_file.display()
        );

        let mut child = Command::new(&self.config.command)
            .args(&self.config.args)
            .envs(credentials.env_pairs())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("Failed to spawn executor: {}", self.config.command))?;

        // Write request to stdin, then close it so the engine sees EOF.
        // An engine that exits without reading is judged by its output, not by the broken pipe.
        if let Some(mut stdin) = child.stdin.take()
            && let Err(e) = stdin.write_all(format!("{}\n", request).as_bytes())
        {
            log::warn!("Failed to write request to executor stdin: {}", e);
        }

        // Drain stderr on the side so a chatty engine can't block on a full pipe
        let stderr_reader = child.stderr.take().map(|mut stderr| {
            thread::spawn(move || {
                let mut buf = Vec::new();
                if let Err(e) = stderr.read_to_end(&mut buf) {
                    log::warn!("Failed to read executor stderr: {}", e);
                }
                String::from_utf8_lossy(&buf).to_string()
            })
        });

        let stdout = child.stdout.take().ok_or_else(|| eyre!("Executor stdout not captured"))?;
        let mut outcome: Option<Result<serde_json::Value>> = None;

        // Lines are decoded lossily so stray bytes from the engine only cost that one line
        let mut reader = BufReader::new(stdout);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf) {
                Ok(0) => break,
                Ok(_) => {}
                Err(e) => {
                    log::warn!("Failed to read executor output: {}", e);
                    break;
                }
            }
            let line = String::from_utf8_lossy(&buf);
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match ExecutorMessage::parse(trimmed) {
                Ok(ExecutorMessage::Callback {
                    notification,
                    step_name,
                }) => on_event(&notification, step_name.as_deref()),
                Ok(ExecutorMessage::Result { value }) => outcome = Some(Ok(value)),
                Ok(ExecutorMessage::Error { message }) => outcome = Some(Err(eyre!(message))),
                Err(e) => log::debug!("Ignoring executor output line ({}): {}", e, trimmed),
            }
        }

        let status = child.wait().context("Failed to wait for executor")?;
        let stderr = stderr_reader
            .and_then(|handle| handle.join().ok())
            .unwrap_or_default();

        log::info!("Executor for '{}' exited with {}", workflow.name, status);

        match outcome {
            Some(result) => result,
            None if !status.success() => {
                let stderr = stderr.trim();
                if stderr.is_empty() {
                    bail!("Executor exited with {}", status)
                } else {
                    bail!("{}", stderr)
                }
            }
            None => bail!("Executor finished without a result"),
        }
    }
}
