//! Markdown run transcript
//!
//! One record per notification, appended in arrival order. Nothing here ever
//! truncates the log; the runner resets it before a run.

use chrono::Local;
use eyre::{Context, Result};
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::notification::Notification;

/// Somewhere markdown records can be appended to
pub trait LogTarget {
    fn append(&mut self, record: &str) -> io::Result<()>;
}

/// Append-only markdown file
pub struct MarkdownFile {
    path: PathBuf,
}

impl MarkdownFile {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Remove the log left over from a previous run
    pub fn reset(path: &Path) -> Result<()> {
        if path.exists() {
            fs::remove_file(path).context(format!("Failed to remove {}", path.display()))?;
            log::debug!("Removed previous markdown log: {}", path.display());
        }
        Ok(())
    }
}

impl LogTarget for MarkdownFile {
    fn append(&mut self, record: &str) -> io::Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        file.write_all(record.as_bytes())
    }
}

/// Render one notification as a markdown record
pub fn to_markdown(notification: &Notification, run_timestamp: &str) -> String {
    let mut md = String::new();
    let step_name = notification.step_name.as_deref().filter(|s| !s.is_empty());

    md.push_str(&format!(
        "## {} · {}\n\n",
        notification.kind,
        step_name.map(|s| format!("`{}`", s)).unwrap_or_else(|| "-".to_string())
    ));
    md.push_str(&format!("- **Time:** {}\n", Local::now().format("%H:%M:%S")));
    md.push_str(&format!("- **Run:** {}\n\n", run_timestamp));
    md.push_str(&notification.message);
    md.push_str("\n\n");

    if let Some(ref code) = notification.code {
        let (lang, body) = match &code.content {
            serde_json::Value::String(s) => ("text", s.clone()),
            other => (
                "json",
                serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
            ),
        };
        let fence = code_fence(&body);
        md.push_str(&format!("{}{}\n{}\n{}\n\n", fence, lang, body.trim_end(), fence));
    }

    md
}

/// Backtick fence longer than any backtick run inside `body`
fn code_fence(body: &str) -> String {
    let longest = body
        .split(|c| c != '`')
        .map(str::len)
        .max()
        .unwrap_or(0);
    "`".repeat(longest.max(2) + 1)
}

/// The markdown half of the reporter
pub struct MarkdownSink {
    target: Box<dyn LogTarget>,
    run_timestamp: String,
}

impl MarkdownSink {
    pub fn new(target: Box<dyn LogTarget>, run_timestamp: &str) -> Self {
        Self {
            target,
            run_timestamp: run_timestamp.to_string(),
        }
    }

    pub fn write(&mut self, notification: &Notification) -> io::Result<()> {
        let record = to_markdown(notification, &self.run_timestamp);
        self.target.append(&record)
    }
}
