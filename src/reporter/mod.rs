//! Event reporter for workflow notifications
//!
//! Renders each notification to the configured sinks:
//! - Console - colored progress blocks for retries, inputs, failures and outputs
//! - Markdown - an append-only transcript of every notification

pub mod console;
pub mod markdown;

use std::path::Path;

pub use console::ConsoleSink;
pub use markdown::{LogTarget, MarkdownFile, MarkdownSink};

use crate::config::ReportSink;
use crate::notification::Notification;

/// Reporter that fans a notification out to console and markdown sinks
#[derive(Default)]
pub struct EventReporter {
    console: Option<ConsoleSink>,
    markdown: Option<MarkdownSink>,
}

impl EventReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_console(mut self, console: ConsoleSink) -> Self {
        self.console = Some(console);
        self
    }

    pub fn with_markdown(mut self, markdown: MarkdownSink) -> Self {
        self.markdown = Some(markdown);
        self
    }

    /// Build a reporter writing to stdout and/or the markdown file at `log_file`
    pub fn for_sinks(sinks: &[ReportSink], log_file: &Path, run_timestamp: &str) -> Self {
        let mut reporter = Self::new();
        for sink in sinks {
            match sink {
                ReportSink::Console => {
                    reporter = reporter.with_console(ConsoleSink::stdout());
                }
                ReportSink::Markdown => {
                    let file = MarkdownFile::new(log_file.to_path_buf());
                    reporter = reporter.with_markdown(MarkdownSink::new(Box::new(file), run_timestamp));
                }
            }
        }
        reporter
    }

    /// Report one notification.
    ///
    /// `step_name_hint` labels the markdown record when the notification carries
    /// no step name of its own. Sink failures are logged and never abort the run.
    pub fn report(&mut self, notification: &Notification, step_name_hint: Option<&str>) {
        let labeled = notification.clone().labeled(step_name_hint);
        log::debug!(
            "Notification kind={} step={} message={:?}",
            labeled.kind,
            labeled.step_name.as_deref().unwrap_or("-"),
            labeled.message
        );

        if let Some(ref mut console) = self.console
            && let Err(e) = console.write(notification)
        {
            log::warn!("Failed to write to console: {}", e);
        }

        if let Some(ref mut markdown) = self.markdown
            && let Err(e) = markdown.write(&labeled)
        {
            log::warn!("Failed to append to markdown log: {}", e);
        }
    }
}
