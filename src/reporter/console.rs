//! Console rendering of notifications
//!
//! Colors carry severity: yellow for retries, blue for inputs, red for failures,
//! green for outputs.

use colored::*;
use std::io::{self, Write};

use crate::notification::{Notification, NotificationKind};

/// How a notification shows up on the console
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleBlock {
    Retry { previous_error: String },
    Input { message: String },
    StepFailed { message: String, details: Option<String> },
    Success { message: String, output: Option<String> },
    /// Known or unknown kind with nothing to show
    Silent,
}

impl ConsoleBlock {
    /// Classify a notification. Order matters: the retry check runs before the
    /// plain input check.
    pub fn classify(notification: &Notification) -> Self {
        let detail = || notification.code.as_ref().map(|c| c.display_content());

        if notification.is_retry() {
            return Self::Retry {
                previous_error: notification.previous_error().to_string(),
            };
        }

        match &notification.kind {
            NotificationKind::Input => Self::Input {
                message: notification.message.clone(),
            },
            NotificationKind::Step if notification.is_step_failure() => Self::StepFailed {
                message: notification.message.clone(),
                details: detail(),
            },
            NotificationKind::Output => Self::Success {
                message: notification.message.clone(),
                output: detail(),
            },
            NotificationKind::Step | NotificationKind::Other(_) => Self::Silent,
        }
    }

    /// Lines to print, including the leading blank line that separates blocks
    pub fn lines(&self) -> Vec<String> {
        match self {
            Self::Retry { previous_error } => vec![
                String::new(),
                "===== RETRY ATTEMPT =====".yellow().to_string(),
                format!("{} {}", "Previous error:".yellow(), previous_error),
            ],
            Self::Input { message } => vec![String::new(), format!("{} {}", "Input:".blue(), message)],
            Self::StepFailed { message, details } => {
                let mut lines = vec![String::new(), format!("{} {}", "Step Failed:".red(), message)];
                if let Some(details) = details {
                    lines.push(format!("{} {}", "Error details:".red(), details));
                }
                lines
            }
            Self::Success { message, output } => {
                let mut lines = vec![String::new(), format!("{} {}", "Success:".green(), message)];
                if let Some(output) = output {
                    lines.push(format!("{} {}", "Output:".green(), output));
                }
                lines
            }
            Self::Silent => Vec::new(),
        }
    }
}

/// Writes rendered blocks to a terminal (or any writer)
pub struct ConsoleSink {
    out: Box<dyn Write>,
}

impl ConsoleSink {
    pub fn new(out: Box<dyn Write>) -> Self {
        Self { out }
    }

    pub fn stdout() -> Self {
        Self::new(Box::new(io::stdout()))
    }

    pub fn write(&mut self, notification: &Notification) -> io::Result<()> {
        for line in ConsoleBlock::classify(notification).lines() {
            writeln!(self.out, "{}", line)?;
        }
        self.out.flush()
    }
}
