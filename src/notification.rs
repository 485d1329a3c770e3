//! Workflow progress notifications
//!
//! A notification is emitted by the workflow executor whenever a step starts,
//! retries, fails or completes. It is consumed once by the reporter and dropped.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Marker the executor puts in input messages when it re-prompts after a validation failure
pub const RETRY_MARKER: &str = "Retrying";

/// Marker the executor puts in step messages when a step did not succeed
pub const FAILURE_MARKER: &str = "failed";

/// What part of the workflow lifecycle a notification describes
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NotificationKind {
    Input,
    Step,
    Output,
    /// Anything the executor sends that we don't know how to format
    Other(String),
}

impl NotificationKind {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Input => "input",
            Self::Step => "step",
            Self::Output => "output",
            Self::Other(kind) => kind,
        }
    }
}

impl From<&str> for NotificationKind {
    fn from(s: &str) -> Self {
        match s {
            "input" => Self::Input,
            "step" => Self::Step,
            "output" => Self::Output,
            _ => Self::Other(s.to_string()),
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for NotificationKind {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for NotificationKind {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Self::from(s.as_str()))
    }
}

/// Payload attached to some notifications (failed steps, step outputs)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Code {
    pub content: serde_json::Value,
}

impl Code {
    #[cfg(test)]
    pub fn new(content: impl Into<serde_json::Value>) -> Self {
        Self {
            content: content.into(),
        }
    }

    /// Content as a single display string; strings are shown verbatim
    pub fn display_content(&self) -> String {
        match &self.content {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

/// A single progress event from the workflow executor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    #[serde(alias = "object")]
    pub kind: NotificationKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<Code>,
}

impl Notification {
    #[cfg(test)]
    pub fn new(kind: impl Into<NotificationKind>, message: &str) -> Self {
        Self {
            kind: kind.into(),
            message: message.to_string(),
            step_name: None,
            code: None,
        }
    }

    #[cfg(test)]
    pub fn with_step_name(mut self, step_name: &str) -> Self {
        self.step_name = Some(step_name.to_string());
        self
    }

    #[cfg(test)]
    pub fn with_code(mut self, content: impl Into<serde_json::Value>) -> Self {
        self.code = Some(Code::new(content));
        self
    }

    /// The notification's own step name, or the hint when it has none.
    pub fn resolved_step_name<'a>(&'a self, hint: Option<&'a str>) -> Option<&'a str> {
        match self.step_name.as_deref() {
            Some(name) if !name.is_empty() => Some(name),
            _ => hint.filter(|h| !h.is_empty()),
        }
    }

    /// Fill the step name from `hint` unless one is already set.
    ///
    /// Applying this repeatedly keeps the first non-empty name.
    pub fn labeled(mut self, hint: Option<&str>) -> Self {
        let name = self.resolved_step_name(hint).map(str::to_string);
        if name.is_some() {
            self.step_name = name;
        }
        self
    }

    pub fn is_retry(&self) -> bool {
        self.kind == NotificationKind::Input && self.message.contains(RETRY_MARKER)
    }

    pub fn is_step_failure(&self) -> bool {
        self.kind == NotificationKind::Step && self.message.contains(FAILURE_MARKER)
    }

    /// Text of the error that caused a retry
    pub fn previous_error(&self) -> &str {
        let Some(idx) = self.message.find(RETRY_MARKER) else {
            return &self.message;
        };
        let rest = &self.message[idx + RETRY_MARKER.len()..];
        match rest.split_once(':') {
            Some((_, tail)) if !tail.trim().is_empty() => tail.trim(),
            _ => &self.message,
        }
    }
}
