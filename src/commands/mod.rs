pub mod check;
pub mod completions;
pub mod replay;
pub mod run;

use colored::*;
use std::path::PathBuf;

use crate::cli::SinkArgs;
use crate::config::{Config, ReportSink};

/// Configured sinks minus the ones switched off on the command line
pub fn active_sinks(config: &Config, args: &SinkArgs) -> Vec<ReportSink> {
    config
        .sinks
        .iter()
        .copied()
        .filter(|sink| match sink {
            ReportSink::Console => !args.no_console,
            ReportSink::Markdown => !args.no_markdown,
        })
        .collect()
}

/// Markdown log path, command line first
pub fn log_file(config: &Config, args: &SinkArgs) -> PathBuf {
    let path = args.log_file.as_ref().unwrap_or(&config.log_file);
    Config::expand_path(path)
}

/// Final workflow value for display; strings are shown as-is
pub fn format_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
    }
}

pub fn print_result(value: &serde_json::Value) {
    println!("{} {}", "Result:".green(), format_value(value));
}

pub fn print_workflow_error(name: &str, error: &str) {
    println!("{} {}", format!("Error in '{}' workflow:", name).bold().red(), error);
}
