//! Replay a captured notification transcript
//!
//! Accepts the same JSON lines the workflow engine writes, or bare notification
//! objects, one per line.

use chrono::Local;
use colored::*;
use eyre::{Context, Result};
use std::fs;
use std::path::Path;

use crate::cli::SinkArgs;
use crate::config::{Config, ReportSink};
use crate::executor::ExecutorMessage;
use crate::reporter::{EventReporter, MarkdownFile};

/// Counts of what a transcript contained
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    pub notifications: usize,
    pub results: usize,
    pub errors: usize,
    pub skipped: usize,
}

pub fn run(file: &Path, sink_args: SinkArgs, config: &Config) -> Result<()> {
    let content = fs::read_to_string(file).context(format!("Failed to read transcript {}", file.display()))?;

    let sinks = super::active_sinks(config, &sink_args);
    let log_file = super::log_file(config, &sink_args);
    let markdown = sinks.contains(&ReportSink::Markdown);

    if markdown {
        MarkdownFile::reset(&log_file)?;
    }

    let run_timestamp = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
    println!("{} {}", "Replaying".bold().blue(), file.display());

    let mut reporter = EventReporter::for_sinks(&sinks, &log_file, &run_timestamp);
    let summary = replay(&content, &mut reporter);

    log::info!("Replayed {}: {:?}", file.display(), summary);
    println!();
    println!(
        "{} {} notifications, {} results, {} errors, {} skipped lines",
        "Replayed".green(),
        summary.notifications,
        summary.results,
        summary.errors,
        summary.skipped
    );

    if markdown {
        println!("Check markdown log: {}", log_file.display());
    }

    Ok(())
}

/// Feed every line of a transcript to the reporter
pub fn replay(content: &str, reporter: &mut EventReporter) -> ReplaySummary {
    let mut summary = ReplaySummary::default();

    for (idx, line) in content.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        match ExecutorMessage::parse(trimmed) {
            Ok(ExecutorMessage::Callback {
                notification,
                step_name,
            }) => {
                reporter.report(&notification, step_name.as_deref());
                summary.notifications += 1;
            }
            Ok(ExecutorMessage::Result { value }) => {
                super::print_result(&value);
                summary.results += 1;
            }
            Ok(ExecutorMessage::Error { message }) => {
                println!("{} {}", "Error:".bold().red(), message);
                summary.errors += 1;
            }
            Err(e) => {
                log::warn!("Skipping transcript line {}: {:#}", idx + 1, e);
                println!("{} line {}: {}", "⚠ Skipping".yellow(), idx + 1, e);
                summary.skipped += 1;
            }
        }
    }

    summary
}
