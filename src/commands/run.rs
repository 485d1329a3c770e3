//! Run workflows through the external engine
//!
//! Credentials are checked before anything else; a workflow that fails is
//! reported and the next one still runs.

use chrono::Local;
use colored::*;
use eyre::{Result, eyre};
use std::path::PathBuf;

use crate::cli::SinkArgs;
use crate::config::{Config, Credentials, ReportSink, WorkflowConfig};
use crate::executor::{ProcessExecutor, WorkflowExecutor};
use crate::reporter::{EventReporter, MarkdownFile};

pub fn run(
    workflows: Vec<String>,
    steps: Option<PathBuf>,
    inputs: Vec<String>,
    sink_args: SinkArgs,
    config: &Config,
) -> Result<()> {
    let credentials = Credentials::from_env()?;

    let selected = match steps {
        Some(steps_file) => vec![adhoc_workflow(steps_file, &inputs)?],
        None => config.select_workflows(&workflows)?,
    };

    let sinks = super::active_sinks(config, &sink_args);
    let log_file = super::log_file(config, &sink_args);
    let markdown = sinks.contains(&ReportSink::Markdown);

    if markdown {
        MarkdownFile::reset(&log_file)?;
    }

    let run_timestamp = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
    println!();
    println!("{}", format!("Starting new run at {}", run_timestamp).bold().green());
    println!();

    let mut reporter = EventReporter::for_sinks(&sinks, &log_file, &run_timestamp);
    let executor = ProcessExecutor::new(config.executor.clone());

    let failed = run_workflows(&executor, &mut reporter, &selected, &credentials);
    log::info!("Run finished: {} of {} workflows failed", failed, selected.len());

    if markdown {
        println!("Check markdown log: {}", log_file.display());
    }

    Ok(())
}

/// Run each workflow in turn; returns how many failed
pub fn run_workflows(
    executor: &dyn WorkflowExecutor,
    reporter: &mut EventReporter,
    workflows: &[WorkflowConfig],
    credentials: &Credentials,
) -> usize {
    let mut failed = 0;

    for workflow in workflows {
        println!();
        println!("{}", format!("Running '{}' workflow...", workflow.name).bold().blue());

        let result = executor.run(workflow, credentials, &mut |notification, hint| {
            reporter.report(notification, hint)
        });

        match result {
            Ok(value) => super::print_result(&value),
            Err(e) => {
                log::error!("Workflow '{}' failed: {:#}", workflow.name, e);
                super::print_workflow_error(&workflow.name, &error_text(&e));
                failed += 1;
            }
        }
    }

    failed
}

/// The whole error chain on one line, so an OS cause isn't hidden behind its context
fn error_text(e: &eyre::Report) -> String {
    format!("{:#}", e)
}

/// A one-off workflow named after its steps file
fn adhoc_workflow(steps_file: PathBuf, inputs: &[String]) -> Result<WorkflowConfig> {
    let name = steps_file
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "workflow".to_string());

    let mut workflow = WorkflowConfig::new(&name, steps_file);
    for input in inputs {
        let (key, value) = parse_input(input)?;
        workflow.inputs.insert(key, value);
    }
    Ok(workflow)
}

/// Parse `key=value`; the value is JSON when it parses as JSON, otherwise a string
fn parse_input(input: &str) -> Result<(String, serde_json::Value)> {
    let (key, raw) = input
        .split_once('=')
        .ok_or_else(|| eyre!("Invalid input '{}', expected key=value", input))?;

    let key = key.trim();
    if key.is_empty() {
        return Err(eyre!("Invalid input '{}', key is empty", input));
    }

    let value = serde_json::from_str(raw).unwrap_or_else(|_| serde_json::Value::String(raw.to_string()));
    Ok((key.to_string(), value))
}
