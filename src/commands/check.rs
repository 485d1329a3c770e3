//! Diagnose run prerequisites

use colored::*;
use eyre::{Result, bail};

use crate::config::{Config, Credentials, REQUIRED_ENV, ReportSink};

pub fn run(config: &Config) -> Result<()> {
    println!("{}", "stepwatch check".bold());
    println!("{}", "═".repeat(50));
    println!();

    // Required environment
    let missing = Credentials::missing(|name| std::env::var(name).ok());
    for name in REQUIRED_ENV {
        if missing.contains(&name) {
            println!("{} {} missing", "✗".red(), name);
        } else {
            println!("{} {} set", "✓".green(), name);
        }
    }
    println!();

    // Executor
    match which::which(&config.executor.command) {
        Ok(path) => println!("{} Executor: {}", "✓".green(), path.display()),
        Err(_) => println!(
            "{} Executor '{}' not found on PATH",
            "⚠".yellow(),
            config.executor.command
        ),
    }

    // Markdown log
    if config.sinks.contains(&ReportSink::Markdown) {
        println!(
            "{} Markdown log: {}",
            "✓".green(),
            Config::expand_path(&config.log_file).display()
        );
    } else {
        println!("{} Markdown log disabled", "⚠".yellow());
    }
    println!();

    // Workflows
    if config.workflows.is_empty() {
        println!("{} No workflows configured", "⚠".yellow());
    }
    for workflow in &config.workflows {
        let steps_file = Config::expand_path(&workflow.steps_file);
        if steps_file.exists() {
            println!("{} {} ({})", "✓".green(), workflow.name.cyan(), steps_file.display());
        } else {
            println!(
                "{} {} steps file missing: {}",
                "⚠".yellow(),
                workflow.name.cyan(),
                steps_file.display()
            );
        }
    }
    println!();

    if !missing.is_empty() {
        bail!("Missing required environment variables: {}", missing.join(", "));
    }

    println!("{}", "All required settings present".green());
    Ok(())
}
