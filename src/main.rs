use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use log::info;
use std::fs;
use std::path::PathBuf;

mod cli;
mod commands;
mod config;
mod executor;
mod notification;
mod reporter;

use cli::{Cli, Commands};
use config::{Config, LogLevel};

fn setup_logging(log_level: &LogLevel) -> Result<()> {
    // Create log directory
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("stepwatch")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("stepwatch.log");

    // Setup env_logger with file output
    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    // RUST_LOG env var takes precedence, otherwise use config log_level
    let mut builder = env_logger::Builder::new();

    if std::env::var("RUST_LOG").is_ok() {
        builder.parse_default_env();
    } else {
        builder.filter_level(log_level.as_filter());
    }

    builder.target(env_logger::Target::Pipe(target)).init();

    info!("Logging initialized, writing to: {}", log_file.display());
    info!(
        "Log level: {} (from {})",
        log_level.as_filter(),
        if std::env::var("RUST_LOG").is_ok() { "RUST_LOG env" } else { "config" }
    );
    Ok(())
}

fn run(cli: Cli, config: Config) -> Result<()> {
    match cli.command {
        Commands::Run {
            workflows,
            steps,
            inputs,
            sinks,
        } => commands::run::run(workflows, steps, inputs, sinks, &config),
        Commands::Replay { file, sinks } => commands::replay::run(&file, sinks, &config),
        Commands::Check => commands::check::run(&config),
        Commands::Completions { shell } => commands::completions::run(shell),
    }
}

fn try_main(cli: Cli) -> Result<()> {
    // .env values win over the inherited environment
    let dotenv = dotenvy::dotenv_override();

    // Load configuration (before logging, so log messages in Config::load are silent)
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    setup_logging(&config.log_level).context("Failed to setup logging")?;

    match dotenv {
        Ok(path) => info!("Loaded environment from {}", path.display()),
        Err(e) if e.not_found() => info!("No .env file found"),
        Err(e) => log::warn!("Failed to load .env: {}", e),
    }
    info!("Starting stepwatch with config from: {:?}", cli.config);

    run(cli, config)
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = try_main(cli) {
        log::error!("Critical error: {:#}", e);
        eprintln!("{} {:#}", "Critical error:".bold().red(), e);
        std::process::exit(1);
    }
}
