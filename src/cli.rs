use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "stepwatch",
    about = "Run AI Stepper workflows and watch their progress",
    version = env!("GIT_DESCRIBE"),
    after_help = "Logs are written to: ~/.local/share/stepwatch/logs/stepwatch.log\n\n\
                  Required environment (or .env): OPENAI_API_BASE, OPENAI_API_KEY, OPENAI_MODEL_NAME"
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to stepwatch.yaml config file")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Sink switches shared by commands that report notifications
#[derive(Args, Debug, Clone, Default)]
pub struct SinkArgs {
    /// Markdown log path (overrides config)
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Don't print notifications to the console
    #[arg(long)]
    pub no_console: bool,

    /// Don't write the markdown log
    #[arg(long)]
    pub no_markdown: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run configured workflows (or an ad-hoc steps file)
    Run {
        /// Only run the named workflow(s)
        #[arg(short, long = "workflow", conflicts_with = "steps")]
        workflows: Vec<String>,

        /// Run this steps file instead of the configured workflows
        #[arg(long)]
        steps: Option<PathBuf>,

        /// Initial input for --steps, as key=value (value may be JSON)
        #[arg(short, long = "input", requires = "steps")]
        inputs: Vec<String>,

        #[command(flatten)]
        sinks: SinkArgs,
    },

    /// Re-render a captured JSON-lines notification transcript
    Replay {
        /// Transcript file
        file: PathBuf,

        #[command(flatten)]
        sinks: SinkArgs,
    },

    /// Check environment, executor and workflow files
    Check,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
}
