use eyre::{Context, Result, bail};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variables the workflow engine needs, in reporting order
pub const REQUIRED_ENV: [&str; 3] = ["OPENAI_API_BASE", "OPENAI_API_KEY", "OPENAI_MODEL_NAME"];

/// Main stepwatch configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub log_level: LogLevel,
    /// Markdown transcript written during `run`
    pub log_file: PathBuf,
    pub sinks: Vec<ReportSink>,
    pub executor: ExecutorConfig,
    pub workflows: Vec<WorkflowConfig>,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
    Off,
}

impl LogLevel {
    pub fn as_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Trace => log::LevelFilter::Trace,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Off => log::LevelFilter::Off,
        }
    }
}

/// Where notifications are reported
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReportSink {
    /// Colored progress blocks on stdout
    Console,
    /// Append-only markdown transcript
    Markdown,
}

/// External workflow engine invocation
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ExecutorConfig {
    pub command: String,
    pub args: Vec<String>,
}

/// A named workflow and its initial inputs
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct WorkflowConfig {
    pub name: String,
    pub steps_file: PathBuf,
    #[serde(default)]
    pub inputs: IndexMap<String, serde_json::Value>,
}

impl WorkflowConfig {
    pub fn new(name: &str, steps_file: impl Into<PathBuf>) -> Self {
        Self {
            name: name.to_string(),
            steps_file: steps_file.into(),
            inputs: IndexMap::new(),
        }
    }

    pub fn with_input(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.inputs.insert(key.to_string(), value.into());
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: LogLevel::default(),
            log_file: PathBuf::from("log.md"),
            sinks: vec![ReportSink::Console, ReportSink::Markdown],
            executor: ExecutorConfig::default(),
            workflows: default_workflows(),
        }
    }
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            command: "ai-stepper".to_string(),
            args: Vec::new(),
        }
    }
}

fn default_workflows() -> Vec<WorkflowConfig> {
    vec![
        WorkflowConfig::new("chain of thoughts", "yaml/chain_of_thoughts.yaml").with_input(
            "query",
            "I need to plan a trip from Boston to Rockport. The train ticket costs $50, and a bus ticket \
             costs $30 but takes 2 hours longer. If your budget is $100 and you need to arrive as soon as \
             possible, what option should I choose? How much money would I have left?",
        ),
        WorkflowConfig::new("complex schema retry", "yaml/complex_schema_retry.yaml").with_input(
            "metrics",
            serde_json::json!({
                "revenue": 1500000,
                "users": 50000,
                "churn_rate": 0.15
            })
            .to_string(),
        ),
    ]
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Check STEPWATCH_CONFIG env var
        if let Ok(env_path) = std::env::var("STEPWATCH_CONFIG") {
            let path = PathBuf::from(env_path);
            if path.exists() {
                match Self::load_from_file(&path) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        log::warn!("Failed to load config from STEPWATCH_CONFIG: {}", e);
                    }
                }
            }
        }

        // Try STEPWATCH_DIR/stepwatch.yaml
        if let Ok(dir) = std::env::var("STEPWATCH_DIR") {
            let path = PathBuf::from(dir).join("stepwatch.yaml");
            if path.exists() {
                match Self::load_from_file(&path) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        log::warn!("Failed to load config from STEPWATCH_DIR: {}", e);
                    }
                }
            }
        }

        // Try ~/.config/stepwatch/stepwatch.yaml
        if let Some(config_dir) = dirs::config_dir() {
            let path = config_dir.join("stepwatch").join("stepwatch.yaml");
            if path.exists() {
                match Self::load_from_file(&path) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        log::warn!("Failed to load config from {}: {}", path.display(), e);
                    }
                }
            }
        }

        // Try ./stepwatch.yaml (next to the workflow yaml files)
        let local_config = PathBuf::from("stepwatch.yaml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    log::warn!("Failed to load local config: {}", e);
                }
            }
        }

        log::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        log::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    /// Expand a path that may contain ~ or env vars
    pub fn expand_path(path: &Path) -> PathBuf {
        let path_str = path.to_string_lossy();
        let expanded = shellexpand::full(&path_str).unwrap_or_else(|_| path_str.clone());
        PathBuf::from(expanded.as_ref())
    }

    /// Workflows selected by name, in the order given; all of them when `names` is empty
    pub fn select_workflows(&self, names: &[String]) -> Result<Vec<WorkflowConfig>> {
        if names.is_empty() {
            return Ok(self.workflows.clone());
        }

        let mut selected = Vec::new();
        for name in names {
            match self.workflows.iter().find(|w| w.name == *name) {
                Some(workflow) => selected.push(workflow.clone()),
                None => {
                    let known: Vec<&str> = self.workflows.iter().map(|w| w.name.as_str()).collect();
                    bail!("Unknown workflow '{}' (configured: {})", name, known.join(", "));
                }
            }
        }
        Ok(selected)
    }
}

/// Credentials handed to the workflow engine
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub api_base: String,
    pub api_key: String,
    pub model_name: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_base", &self.api_base)
            .field("api_key", &"***")
            .field("model_name", &self.model_name)
            .finish()
    }
}

impl Credentials {
    /// Names of required variables that `lookup` reports unset or empty
    pub fn missing<F>(lookup: F) -> Vec<&'static str>
    where
        F: Fn(&str) -> Option<String>,
    {
        REQUIRED_ENV
            .iter()
            .copied()
            .filter(|name| lookup(name).is_none_or(|v| v.is_empty()))
            .collect()
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let missing = Self::missing(&lookup);
        if !missing.is_empty() {
            bail!("Missing required environment variables: {}", missing.join(", "));
        }

        let get = |name: &str| lookup(name).unwrap_or_default();
        Ok(Self {
            api_base: get(REQUIRED_ENV[0]),
            api_key: get(REQUIRED_ENV[1]),
            model_name: get(REQUIRED_ENV[2]),
        })
    }

    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Pairs to export to the executor process
    pub fn env_pairs(&self) -> [(&'static str, &str); 3] {
        [
            (REQUIRED_ENV[0], self.api_base.as_str()),
            (REQUIRED_ENV[1], self.api_key.as_str()),
            (REQUIRED_ENV[2], self.model_name.as_str()),
        ]
    }
}
