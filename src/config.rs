//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.auditq.toml` files.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Name of the configuration file looked up in the working directory.
pub const CONFIG_FILE: &str = ".auditq.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Job queue settings.
    #[serde(default)]
    pub queue: QueueConfig,

    /// Analysis engine settings.
    #[serde(default)]
    pub engine: EngineConfig,

    /// Scanner settings.
    #[serde(default)]
    pub scanner: ScannerConfig,

    /// Scope (module) layout.
    #[serde(default)]
    pub scopes: ScopesConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Default output file path.
    #[serde(default = "default_output")]
    pub output: String,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output: default_output(),
            verbose: false,
        }
    }
}

fn default_output() -> String {
    "auditq_report.md".to_string()
}

/// Job queue settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Maximum number of pending jobs.
    #[serde(default = "default_capacity")]
    pub capacity: usize,

    /// Merge new jobs into queued jobs for the same scope.
    #[serde(default = "default_true")]
    pub coalesce: bool,

    /// Also merge jobs from explicit user actions.
    #[serde(default = "default_true")]
    pub coalesce_manual: bool,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            coalesce: true,
            coalesce_manual: true,
        }
    }
}

fn default_capacity() -> usize {
    crate::queue::JobQueue::CAPACITY
}

fn default_true() -> bool {
    true
}

/// External analysis engine settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Executable invoked once per job.
    #[serde(default = "default_engine_command")]
    pub command: String,

    /// Arguments placed before the target files.
    #[serde(default)]
    pub args: Vec<String>,

    /// Per-job timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            command: default_engine_command(),
            args: Vec::new(),
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_engine_command() -> String {
    "auditq-engine".to_string()
}

fn default_timeout() -> u64 {
    300
}

/// File scanner settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerConfig {
    /// Maximum files collected by a full scan.
    #[serde(default = "default_max_files")]
    pub max_files: usize,

    /// File extensions to include.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Directory or file names to exclude.
    #[serde(default = "default_excludes")]
    pub excludes: Vec<String>,

    /// Maximum file size in bytes.
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            max_files: default_max_files(),
            extensions: default_extensions(),
            excludes: default_excludes(),
            max_file_size: default_max_file_size(),
        }
    }
}

fn default_max_files() -> usize {
    1000
}

fn default_extensions() -> Vec<String> {
    vec![
        "rs", "py", "js", "ts", "jsx", "tsx", "go", "java", "kt", "c", "cpp", "h", "hpp", "cs",
        "rb", "php", "swift", "scala",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_excludes() -> Vec<String> {
    vec![
        ".git",
        "target",
        "node_modules",
        "vendor",
        "dist",
        "build",
        "__pycache__",
        ".venv",
        "venv",
        ".idea",
        ".vscode",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_max_file_size() -> u64 {
    1024 * 1024 // 1MB
}

/// Scope (module) layout of the project.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScopesConfig {
    /// Module roots relative to the project root, e.g. `["crates/core", "app"]`.
    /// When empty, each top-level directory is its own scope.
    #[serde(default)]
    pub roots: Vec<String>,
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        Self::load_from_dir(Path::new("."))
    }

    /// Try to load configuration from a project directory.
    pub fn load_from_dir(dir: &Path) -> Result<Option<Self>> {
        let config_path = dir.join(CONFIG_FILE);

        if config_path.exists() {
            Ok(Some(Self::load(&config_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// Only explicitly provided CLI values override the file.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(capacity) = args.capacity {
            self.queue.capacity = capacity;
        }
        if args.no_coalesce {
            self.queue.coalesce = false;
        }

        if let Some(ref command) = args.engine {
            self.engine.command = command.clone();
        }
        if !args.engine_arg.is_empty() {
            self.engine.args = args.engine_arg.clone();
        }
        if let Some(timeout) = args.timeout {
            self.engine.timeout_seconds = timeout;
        }

        if let Some(max_files) = args.max_files {
            self.scanner.max_files = max_files;
        }
        if let Some(ref extensions) = args.extensions {
            self.scanner.extensions = extensions.clone();
        }
        if let Some(ref excludes) = args.exclude {
            self.scanner.excludes = excludes.clone();
        }

        if let Some(ref output) = args.output {
            self.general.output = output.display().to_string();
        }
        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Reject settings that would make every job fail or be dropped.
    pub fn validate(&self) -> Result<()> {
        if self.queue.capacity == 0 {
            bail!("queue.capacity must be at least 1");
        }
        if self.engine.timeout_seconds == 0 {
            bail!("engine.timeout_seconds must be at least 1");
        }
        if self.engine.command.trim().is_empty() {
            bail!("engine.command must not be empty");
        }
        if self.scanner.max_files == 0 {
            bail!("scanner.max_files must be at least 1");
        }
        if self.scanner.extensions.is_empty() {
            bail!("scanner.extensions must list at least one extension");
        }
        Ok(())
    }

    /// Log level from `general.verbose`; `quiet` wins.
    pub fn log_level(&self, quiet: bool) -> tracing::Level {
        if quiet {
            tracing::Level::ERROR
        } else if self.general.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> Result<String> {
        let config = Config::default();
        toml::to_string_pretty(&config).context("Failed to serialize default config")
    }
}
