//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::models::{Severity, TriggerType};
use clap::Parser;
use std::path::PathBuf;

/// AuditQ - queue source files for static analysis
///
/// Builds analysis jobs from triggers, coalesces them per module in a
/// bounded queue, and runs each job through an external analysis engine.
///
/// Examples:
///   auditq --local ./my-project
///   auditq --local ./my-project --trigger save src/lib.rs src/main.rs
///   auditq --local ./my-project --events triggers.jsonl --dry-run
///   auditq --local ./my-project --engine semgrep --engine-arg=--json
///   auditq --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Files to analyze, relative to the project root
    ///
    /// Submitted as a single trigger event. When omitted (and no --events
    /// file is given) every matching file in the project is submitted.
    #[arg(value_name = "FILES")]
    pub files: Vec<PathBuf>,

    /// Project root directory
    #[arg(short, long, value_name = "DIR", required_unless_present = "init_config")]
    pub local: Option<PathBuf>,

    /// Trigger type for the positional files
    #[arg(short, long, default_value = "action", value_name = "TYPE", value_parser = parse_trigger)]
    pub trigger: TriggerType,

    /// JSON-lines file of trigger events ({"trigger": "save", "files": [...]})
    #[arg(long, value_name = "FILE", conflicts_with = "files")]
    pub events: Option<PathBuf>,

    /// Drain the queue after every event instead of after all events
    #[arg(long)]
    pub drain_each: bool,

    /// Never merge jobs for the same module
    #[arg(long)]
    pub no_coalesce: bool,

    /// Maximum number of pending jobs
    #[arg(long, value_name = "COUNT")]
    pub capacity: Option<usize>,

    /// Analysis engine executable
    ///
    /// Can also be set via AUDITQ_ENGINE env var or .auditq.toml config.
    #[arg(long, value_name = "CMD", env = "AUDITQ_ENGINE")]
    pub engine: Option<String>,

    /// Extra argument passed to the engine before the files (repeatable)
    #[arg(long, value_name = "ARG", allow_hyphen_values = true)]
    pub engine_arg: Vec<String>,

    /// Per-job engine timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Maximum number of files collected by a full scan
    #[arg(long, value_name = "COUNT")]
    pub max_files: Option<usize>,

    /// File extensions to include (comma-separated)
    #[arg(long, value_name = "EXTS", value_delimiter = ',')]
    pub extensions: Option<Vec<String>>,

    /// Names to exclude from analysis (comma-separated)
    #[arg(long, value_name = "NAMES", value_delimiter = ',')]
    pub exclude: Option<Vec<String>>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .auditq.toml in the project root and
    /// then in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Output file path for the report
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format (markdown, json)
    #[arg(long, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Minimum severity to include in the report
    #[arg(long, value_name = "LEVEL")]
    pub min_severity: Option<SeverityLevel>,

    /// Exit with code 2 if findings at or above this severity are found
    #[arg(long, value_name = "LEVEL")]
    pub fail_on: Option<SeverityLevel>,

    /// Queue the jobs and print them without running the engine
    #[arg(long)]
    pub dry_run: bool,

    /// Generate a default .auditq.toml configuration file
    #[arg(long)]
    pub init_config: bool,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,
}

/// Output format for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

/// Severity level for --fail-on and --min-severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, clap::ValueEnum)]
pub enum SeverityLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl From<SeverityLevel> for Severity {
    fn from(level: SeverityLevel) -> Self {
        match level {
            SeverityLevel::Low => Severity::Low,
            SeverityLevel::Medium => Severity::Medium,
            SeverityLevel::High => Severity::High,
            SeverityLevel::Critical => Severity::Critical,
        }
    }
}

fn parse_trigger(s: &str) -> Result<TriggerType, String> {
    s.parse()
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.init_config {
            return Ok(());
        }

        if let Some(ref local_path) = self.local {
            if !local_path.exists() {
                return Err(format!(
                    "Project directory does not exist: {}",
                    local_path.display()
                ));
            }
            if !local_path.is_dir() {
                return Err(format!(
                    "Project path is not a directory: {}",
                    local_path.display()
                ));
            }
        }

        if let Some(ref events) = self.events {
            if !events.is_file() {
                return Err(format!("Events file does not exist: {}", events.display()));
            }
        }

        if self.capacity == Some(0) {
            return Err("Capacity must be at least 1".to_string());
        }

        if self.timeout == Some(0) {
            return Err("Timeout must be at least 1 second".to_string());
        }

        if self.max_files == Some(0) {
            return Err("Max files must be at least 1".to_string());
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        Ok(())
    }
}
