//! Contract with the external analysis engine.
//!
//! The engine is a black box: it receives the target files of one job and
//! answers with findings. [`CommandEngine`] drives any executable that
//! prints findings as JSON lines on stdout.

use crate::config::EngineConfig;
use crate::models::{Issue, ScopeId, Severity};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

/// Failures of a single engine invocation.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to start engine `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("engine timed out after {0:?}")]
    Timeout(Duration),

    #[error("engine exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },
}

/// Something that can analyze the files of one job.
#[allow(async_fn_in_trait)]
pub trait AnalysisEngine {
    /// Human-readable engine name for logs and reports.
    fn name(&self) -> &str;

    /// Analyze `files` (relative to `root`) belonging to `scope`.
    async fn analyze(
        &self,
        root: &Path,
        scope: &ScopeId,
        files: &[PathBuf],
    ) -> Result<Vec<Issue>, EngineError>;
}

/// Engine backed by an external command.
///
/// The command runs in the project root with the configured arguments
/// followed by the target files.
#[derive(Debug, Clone)]
pub struct CommandEngine {
    command: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandEngine {
    pub fn new(command: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            command: command.into(),
            args,
            timeout,
        }
    }
}

impl From<&EngineConfig> for CommandEngine {
    fn from(config: &EngineConfig) -> Self {
        Self::new(
            config.command.clone(),
            config.args.clone(),
            Duration::from_secs(config.timeout_seconds),
        )
    }
}

impl AnalysisEngine for CommandEngine {
    fn name(&self) -> &str {
        &self.command
    }

    async fn analyze(
        &self,
        root: &Path,
        scope: &ScopeId,
        files: &[PathBuf],
    ) -> Result<Vec<Issue>, EngineError> {
        debug!(
            "Running {} on {} files of scope {}",
            self.command,
            files.len(),
            scope
        );

        let child = Command::new(&self.command)
            .args(&self.args)
            .args(files)
            .current_dir(root)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| EngineError::Spawn {
                command: self.command.clone(),
                source,
            })?;

        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(result) => result.map_err(|source| EngineError::Spawn {
                command: self.command.clone(),
                source,
            })?,
            Err(_) => return Err(EngineError::Timeout(self.timeout)),
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let issues = parse_findings(&stdout);

        // Linters commonly exit non-zero when they report findings.
        if !output.status.success() && issues.is_empty() {
            return Err(EngineError::Failed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(issues)
    }
}

/// Parse findings from engine output (JSON lines format).
///
/// Lines that are not JSON objects, or lack a file path, are skipped.
pub fn parse_findings(output: &str) -> Vec<Issue> {
    let mut issues = Vec::new();

    for line in output.lines() {
        let line = line.trim();
        if line.is_empty() || !line.starts_with('{') {
            continue;
        }

        if let Ok(json) = serde_json::from_str::<Value>(line) {
            if let Some(issue) = json_to_issue(&json) {
                issues.push(issue);
            }
        }
    }

    issues
}

fn json_to_issue(json: &Value) -> Option<Issue> {
    let file_path = json["file_path"].as_str().or(json["file"].as_str())?;

    Some(Issue {
        file_path: file_path.to_string(),
        line: json["line"]
            .as_u64()
            .or(json["line_number"].as_u64())
            .unwrap_or(0) as usize,
        severity: Severity::from_engine(json["severity"].as_str().unwrap_or("medium")),
        rule: json["rule"]
            .as_str()
            .or(json["category"].as_str())
            .unwrap_or("general")
            .to_string(),
        message: json["message"]
            .as_str()
            .or(json["title"].as_str())
            .unwrap_or("")
            .to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn shell_engine(script: &str, timeout: Duration) -> CommandEngine {
        CommandEngine::new(
            "sh",
            vec!["-c".to_string(), script.to_string(), "sh".to_string()],
            timeout,
        )
    }

    #[test]
    fn test_parse_findings_skips_noise() {
        let output = r#"
Analyzing 2 files...
{"file_path": "src/lib.rs", "line": 12, "severity": "high", "rule": "unwrap-used", "message": "avoid unwrap"}
{"broken json
{"file": "src/main.rs", "line_number": 3, "category": "style", "title": "long line"}
{"line": 4, "message": "no file"}
done
"#;

        let issues = parse_findings(output);
        assert_eq!(issues.len(), 2);

        assert_eq!(issues[0].file_path, "src/lib.rs");
        assert_eq!(issues[0].line, 12);
        assert_eq!(issues[0].severity, Severity::High);
        assert_eq!(issues[0].rule, "unwrap-used");

        assert_eq!(issues[1].file_path, "src/main.rs");
        assert_eq!(issues[1].line, 3);
        assert_eq!(issues[1].severity, Severity::Medium);
        assert_eq!(issues[1].rule, "style");
        assert_eq!(issues[1].message, "long line");
    }

    #[test]
    fn test_engine_from_config() {
        let config = EngineConfig {
            command: "semgrep".to_string(),
            args: vec!["--json".to_string()],
            timeout_seconds: 30,
        };
        let engine = CommandEngine::from(&config);
        assert_eq!(engine.name(), "semgrep");
        assert_eq!(engine.timeout, Duration::from_secs(30));
    }

    #[tokio::test]
    async fn test_command_engine_receives_files() {
        let dir = TempDir::new().unwrap();
        let engine = shell_engine(
            r#"for f in "$@"; do printf '{"file_path":"%s","line":1,"severity":"low","rule":"seen"}\n' "$f"; done"#,
            Duration::from_secs(10),
        );

        let files = vec![PathBuf::from("a.rs"), PathBuf::from("b.rs")];
        let issues = engine
            .analyze(dir.path(), &ScopeId::root(), &files)
            .await
            .unwrap();

        let paths: Vec<_> = issues.iter().map(|i| i.file_path.as_str()).collect();
        assert_eq!(paths, vec!["a.rs", "b.rs"]);
        assert!(issues.iter().all(|i| i.severity == Severity::Low));
    }

    #[tokio::test]
    async fn test_command_engine_nonzero_exit_with_findings_is_ok() {
        let dir = TempDir::new().unwrap();
        let engine = shell_engine(
            r#"echo '{"file_path":"a.rs","line":2}'; exit 1"#,
            Duration::from_secs(10),
        );

        let issues = engine
            .analyze(dir.path(), &ScopeId::root(), &[PathBuf::from("a.rs")])
            .await
            .unwrap();
        assert_eq!(issues.len(), 1);
    }

    #[tokio::test]
    async fn test_command_engine_failure() {
        let dir = TempDir::new().unwrap();
        let engine = shell_engine("echo boom >&2; exit 3", Duration::from_secs(10));

        let err = engine
            .analyze(dir.path(), &ScopeId::root(), &[PathBuf::from("a.rs")])
            .await
            .unwrap_err();
        match err {
            EngineError::Failed { stderr, .. } => assert_eq!(stderr, "boom"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_command_engine_timeout() {
        let dir = TempDir::new().unwrap();
        let engine = shell_engine("sleep 5", Duration::from_millis(100));

        let err = engine
            .analyze(dir.path(), &ScopeId::root(), &[PathBuf::from("a.rs")])
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Timeout(_)));
    }

    #[tokio::test]
    async fn test_command_engine_missing_binary() {
        let dir = TempDir::new().unwrap();
        let engine = CommandEngine::new(
            "auditq-no-such-engine",
            Vec::new(),
            Duration::from_secs(1),
        );

        let err = engine
            .analyze(dir.path(), &ScopeId::root(), &[PathBuf::from("a.rs")])
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Spawn { .. }));
    }
}
