//! Data models for the analysis queue.
//!
//! This module contains the job types that flow through the queue as well
//! as the findings reported back by the analysis engine.

use crate::queue::QueueError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};

/// Identifies the project that owns a queue and its jobs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProjectId(PathBuf);

impl ProjectId {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self(root.into())
    }

    /// Root directory of the project.
    pub fn root(&self) -> &Path {
        &self.0
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

/// Owning scope of a job (a module or component, relative to the project root).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScopeId(String);

impl ScopeId {
    /// Scope of files that belong to no configured module.
    pub fn root() -> Self {
        Self(".".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ScopeId {
    fn from(s: &str) -> Self {
        let trimmed = s.trim_end_matches('/');
        if trimmed.is_empty() {
            Self::root()
        } else {
            Self(trimmed.to_string())
        }
    }
}

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Why an analysis was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerType {
    /// Explicit user action.
    Action,
    /// File saved.
    Save,
    /// Editor content changed.
    EditorChange,
    /// File opened in an editor.
    EditorOpen,
    /// Project bound to a remote server.
    Binding,
    /// Analysis settings changed.
    ConfigChange,
    /// Project opened.
    Startup,
}

impl TriggerType {
    /// Returns true for triggers a user asked for explicitly.
    pub fn is_manual(&self) -> bool {
        matches!(self, TriggerType::Action)
    }
}

impl fmt::Display for TriggerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriggerType::Action => write!(f, "action"),
            TriggerType::Save => write!(f, "save"),
            TriggerType::EditorChange => write!(f, "editor change"),
            TriggerType::EditorOpen => write!(f, "editor open"),
            TriggerType::Binding => write!(f, "binding"),
            TriggerType::ConfigChange => write!(f, "config change"),
            TriggerType::Startup => write!(f, "startup"),
        }
    }
}

impl std::str::FromStr for TriggerType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace(['-', ' '], "_").as_str() {
            "action" | "manual" => Ok(TriggerType::Action),
            "save" => Ok(TriggerType::Save),
            "editor_change" | "change" => Ok(TriggerType::EditorChange),
            "editor_open" | "open" => Ok(TriggerType::EditorOpen),
            "binding" => Ok(TriggerType::Binding),
            "config_change" | "config" => Ok(TriggerType::ConfigChange),
            "startup" => Ok(TriggerType::Startup),
            other => Err(format!("unknown trigger type: {}", other)),
        }
    }
}

/// A unit of requested analysis work: a set of files in one scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    project: ProjectId,
    scope: ScopeId,
    files: BTreeSet<PathBuf>,
    trigger: TriggerType,
}

impl Job {
    /// Creates a job, rejecting an empty file set.
    pub fn new(
        project: ProjectId,
        scope: ScopeId,
        files: impl IntoIterator<Item = PathBuf>,
        trigger: TriggerType,
    ) -> Result<Self, QueueError> {
        let files: BTreeSet<PathBuf> = files.into_iter().collect();
        if files.is_empty() {
            return Err(QueueError::InvalidJob("no files to analyze".to_string()));
        }

        Ok(Self {
            project,
            scope,
            files,
            trigger,
        })
    }

    /// Combines a queued job with a newer one for the same scope.
    ///
    /// Files are unioned. A manual trigger on either side wins; otherwise the
    /// queued job keeps its trigger.
    pub fn merge(earlier: &Job, later: &Job) -> Job {
        let trigger = if later.trigger.is_manual() && !earlier.trigger.is_manual() {
            later.trigger
        } else {
            earlier.trigger
        };

        Job {
            project: earlier.project.clone(),
            scope: earlier.scope.clone(),
            files: earlier.files.union(&later.files).cloned().collect(),
            trigger,
        }
    }

    pub fn project(&self) -> &ProjectId {
        &self.project
    }

    pub fn scope(&self) -> &ScopeId {
        &self.scope
    }

    pub fn files(&self) -> &BTreeSet<PathBuf> {
        &self.files
    }

    pub fn trigger(&self) -> TriggerType {
        self.trigger
    }
}

/// Severity level of a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Low severity - style issues, minor suggestions
    Low,
    /// Medium severity - code quality issues, potential bugs
    Medium,
    /// High severity - bugs, security concerns
    High,
    /// Critical severity - security vulnerabilities, major bugs
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Low => write!(f, "Low"),
            Severity::Medium => write!(f, "Medium"),
            Severity::High => write!(f, "High"),
            Severity::Critical => write!(f, "Critical"),
        }
    }
}

impl Severity {
    /// Returns an emoji representation of the severity.
    pub fn emoji(&self) -> &'static str {
        match self {
            Severity::Low => "🟢",
            Severity::Medium => "🟡",
            Severity::High => "🟠",
            Severity::Critical => "🔴",
        }
    }

    /// Lenient parse of engine-provided severities. Unknown values map to Medium.
    pub fn from_engine(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "critical" | "blocker" => Severity::Critical,
            "high" | "major" | "error" => Severity::High,
            "low" | "minor" | "info" | "note" => Severity::Low,
            _ => Severity::Medium,
        }
    }
}

/// A single finding reported by the analysis engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    /// Path to the file containing the issue (relative to the project root).
    pub file_path: String,
    /// Line number of the issue (1-indexed, 0 when unknown).
    pub line: usize,
    pub severity: Severity,
    /// Rule key or category reported by the engine.
    pub rule: String,
    pub message: String,
}

/// Result of running one dequeued job through the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobOutcome {
    pub scope: ScopeId,
    pub trigger: TriggerType,
    /// Target files, relative to the project root.
    pub files: Vec<String>,
    pub issues: Vec<Issue>,
    /// Engine error message if the job failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub duration_seconds: f64,
}

impl JobOutcome {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Summary of findings across all jobs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IssueSummary {
    pub total: usize,
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    /// Issues grouped by rule.
    pub by_rule: HashMap<String, usize>,
}

impl IssueSummary {
    /// Creates a summary from a list of issues.
    pub fn from_issues<'a>(issues: impl IntoIterator<Item = &'a Issue>) -> Self {
        let mut summary = Self::default();

        for issue in issues {
            summary.total += 1;
            match issue.severity {
                Severity::Critical => summary.critical += 1,
                Severity::High => summary.high += 1,
                Severity::Medium => summary.medium += 1,
                Severity::Low => summary.low += 1,
            }

            *summary.by_rule.entry(issue.rule.clone()).or_insert(0) += 1;
        }

        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(scope: &str, files: &[&str], trigger: TriggerType) -> Job {
        Job::new(
            ProjectId::new("/work/project"),
            ScopeId::from(scope),
            files.iter().map(PathBuf::from),
            trigger,
        )
        .unwrap()
    }

    #[test]
    fn test_job_rejects_empty_files() {
        let result = Job::new(
            ProjectId::new("/work/project"),
            ScopeId::root(),
            Vec::<PathBuf>::new(),
            TriggerType::Save,
        );
        assert!(matches!(result, Err(QueueError::InvalidJob(_))));
    }

    #[test]
    fn test_merge_unions_files() {
        let a = job("core", &["core/a.rs", "core/b.rs"], TriggerType::Save);
        let b = job("core", &["core/b.rs", "core/c.rs"], TriggerType::Save);

        let merged = Job::merge(&a, &b);
        let files: Vec<_> = merged.files().iter().map(|p| p.to_str().unwrap()).collect();
        assert_eq!(files, vec!["core/a.rs", "core/b.rs", "core/c.rs"]);
        assert_eq!(merged.scope().as_str(), "core");
    }

    #[test]
    fn test_merge_manual_trigger_wins() {
        let auto = job("core", &["a.rs"], TriggerType::Save);
        let manual = job("core", &["b.rs"], TriggerType::Action);

        assert_eq!(Job::merge(&auto, &manual).trigger(), TriggerType::Action);
        assert_eq!(Job::merge(&manual, &auto).trigger(), TriggerType::Action);
    }

    #[test]
    fn test_merge_keeps_earlier_automatic_trigger() {
        let open = job("core", &["a.rs"], TriggerType::EditorOpen);
        let save = job("core", &["b.rs"], TriggerType::Save);

        assert_eq!(Job::merge(&open, &save).trigger(), TriggerType::EditorOpen);
        // Inputs are untouched.
        assert_eq!(open.files().len(), 1);
        assert_eq!(save.files().len(), 1);
    }

    #[test]
    fn test_trigger_from_str() {
        assert_eq!("ACTION".parse::<TriggerType>(), Ok(TriggerType::Action));
        assert_eq!("editor-change".parse::<TriggerType>(), Ok(TriggerType::EditorChange));
        assert_eq!("config".parse::<TriggerType>(), Ok(TriggerType::ConfigChange));
        assert!("later".parse::<TriggerType>().is_err());
    }

    #[test]
    fn test_trigger_serde_snake_case() {
        let json = serde_json::to_string(&TriggerType::EditorOpen).unwrap();
        assert_eq!(json, "\"editor_open\"");
    }

    #[test]
    fn test_scope_from_str() {
        assert_eq!(ScopeId::from("crates/core/").as_str(), "crates/core");
        assert_eq!(ScopeId::from(""), ScopeId::root());
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Low < Severity::Medium);
        assert!(Severity::Medium < Severity::High);
        assert!(Severity::High < Severity::Critical);
    }

    #[test]
    fn test_severity_from_engine() {
        assert_eq!(Severity::from_engine("BLOCKER"), Severity::Critical);
        assert_eq!(Severity::from_engine("major"), Severity::High);
        assert_eq!(Severity::from_engine("info"), Severity::Low);
        assert_eq!(Severity::from_engine("whatever"), Severity::Medium);
    }

    #[test]
    fn test_issue_summary() {
        let issue = |severity, rule: &str| Issue {
            file_path: "src/lib.rs".to_string(),
            line: 1,
            severity,
            rule: rule.to_string(),
            message: String::new(),
        };
        let issues = vec![
            issue(Severity::Critical, "S2068"),
            issue(Severity::High, "S1481"),
            issue(Severity::Low, "S2068"),
        ];

        let summary = IssueSummary::from_issues(&issues);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.critical, 1);
        assert_eq!(summary.high, 1);
        assert_eq!(summary.low, 1);
        assert_eq!(summary.by_rule.get("S2068"), Some(&2));
    }
}
