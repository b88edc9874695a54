//! Markdown and JSON report generation.
//!
//! This module renders the outcomes of a queue drain into an audit report.

use crate::analysis::{aggregate_issues, group_by_file, most_problematic_files, sort_issues_by_severity};
use crate::analysis::SubmitOutcome;
use crate::models::{Issue, IssueSummary, JobOutcome, Severity};
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Metadata about the analysis run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// Project root that was analyzed.
    pub project: String,
    pub analysis_date: DateTime<Utc>,
    /// Engine command used for the jobs.
    pub engine: String,
    pub jobs_run: usize,
    pub jobs_failed: usize,
    pub files_analyzed: usize,
    pub total_issues: usize,
    /// Totals of all submitted trigger events.
    pub submitted: SubmitOutcome,
    pub duration_seconds: f64,
}

/// The complete analysis report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub metadata: ReportMetadata,
    pub jobs: Vec<JobOutcome>,
    pub summary: IssueSummary,
}

impl Report {
    /// Builds a report, computing counts and summary from the outcomes.
    pub fn new(
        project: String,
        engine: String,
        submitted: SubmitOutcome,
        jobs: Vec<JobOutcome>,
        duration_seconds: f64,
    ) -> Self {
        let issues = aggregate_issues(&jobs);
        let summary = IssueSummary::from_issues(&issues);

        let metadata = ReportMetadata {
            project,
            analysis_date: Utc::now(),
            engine,
            jobs_run: jobs.len(),
            jobs_failed: jobs.iter().filter(|j| !j.is_success()).count(),
            files_analyzed: jobs.iter().map(|j| j.files.len()).sum(),
            total_issues: summary.total,
            submitted,
            duration_seconds,
        };

        Self {
            metadata,
            jobs,
            summary,
        }
    }
}

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &Report) -> String {
    let mut output = String::new();

    output.push_str("# AuditQ Report\n\n");
    output.push_str(&generate_metadata_section(&report.metadata));
    output.push_str(&generate_summary_section(report));
    output.push_str(&generate_jobs_section(&report.jobs));
    output.push_str("---\n\n*Report generated by AuditQ*\n");

    output
}

fn generate_metadata_section(metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Project:** {}\n", metadata.project));
    section.push_str(&format!(
        "- **Analysis Date:** {}\n",
        metadata.analysis_date.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!("- **Engine:** `{}`\n", metadata.engine));
    section.push_str(&format!("- **Jobs Run:** {}\n", metadata.jobs_run));
    if metadata.jobs_failed > 0 {
        section.push_str(&format!("- **Jobs Failed:** {}\n", metadata.jobs_failed));
    }
    section.push_str(&format!("- **Files Analyzed:** {}\n", metadata.files_analyzed));

    let submitted = &metadata.submitted;
    section.push_str(&format!(
        "- **Queue:** {} queued, {} coalesced, {} rejected, {} files skipped\n",
        submitted.queued, submitted.coalesced, submitted.rejected, submitted.skipped_files
    ));
    section.push_str(&format!("- **Total Issues:** {}\n", metadata.total_issues));
    section.push_str(&format!(
        "- **Analysis Duration:** {:.1}s\n\n",
        metadata.duration_seconds
    ));

    section
}

fn generate_summary_section(report: &Report) -> String {
    let summary = &report.summary;
    let mut section = String::new();

    section.push_str("## Summary\n\n");
    section.push_str(&format!(
        "| {} Critical | {} High | {} Medium | {} Low | **Total** |\n",
        Severity::Critical.emoji(),
        Severity::High.emoji(),
        Severity::Medium.emoji(),
        Severity::Low.emoji(),
    ));
    section.push_str("|:---:|:---:|:---:|:---:|:---:|\n");
    section.push_str(&format!(
        "| {} | {} | {} | {} | **{}** |\n\n",
        summary.critical, summary.high, summary.medium, summary.low, summary.total
    ));

    if !summary.by_rule.is_empty() {
        section.push_str("### Issues by Rule\n\n");
        section.push_str("| Rule | Count |\n");
        section.push_str("|:---|:---:|\n");

        let mut rules: Vec<_> = summary.by_rule.iter().collect();
        rules.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));

        for (rule, count) in rules {
            section.push_str(&format!("| {} | {} |\n", rule, count));
        }
        section.push('\n');
    }

    let problematic = most_problematic_files(&aggregate_issues(&report.jobs), 5);
    if !problematic.is_empty() {
        section.push_str("### Most Problematic Files\n\n");
        section.push_str("| File | Issues |\n");
        section.push_str("|:---|:---:|\n");

        for (file, count) in problematic {
            section.push_str(&format!("| `{}` | {} |\n", file, count));
        }
        section.push('\n');
    }

    section
}

fn generate_jobs_section(jobs: &[JobOutcome]) -> String {
    let mut section = String::new();

    section.push_str("## Jobs\n\n");

    if jobs.is_empty() {
        section.push_str("No jobs were run.\n\n");
        return section;
    }

    for (i, job) in jobs.iter().enumerate() {
        section.push_str(&generate_job_section(i + 1, job));
    }

    section
}

fn generate_job_section(number: usize, job: &JobOutcome) -> String {
    let mut section = String::new();

    section.push_str(&format!("### {}. `{}`\n\n", number, job.scope));
    section.push_str(&format!(
        "*Trigger: {} | Files: {} | Issues: {} | {:.1}s*\n\n",
        job.trigger,
        job.files.len(),
        job.issues.len(),
        job.duration_seconds
    ));

    if let Some(ref error) = job.error {
        section.push_str(&format!("> ❌ **Analysis failed:** {}\n\n", error));
        return section;
    }

    if job.issues.is_empty() {
        section.push_str("No issues found.\n\n");
        return section;
    }

    for (file, mut issues) in group_by_file(&job.issues) {
        sort_issues_by_severity(&mut issues);
        section.push_str(&format!("#### {}\n\n", file));
        for issue in &issues {
            section.push_str(&generate_issue_line(issue));
        }
        section.push('\n');
    }

    section
}

fn generate_issue_line(issue: &Issue) -> String {
    let location = if issue.line > 0 {
        format!("L{}", issue.line)
    } else {
        "-".to_string()
    };

    let mut line = format!(
        "- {} **{}** `{}` {}",
        issue.severity.emoji(),
        issue.severity,
        issue.rule,
        location
    );
    if !issue.message.is_empty() {
        line.push_str(&format!(": {}", issue.message));
    }
    line.push('\n');
    line
}

/// Generate a JSON report.
pub fn generate_json_report(report: &Report) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ScopeId, TriggerType};

    fn create_test_report() -> Report {
        let jobs = vec![
            JobOutcome {
                scope: ScopeId::from("core"),
                trigger: TriggerType::Save,
                files: vec!["core/lib.rs".to_string(), "core/queue.rs".to_string()],
                issues: vec![
                    Issue {
                        file_path: "core/lib.rs".to_string(),
                        line: 10,
                        severity: Severity::High,
                        rule: "unwrap-used".to_string(),
                        message: "Unchecked error".to_string(),
                    },
                    Issue {
                        file_path: "core/queue.rs".to_string(),
                        line: 0,
                        severity: Severity::Low,
                        rule: "doc-missing".to_string(),
                        message: String::new(),
                    },
                ],
                error: None,
                duration_seconds: 1.2,
            },
            JobOutcome {
                scope: ScopeId::from("cli"),
                trigger: TriggerType::Action,
                files: vec!["cli/main.rs".to_string()],
                issues: Vec::new(),
                error: Some("engine timed out after 30s".to_string()),
                duration_seconds: 30.0,
            },
        ];

        let submitted = SubmitOutcome {
            queued: 2,
            coalesced: 1,
            rejected: 0,
            skipped_files: 3,
        };

        Report::new(
            "/work/project".to_string(),
            "semgrep".to_string(),
            submitted,
            jobs,
            31.5,
        )
    }

    #[test]
    fn test_report_metadata_counts() {
        let report = create_test_report();
        assert_eq!(report.metadata.jobs_run, 2);
        assert_eq!(report.metadata.jobs_failed, 1);
        assert_eq!(report.metadata.files_analyzed, 3);
        assert_eq!(report.metadata.total_issues, 2);
        assert_eq!(report.summary.high, 1);
    }

    #[test]
    fn test_generate_markdown_report() {
        let report = create_test_report();
        let markdown = generate_markdown_report(&report);

        assert!(markdown.contains("# AuditQ Report"));
        assert!(markdown.contains("## Metadata"));
        assert!(markdown.contains("2 queued, 1 coalesced, 0 rejected, 3 files skipped"));
        assert!(markdown.contains("### 1. `core`"));
        assert!(markdown.contains("#### core/lib.rs"));
        assert!(markdown.contains("`unwrap-used` L10: Unchecked error"));
        assert!(markdown.contains("**Analysis failed:** engine timed out"));
    }

    #[test]
    fn test_generate_issue_line_without_location() {
        let issue = Issue {
            file_path: "a.rs".to_string(),
            line: 0,
            severity: Severity::Critical,
            rule: "secret".to_string(),
            message: String::new(),
        };

        assert_eq!(generate_issue_line(&issue), "- 🔴 **Critical** `secret` -\n");
    }

    #[test]
    fn test_generate_json_report() {
        let report = create_test_report();
        let json = generate_json_report(&report).unwrap();

        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["metadata"]["engine"], "semgrep");
        assert_eq!(value["jobs"][0]["scope"], "core");
        assert_eq!(value["jobs"][1]["trigger"], "action");
        assert!(value["jobs"][0].get("error").is_none());
    }
}
