//! Issue aggregation across job outcomes.
//!
//! Helpers used by the report to flatten, filter and group findings.

use crate::models::{Issue, JobOutcome, Severity};
use std::collections::{BTreeMap, HashMap};

/// Collect all issues from job outcomes.
pub fn aggregate_issues(outcomes: &[JobOutcome]) -> Vec<Issue> {
    outcomes.iter().flat_map(|o| o.issues.clone()).collect()
}

/// Drop issues below `min` from every outcome.
pub fn retain_min_severity(outcomes: &mut [JobOutcome], min: Severity) {
    for outcome in outcomes {
        outcome.issues.retain(|issue| issue.severity >= min);
    }
}

/// Sort issues by severity (critical first), then by line.
pub fn sort_issues_by_severity(issues: &mut [Issue]) {
    issues.sort_by(|a, b| b.severity.cmp(&a.severity).then_with(|| a.line.cmp(&b.line)));
}

/// Group issues by file path, files in path order and issues by line.
pub fn group_by_file(issues: &[Issue]) -> BTreeMap<String, Vec<Issue>> {
    let mut grouped: BTreeMap<String, Vec<Issue>> = BTreeMap::new();

    for issue in issues {
        grouped
            .entry(issue.file_path.clone())
            .or_default()
            .push(issue.clone());
    }

    for issues in grouped.values_mut() {
        issues.sort_by_key(|i| i.line);
    }

    grouped
}

/// Identify the files with the most issues.
pub fn most_problematic_files(issues: &[Issue], n: usize) -> Vec<(String, usize)> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for issue in issues {
        *counts.entry(issue.file_path.as_str()).or_default() += 1;
    }

    let mut files: Vec<(String, usize)> = counts
        .into_iter()
        .map(|(path, count)| (path.to_string(), count))
        .collect();

    files.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    files.truncate(n);
    files
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ScopeId, TriggerType};

    fn issue(file: &str, line: usize, severity: Severity) -> Issue {
        Issue {
            file_path: file.to_string(),
            line,
            severity,
            rule: "rule".to_string(),
            message: "message".to_string(),
        }
    }

    fn outcome(issues: Vec<Issue>) -> JobOutcome {
        JobOutcome {
            scope: ScopeId::root(),
            trigger: TriggerType::Action,
            files: vec!["a.rs".to_string()],
            issues,
            error: None,
            duration_seconds: 0.5,
        }
    }

    #[test]
    fn test_aggregate_and_filter() {
        let mut outcomes = vec![
            outcome(vec![issue("a.rs", 1, Severity::High)]),
            outcome(vec![
                issue("b.rs", 2, Severity::Low),
                issue("b.rs", 3, Severity::Critical),
            ]),
        ];
        assert_eq!(aggregate_issues(&outcomes).len(), 3);

        retain_min_severity(&mut outcomes, Severity::High);
        let remaining = aggregate_issues(&outcomes);
        assert_eq!(remaining.len(), 2);
        assert!(remaining.iter().all(|i| i.severity >= Severity::High));
    }

    #[test]
    fn test_sort_issues_by_severity() {
        let mut issues = vec![
            issue("a.rs", 9, Severity::Low),
            issue("a.rs", 5, Severity::Critical),
            issue("a.rs", 2, Severity::Critical),
        ];

        sort_issues_by_severity(&mut issues);

        assert_eq!(issues[0].line, 2);
        assert_eq!(issues[1].line, 5);
        assert_eq!(issues[2].severity, Severity::Low);
    }

    #[test]
    fn test_group_by_file() {
        let issues = vec![
            issue("b.rs", 7, Severity::Low),
            issue("a.rs", 3, Severity::Low),
            issue("b.rs", 1, Severity::High),
        ];

        let grouped = group_by_file(&issues);
        let files: Vec<_> = grouped.keys().cloned().collect();
        assert_eq!(files, vec!["a.rs", "b.rs"]);
        assert_eq!(grouped["b.rs"][0].line, 1);
    }

    #[test]
    fn test_most_problematic_files() {
        let issues = vec![
            issue("a.rs", 1, Severity::Low),
            issue("b.rs", 1, Severity::Low),
            issue("b.rs", 2, Severity::Low),
            issue("c.rs", 1, Severity::Low),
        ];

        let top = most_problematic_files(&issues, 2);
        assert_eq!(top, vec![("b.rs".to_string(), 2), ("a.rs".to_string(), 1)]);
    }
}
