//! Turns trigger events into queued analysis jobs.
//!
//! Files of an event are filtered through the scanner, grouped by owning
//! scope, and queued as one job per scope.

use crate::models::{Job, ProjectId, ScopeId, TriggerType};
use crate::queue::{JobQueue, QueueError};
use crate::scanner::FileScanner;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info, warn};

/// A request to analyze some files, as produced by an editor or build hook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerEvent {
    pub trigger: TriggerType,
    #[serde(default)]
    pub files: Vec<PathBuf>,
}

impl TriggerEvent {
    pub fn new(trigger: TriggerType, files: Vec<PathBuf>) -> Self {
        Self { trigger, files }
    }

    /// Read events from a JSON-lines file. Blank lines and `#` comments are ignored.
    pub fn read_jsonl(path: &Path) -> Result<Vec<Self>> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read events file: {}", path.display()))?;

        let mut events = Vec::new();
        for (idx, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let event: TriggerEvent = serde_json::from_str(line).with_context(|| {
                format!("Invalid event on line {} of {}", idx + 1, path.display())
            })?;
            events.push(event);
        }

        Ok(events)
    }
}

/// Maps project-relative files to their owning scope.
#[derive(Debug, Clone, Default)]
pub struct ScopeResolver {
    /// Configured scope roots, longest first.
    roots: Vec<ScopeId>,
}

impl ScopeResolver {
    pub fn new(roots: &[String]) -> Self {
        let mut roots: Vec<ScopeId> = roots
            .iter()
            .filter_map(|r| normalize_root(r))
            .collect();
        roots.sort_by(|a, b| {
            b.as_str()
                .len()
                .cmp(&a.as_str().len())
                .then_with(|| a.cmp(b))
        });
        roots.dedup();
        Self { roots }
    }

    /// Longest configured root containing the file. Without configured roots,
    /// the file's top-level directory.
    pub fn resolve(&self, rel_path: &Path) -> ScopeId {
        if !self.roots.is_empty() {
            return self
                .roots
                .iter()
                .find(|root| rel_path.starts_with(root.as_str()))
                .cloned()
                .unwrap_or_else(ScopeId::root);
        }

        let mut components = rel_path.components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(first)), Some(_)) => {
                ScopeId::from(&*first.to_string_lossy())
            }
            _ => ScopeId::root(),
        }
    }
}

/// Normalize a configured root the way event files are relativized.
/// Roots naming the project itself are dropped.
fn normalize_root(root: &str) -> Option<ScopeId> {
    let normalized: PathBuf = Path::new(root)
        .components()
        .filter(|c| *c != Component::CurDir)
        .collect();
    let normalized = normalized.to_string_lossy();

    if normalized.is_empty() {
        None
    } else {
        Some(ScopeId::from(&*normalized))
    }
}

/// What happened to the jobs of one submitted event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitOutcome {
    /// Jobs appended to the queue.
    pub queued: usize,
    /// Jobs merged into an already queued job.
    pub coalesced: usize,
    /// Jobs refused because the queue was full.
    pub rejected: usize,
    /// Files dropped before job creation.
    pub skipped_files: usize,
}

impl std::ops::AddAssign for SubmitOutcome {
    fn add_assign(&mut self, other: Self) {
        self.queued += other.queued;
        self.coalesced += other.coalesced;
        self.rejected += other.rejected;
        self.skipped_files += other.skipped_files;
    }
}

/// Builds jobs for one project and feeds them into its queue.
pub struct Submitter {
    project: ProjectId,
    scanner: FileScanner,
    resolver: ScopeResolver,
    coalesce_manual: bool,
}

impl Submitter {
    pub fn new(project: ProjectId, scanner: FileScanner, resolver: ScopeResolver) -> Self {
        Self {
            project,
            scanner,
            resolver,
            coalesce_manual: true,
        }
    }

    /// Whether jobs from explicit user actions may be merged.
    pub fn coalesce_manual(mut self, enabled: bool) -> Self {
        self.coalesce_manual = enabled;
        self
    }

    /// An event covering every matching file in the project.
    pub fn scan_event(&self, trigger: TriggerType) -> Result<TriggerEvent> {
        let files = self.scanner.scan()?.into_iter().map(|f| f.path).collect();
        Ok(TriggerEvent::new(trigger, files))
    }

    /// Group the analyzable files of an event into one job per scope.
    ///
    /// Returns the jobs in first-seen scope order and the number of skipped files.
    pub fn build_jobs(&self, event: &TriggerEvent) -> (Vec<Job>, usize) {
        let mut groups: Vec<(ScopeId, Vec<PathBuf>)> = Vec::new();
        let mut skipped = 0;

        for file in &event.files {
            let Some(rel) = self.relativize(file) else {
                debug!("Skipping file outside project: {}", file.display());
                skipped += 1;
                continue;
            };

            if !self.scanner.matches(&rel) {
                debug!("Skipping non-analyzable file: {}", rel.display());
                skipped += 1;
                continue;
            }

            let scope = self.resolver.resolve(&rel);
            match groups.iter_mut().find(|(s, _)| *s == scope) {
                Some((_, files)) => files.push(rel),
                None => groups.push((scope, vec![rel])),
            }
        }

        // Groups are never empty, so job creation cannot fail here.
        let jobs = groups
            .into_iter()
            .filter_map(|(scope, files)| {
                Job::new(self.project.clone(), scope, files, event.trigger).ok()
            })
            .collect();

        (jobs, skipped)
    }

    /// Submit an event to the queue.
    ///
    /// A full queue rejects the job and is reported in the outcome; retrying
    /// is left to the caller.
    pub fn submit(
        &self,
        queue: &mut JobQueue,
        event: &TriggerEvent,
        coalesce: bool,
    ) -> Result<SubmitOutcome, QueueError> {
        let (jobs, skipped_files) = self.build_jobs(event);
        let mut outcome = SubmitOutcome {
            skipped_files,
            ..SubmitOutcome::default()
        };

        if jobs.is_empty() {
            info!("Nothing to analyze for {} trigger", event.trigger);
            return Ok(outcome);
        }

        let coalesce = coalesce && (self.coalesce_manual || !event.trigger.is_manual());

        for job in jobs {
            let merges = coalesce && queue.iter().any(|q| q.scope() == job.scope());
            let scope = job.scope().clone();
            let file_count = job.files().len();

            match queue.enqueue(job, coalesce) {
                Ok(()) if merges => {
                    debug!("Merged {} files into queued job for {}", file_count, scope);
                    outcome.coalesced += 1;
                }
                Ok(()) => {
                    debug!("Queued job for {} ({} files)", scope, file_count);
                    outcome.queued += 1;
                }
                Err(QueueError::NoCapacity { capacity }) => {
                    warn!(
                        "Analysis queue full ({} jobs), dropping {} trigger for {}",
                        capacity, event.trigger, scope
                    );
                    outcome.rejected += 1;
                }
                Err(e) => return Err(e),
            }
        }

        Ok(outcome)
    }

    fn relativize(&self, file: &Path) -> Option<PathBuf> {
        let rel = if file.is_absolute() {
            file.strip_prefix(self.scanner.root()).ok()?.to_path_buf()
        } else {
            file.to_path_buf()
        };

        let escapes = rel
            .components()
            .any(|c| matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_)));
        if escapes {
            return None;
        }

        // Drop leading "./" so equal files compare equal.
        Some(rel.components().filter(|c| *c != Component::CurDir).collect())
    }
}
