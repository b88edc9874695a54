//! Drains queued jobs through the analysis engine.

use crate::analysis::engine::AnalysisEngine;
use crate::analysis::session::AnalysisSession;
use crate::models::{Job, JobOutcome};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Notified around every job the runner executes.
pub trait TaskListener {
    fn started(&self, _job: &Job) {}

    /// Called once per dequeued job, whether the engine succeeded or not.
    fn ended(&self, job: &Job, outcome: &JobOutcome);
}

/// Listener that reports job progress through `tracing`.
pub struct LoggingListener;

impl TaskListener for LoggingListener {
    fn started(&self, job: &Job) {
        info!(
            "Analyzing {} files in {} ({} trigger)",
            job.files().len(),
            job.scope(),
            job.trigger()
        );
    }

    fn ended(&self, job: &Job, outcome: &JobOutcome) {
        match outcome.error {
            None => info!(
                "Finished {}: {} issues in {:.1}s",
                job.scope(),
                outcome.issues.len(),
                outcome.duration_seconds
            ),
            Some(ref error) => warn!("Analysis of {} failed: {}", job.scope(), error),
        }
    }
}

/// Pulls jobs from a session one at a time and runs them.
pub struct TaskRunner<E> {
    engine: E,
    listeners: Vec<Box<dyn TaskListener>>,
    show_progress: bool,
}

impl<E: AnalysisEngine> TaskRunner<E> {
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            listeners: Vec::new(),
            show_progress: false,
        }
    }

    pub fn with_listener(mut self, listener: impl TaskListener + 'static) -> Self {
        self.listeners.push(Box::new(listener));
        self
    }

    /// Show a spinner while jobs run.
    pub fn show_progress(mut self, enabled: bool) -> Self {
        self.show_progress = enabled;
        self
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Run the next queued job, if there is one.
    ///
    /// The session lock is released before the engine runs, so triggers can
    /// keep queueing work while a job is in progress.
    pub async fn run_next(&self, session: &AnalysisSession) -> Option<JobOutcome> {
        let job = session.next_job().await?;
        Some(self.run_job(session, job).await)
    }

    /// Run jobs until the queue is empty.
    pub async fn drain(&self, session: &AnalysisSession) -> Vec<JobOutcome> {
        let spinner = self.spinner();
        let mut outcomes = Vec::new();

        while let Some(job) = session.next_job().await {
            if let Some(ref pb) = spinner {
                pb.set_message(format!("{} ({} files)", job.scope(), job.files().len()));
            }

            outcomes.push(self.run_job(session, job).await);

            if let Some(ref pb) = spinner {
                pb.inc(1);
            }
        }

        if let Some(pb) = spinner {
            pb.finish_and_clear();
        }

        outcomes
    }

    async fn run_job(&self, session: &AnalysisSession, job: Job) -> JobOutcome {
        for listener in &self.listeners {
            listener.started(&job);
        }

        let start = Instant::now();
        let files: Vec<PathBuf> = job.files().iter().cloned().collect();
        let result = self
            .engine
            .analyze(session.project().root(), job.scope(), &files)
            .await;

        let (issues, error) = match result {
            Ok(issues) => (issues, None),
            Err(e) => (Vec::new(), Some(e.to_string())),
        };

        let outcome = JobOutcome {
            scope: job.scope().clone(),
            trigger: job.trigger(),
            files: files.iter().map(|f| f.display().to_string()).collect(),
            issues,
            error,
            duration_seconds: start.elapsed().as_secs_f64(),
        };

        for listener in &self.listeners {
            listener.ended(&job, &outcome);
        }

        outcome
    }

    fn spinner(&self) -> Option<ProgressBar> {
        if !self.show_progress {
            return None;
        }

        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {pos} jobs done, running {msg}")
        {
            pb.set_style(style);
        }
        pb.enable_steady_tick(Duration::from_millis(120));
        Some(pb)
    }
}
