//! Per-project analysis session.
//!
//! The session owns the project's job queue. The queue itself is not thread
//! safe, so every access goes through the session's mutex.

use crate::analysis::submitter::{SubmitOutcome, Submitter, TriggerEvent};
use crate::models::{Job, ProjectId};
use crate::queue::{JobQueue, QueueError};
use std::path::PathBuf;
use tokio::sync::Mutex;
use tracing::debug;

pub struct AnalysisSession {
    project: ProjectId,
    queue: Mutex<JobQueue>,
}

impl AnalysisSession {
    pub fn new(project_root: PathBuf, capacity: usize) -> Self {
        let project = ProjectId::new(project_root);
        let queue = JobQueue::with_capacity(project.clone(), capacity);
        Self {
            project,
            queue: Mutex::new(queue),
        }
    }

    pub fn project(&self) -> &ProjectId {
        &self.project
    }

    /// Run `f` with exclusive access to the queue.
    pub async fn with_queue<R>(&self, f: impl FnOnce(&mut JobQueue) -> R) -> R {
        let mut queue = self.queue.lock().await;
        f(&mut queue)
    }

    pub async fn submit(
        &self,
        submitter: &Submitter,
        event: &TriggerEvent,
        coalesce: bool,
    ) -> Result<SubmitOutcome, QueueError> {
        self.with_queue(|queue| submitter.submit(queue, event, coalesce))
            .await
    }

    /// Number of pending jobs.
    pub async fn pending(&self) -> usize {
        self.with_queue(|queue| queue.len()).await
    }

    /// Take the next job, if any.
    pub async fn next_job(&self) -> Option<Job> {
        self.with_queue(|queue| {
            if queue.is_empty() {
                None
            } else {
                queue.dequeue().ok()
            }
        })
        .await
    }

    /// Copy of the pending jobs in dequeue order.
    pub async fn snapshot(&self) -> Vec<Job> {
        self.with_queue(|queue| queue.iter().cloned().collect())
            .await
    }

    /// Drop all pending jobs.
    pub async fn close(&self) {
        let dropped = self
            .with_queue(|queue| {
                let n = queue.len();
                queue.clear();
                n
            })
            .await;
        debug!("Session for {} closed, {} pending jobs dropped", self.project, dropped);
    }
}
