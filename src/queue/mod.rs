//! Bounded job queue with per-scope coalescing.
//!
//! NOT thread safe. The queue does no locking of its own; callers that share
//! it must serialize access themselves (see `analysis::session`).

use crate::models::{Job, ProjectId};
use std::collections::VecDeque;
use thiserror::Error;

/// Errors returned by queue operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueueError {
    /// No coalescing match and the queue is full.
    #[error("job queue is full (capacity {capacity})")]
    NoCapacity { capacity: usize },

    /// Dequeue on an empty queue.
    #[error("job queue is empty")]
    Empty,

    /// The job violates a queue precondition.
    #[error("invalid job: {0}")]
    InvalidJob(String),
}

/// FIFO queue of pending analysis jobs for a single project.
#[derive(Debug)]
pub struct JobQueue {
    project: ProjectId,
    capacity: usize,
    jobs: VecDeque<Job>,
}

impl JobQueue {
    /// Default maximum number of queued jobs.
    pub const CAPACITY: usize = 5;

    pub fn new(project: ProjectId) -> Self {
        Self::with_capacity(project, Self::CAPACITY)
    }

    pub fn with_capacity(project: ProjectId, capacity: usize) -> Self {
        Self {
            project,
            capacity,
            jobs: VecDeque::with_capacity(capacity),
        }
    }

    /// Queues a job, merging it into a queued job for the same scope if there is one.
    pub fn queue(&mut self, job: Job) -> Result<(), QueueError> {
        self.enqueue(job, true)
    }

    /// Queues a job.
    ///
    /// With `coalesce`, the first queued job with the same scope is replaced in
    /// place by the merge of both, without consulting capacity. Otherwise the
    /// job is appended, failing with [`QueueError::NoCapacity`] when full.
    pub fn enqueue(&mut self, job: Job, coalesce: bool) -> Result<(), QueueError> {
        if job.project() != &self.project {
            return Err(QueueError::InvalidJob(format!(
                "job belongs to a different project: {}",
                job.project()
            )));
        }
        if job.files().is_empty() {
            return Err(QueueError::InvalidJob("no files to analyze".to_string()));
        }

        if coalesce {
            if let Some(slot) = self.jobs.iter_mut().find(|j| j.scope() == job.scope()) {
                *slot = Job::merge(slot, &job);
                return Ok(());
            }
        }

        if self.jobs.len() >= self.capacity {
            return Err(QueueError::NoCapacity {
                capacity: self.capacity,
            });
        }

        self.jobs.push_back(job);
        Ok(())
    }

    /// Removes and returns the oldest job.
    ///
    /// Callers are expected to check [`JobQueue::len`] first.
    pub fn dequeue(&mut self) -> Result<Job, QueueError> {
        self.jobs.pop_front().ok_or(QueueError::Empty)
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn project(&self) -> &ProjectId {
        &self.project
    }

    /// Queued jobs in dequeue order.
    pub fn iter(&self) -> impl Iterator<Item = &Job> {
        self.jobs.iter()
    }

    pub fn clear(&mut self) {
        self.jobs.clear();
    }
}
