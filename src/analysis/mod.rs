//! Analysis pipeline around the job queue.
//!
//! Triggers are turned into jobs by the submitter, held by the session's
//! queue, and executed by the runner against an external engine.

pub mod aggregator;
pub mod engine;
pub mod runner;
pub mod session;
pub mod submitter;

pub use aggregator::*;
pub use engine::{AnalysisEngine, CommandEngine};
pub use runner::{LoggingListener, TaskRunner};
pub use session::AnalysisSession;
pub use submitter::{ScopeResolver, SubmitOutcome, Submitter, TriggerEvent};
