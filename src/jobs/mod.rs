//! Batch jobs
//!
//! The cancellable-run primitive, the batch orchestrator it drives, and the
//! manager that owns running jobs.

pub mod batch;
pub mod cancellable;
pub mod manager;

pub use batch::{BatchOrchestrator, ProgressSink};
pub use cancellable::{run, CancelNotice, RunOutcome};
pub use manager::{JobId, JobManager, JobProgress, JobRecord, JobState};
