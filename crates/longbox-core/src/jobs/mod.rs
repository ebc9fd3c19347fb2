//! Asynchronous injection jobs: submission, tracking, cancellation.

mod manager;
mod tracker;
mod types;

pub use manager::JobManager;
pub use tracker::JobTracker;
pub use types::{Job, JobSpec, JobState};
