//! Thread-safe store for active and recently finished jobs.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use chrono::Utc;

use super::types::{Job, JobState};
use crate::inject::InjectionResult;

/// Tracks every submitted job; getters return snapshots, never references.
pub struct JobTracker {
    state: Mutex<HashMap<String, Job>>,
}

impl JobTracker {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(HashMap::new()),
        }
    }

    /// Insert a new job entry.
    pub fn insert(&self, job: Job) {
        let mut state = self.state.lock().expect("job tracker lock poisoned");
        state.insert(job.id.clone(), job);
    }

    /// Get a snapshot of a specific job.
    pub fn get(&self, job_id: &str) -> Option<Job> {
        let state = self.state.lock().expect("job tracker lock poisoned");
        state.get(job_id).cloned()
    }

    /// List all tracked jobs, newest first.
    pub fn list_all(&self) -> Vec<Job> {
        let state = self.state.lock().expect("job tracker lock poisoned");
        let mut jobs: Vec<Job> = state.values().cloned().collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        jobs
    }

    /// Transition a job's state. Terminal states are never overwritten.
    pub fn set_state(&self, job_id: &str, new_state: JobState) {
        let mut state = self.state.lock().expect("job tracker lock poisoned");
        if let Some(job) = state.get_mut(job_id) {
            if job.state.is_terminal() {
                return;
            }
            job.state = new_state;
            match new_state {
                JobState::Running => job.started_at = Some(Utc::now()),
                s if s.is_terminal() => job.finished_at = Some(Utc::now()),
                _ => {}
            }
        }
    }

    /// Append a per-issue result.
    pub fn push_result(&self, job_id: &str, result: InjectionResult) {
        let mut state = self.state.lock().expect("job tracker lock poisoned");
        if let Some(job) = state.get_mut(job_id) {
            job.results.push(result);
        }
    }

    /// Append a non-fatal job-level problem.
    pub fn push_error(&self, job_id: &str, message: String) {
        let mut state = self.state.lock().expect("job tracker lock poisoned");
        if let Some(job) = state.get_mut(job_id) {
            job.errors.push(message);
        }
    }

    /// Record the fatal error and move the job to Failed.
    pub fn set_failed(&self, job_id: &str, message: String) {
        let mut state = self.state.lock().expect("job tracker lock poisoned");
        if let Some(job) = state.get_mut(job_id) {
            if job.state.is_terminal() {
                return;
            }
            job.state = JobState::Failed;
            job.error = Some(message);
            job.finished_at = Some(Utc::now());
        }
    }

    /// Set the total issue count once the volume cache has been consulted.
    pub fn set_issues_total(&self, job_id: &str, total: usize) {
        let mut state = self.state.lock().expect("job tracker lock poisoned");
        if let Some(job) = state.get_mut(job_id) {
            job.issues_total = Some(total);
        }
    }

    /// Remove a job entry, returning it if it was present.
    pub fn remove(&self, job_id: &str) -> Option<Job> {
        let mut state = self.state.lock().expect("job tracker lock poisoned");
        state.remove(job_id)
    }

    /// Drop finished jobs older than `ttl`; returns how many were evicted.
    pub fn evict_finished(&self, ttl: Duration) -> usize {
        let cutoff = Utc::now()
            - chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::hours(24));
        let mut state = self.state.lock().expect("job tracker lock poisoned");
        let before = state.len();
        state.retain(|_, job| {
            !(job.state.is_terminal() && job.finished_at.map(|t| t < cutoff).unwrap_or(false))
        });
        before - state.len()
    }
}

impl Default for JobTracker {
    fn default() -> Self {
        Self::new()
    }
}
