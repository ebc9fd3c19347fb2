//! Job manager: bounded worker pool over the injection engine.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::Semaphore;
use tracing::{error, info};

use super::tracker::JobTracker;
use super::types::{Job, JobSpec, JobState};
use crate::cancel::CancellationToken;
use crate::inject::InjectionEngine;
use crate::{LongboxError, Result};

/// Accepts injection jobs and runs them on a bounded pool of workers.
///
/// Each submitted job gets a worker task immediately, but the worker blocks on
/// a semaphore permit before any injection starts, so jobs beyond the
/// configured ceiling sit in Pending until a slot frees up. Cancellation is
/// cooperative: a cancel request flips the job to Cancelling, and the worker
/// acknowledges at the next issue boundary.
pub struct JobManager {
    engine: Arc<InjectionEngine>,
    tracker: Arc<JobTracker>,
    permits: Arc<Semaphore>,
    cancel_tokens: Mutex<HashMap<String, CancellationToken>>,
}

impl JobManager {
    pub fn new(engine: InjectionEngine) -> Self {
        let ceiling = engine.config().max_concurrent_jobs;
        Self {
            engine: Arc::new(engine),
            tracker: Arc::new(JobTracker::new()),
            permits: Arc::new(Semaphore::new(ceiling)),
            cancel_tokens: Mutex::new(HashMap::new()),
        }
    }

    /// Submit a job; returns its id immediately.
    pub fn submit(&self, spec: JobSpec) -> String {
        let job = Job::new(spec.clone());
        let job_id = job.id.clone();
        info!("Submitted job {job_id}: {}", spec.describe());
        self.tracker.insert(job);

        let token = CancellationToken::new();
        {
            let mut tokens = self.cancel_tokens.lock().expect("cancel_tokens lock poisoned");
            tokens.insert(job_id.clone(), token.clone());
        }

        let engine = self.engine.clone();
        let tracker = self.tracker.clone();
        let permits = self.permits.clone();
        let id = job_id.clone();

        tokio::spawn(async move {
            // Queued jobs stay Pending until a permit frees up.
            let _permit = match permits.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => return,
            };

            if token.is_cancelled() {
                tracker.set_state(&id, JobState::Cancelled);
                return;
            }

            tracker.set_state(&id, JobState::Running);
            match run_job(&engine, &tracker, &id, &spec, &token).await {
                Ok(()) if token.is_cancelled() => {
                    tracker.set_state(&id, JobState::Cancelled);
                }
                Ok(()) => {
                    tracker.set_state(&id, JobState::Completed);
                }
                Err(LongboxError::Cancelled) => {
                    info!("Job {id} cancelled");
                    tracker.set_state(&id, JobState::Cancelled);
                }
                Err(e) => {
                    error!("Job {id} failed: {e}");
                    tracker.set_failed(&id, e.to_string());
                }
            }
        });

        job_id
    }

    /// Get a snapshot of one job.
    pub fn get_status(&self, job_id: &str) -> Result<Job> {
        self.tracker.get(job_id).ok_or(LongboxError::JobNotFound {
            job_id: job_id.to_string(),
        })
    }

    /// List all tracked jobs, newest first.
    pub fn list_jobs(&self) -> Vec<Job> {
        self.tracker.list_all()
    }

    /// Request cancellation of a job.
    ///
    /// Returns `false` when the job already reached a terminal state. The job
    /// moves to Cancelling here and to Cancelled once the worker observes the
    /// token.
    pub fn cancel(&self, job_id: &str) -> Result<bool> {
        let job = self.get_status(job_id)?;
        if job.state.is_terminal() {
            return Ok(false);
        }

        let token = {
            let tokens = self.cancel_tokens.lock().expect("cancel_tokens lock poisoned");
            tokens.get(job_id).cloned()
        };
        if let Some(token) = token {
            token.cancel();
        }
        self.tracker.set_state(job_id, JobState::Cancelling);
        info!("Requested cancellation of job {job_id}");
        Ok(true)
    }

    /// Drop finished jobs older than `ttl`; returns how many were evicted.
    pub fn evict_finished(&self, ttl: Duration) -> usize {
        let evicted = self.tracker.evict_finished(ttl);
        let mut tokens = self.cancel_tokens.lock().expect("cancel_tokens lock poisoned");
        let tracker = &self.tracker;
        tokens.retain(|id, _| tracker.get(id).is_some());
        evicted
    }

    /// Graceful shutdown: request cancellation of every non-terminal job.
    pub fn shutdown(&self) {
        let tokens: Vec<(String, CancellationToken)> = {
            let tokens = self.cancel_tokens.lock().expect("cancel_tokens lock poisoned");
            tokens.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
        };
        for (id, token) in tokens {
            if let Some(job) = self.tracker.get(&id) {
                if !job.state.is_terminal() {
                    token.cancel();
                    self.tracker.set_state(&id, JobState::Cancelling);
                }
            }
        }
    }
}

/// Execute one job's spec against the engine.
async fn run_job(
    engine: &InjectionEngine,
    tracker: &JobTracker,
    job_id: &str,
    spec: &JobSpec,
    token: &CancellationToken,
) -> Result<()> {
    match spec {
        JobSpec::SingleIssue {
            volume_id,
            issue_index,
        } => {
            engine
                .inject_issue_set(*volume_id, &[*issue_index], token, |r| {
                    tracker.push_result(job_id, r.clone())
                })
                .await?;
        }
        JobSpec::IssueSet {
            volume_id,
            issue_indices,
        } => {
            engine
                .inject_issue_set(*volume_id, issue_indices, token, |r| {
                    tracker.push_result(job_id, r.clone())
                })
                .await?;
        }
        JobSpec::Volume { volume_id } => {
            let results = engine
                .inject_volume(*volume_id, token, |r| {
                    tracker.push_result(job_id, r.clone())
                })
                .await?;
            tracker.set_issues_total(job_id, results.len());
        }
        JobSpec::VolumeSet { volume_ids } => {
            let mut attempted = 0usize;
            let mut total = 0usize;
            for &volume_id in volume_ids {
                token.check()?;
                match engine
                    .inject_volume(volume_id, token, |r| tracker.push_result(job_id, r.clone()))
                    .await
                {
                    Ok(results) => {
                        attempted += 1;
                        total += results.len();
                    }
                    // An unknown volume does not sink the rest of the set.
                    Err(e @ LongboxError::VolumeNotFound { .. }) => {
                        tracker.push_error(job_id, e.to_string());
                    }
                    Err(e) => return Err(e),
                }
            }
            tracker.set_issues_total(job_id, total);
            if attempted == 0 && !volume_ids.is_empty() {
                return Err(LongboxError::Other(
                    "no volume in the set could be loaded".to_string(),
                ));
            }
        }
    }
    Ok(())
}
