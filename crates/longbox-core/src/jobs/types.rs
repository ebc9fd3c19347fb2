//! Job records and lifecycle states.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::inject::InjectionResult;

/// Lifecycle state of a job.
///
/// Pending -> Running -> Completed | Failed, with a cancellation branch:
/// a cancel request moves the job to Cancelling, and the worker acknowledges
/// at the next issue boundary by moving it to Cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelling,
    Cancelled,
}

impl JobState {
    /// Terminal states never transition again.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobState::Completed | JobState::Failed | JobState::Cancelled
        )
    }
}

/// What a job injects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JobSpec {
    /// One issue of one volume.
    SingleIssue { volume_id: i64, issue_index: usize },
    /// Every issue of one volume.
    Volume { volume_id: i64 },
    /// Every issue of several volumes.
    VolumeSet { volume_ids: Vec<i64> },
    /// A subset of one volume's issues.
    IssueSet {
        volume_id: i64,
        issue_indices: Vec<usize>,
    },
}

impl JobSpec {
    /// Short human-readable description for logs.
    pub fn describe(&self) -> String {
        match self {
            JobSpec::SingleIssue {
                volume_id,
                issue_index,
            } => format!("volume {volume_id} issue {issue_index}"),
            JobSpec::Volume { volume_id } => format!("volume {volume_id}"),
            JobSpec::VolumeSet { volume_ids } => format!("{} volumes", volume_ids.len()),
            JobSpec::IssueSet {
                volume_id,
                issue_indices,
            } => format!("{} issues of volume {volume_id}", issue_indices.len()),
        }
    }

    /// Number of issues the job will attempt, when known before the volume
    /// cache is consulted.
    pub fn known_issue_count(&self) -> Option<usize> {
        match self {
            JobSpec::SingleIssue { .. } => Some(1),
            JobSpec::IssueSet { issue_indices, .. } => Some(issue_indices.len()),
            JobSpec::Volume { .. } | JobSpec::VolumeSet { .. } => None,
        }
    }
}

/// Snapshot of one injection job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub spec: JobSpec,
    pub state: JobState,
    /// Per-issue outcomes, appended as the worker progresses.
    pub results: Vec<InjectionResult>,
    /// Non-fatal job-level problems (e.g. an unknown volume in a set).
    pub errors: Vec<String>,
    /// Fatal error that moved the job to Failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Total issues the job will attempt, once known.
    pub issues_total: Option<usize>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl Job {
    pub fn new(spec: JobSpec) -> Self {
        let issues_total = spec.known_issue_count();
        Self {
            id: Uuid::new_v4().to_string(),
            spec,
            state: JobState::Pending,
            results: vec![],
            errors: vec![],
            error: None,
            issues_total,
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
        }
    }

    /// Number of issues attempted so far.
    pub fn issues_done(&self) -> usize {
        self.results.len()
    }
}
