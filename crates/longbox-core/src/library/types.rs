//! Volume and issue descriptors.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// A volume: one comic series installment backed by a folder of archives.
///
/// Owned by the volume cache; the core treats it as read-only input and
/// fetches it once per job submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Volume {
    /// Externally assigned identifier.
    pub id: i64,
    /// Folder path relative to the configured comics root.
    pub folder: String,
    /// Ordered issue list; an issue's position is its stable identity.
    pub issues: Vec<Issue>,
}

impl Volume {
    pub fn issue(&self, index: usize) -> Option<&Issue> {
        self.issues.get(index)
    }
}

/// One numbered unit of a volume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    /// 0-based position within the volume's issue list. Unique within the
    /// volume and stable across calls within one job; resolver and engine use
    /// the same index for correlation.
    pub index: usize,
    /// Issue number as a string, preserved verbatim ("1", "2.5", "Annual 1").
    pub number: String,
    /// Candidate archive files, relative to the comics root. An issue may map
    /// to more than one physical file, e.g. a two-part scan.
    pub files: Vec<PathBuf>,
}

/// Per-issue outcome reported back to the volume cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueStatus {
    Injected,
    Failed,
}

impl IssueStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueStatus::Injected => "injected",
            IssueStatus::Failed => "failed",
        }
    }
}
