//! Result types reported by the injection engine.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Outcome of rewriting one archive file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileOutcome {
    /// Absolute path of the archive.
    pub path: PathBuf,
    pub success: bool,
    /// Failure description when `success` is false.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl FileOutcome {
    pub fn ok(path: PathBuf) -> Self {
        Self {
            path,
            success: true,
            message: None,
        }
    }

    pub fn failed(path: PathBuf, message: impl Into<String>) -> Self {
        Self {
            path,
            success: false,
            message: Some(message.into()),
        }
    }
}

/// Outcome of injecting metadata for one issue.
///
/// An issue succeeds only when every one of its archive files was rewritten;
/// file failures are independent, so a mixed outcome lists both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InjectionResult {
    pub volume_id: i64,
    pub issue_index: usize,
    /// Per-file outcomes, in the order the cache lists the files.
    pub files: Vec<FileOutcome>,
    pub success: bool,
    /// Failure description when `success` is false.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl InjectionResult {
    /// An issue that failed before any file was touched.
    pub fn failed(volume_id: i64, issue_index: usize, message: impl Into<String>) -> Self {
        Self {
            volume_id,
            issue_index,
            files: vec![],
            success: false,
            message: Some(message.into()),
        }
    }

    /// Build from per-file outcomes: success when non-empty and all succeeded.
    pub fn from_files(volume_id: i64, issue_index: usize, files: Vec<FileOutcome>) -> Self {
        let failed = files.iter().filter(|f| !f.success).count();
        let success = !files.is_empty() && failed == 0;
        let message = if files.is_empty() {
            Some("issue has no archive files".to_string())
        } else if failed > 0 {
            Some(format!("{failed} of {} files failed", files.len()))
        } else {
            None
        };
        Self {
            volume_id,
            issue_index,
            files,
            success,
            message,
        }
    }
}
