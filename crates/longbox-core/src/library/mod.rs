//! Volume cache: the external directory of volumes and their issue lists.
//!
//! The core reads volumes through the narrow [`VolumeStore`] trait and sends
//! best-effort per-issue status notifications back. [`SqliteVolumeStore`] is
//! the bundled implementation backed by a local SQLite database.

mod sqlite;
mod types;

use async_trait::async_trait;

use crate::Result;

pub use sqlite::SqliteVolumeStore;
pub use types::{Issue, IssueStatus, Volume};

/// Read side plus status notifications of the volume directory.
#[async_trait]
pub trait VolumeStore: Send + Sync {
    /// Fetch a volume with its ordered issue list. Fails with
    /// `VolumeNotFound` when the id is unknown.
    async fn get_volume(&self, volume_id: i64) -> Result<Volume>;

    /// Record the injection outcome for one issue. Best-effort: callers log
    /// failures and carry on.
    async fn mark_issue_status(
        &self,
        volume_id: i64,
        issue_index: usize,
        status: IssueStatus,
    ) -> Result<()>;
}
