//! The injection engine: resolve, synthesize, rewrite.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::archive::ArchiveAdapter;
use crate::cancel::CancellationToken;
use crate::catalog::CatalogClient;
use crate::comicinfo::{self, ComicInfo};
use crate::config::{ArchiveConfig, InjectorConfig};
use crate::library::{IssueStatus, Volume, VolumeStore};
use crate::resolver;
use crate::{LongboxError, Result};

use super::types::{FileOutcome, InjectionResult};

/// Drives metadata injection for issues of cached volumes.
///
/// The engine resolves each issue against the catalog, synthesizes a
/// `ComicInfo.xml` document, and rewrites every archive file of the issue.
/// Issue-scoped failures become failed [`InjectionResult`]s; only errors that
/// prevent any per-issue work (an unknown volume, cancellation) propagate.
pub struct InjectionEngine {
    store: Arc<dyn VolumeStore>,
    catalog: Arc<dyn CatalogClient>,
    archives: ArchiveAdapter,
    config: InjectorConfig,
}

impl InjectionEngine {
    pub fn new(
        store: Arc<dyn VolumeStore>,
        catalog: Arc<dyn CatalogClient>,
        config: InjectorConfig,
    ) -> Self {
        let archives = ArchiveAdapter::new(config.rar_tool.clone());
        Self {
            store,
            catalog,
            archives,
            config,
        }
    }

    pub fn config(&self) -> &InjectorConfig {
        &self.config
    }

    /// Inject metadata for one issue of an already-fetched volume.
    ///
    /// Resolution happens before any archive is opened, so a `NoMatch` leaves
    /// every file byte-identical. File rewrites are independent: one failing
    /// archive does not stop the issue's remaining files.
    pub async fn inject_issue(
        &self,
        volume: &Volume,
        issue_index: usize,
    ) -> Result<InjectionResult> {
        let record = match resolver::resolve(volume, issue_index, &*self.catalog, &self.config)
            .await
        {
            Ok(record) => record,
            Err(e) if e.is_issue_scoped() => {
                let result = InjectionResult::failed(volume.id, issue_index, e.to_string());
                // No status row for an index the volume does not have.
                if volume.issue(issue_index).is_some() {
                    self.record_status(volume.id, issue_index, &result).await;
                }
                return Ok(result);
            }
            Err(e) => return Err(e),
        };

        let issue = volume
            .issue(issue_index)
            .ok_or(LongboxError::IssueNotFound {
                volume_id: volume.id,
                issue_index,
            })?;

        let document = match self.synthesize(volume, &record, &issue.number) {
            Ok(bytes) => bytes,
            Err(e) if e.is_issue_scoped() => {
                let result = InjectionResult::failed(volume.id, issue_index, e.to_string());
                self.record_status(volume.id, issue_index, &result).await;
                return Ok(result);
            }
            Err(e) => return Err(e),
        };

        // One serialized document shared by every file of the issue.
        let mut files = Vec::with_capacity(issue.files.len());
        for file in &issue.files {
            let path = self.config.comics_root.join(file);
            match self
                .archives
                .replace_or_insert_member(&path, ArchiveConfig::METADATA_MEMBER, &document)
                .await
            {
                Ok(()) => {
                    debug!("Injected metadata into {}", path.display());
                    files.push(FileOutcome::ok(path));
                }
                Err(e) => {
                    warn!("Failed to rewrite {}: {e}", path.display());
                    files.push(FileOutcome::failed(path, e.to_string()));
                }
            }
        }

        let result = InjectionResult::from_files(volume.id, issue_index, files);
        self.record_status(volume.id, issue_index, &result).await;
        Ok(result)
    }

    /// Inject metadata for a subset of a volume's issues.
    ///
    /// `on_result` is invoked after each issue, whether it succeeded or not.
    /// Cancellation is checked between issues; an issue already started runs
    /// to completion so no archive is left half-written.
    pub async fn inject_issue_set(
        &self,
        volume_id: i64,
        issue_indices: &[usize],
        cancel: &CancellationToken,
        mut on_result: impl FnMut(&InjectionResult),
    ) -> Result<Vec<InjectionResult>> {
        let volume = self.store.get_volume(volume_id).await?;
        let mut results = Vec::with_capacity(issue_indices.len());
        for &index in issue_indices {
            cancel.check()?;
            let result = self.inject_issue(&volume, index).await?;
            on_result(&result);
            results.push(result);
        }
        info!(
            "Injected volume {volume_id}: {}/{} issues succeeded",
            results.iter().filter(|r| r.success).count(),
            results.len()
        );
        Ok(results)
    }

    /// Inject metadata for every issue of a volume.
    pub async fn inject_volume(
        &self,
        volume_id: i64,
        cancel: &CancellationToken,
        on_result: impl FnMut(&InjectionResult),
    ) -> Result<Vec<InjectionResult>> {
        let volume = self.store.get_volume(volume_id).await?;
        let indices: Vec<usize> = volume.issues.iter().map(|i| i.index).collect();
        self.inject_issue_set(volume_id, &indices, cancel, on_result)
            .await
    }

    /// Build and serialize the metadata document for one issue.
    fn synthesize(
        &self,
        volume: &Volume,
        record: &crate::catalog::CatalogMatch,
        issue_number: &str,
    ) -> Result<Vec<u8>> {
        let mut document = ComicInfo::build(record, issue_number)?;
        document.count = u32::try_from(volume.issues.len()).ok();
        comicinfo::serialize(&document)
    }

    /// Persist the per-issue status back to the cache; failures are logged
    /// and do not affect the injection outcome.
    async fn record_status(&self, volume_id: i64, issue_index: usize, result: &InjectionResult) {
        let status = if result.success {
            IssueStatus::Injected
        } else {
            IssueStatus::Failed
        };
        if let Err(e) = self
            .store
            .mark_issue_status(volume_id, issue_index, status)
            .await
        {
            warn!("Failed to record status for volume {volume_id} issue {issue_index}: {e}");
        }
    }
}
