//! Longbox Core - Headless library for comic archive metadata injection.
//!
//! This crate resolves the issues of a comic library against an online
//! catalog, synthesizes `ComicInfo.xml` metadata documents, and writes them
//! into the issues' archive files (`.cbz`/`.zip` natively, `.cbr`/`.rar`
//! through an external tool). Work runs as asynchronous jobs on a bounded
//! worker pool, with per-issue progress and cooperative cancellation.
//!
//! # Example
//!
//! ```rust,ignore
//! use longbox_core::{JobSpec, Longbox};
//!
//! #[tokio::main]
//! async fn main() -> longbox_core::Result<()> {
//!     let longbox = Longbox::new("/comics", "/comics/.longbox.sqlite", "cv-api-key")?;
//!
//!     let job_id = longbox.submit(JobSpec::Volume { volume_id: 42 });
//!     let job = longbox.get_status(&job_id)?;
//!     println!("job {} is {:?}", job.id, job.state);
//!
//!     Ok(())
//! }
//! ```

pub mod archive;
pub mod cancel;
pub mod catalog;
pub mod comicinfo;
pub mod config;
pub mod error;
pub mod inject;
pub mod jobs;
pub mod library;
pub mod resolver;

// Re-export commonly used types
pub use archive::{ArchiveAdapter, ArchiveFormat};
pub use cancel::CancellationToken;
pub use catalog::{CatalogClient, CatalogMatch, ComicVineClient, CreditEntry};
pub use comicinfo::ComicInfo;
pub use config::InjectorConfig;
pub use error::{LongboxError, Result};
pub use inject::{FileOutcome, InjectionEngine, InjectionResult};
pub use jobs::{Job, JobManager, JobSpec, JobState};
pub use library::{Issue, IssueStatus, SqliteVolumeStore, Volume, VolumeStore};
pub use resolver::TieBreak;

use std::path::Path;
use std::sync::Arc;

/// Main entry point wiring the volume cache, catalog client, injection
/// engine, and job manager together.
///
/// For finer control (a custom [`CatalogClient`], an alternative
/// [`VolumeStore`]), assemble an [`InjectionEngine`] and [`JobManager`]
/// directly; this facade only covers the common case.
pub struct Longbox {
    store: Arc<SqliteVolumeStore>,
    manager: JobManager,
}

impl Longbox {
    /// Open the volume cache at `db_path` and connect to the default catalog.
    pub fn new(
        comics_root: impl AsRef<Path>,
        db_path: impl AsRef<Path>,
        api_key: impl Into<String>,
    ) -> Result<Self> {
        Self::with_config(InjectorConfig::new(comics_root.as_ref()), db_path, api_key)
    }

    pub fn with_config(
        config: InjectorConfig,
        db_path: impl AsRef<Path>,
        api_key: impl Into<String>,
    ) -> Result<Self> {
        let store = Arc::new(SqliteVolumeStore::new(db_path)?);
        let catalog = Arc::new(ComicVineClient::new(api_key)?);
        let engine = InjectionEngine::new(store.clone(), catalog, config);
        Ok(Self {
            store,
            manager: JobManager::new(engine),
        })
    }

    /// The volume cache backing this instance.
    pub fn store(&self) -> &Arc<SqliteVolumeStore> {
        &self.store
    }

    /// Submit an injection job; returns its id immediately.
    pub fn submit(&self, spec: JobSpec) -> String {
        self.manager.submit(spec)
    }

    /// Get a snapshot of one job.
    pub fn get_status(&self, job_id: &str) -> Result<Job> {
        self.manager.get_status(job_id)
    }

    /// Request cancellation of a job; `false` if it already finished.
    pub fn cancel(&self, job_id: &str) -> Result<bool> {
        self.manager.cancel(job_id)
    }

    /// List all tracked jobs, newest first.
    pub fn list_jobs(&self) -> Vec<Job> {
        self.manager.list_jobs()
    }

    /// Drop finished jobs older than the configured TTL.
    pub fn evict_finished(&self) -> usize {
        self.manager.evict_finished(config::JobsConfig::FINISHED_JOB_TTL)
    }

    /// Graceful shutdown: request cancellation of every active job.
    pub fn shutdown(&self) {
        self.manager.shutdown();
    }
}
