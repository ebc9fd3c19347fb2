//! Centralized configuration for the injection core.
//!
//! Fixed operational constants live in const structs; per-deployment settings
//! (comics root, worker ceiling, tie-break policy) live in [`InjectorConfig`].

use std::path::PathBuf;
use std::time::Duration;

use crate::resolver::TieBreak;

/// Network-related configuration for the catalog client.
pub struct NetworkConfig;

impl NetworkConfig {
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
    /// Minimum delay between consecutive catalog requests.
    pub const CATALOG_RATE_DELAY: Duration = Duration::from_secs(1);
    pub const CATALOG_RETRY_ATTEMPTS: u32 = 2;
    pub const CATALOG_RETRY_DELAY: Duration = Duration::from_secs(5);
    pub const COMICVINE_API_BASE: &'static str = "https://comicvine.gamespot.com/api";
    pub const SEARCH_LIMIT: u32 = 20;
    pub const USER_AGENT: &'static str = "longbox/0.1";
}

/// Archive container configuration.
pub struct ArchiveConfig;

impl ArchiveConfig {
    /// Well-known member name for the embedded metadata document.
    pub const METADATA_MEMBER: &'static str = "ComicInfo.xml";
    /// Container extensions handled by the native zip backend.
    pub const ZIP_EXTENSIONS: [&'static str; 2] = ["cbz", "zip"];
    /// Container extensions handled by the external-tool rar backend.
    pub const RAR_EXTENSIONS: [&'static str; 2] = ["cbr", "rar"];
    /// Default name of the external rar tool looked up on PATH.
    pub const RAR_TOOL: &'static str = "rar";
}

/// Job orchestration configuration.
pub struct JobsConfig;

impl JobsConfig {
    /// Default ceiling for concurrently running jobs.
    pub const DEFAULT_MAX_CONCURRENT: usize = 2;
    /// Age after which finished jobs are eligible for eviction.
    pub const FINISHED_JOB_TTL: Duration = Duration::from_secs(24 * 60 * 60);
}

/// Per-deployment settings for the injection engine.
#[derive(Debug, Clone)]
pub struct InjectorConfig {
    /// Root directory the volume cache's folder paths are relative to.
    pub comics_root: PathBuf,
    /// Maximum number of jobs running at once; extra jobs queue in pending.
    pub max_concurrent_jobs: usize,
    /// Policy for catalog candidates still tied after the year heuristic.
    pub tie_break: TieBreak,
    /// Override for the external rar tool; `None` uses [`ArchiveConfig::RAR_TOOL`].
    pub rar_tool: Option<PathBuf>,
}

impl InjectorConfig {
    pub fn new(comics_root: impl Into<PathBuf>) -> Self {
        Self {
            comics_root: comics_root.into(),
            max_concurrent_jobs: JobsConfig::DEFAULT_MAX_CONCURRENT,
            tie_break: TieBreak::default(),
            rar_tool: None,
        }
    }

    pub fn with_max_concurrent_jobs(mut self, ceiling: usize) -> Self {
        self.max_concurrent_jobs = ceiling.max(1);
        self
    }

    pub fn with_tie_break(mut self, tie_break: TieBreak) -> Self {
        self.tie_break = tie_break;
        self
    }

    pub fn with_rar_tool(mut self, tool: impl Into<PathBuf>) -> Self {
        self.rar_tool = Some(tool.into());
        self
    }
}
