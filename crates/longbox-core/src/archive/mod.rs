//! Archive adapter: read and rewrite comic archive containers.
//!
//! Two backends, selected by container extension:
//! - zip-family (`.cbz`, `.zip`) — rewritten natively with the `zip` crate;
//! - rar-family (`.cbr`, `.rar`) — extract/modify/repack through an external
//!   `rar` tool, since that format cannot be modified in place by library code.
//!
//! All rewrites are atomic: the new container is assembled in a temp file in
//! the same directory and renamed over the original, so a failure partway
//! through leaves the original archive unmodified. Sibling members are never
//! deleted, renamed, or reordered.

mod rar;
mod zip;

use std::path::{Path, PathBuf};

use crate::config::ArchiveConfig;
use crate::{LongboxError, Result};

pub use rar::RarBackend;

/// Container family of an archive file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    Zip,
    Rar,
}

impl ArchiveFormat {
    /// Determine the container family from the file extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        if ArchiveConfig::ZIP_EXTENSIONS.contains(&ext.as_str()) {
            Ok(ArchiveFormat::Zip)
        } else if ArchiveConfig::RAR_EXTENSIONS.contains(&ext.as_str()) {
            Ok(ArchiveFormat::Rar)
        } else {
            Err(LongboxError::ArchiveUnreadable {
                path: path.to_path_buf(),
                reason: format!("unsupported container extension: {ext:?}"),
            })
        }
    }
}

/// Dispatches archive operations to the backend for the container format.
#[derive(Debug)]
pub struct ArchiveAdapter {
    rar: RarBackend,
}

impl ArchiveAdapter {
    /// Create an adapter. `rar_tool` overrides the external tool used for
    /// rar-family containers; `None` uses [`ArchiveConfig::RAR_TOOL`] on PATH.
    pub fn new(rar_tool: Option<PathBuf>) -> Self {
        Self {
            rar: RarBackend::new(rar_tool),
        }
    }

    /// List member names of an archive.
    pub async fn list_members(&self, path: &Path) -> Result<Vec<String>> {
        match ArchiveFormat::from_path(path)? {
            ArchiveFormat::Zip => zip::list_members(path),
            ArchiveFormat::Rar => self.rar.list_members(path).await,
        }
    }

    /// Read one member's content, or `None` if the archive has no such member.
    ///
    /// Member name comparison is case-insensitive; existing libraries disagree
    /// on `ComicInfo.xml` vs `comicinfo.xml`.
    pub async fn read_member(&self, path: &Path, member: &str) -> Result<Option<Vec<u8>>> {
        match ArchiveFormat::from_path(path)? {
            ArchiveFormat::Zip => zip::read_member(path, member),
            ArchiveFormat::Rar => self.rar.read_member(path, member).await,
        }
    }

    /// Overwrite `member` if it exists (any case), append it otherwise.
    ///
    /// Every other member is preserved byte-for-byte. On failure the original
    /// archive is left untouched.
    pub async fn replace_or_insert_member(
        &self,
        path: &Path,
        member: &str,
        content: &[u8],
    ) -> Result<()> {
        match ArchiveFormat::from_path(path)? {
            ArchiveFormat::Zip => zip::replace_or_insert_member(path, member, content),
            ArchiveFormat::Rar => self.rar.replace_or_insert_member(path, member, content).await,
        }
    }

    /// Whether the archive already carries a metadata document.
    pub async fn has_comic_info(&self, path: &Path) -> Result<bool> {
        let members = self.list_members(path).await?;
        Ok(members
            .iter()
            .any(|m| m.eq_ignore_ascii_case(ArchiveConfig::METADATA_MEMBER)))
    }
}
