//! External-tool backend for rar-family containers (`.cbr`, `.rar`).
//!
//! The rar format cannot be rewritten in place by library code, so every
//! mutation is extract-all -> modify -> repack with the `rar` binary. If the
//! tool is not present the operation fails with `ArchiveToolUnavailable`,
//! which the injection engine reports per issue instead of aborting the job.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tempfile::TempDir;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::config::ArchiveConfig;
use crate::{LongboxError, Result};

#[derive(Debug)]
pub struct RarBackend {
    tool: PathBuf,
}

impl RarBackend {
    pub fn new(tool: Option<PathBuf>) -> Self {
        Self {
            tool: tool.unwrap_or_else(|| PathBuf::from(ArchiveConfig::RAR_TOOL)),
        }
    }

    /// Check for the external tool. Spawning is the only reliable check; a
    /// missing binary surfaces as a NotFound spawn error.
    pub async fn tool_available(&self) -> bool {
        Command::new(&self.tool)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .is_ok()
    }

    async fn require_tool(&self) -> Result<()> {
        if self.tool_available().await {
            Ok(())
        } else {
            Err(LongboxError::ArchiveToolUnavailable {
                format: "rar".to_string(),
            })
        }
    }

    async fn run(&self, args: &[&str], cwd: Option<&Path>) -> Result<Vec<u8>> {
        let mut cmd = Command::new(&self.tool);
        cmd.args(args).stdin(Stdio::null());
        if let Some(dir) = cwd {
            cmd.current_dir(dir);
        }
        let output = cmd
            .output()
            .await
            .map_err(|e| LongboxError::ArchiveToolUnavailable {
                format: format!("rar ({e})"),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(LongboxError::Other(format!(
                "rar tool exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }
        Ok(output.stdout)
    }

    pub async fn list_members(&self, path: &Path) -> Result<Vec<String>> {
        self.require_tool().await?;

        // `lb` prints one member name per line with no header.
        let stdout = self
            .run(&["lb", &path.to_string_lossy()], None)
            .await
            .map_err(|e| match e {
                LongboxError::Other(reason) => LongboxError::ArchiveUnreadable {
                    path: path.to_path_buf(),
                    reason,
                },
                other => other,
            })?;

        Ok(String::from_utf8_lossy(&stdout)
            .lines()
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .collect())
    }

    pub async fn read_member(&self, path: &Path, member: &str) -> Result<Option<Vec<u8>>> {
        let extracted = self.extract_all(path).await?;
        let Some(found) = find_member(extracted.path(), member)? else {
            return Ok(None);
        };
        let content = tokio::fs::read(&found)
            .await
            .map_err(|e| LongboxError::io_with_path(e, &found))?;
        Ok(Some(content))
    }

    pub async fn replace_or_insert_member(
        &self,
        path: &Path,
        member: &str,
        content: &[u8],
    ) -> Result<()> {
        let extracted = self.extract_all(path).await?;

        // Drop any existing copy regardless of case, then write ours.
        if let Some(existing) = find_member(extracted.path(), member)? {
            debug!("Removing existing member {} from {}", existing.display(), path.display());
            tokio::fs::remove_file(&existing)
                .await
                .map_err(|e| LongboxError::io_with_path(e, &existing))?;
        }
        let target = extracted.path().join(member);
        tokio::fs::write(&target, content)
            .await
            .map_err(|e| LongboxError::io_with_path(e, &target))?;

        self.repack(path, extracted.path()).await
    }

    async fn extract_all(&self, path: &Path) -> Result<TempDir> {
        self.require_tool().await?;

        let dir = TempDir::new().map_err(|e| LongboxError::Io {
            message: format!("failed to create extraction dir: {e}"),
            path: None,
            source: Some(e),
        })?;

        let archive = absolutize(path)?;
        self.run(
            &["x", "-o+", "-idq", &archive.to_string_lossy()],
            Some(dir.path()),
        )
        .await
        .map_err(|e| match e {
            LongboxError::Other(reason) => LongboxError::ArchiveUnreadable {
                path: path.to_path_buf(),
                reason,
            },
            other => other,
        })?;

        Ok(dir)
    }

    async fn repack(&self, path: &Path, extracted: &Path) -> Result<()> {
        let parent = path.parent().ok_or_else(|| LongboxError::WriteFailed {
            path: path.to_path_buf(),
            reason: "archive path has no parent directory".to_string(),
        })?;

        // Repack next to the original so the final rename is atomic.
        let staged = parent.join(format!(
            ".{}.repack.rar",
            path.file_name().unwrap_or_default().to_string_lossy()
        ));
        if staged.exists() {
            tokio::fs::remove_file(&staged).await.ok();
        }

        let staged_abs = absolutize(&staged)?;
        let result = self
            .run(
                &["a", "-r", "-ep1", "-idq", &staged_abs.to_string_lossy(), "."],
                Some(extracted),
            )
            .await;

        if let Err(e) = result {
            tokio::fs::remove_file(&staged).await.ok();
            return Err(LongboxError::WriteFailed {
                path: path.to_path_buf(),
                reason: e.to_string(),
            });
        }

        tokio::fs::rename(&staged, path).await.map_err(|e| {
            warn!("Failed to move repacked archive over {}: {}", path.display(), e);
            LongboxError::WriteFailed {
                path: path.to_path_buf(),
                reason: e.to_string(),
            }
        })?;

        debug!("Repacked {} via external rar tool", path.display());
        Ok(())
    }
}

/// Locate a member file under the extraction root, case-insensitively.
fn find_member(root: &Path, member: &str) -> Result<Option<PathBuf>> {
    for entry in walkdir::WalkDir::new(root).min_depth(1) {
        let entry = entry.map_err(|e| LongboxError::Io {
            message: format!("failed to walk extraction dir: {e}"),
            path: Some(root.to_path_buf()),
            source: None,
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(root)
            .unwrap_or(entry.path())
            .to_string_lossy()
            .replace('\\', "/");
        if relative.eq_ignore_ascii_case(member) {
            return Ok(Some(entry.path().to_path_buf()));
        }
    }
    Ok(None)
}

fn absolutize(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        let cwd = std::env::current_dir().map_err(LongboxError::from)?;
        Ok(cwd.join(path))
    }
}
