//! Native backend for zip-family containers (`.cbz`, `.zip`).

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

use crate::{LongboxError, Result};

fn open_archive(path: &Path) -> Result<ZipArchive<File>> {
    let file = File::open(path).map_err(|e| LongboxError::ArchiveUnreadable {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    ZipArchive::new(file).map_err(|e| LongboxError::ArchiveUnreadable {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

pub fn list_members(path: &Path) -> Result<Vec<String>> {
    let archive = open_archive(path)?;
    Ok(archive.file_names().map(|n| n.to_string()).collect())
}

pub fn read_member(path: &Path, member: &str) -> Result<Option<Vec<u8>>> {
    let mut archive = open_archive(path)?;

    let name = match archive
        .file_names()
        .find(|n| n.eq_ignore_ascii_case(member))
        .map(|n| n.to_string())
    {
        Some(name) => name,
        None => return Ok(None),
    };

    let mut entry = archive
        .by_name(&name)
        .map_err(|e| LongboxError::ArchiveUnreadable {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
    let mut content = Vec::with_capacity(entry.size() as usize);
    entry
        .read_to_end(&mut content)
        .map_err(|e| LongboxError::ArchiveUnreadable {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
    Ok(Some(content))
}

pub fn replace_or_insert_member(path: &Path, member: &str, content: &[u8]) -> Result<()> {
    let mut archive = open_archive(path)?;

    let parent = path.parent().ok_or_else(|| LongboxError::WriteFailed {
        path: path.to_path_buf(),
        reason: "archive path has no parent directory".to_string(),
    })?;

    // Temp file in the same directory so the final rename stays on one
    // filesystem and is atomic.
    let tmp = NamedTempFile::new_in(parent).map_err(|e| LongboxError::WriteFailed {
        path: path.to_path_buf(),
        reason: format!("failed to create temp file: {e}"),
    })?;
    let mut writer = ZipWriter::new(tmp);

    let write_err = |e: &dyn std::fmt::Display| LongboxError::WriteFailed {
        path: path.to_path_buf(),
        reason: e.to_string(),
    };

    // Stream every sibling entry unmodified; the target member (any case) is
    // dropped here and rewritten below, which keeps re-injection idempotent.
    for i in 0..archive.len() {
        let entry = archive.by_index_raw(i).map_err(|e| write_err(&e))?;
        if entry.name().eq_ignore_ascii_case(member) {
            debug!("Replacing existing member {} in {}", entry.name(), path.display());
            continue;
        }
        writer.raw_copy_file(entry).map_err(|e| write_err(&e))?;
    }

    writer
        .start_file(member, SimpleFileOptions::default())
        .map_err(|e| write_err(&e))?;
    writer.write_all(content).map_err(|e| write_err(&e))?;

    let tmp = writer.finish().map_err(|e| write_err(&e))?;
    tmp.persist(path).map_err(|e| LongboxError::WriteFailed {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    debug!("Rewrote {} with member {}", path.display(), member);
    Ok(())
}
