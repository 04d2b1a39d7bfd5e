//! Write-then-replace file persistence.
//!
//! Content is staged in a temp file created next to the target (same
//! filesystem, so the final rename is atomic), synced, then renamed over
//! the target. Readers observe either the old file or the new one, never a
//! partial write.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Suffix appended to a file name to form its backup sibling
pub const BACKUP_SUFFIX: &str = "backup";

/// `tasks.checkpoint.json` -> `tasks.checkpoint.json.backup`
pub fn backup_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".");
    name.push(BACKUP_SUFFIX);
    path.with_file_name(name)
}

/// Directory that temp files for `path` are staged in
fn staging_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

/// Atomically replace `path` with `content`, creating parent directories.
pub fn atomic_write(path: &Path, content: &[u8]) -> io::Result<()> {
    let dir = staging_dir(path);
    fs::create_dir_all(dir)?;

    let mut staging = NamedTempFile::new_in(dir)?;
    staging.write_all(content)?;
    staging.as_file().sync_all()?;
    staging.persist(path).map_err(|e| e.error)?;

    Ok(())
}

/// Copy `path` over its backup sibling. Returns `false` when there is
/// nothing to back up.
pub fn copy_to_backup(path: &Path) -> io::Result<bool> {
    if !path.exists() {
        return Ok(false);
    }
    fs::copy(path, backup_path(path))?;
    Ok(true)
}
