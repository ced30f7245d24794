//! All-or-nothing file writes
//!
//! Content goes to a hidden temp file next to the destination and is
//! renamed over it only once fully written and synced. If anything fails
//! the temp file is removed on drop and the destination is untouched.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use tempfile::NamedTempFile;

/// Owner read/write only
pub const PRIVATE_FILE_MODE: u32 = 0o600;
/// Owner read/write, everyone else read
pub const PUBLIC_FILE_MODE: u32 = 0o644;

/// Write `contents` to a temp file in `dir` without making it visible yet
pub fn stage(dir: &Path, contents: &[u8], mode: u32) -> io::Result<NamedTempFile> {
    let mut tmp = tempfile::Builder::new()
        .prefix(".pqfe-")
        .suffix(".tmp")
        .tempfile_in(dir)?;
    tmp.write_all(contents)?;
    tmp.as_file().sync_all()?;
    set_mode(tmp.path(), mode)?;
    Ok(tmp)
}

/// Move a staged file into place
pub fn commit(staged: NamedTempFile, path: &Path) -> io::Result<()> {
    staged.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Atomically replace `path` with `contents`
pub fn write_atomic(path: &Path, contents: &[u8], mode: u32) -> io::Result<()> {
    let dir = parent_dir(path);
    fs::create_dir_all(dir)?;
    commit(stage(dir, contents, mode)?, path)
}

pub(crate) fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32) -> io::Result<()> {
    Ok(())
}
