//! Filesystem helpers: path-reporting reads and atomic writes.
//!
//! Every failure carries the path it happened on. Writes go to a
//! temporary file in the destination directory and are moved into place
//! with a rename, so a crash mid-write never leaves a partial file
//! behind.

use std::fs;
use std::io::Write;
use std::path::Path;

use crate::error::{Error, Result};

pub fn read(path: impl AsRef<Path>) -> Result<Vec<u8>> {
    let path = path.as_ref();
    fs::read(path).map_err(|e| Error::io(path, e))
}

pub fn read_to_string(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    fs::read_to_string(path).map_err(|e| Error::io(path, e))
}

/// Atomically replaces `path` with `contents`.
pub fn write_atomic(path: impl AsRef<Path>, contents: &[u8]) -> Result<()> {
    write_atomic_with_mode(path.as_ref(), contents, None)
}

/// Atomically replaces `path` with `contents`, restricting the file to
/// its owner (0600). Used for private key material.
pub fn write_atomic_private(path: impl AsRef<Path>, contents: &[u8]) -> Result<()> {
    write_atomic_with_mode(path.as_ref(), contents, Some(0o600))
}

fn write_atomic_with_mode(path: &Path, contents: &[u8], mode: Option<u32>) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::Builder::new()
        .prefix(".certops-")
        .tempfile_in(dir)
        .map_err(|e| Error::io(path, e))?;
    tmp.write_all(contents).map_err(|e| Error::io(path, e))?;
    tmp.flush().map_err(|e| Error::io(path, e))?;

    #[cfg(unix)]
    if let Some(mode) = mode {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(tmp.path(), fs::Permissions::from_mode(mode))
            .map_err(|e| Error::io(path, e))?;
    }
    #[cfg(not(unix))]
    let _ = mode;

    tmp.persist(path)
        .map_err(|e| Error::io(path, e.error))?;
    Ok(())
}
