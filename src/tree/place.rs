//! Placing data at its final path: atomic writes, cross-filesystem moves,
//! removal and symlink creation.

use std::fs;
use std::io::{self, Write};
use std::path::Path;
use tracing::debug;

/// Prefix of in-flight temporary files written next to their destination
pub const TEMP_PREFIX: &str = ".dotvault-";

/// Suffix of in-flight temporary files written next to their destination
pub const TEMP_SUFFIX: &str = ".partial";

/// True for names produced by [`write_atomic`] while a write is in flight
pub fn is_temp_name(name: &str) -> bool {
    name.starts_with(TEMP_PREFIX) && name.ends_with(TEMP_SUFFIX)
}

/// Write bytes to `path` so that readers never observe a partial file
///
/// Writes to a temporary file in the destination directory, then renames it
/// over the destination. The temporary file is removed on every error path.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "path has no parent"))?;
    fs::create_dir_all(parent)?;

    let mut temp = tempfile::Builder::new()
        .prefix(TEMP_PREFIX)
        .suffix(TEMP_SUFFIX)
        .tempfile_in(parent)?;
    temp.write_all(bytes)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Remove a file, symlink or directory tree
pub fn remove_path(path: &Path) -> io::Result<()> {
    let metadata = fs::symlink_metadata(path)?;
    if metadata.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    }
}

/// Move a file or directory, falling back to copy-then-delete when a plain
/// rename is impossible (e.g. source and destination on different volumes).
///
/// The fallback copy is staged next to `to` and renamed into place, so `to`
/// never holds a partial copy.
pub fn move_path(from: &Path, to: &Path) -> io::Result<()> {
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent)?;
    }
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(e) => {
            debug!(from = ?from, to = ?to, error = %e, "rename failed, copying instead");
            copy_into_place(from, to)?;
            remove_path(from)
        }
    }
}

/// Copy `from` into a staging directory beside `to`, then rename it over `to`
fn copy_into_place(from: &Path, to: &Path) -> io::Result<()> {
    let parent = to
        .parent()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "path has no parent"))?;
    let staging = tempfile::Builder::new()
        .prefix(TEMP_PREFIX)
        .suffix(TEMP_SUFFIX)
        .tempdir_in(parent)?;
    let staged = staging.path().join("entry");
    copy_recursive(from, &staged)?;
    fs::rename(&staged, to)
}

fn copy_recursive(from: &Path, to: &Path) -> io::Result<()> {
    let metadata = fs::symlink_metadata(from)?;
    let file_type = metadata.file_type();
    if file_type.is_symlink() {
        let target = fs::read_link(from)?;
        symlink(&target, to)
    } else if file_type.is_dir() {
        fs::create_dir_all(to)?;
        for entry in fs::read_dir(from)? {
            let entry = entry?;
            copy_recursive(&entry.path(), &to.join(entry.file_name()))?;
        }
        fs::set_permissions(to, metadata.permissions())
    } else {
        fs::copy(from, to).map(|_| ())
    }
}

/// Create a symlink at `link` pointing to `target`
#[cfg(unix)]
pub fn symlink(target: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

/// Create a symlink at `link` pointing to `target`
#[cfg(windows)]
pub fn symlink(target: &Path, link: &Path) -> io::Result<()> {
    if target.is_dir() {
        std::os::windows::fs::symlink_dir(target, link)
    } else {
        std::os::windows::fs::symlink_file(target, link)
    }
}
