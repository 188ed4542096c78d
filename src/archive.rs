//! Directory archives
//!
//! Packs a directory subtree into a single bincode-encoded byte stream so it
//! can be encrypted as one blob, and unpacks such a stream into a fresh
//! directory. Relative paths, file bytes, unix permission bits and symlinks
//! survive the round trip.

use crate::error::ArchiveError;
use crate::tree::hasher::slash_path;
use crate::tree::walker::{Entry, Walker};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Component, Path, PathBuf};

/// Current archive format version
const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct Archive {
    version: u32,
    entries: Vec<ArchiveEntry>,
}

/// One archived filesystem object; paths are relative and `/`-separated
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArchiveEntry {
    Directory {
        path: String,
        mode: Option<u32>,
    },
    File {
        path: String,
        mode: Option<u32>,
        data: Vec<u8>,
    },
    Symlink {
        path: String,
        target: String,
    },
}

impl ArchiveEntry {
    pub fn path(&self) -> &str {
        match self {
            ArchiveEntry::Directory { path, .. }
            | ArchiveEntry::File { path, .. }
            | ArchiveEntry::Symlink { path, .. } => path,
        }
    }
}

/// Pack the contents of `dir` into a byte stream
pub fn pack(dir: &Path) -> Result<Vec<u8>, ArchiveError> {
    if !dir.is_dir() {
        return Err(ArchiveError::NotADirectory(dir.to_path_buf()));
    }

    let mut entries = Vec::new();
    for entry in Walker::new(dir).walk()? {
        let full = dir.join(entry.path());
        let path = slash_path(entry.path());
        entries.push(match entry {
            Entry::Directory { .. } => ArchiveEntry::Directory {
                path,
                mode: mode_of(&full)?,
            },
            Entry::File { .. } => ArchiveEntry::File {
                path,
                mode: mode_of(&full)?,
                data: fs::read(&full)?,
            },
            Entry::Symlink { .. } => ArchiveEntry::Symlink {
                path,
                target: fs::read_link(&full)?.to_string_lossy().into_owned(),
            },
        });
    }

    bincode::serialize(&Archive {
        version: FORMAT_VERSION,
        entries,
    })
    .map_err(|e| ArchiveError::Encoding(e.to_string()))
}

/// Unpack a byte stream produced by [`pack`] into `dest`
///
/// `dest` is created if missing. Entries may arrive in any order; parent
/// directories are created on demand. Absolute and `..` paths, and paths
/// nested under an archived symlink, are rejected before anything is written.
pub fn unpack(bytes: &[u8], dest: &Path) -> Result<(), ArchiveError> {
    let archive: Archive =
        bincode::deserialize(bytes).map_err(|e| ArchiveError::Encoding(e.to_string()))?;
    if archive.version != FORMAT_VERSION {
        return Err(ArchiveError::UnsupportedVersion(archive.version));
    }

    let resolved = archive
        .entries
        .iter()
        .map(|entry| safe_join(dest, entry.path()).map(|target| (entry, target)))
        .collect::<Result<Vec<_>, _>>()?;
    reject_paths_under_symlinks(&archive.entries)?;

    fs::create_dir_all(dest)?;
    let mut dir_modes = Vec::new();

    for (entry, target) in resolved {
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        match entry {
            ArchiveEntry::Directory { mode, .. } => {
                fs::create_dir_all(&target)?;
                // Directory modes are applied last so read-only dirs can still be filled.
                if let Some(mode) = mode {
                    dir_modes.push((target, *mode));
                }
            }
            ArchiveEntry::File { mode, data, .. } => {
                fs::write(&target, data)?;
                if let Some(mode) = mode {
                    set_mode(&target, *mode)?;
                }
            }
            ArchiveEntry::Symlink { target: link_target, .. } => {
                restore_symlink(Path::new(link_target), &target)?;
            }
        }
    }

    dir_modes.sort_by(|a, b| b.0.cmp(&a.0));
    for (path, mode) in dir_modes {
        set_mode(&path, mode)?;
    }
    Ok(())
}

fn safe_join(dest: &Path, relative: &str) -> Result<PathBuf, ArchiveError> {
    let rel = Path::new(relative);
    let is_safe = !relative.is_empty()
        && rel
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    if !is_safe {
        return Err(ArchiveError::UnsafePath(relative.to_string()));
    }
    Ok(dest.join(rel))
}

fn normalized(relative: &str) -> PathBuf {
    Path::new(relative)
        .components()
        .filter(|c| matches!(c, Component::Normal(_)))
        .collect()
}

/// An entry below an archived symlink would be written through that link
fn reject_paths_under_symlinks(entries: &[ArchiveEntry]) -> Result<(), ArchiveError> {
    let links: BTreeSet<PathBuf> = entries
        .iter()
        .filter(|e| matches!(e, ArchiveEntry::Symlink { .. }))
        .map(|e| normalized(e.path()))
        .collect();
    if links.is_empty() {
        return Ok(());
    }
    for entry in entries {
        let path = normalized(entry.path());
        if path.ancestors().skip(1).any(|a| links.contains(a)) {
            return Err(ArchiveError::UnsafePath(entry.path().to_string()));
        }
    }
    Ok(())
}

#[cfg(unix)]
fn mode_of(path: &Path) -> std::io::Result<Option<u32>> {
    use std::os::unix::fs::PermissionsExt;
    Ok(Some(fs::symlink_metadata(path)?.permissions().mode() & 0o7777))
}

#[cfg(not(unix))]
fn mode_of(_path: &Path) -> std::io::Result<Option<u32>> {
    Ok(None)
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32) -> std::io::Result<()> {
    Ok(())
}

#[cfg(unix)]
fn restore_symlink(target: &Path, link: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(not(unix))]
fn restore_symlink(target: &Path, link: &Path) -> std::io::Result<()> {
    tracing::warn!(link = ?link, target = ?target, "symlinks are not restored on this platform");
    Ok(())
}
