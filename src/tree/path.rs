//! Path canonicalization and normalization utilities

use std::io;
use std::path::{Component, Path, PathBuf};
use unicode_normalization::UnicodeNormalization;

/// Canonicalize a path (resolves symlinks, `..`, `.`)
///
/// Uses dunce so Windows paths stay in their familiar form.
pub fn canonicalize_path(path: &Path) -> io::Result<PathBuf> {
    dunce::canonicalize(path)
}

/// Normalize a logical entry name for comparison
///
/// Unicode is normalized to NFC and `.` components are dropped, so names read
/// back from a filesystem that stores decomposed forms still match.
pub fn normalize_name(name: &Path) -> PathBuf {
    name.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .map(|c| c.as_os_str().to_string_lossy().nfc().collect::<String>())
        .collect()
}

/// Make a path absolute against the current directory without touching
/// symlinks, and fold `.`/`..` lexically.
pub fn absolutize(path: &Path) -> io::Result<PathBuf> {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };

    let mut out = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    Ok(out)
}

/// True if `link` is a symlink that resolves to the same object as `target`
pub fn points_to(link: &Path, target: &Path) -> bool {
    let is_symlink = link
        .symlink_metadata()
        .map(|m| m.file_type().is_symlink())
        .unwrap_or(false);
    if !is_symlink {
        return false;
    }
    match (canonicalize_path(link), canonicalize_path(target)) {
        (Ok(resolved), Ok(expected)) => resolved == expected,
        _ => false,
    }
}
