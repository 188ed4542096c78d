//! Content fingerprints for files and directory trees using BLAKE3
//!
//! The fingerprint is embedded in blob names, so it is short (8 hex chars)
//! and filesystem-safe. It only detects change; integrity is the crypto
//! engine's job.

use crate::tree::walker::{Entry, Walker};
use blake3::Hasher;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io;
use std::path::Path;

/// Length of a content hash as embedded in blob names
pub const HASH_LEN: usize = 8;

/// Short content fingerprint
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentHash(String);

impl ContentHash {
    /// Wrap an existing fingerprint, validating its shape.
    ///
    /// Accepts exactly [`HASH_LEN`] ASCII alphanumerics, `-` or `_`, which
    /// also covers fingerprints written by older base64-style encoders.
    pub fn parse(s: &str) -> Option<Self> {
        let valid = s.len() == HASH_LEN
            && s
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
        valid.then(|| Self(s.to_string()))
    }

    fn from_digest(hasher: &Hasher) -> Self {
        let digest = hasher.finalize();
        let mut hex = hex::encode(digest.as_bytes());
        hex.truncate(HASH_LEN);
        Self(hex)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Compute the fingerprint of a file or directory
///
/// Symlinks at `path` itself are followed; symlinks inside a directory are
/// hashed by their target string.
pub fn content_hash(path: &Path) -> io::Result<ContentHash> {
    let metadata = fs::metadata(path)?;
    if metadata.is_dir() {
        directory_hash(path)
    } else {
        Ok(compute_content_hash(&fs::read(path)?))
    }
}

/// Compute the fingerprint of raw file bytes
pub fn compute_content_hash(content: &[u8]) -> ContentHash {
    let mut hasher = Hasher::new();
    hasher.update(content);
    ContentHash::from_digest(&hasher)
}

/// Compute the fingerprint of a directory subtree
///
/// hash = H("directory" || for each entry sorted by path:
///          tag || path_len || path || [content_len || content | target])
fn directory_hash(root: &Path) -> io::Result<ContentHash> {
    let mut hasher = Hasher::new();
    hasher.update(b"directory");

    for entry in Walker::new(root).walk()? {
        let rel = slash_path(entry.path());
        let rel_bytes = rel.as_bytes();
        match &entry {
            Entry::Directory { .. } => {
                hasher.update(b"d");
                update_len_prefixed(&mut hasher, rel_bytes);
            }
            Entry::File { path, .. } => {
                hasher.update(b"f");
                update_len_prefixed(&mut hasher, rel_bytes);
                let content = fs::read(root.join(path))?;
                update_len_prefixed(&mut hasher, &content);
            }
            Entry::Symlink { path } => {
                hasher.update(b"l");
                update_len_prefixed(&mut hasher, rel_bytes);
                let target = fs::read_link(root.join(path))?;
                update_len_prefixed(&mut hasher, slash_path(&target).as_bytes());
            }
        }
    }

    Ok(ContentHash::from_digest(&hasher))
}

fn update_len_prefixed(hasher: &mut Hasher, bytes: &[u8]) {
    // 8 bytes, big-endian for determinism
    hasher.update(&(bytes.len() as u64).to_be_bytes());
    hasher.update(bytes);
}

/// Relative path rendered with `/` separators
pub(crate) fn slash_path(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
