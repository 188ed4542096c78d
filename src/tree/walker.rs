//! Filesystem walker for traversing tracked directory subtrees

use std::io;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Filesystem entry types, with paths relative to the walk root
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    /// A regular file and its size
    File { path: PathBuf, size: u64 },
    /// A directory
    Directory { path: PathBuf },
    /// A symbolic link (never followed)
    Symlink { path: PathBuf },
}

impl Entry {
    /// Path relative to the walk root
    pub fn path(&self) -> &Path {
        match self {
            Entry::File { path, .. } | Entry::Directory { path } | Entry::Symlink { path } => path,
        }
    }
}

/// Filesystem walker configuration
#[derive(Debug, Clone, Default)]
pub struct WalkerConfig {
    /// Component names to skip entirely (e.g. ".git")
    pub ignore_patterns: Vec<String>,
    /// Maximum depth to traverse (None = unlimited)
    pub max_depth: Option<usize>,
}

/// Filesystem walker
///
/// Symlinks are reported, never followed, so a tracked directory hashes and
/// packs the same regardless of what its links point at.
pub struct Walker {
    root: PathBuf,
    config: WalkerConfig,
}

impl Walker {
    /// Create a new walker for the given root path
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            config: WalkerConfig::default(),
        }
    }

    /// Create a walker with custom configuration
    pub fn with_config(root: impl Into<PathBuf>, config: WalkerConfig) -> Self {
        Self {
            root: root.into(),
            config,
        }
    }

    /// Walk the subtree and collect all entries below the root
    ///
    /// Returns entries sorted by relative path for determinism.
    pub fn walk(&self) -> io::Result<Vec<Entry>> {
        let mut entries = Vec::new();

        let walker = WalkDir::new(&self.root)
            .follow_links(false)
            .min_depth(1)
            .max_depth(self.config.max_depth.unwrap_or(usize::MAX))
            .into_iter()
            .filter_entry(|e| !self.should_ignore(e));

        for entry in walker {
            let entry = entry.map_err(|e| {
                io::Error::new(
                    io::ErrorKind::Other,
                    format!("Failed to walk directory {:?}: {}", self.root, e),
                )
            })?;

            let relative = entry
                .path()
                .strip_prefix(&self.root)
                .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?
                .to_path_buf();

            let file_type = entry.file_type();
            if file_type.is_symlink() {
                entries.push(Entry::Symlink { path: relative });
            } else if file_type.is_dir() {
                entries.push(Entry::Directory { path: relative });
            } else if file_type.is_file() {
                let metadata = entry.metadata().map_err(|e| {
                    io::Error::new(
                        io::ErrorKind::Other,
                        format!("Failed to read metadata for {:?}: {}", entry.path(), e),
                    )
                })?;
                entries.push(Entry::File {
                    path: relative,
                    size: metadata.len(),
                });
            }
        }

        entries.sort_by(|a, b| a.path().cmp(b.path()));
        Ok(entries)
    }

    fn should_ignore(&self, entry: &DirEntry) -> bool {
        let name = entry.file_name().to_string_lossy();
        self.config
            .ignore_patterns
            .iter()
            .any(|pattern| pattern.as_str() == name)
    }
}
