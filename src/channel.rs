//! Channels: named groups of dotfiles under the repository root
//!
//! A channel is rebuilt from disk on every open. Scanning classifies each
//! file through the blob name codec, collapses competing encrypted versions
//! into one active entry plus conflicts, and hides plain entries shadowed by
//! an encrypted entry of the same name.

use crate::blob::{classify, is_blob_candidate, BlobFile, Classified, EntryKind};
use crate::confirm::Confirm;
use crate::crypto::CryptoKey;
use crate::dotfile::{materialize, ChannelPaths, Dotfile};
use crate::error::DotfileError;
use crate::tree::hasher::slash_path;
use crate::tree::path::{absolutize, normalize_name};
use crate::tree::place::is_temp_name;
use crate::{detail, notice};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Which directories a scan descends into and which names it ignores
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanConfig {
    /// Channel-relative directories whose children are tracked individually
    pub check_dirs: Vec<String>,
    /// File or directory names skipped at every level
    pub exclude: Vec<String>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            check_dirs: vec![".config".to_string()],
            exclude: [".git", ".hg", ".svn", ".DS_Store"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl ScanConfig {
    /// True if the scan descends into the channel-relative directory `rel`
    ///
    /// Ancestors of a configured directory are descended into as well, so
    /// `.local/share` alone is enough to track entries below it.
    pub fn descends_into(&self, rel: &Path) -> bool {
        let rel = slash_path(rel);
        if rel.is_empty() {
            return true;
        }
        self.check_dirs.iter().any(|dir| {
            let dir = dir.trim_matches('/');
            dir == rel || dir.starts_with(&format!("{rel}/"))
        })
    }

    fn excludes(&self, name: &str) -> bool {
        self.exclude.iter().any(|e| e == name) || is_temp_name(name)
    }
}

/// An encrypted version that is not the active one
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictEntry {
    name: PathBuf,
    blob: BlobFile,
}

impl ConflictEntry {
    /// Logical name of the entry this version belongs to
    pub fn name(&self) -> &Path {
        &self.name
    }

    pub fn blob(&self) -> &BlobFile {
        &self.blob
    }

    /// Blob filename, the conflict's identity for lookups
    pub fn filename(&self) -> String {
        self.blob.name.encode()
    }

    pub fn kind(&self) -> EntryKind {
        self.blob.name.kind()
    }

    pub fn version_timestamp(&self) -> DateTime<Utc> {
        self.blob.name.timestamp()
    }

    /// Whether the blob carries the on-disk conflict marker
    pub fn is_marked(&self) -> bool {
        self.blob.name.is_conflict()
    }

    /// Decrypt this version to `dest` for manual comparison
    pub fn decrypt_to(&self, key: &CryptoKey, dest: &Path) -> Result<(), DotfileError> {
        materialize(&self.blob, key, dest)?;
        notice!(
            "conflict",
            "extract",
            "{} -> {}",
            self.blob.name,
            dest.display()
        );
        Ok(())
    }
}

/// Outcome of a bulk link or unlink
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BulkReport {
    /// Entries whose link state changed
    pub changed: Vec<PathBuf>,
    /// Entries skipped because of their link state, with the reason
    pub skipped: Vec<(PathBuf, String)>,
    /// The confirmation prompt was declined
    pub cancelled: bool,
}

/// Items found while walking a channel directory
#[derive(Default)]
struct ScanResult {
    plain: Vec<PathBuf>,
    active: BTreeMap<PathBuf, Vec<BlobFile>>,
    conflicts: Vec<ConflictEntry>,
}

/// A scanned channel
#[derive(Debug)]
pub struct Channel {
    paths: ChannelPaths,
    key: Option<CryptoKey>,
    scan: ScanConfig,
    dotfiles: BTreeMap<PathBuf, Dotfile>,
    conflicts: Vec<ConflictEntry>,
}

impl Channel {
    /// Scan the channel directory and build its index
    pub fn open(
        paths: ChannelPaths,
        key: Option<CryptoKey>,
        scan: ScanConfig,
    ) -> Result<Self, DotfileError> {
        if !paths.root.is_dir() {
            return Err(DotfileError::ChannelNotFound(paths.name.clone()));
        }

        let mut found = ScanResult::default();
        scan_dir(&scan, &paths.root, Path::new(""), &mut found)?;

        let mut channel = Self {
            paths,
            key,
            scan,
            dotfiles: BTreeMap::new(),
            conflicts: found.conflicts,
        };

        for (name, mut versions) in found.active {
            versions.sort_by(|a, b| {
                (a.name.timestamp(), a.name.encode()).cmp(&(b.name.timestamp(), b.name.encode()))
            });
            let newest = match versions.pop() {
                Some(blob) => blob,
                None => continue,
            };
            for stale in versions {
                notice!(
                    "scan",
                    "conflict",
                    "{}: {} is older than {}",
                    channel.paths.name,
                    stale.name,
                    newest.name
                );
                channel.conflicts.push(ConflictEntry {
                    name: name.clone(),
                    blob: stale,
                });
            }
            let dotfile = Dotfile::encrypted(&channel.paths, &name, newest, channel.key.clone())?;
            channel.dotfiles.insert(normalize_name(&name), dotfile);
        }

        for name in found.plain {
            let key = normalize_name(&name);
            if channel.dotfiles.contains_key(&key) {
                detail!(
                    "scan",
                    "hide",
                    "{}: plain {} shadowed by encrypted entry",
                    channel.paths.name,
                    name.display()
                );
                continue;
            }
            let dotfile = Dotfile::plain(&channel.paths, &name)?;
            channel.dotfiles.insert(key, dotfile);
        }

        channel.conflicts.sort_by(|a, b| {
            b.version_timestamp()
                .cmp(&a.version_timestamp())
                .then_with(|| a.filename().cmp(&b.filename()))
        });

        channel.sweep_orphan_links()?;

        detail!(
            "scan",
            "done",
            "{}: {} dotfiles, {} conflicts",
            channel.paths.name,
            channel.dotfiles.len(),
            channel.conflicts.len()
        );
        Ok(channel)
    }

    /// Remove dangling home links into this channel left by entries that no
    /// longer exist on disk
    ///
    /// Only the home directory itself and the configured check directories
    /// are inspected.
    fn sweep_orphan_links(&self) -> Result<(), DotfileError> {
        let roots = [
            absolutize(&self.paths.root)?,
            absolutize(&self.paths.decrypted_root)?,
        ];
        let dirs = std::iter::once(String::new()).chain(self.scan.check_dirs.iter().cloned());
        for dir in dirs {
            let home_dir = self.paths.home.join(dir.trim_matches('/'));
            let entries = match fs::read_dir(&home_dir) {
                Ok(entries) => entries,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };
            for entry in entries {
                let link = entry?.path();
                let Ok(target) = fs::read_link(&link) else {
                    continue;
                };
                let target = absolutize(&home_dir.join(target))?;
                let ours = roots.iter().any(|root| target.starts_with(root));
                if !ours || fs::symlink_metadata(&target).is_ok() {
                    continue;
                }
                fs::remove_file(&link)?;
                notice!(
                    "link_check",
                    "remove",
                    "{}: removed orphaned link {}",
                    self.paths.name,
                    link.display()
                );
            }
        }
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.paths.name
    }

    pub fn paths(&self) -> &ChannelPaths {
        &self.paths
    }

    pub fn key(&self) -> Option<&CryptoKey> {
        self.key.as_ref()
    }

    /// Entries ordered by logical name
    pub fn dotfiles(&self) -> impl Iterator<Item = &Dotfile> {
        self.dotfiles.values()
    }

    pub fn dotfiles_mut(&mut self) -> impl Iterator<Item = &mut Dotfile> {
        self.dotfiles.values_mut()
    }

    /// Conflicts, newest first
    pub fn conflicts(&self) -> &[ConflictEntry] {
        &self.conflicts
    }

    pub fn get_dotfile(&self, name: &Path) -> Option<&Dotfile> {
        self.dotfiles.get(&normalize_name(name))
    }

    pub fn get_dotfile_mut(&mut self, name: &Path) -> Option<&mut Dotfile> {
        self.dotfiles.get_mut(&normalize_name(name))
    }

    /// Look up a conflict by its literal blob filename
    pub fn get_conflict(&self, filename: &str) -> Option<&ConflictEntry> {
        self.conflicts.iter().find(|c| c.filename() == filename)
    }

    /// Link every unlinked entry after confirmation
    pub fn link_all(&mut self, force: bool, confirm: &dyn Confirm) -> Result<BulkReport, DotfileError> {
        let pending: Vec<PathBuf> = self
            .dotfiles
            .iter()
            .filter(|(_, d)| !d.is_linked())
            .map(|(k, _)| k.clone())
            .collect();
        let prompt = format!(
            "Link {} dotfile(s) from channel {}?",
            pending.len(),
            self.paths.name
        );
        self.bulk(pending, &prompt, confirm, |d| d.link(force))
    }

    /// Unlink every linked entry after confirmation
    pub fn unlink_all(&mut self, confirm: &dyn Confirm) -> Result<BulkReport, DotfileError> {
        let pending: Vec<PathBuf> = self
            .dotfiles
            .iter()
            .filter(|(_, d)| d.is_linked())
            .map(|(k, _)| k.clone())
            .collect();
        let prompt = format!(
            "Unlink {} dotfile(s) from channel {}?",
            pending.len(),
            self.paths.name
        );
        self.bulk(pending, &prompt, confirm, Dotfile::unlink)
    }

    fn bulk<F>(
        &mut self,
        pending: Vec<PathBuf>,
        prompt: &str,
        confirm: &dyn Confirm,
        mut action: F,
    ) -> Result<BulkReport, DotfileError>
    where
        F: FnMut(&mut Dotfile) -> Result<(), DotfileError>,
    {
        let mut report = BulkReport::default();
        if pending.is_empty() {
            return Ok(report);
        }

        for name in &pending {
            notice!("list", "pending", "{}: {}", self.paths.name, name.display());
        }
        if !confirm.confirm(prompt)? {
            report.cancelled = true;
            return Ok(report);
        }

        for name in pending {
            let Some(dotfile) = self.dotfiles.get_mut(&name) else {
                continue;
            };
            match action(dotfile) {
                Ok(()) => report.changed.push(name),
                Err(e) if e.is_link_state() => {
                    detail!("bulk", "skip", "{}: {}", name.display(), e);
                    report.skipped.push((name, e.to_string()));
                }
                Err(e) => return Err(e),
            }
        }
        Ok(report)
    }

    /// Start tracking `path` (a file or directory under home) in this channel
    pub fn init(&mut self, path: &Path, encrypted: bool) -> Result<&Dotfile, DotfileError> {
        let invalid = |reason: &str| DotfileError::SourceInvalid {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        };

        let source = absolutize(path)?;
        let home = absolutize(&self.paths.home)?;
        let rel = source
            .strip_prefix(&home)
            .map_err(|_| invalid("not inside the home directory"))?;
        if rel.as_os_str().is_empty() {
            return Err(invalid("is the home directory itself"));
        }

        let meta = fs::symlink_metadata(&source).map_err(|e| invalid(&e.to_string()))?;
        if meta.file_type().is_symlink() {
            return Err(invalid("is a symlink"));
        }
        if !meta.is_file() && !meta.is_dir() {
            return Err(invalid("not a regular file or directory"));
        }

        let name = normalize_name(rel);
        let file_name = name.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        if is_blob_candidate(file_name) {
            return Err(invalid("name looks like an encrypted blob"));
        }
        if self.scan.descends_into(&name) {
            return Err(invalid(
                "is a scanned directory (track the entries inside it instead)",
            ));
        }
        if let Some(parent) = name.parent() {
            if !self.scan.descends_into(parent) {
                return Err(invalid(
                    "parent directory is not scanned (add it to core.check_dirs)",
                ));
            }
        }
        if self.dotfiles.contains_key(&name) || fs::symlink_metadata(self.paths.root.join(&name)).is_ok()
        {
            return Err(DotfileError::AlreadyTracked(name));
        }

        let mut dotfile = if encrypted {
            if self.key.is_none() {
                return Err(DotfileError::MissingKey);
            }
            let kind = if meta.is_dir() {
                EntryKind::Directory
            } else {
                EntryKind::File
            };
            Dotfile::fresh_encrypted(&self.paths, &name, kind, self.key.clone())?
        } else {
            Dotfile::plain(&self.paths, &name)?
        };
        dotfile.init(&source)?;
        notice!(
            "init",
            "track",
            "{}: {}{}",
            self.paths.name,
            name.display(),
            if encrypted { " (encrypted)" } else { "" }
        );

        Ok(self.dotfiles.entry(name).or_insert(dotfile))
    }
}

fn scan_dir(
    scan: &ScanConfig,
    dir: &Path,
    rel: &Path,
    found: &mut ScanResult,
) -> Result<(), DotfileError> {
    let mut entries = fs::read_dir(dir)?.collect::<Result<Vec<_>, _>>()?;
    entries.sort_by_key(|e| e.file_name());

    for entry in entries {
        let file_name = entry.file_name();
        let Some(name) = file_name.to_str() else {
            tracing::warn!(path = ?entry.path(), "skipping non UTF-8 name");
            continue;
        };
        if scan.excludes(name) {
            continue;
        }

        let file_type = entry.file_type()?;
        let rel_path = rel.join(name);
        if file_type.is_symlink() {
            detail!("scan", "skip", "symlink {}", rel_path.display());
        } else if file_type.is_dir() {
            if scan.descends_into(&rel_path) {
                scan_dir(scan, &entry.path(), &rel_path, found)?;
            } else {
                found.plain.push(rel_path);
            }
        } else {
            match classify(name)? {
                Classified::Plain => found.plain.push(rel_path),
                Classified::Active(blob) => {
                    let logical = rel.join(blob.name());
                    found.active.entry(logical).or_default().push(BlobFile {
                        name: blob,
                        path: entry.path(),
                    });
                }
                Classified::Conflict(blob) => {
                    found.conflicts.push(ConflictEntry {
                        name: rel.join(blob.name()),
                        blob: BlobFile {
                            name: blob,
                            path: entry.path(),
                        },
                    });
                }
            }
        }
    }
    Ok(())
}
