//! Dotfile entries and their link state machine
//!
//! A [`Dotfile`] is one logical tracked item of a channel. Plain entries link
//! the home path straight at the file or directory inside the channel.
//! Encrypted entries keep their source of truth in a blob and link the home
//! path at a decrypted working copy that is rebuilt on demand.

use crate::archive;
use crate::blob::{now_timestamp, BlobFile, BlobName, EntryKind};
use crate::crypto::{self, CryptoKey};
use crate::error::{DotfileError, ParseError};
use crate::tree::hasher::{content_hash, ContentHash};
use crate::tree::path::points_to;
use crate::tree::place::{move_path, remove_path, symlink, write_atomic};
use crate::{detail, notice};
use chrono::{DateTime, Utc};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use zeroize::Zeroizing;

/// Filesystem locations shared by every entry of one channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelPaths {
    /// Channel name (directory name under the repository root)
    pub name: String,
    /// Channel directory
    pub root: PathBuf,
    /// Home directory links are placed under
    pub home: PathBuf,
    /// Directory holding this channel's decrypted working copies
    pub decrypted_root: PathBuf,
}

impl ChannelPaths {
    pub fn new(
        name: impl Into<String>,
        root: impl Into<PathBuf>,
        home: impl Into<PathBuf>,
        decrypted_dir: &Path,
    ) -> Self {
        let name = name.into();
        Self {
            decrypted_root: decrypted_dir.join(&name),
            name,
            root: root.into(),
            home: home.into(),
        }
    }
}

/// Link state of an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Linked,
    Unlinked,
}

/// Whether an encrypted entry's working copy matches its blob
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Synced,
    Stale,
}

/// Encrypted variant data
#[derive(Debug, Clone)]
struct EncryptedEntry {
    kind: EntryKind,
    /// `None` while the entry is being initialized from plaintext
    blob: Option<BlobFile>,
    working_copy: PathBuf,
    key: Option<CryptoKey>,
}

#[derive(Debug, Clone)]
enum Variant {
    Plain { source: PathBuf },
    Encrypted(EncryptedEntry),
}

/// One tracked entry
#[derive(Debug, Clone)]
pub struct Dotfile {
    name: PathBuf,
    channel: String,
    channel_root: PathBuf,
    link_path: PathBuf,
    variant: Variant,
}

/// What has to happen at the link path before the symlink can be created
enum LinkPreflight {
    Clear,
    ReplaceSymlink,
    RemoveExisting,
}

impl Dotfile {
    /// Plain entry stored as-is at `<channel>/<name>`
    pub fn plain(paths: &ChannelPaths, name: impl Into<PathBuf>) -> Result<Self, DotfileError> {
        let name = name.into();
        let source = paths.root.join(&name);
        Self::build(paths, name, Variant::Plain { source })
    }

    /// Encrypted entry backed by an existing blob
    pub fn encrypted(
        paths: &ChannelPaths,
        name: impl Into<PathBuf>,
        blob: BlobFile,
        key: Option<CryptoKey>,
    ) -> Result<Self, DotfileError> {
        let name = name.into();
        let variant = Variant::Encrypted(EncryptedEntry {
            kind: blob.name.kind(),
            working_copy: paths.decrypted_root.join(&name),
            blob: Some(blob),
            key,
        });
        Self::build(paths, name, variant)
    }

    /// Encrypted entry with no blob yet, about to be initialized
    pub fn fresh_encrypted(
        paths: &ChannelPaths,
        name: impl Into<PathBuf>,
        kind: EntryKind,
        key: Option<CryptoKey>,
    ) -> Result<Self, DotfileError> {
        let name = name.into();
        let variant = Variant::Encrypted(EncryptedEntry {
            kind,
            working_copy: paths.decrypted_root.join(&name),
            blob: None,
            key,
        });
        Self::build(paths, name, variant)
    }

    fn build(paths: &ChannelPaths, name: PathBuf, variant: Variant) -> Result<Self, DotfileError> {
        let dotfile = Self {
            link_path: paths.home.join(&name),
            channel: paths.name.clone(),
            channel_root: paths.root.clone(),
            name,
            variant,
        };
        dotfile.heal_link()?;
        Ok(dotfile)
    }

    /// Remove a home symlink that is orphaned or points somewhere else
    fn heal_link(&self) -> Result<(), DotfileError> {
        let is_symlink = fs::symlink_metadata(&self.link_path)
            .map(|m| m.file_type().is_symlink())
            .unwrap_or(false);
        if !is_symlink || self.is_linked() {
            return Ok(());
        }
        fs::remove_file(&self.link_path)?;
        notice!(
            "link_check",
            "remove",
            "{}: removed orphaned link {}",
            self.channel,
            self.link_path.display()
        );
        Ok(())
    }

    /// Logical name relative to the channel root
    pub fn name(&self) -> &Path {
        &self.name
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub fn link_path(&self) -> &Path {
        &self.link_path
    }

    pub fn is_encrypted(&self) -> bool {
        matches!(self.variant, Variant::Encrypted(_))
    }

    pub fn kind(&self) -> EntryKind {
        match &self.variant {
            Variant::Plain { source } if source.is_dir() => EntryKind::Directory,
            Variant::Plain { .. } => EntryKind::File,
            Variant::Encrypted(enc) => enc.kind,
        }
    }

    /// Canonical data inside the channel: the plain object or the blob file
    pub fn source_path(&self) -> Option<&Path> {
        match &self.variant {
            Variant::Plain { source } => Some(source),
            Variant::Encrypted(enc) => enc.blob.as_ref().map(|b| b.path.as_path()),
        }
    }

    pub fn blob(&self) -> Option<&BlobFile> {
        match &self.variant {
            Variant::Encrypted(enc) => enc.blob.as_ref(),
            Variant::Plain { .. } => None,
        }
    }

    /// Hash of the last-encrypted plaintext
    pub fn content_hash(&self) -> Option<&ContentHash> {
        self.blob().map(|b| b.name.hash())
    }

    /// Creation time of the current encrypted version
    pub fn version_timestamp(&self) -> Option<DateTime<Utc>> {
        self.blob().map(|b| b.name.timestamp())
    }

    /// Decrypted working copy location
    pub fn working_copy(&self) -> Option<&Path> {
        match &self.variant {
            Variant::Encrypted(enc) => Some(&enc.working_copy),
            Variant::Plain { .. } => None,
        }
    }

    /// What the home symlink must point at
    pub fn link_target(&self) -> &Path {
        match &self.variant {
            Variant::Plain { source } => source,
            Variant::Encrypted(enc) => &enc.working_copy,
        }
    }

    pub fn is_linked(&self) -> bool {
        points_to(&self.link_path, self.link_target())
    }

    pub fn link_state(&self) -> LinkState {
        if self.is_linked() {
            LinkState::Linked
        } else {
            LinkState::Unlinked
        }
    }

    /// Synced/stale for encrypted entries, `None` for plain ones
    pub fn sync_state(&self) -> Result<Option<SyncState>, DotfileError> {
        if !self.is_encrypted() {
            return Ok(None);
        }
        Ok(Some(if self.is_changed()? {
            SyncState::Stale
        } else {
            SyncState::Synced
        }))
    }

    fn encrypted_mut(&mut self) -> Result<&mut EncryptedEntry, DotfileError> {
        match &mut self.variant {
            Variant::Encrypted(enc) => Ok(enc),
            Variant::Plain { .. } => Err(DotfileError::NotEncrypted(self.name.clone())),
        }
    }

    fn encrypted_ref(&self) -> Result<&EncryptedEntry, DotfileError> {
        match &self.variant {
            Variant::Encrypted(enc) => Ok(enc),
            Variant::Plain { .. } => Err(DotfileError::NotEncrypted(self.name.clone())),
        }
    }

    fn preflight(&self, force: bool) -> Result<LinkPreflight, DotfileError> {
        if self.is_linked() {
            return Err(DotfileError::AlreadyLinked(self.link_path.clone()));
        }
        match fs::symlink_metadata(&self.link_path) {
            Ok(meta) if meta.file_type().is_symlink() => Ok(LinkPreflight::ReplaceSymlink),
            Ok(_) if force => Ok(LinkPreflight::RemoveExisting),
            Ok(_) => Err(DotfileError::LinkTargetExists(self.link_path.clone())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(LinkPreflight::Clear),
            Err(e) => Err(e.into()),
        }
    }

    /// Create the home symlink, decrypting first for encrypted entries
    pub fn link(&mut self, force: bool) -> Result<(), DotfileError> {
        let preflight = self.preflight(force)?;

        if self.is_encrypted() {
            self.decrypt()?;
        }

        match preflight {
            LinkPreflight::Clear => {}
            LinkPreflight::ReplaceSymlink => {
                fs::remove_file(&self.link_path)?;
                detail!("link", "replace", "{}", self.link_path.display());
            }
            LinkPreflight::RemoveExisting => {
                remove_path(&self.link_path)?;
                notice!("link", "overwrite", "{}", self.link_path.display());
            }
        }

        if let Some(parent) = self.link_path.parent() {
            fs::create_dir_all(parent)?;
        }
        symlink(self.link_target(), &self.link_path)?;
        notice!(
            "link",
            "create",
            "{}: {} -> {}",
            self.channel,
            self.link_path.display(),
            self.link_target().display()
        );
        Ok(())
    }

    /// Remove the home symlink, and the working copy of encrypted entries
    pub fn unlink(&mut self) -> Result<(), DotfileError> {
        if !self.is_linked() {
            notice!("unlink", "skip", "{}: not linked", self.link_path.display());
            return Err(DotfileError::NotLinked(self.link_path.clone()));
        }

        fs::remove_file(&self.link_path)?;
        if let Variant::Encrypted(enc) = &self.variant {
            if fs::symlink_metadata(&enc.working_copy).is_ok() {
                remove_path(&enc.working_copy)?;
                detail!("unlink", "remove", "{}", enc.working_copy.display());
            }
        }
        notice!(
            "unlink",
            "remove",
            "{}: {}",
            self.channel,
            self.link_path.display()
        );
        Ok(())
    }

    /// Rebuild the working copy from the current blob
    pub fn decrypt(&self) -> Result<(), DotfileError> {
        let enc = self.encrypted_ref()?;
        self.decrypt_to(&enc.working_copy)
    }

    /// Decrypt the current blob to an arbitrary destination
    pub fn decrypt_to(&self, dest: &Path) -> Result<(), DotfileError> {
        let enc = self.encrypted_ref()?;
        let blob = enc
            .blob
            .as_ref()
            .ok_or_else(|| DotfileError::MissingBlob(self.name.clone()))?;
        let key = enc.key.as_ref().ok_or(DotfileError::MissingKey)?;
        materialize(blob, key, dest)?;
        detail!("decrypt", "write", "{} -> {}", blob.name, dest.display());
        Ok(())
    }

    /// Encrypt `src` into a new blob for this entry
    pub fn encrypt(&mut self, src: &Path, force: bool) -> Result<(), DotfileError> {
        let meta = fs::metadata(src).map_err(|e| DotfileError::SourceInvalid {
            path: src.to_path_buf(),
            reason: e.to_string(),
        })?;
        let kind = if meta.is_dir() {
            EntryKind::Directory
        } else {
            EntryKind::File
        };

        let file_name = self
            .name
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| ParseError::EntryName(self.name.display().to_string()))?
            .to_string();
        let blob_dir = match self.name.parent() {
            Some(parent) => self.channel_root.join(parent),
            None => self.channel_root.clone(),
        };

        let enc = self.encrypted_ref()?;
        let key = enc.key.as_ref().ok_or(DotfileError::MissingKey)?;

        let hash = content_hash(src)?;
        let blob_name = BlobName::new(&file_name, kind, hash, now_timestamp())?;
        let blob = BlobFile::in_dir(&blob_dir, blob_name);
        if !force && fs::symlink_metadata(&blob.path).is_ok() {
            return Err(DotfileError::BlobExists(blob.path));
        }

        let plaintext = match kind {
            EntryKind::File => Zeroizing::new(fs::read(src)?),
            EntryKind::Directory => Zeroizing::new(archive::pack(src)?),
        };
        let token = crypto::encrypt(&plaintext, key)?;
        write_atomic(&blob.path, &token)?;
        notice!("encrypt", "write", "{}: {}", self.channel, blob.name);

        let enc = self.encrypted_mut()?;
        enc.kind = kind;
        enc.blob = Some(blob);
        Ok(())
    }

    /// True if the working copy differs from the encrypted version
    ///
    /// Unlinked encrypted entries count as changed. Plain entries never do.
    pub fn is_changed(&self) -> Result<bool, DotfileError> {
        let enc = match &self.variant {
            Variant::Plain { .. } => return Ok(false),
            Variant::Encrypted(enc) => enc,
        };
        if !self.is_linked() {
            return Ok(true);
        }
        match &enc.blob {
            None => Ok(true),
            Some(blob) => Ok(&content_hash(&enc.working_copy)? != blob.name.hash()),
        }
    }

    /// Re-encrypt an edited working copy as a new version
    ///
    /// Returns `true` if a new blob was written.
    pub fn update(&mut self) -> Result<bool, DotfileError> {
        if !self.is_encrypted() {
            return Ok(false);
        }
        if !self.is_linked() {
            notice!("update", "skip", "{}: not linked", self.name.display());
            return Ok(false);
        }
        if !self.is_changed()? {
            return Ok(false);
        }

        let enc = self.encrypted_ref()?;
        let previous = enc.blob.clone();
        let working_copy = enc.working_copy.clone();

        self.encrypt(&working_copy, true)?;
        self.unlink()?;
        if let (Some(previous), Some(current)) = (previous, self.blob()) {
            if previous.path != current.path {
                remove_path(&previous.path)?;
                detail!("update", "remove", "{}", previous.name);
            }
        }
        self.link(false)?;
        notice!("update", "done", "{}: {}", self.channel, self.name.display());
        Ok(true)
    }

    /// Start tracking `source`, which is replaced by the home link
    pub fn init(&mut self, source: &Path) -> Result<(), DotfileError> {
        let plain_dest = match &self.variant {
            Variant::Plain { source: dest } => Some(dest.clone()),
            Variant::Encrypted(_) => None,
        };
        match plain_dest {
            Some(dest) => {
                move_path(source, &dest)?;
                notice!("init", "move", "{} -> {}", source.display(), dest.display());
            }
            None => {
                self.encrypt(source, false)?;
                remove_path(source)?;
                detail!("init", "remove", "{}", source.display());
            }
        }
        self.link(false)
    }
}

/// Decrypt `blob` into `dest`, replacing whatever is there
///
/// The whole plaintext is decrypted and, for directories, unpacked into a
/// scratch directory before `dest` is touched, so a bad key or corrupt blob
/// leaves `dest` as it was.
pub(crate) fn materialize(blob: &BlobFile, key: &CryptoKey, dest: &Path) -> Result<(), DotfileError> {
    let token = fs::read(&blob.path)?;
    let plaintext = crypto::decrypt(&token, key).map_err(|_| DotfileError::Decryption {
        path: blob.path.clone(),
    })?;

    match blob.name.kind() {
        EntryKind::File => {
            if dest.is_dir() && !dest.is_symlink() {
                remove_path(dest)?;
            }
            write_atomic(dest, &plaintext)?;
        }
        EntryKind::Directory => {
            let scratch = tempfile::tempdir()?;
            let staged = scratch.path().join("entry");
            archive::unpack(&plaintext, &staged)?;
            if fs::symlink_metadata(dest).is_ok() {
                remove_path(dest)?;
            }
            move_path(&staged, dest)?;
        }
    }
    Ok(())
}
