//! Error types for the dotvault repository.

use std::path::PathBuf;
use thiserror::Error;

/// Blob filename parse errors
///
/// Raised whenever a filename looks like an encrypted blob but does not match
/// one of the two accepted forms exactly.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("Invalid blob name {filename:?}: expected 5 or 6 '#'-separated segments, found {found}")]
    SegmentCount { filename: String, found: usize },

    #[error("Invalid blob name {filename:?}: empty entry name")]
    EmptyName { filename: String },

    #[error("Invalid blob name {filename:?}: bad hash segment {segment:?}")]
    Hash { filename: String, segment: String },

    #[error("Invalid blob name {filename:?}: bad timestamp segment {segment:?}")]
    Timestamp { filename: String, segment: String },

    #[error("Invalid blob name {filename:?}: bad kind segment {segment:?} (expected F or D)")]
    Kind { filename: String, segment: String },

    #[error("Invalid blob name {filename:?}: missing CRYPT marker")]
    MissingCryptMarker { filename: String },

    #[error("Invalid blob name {filename:?}: unknown trailing marker {segment:?}")]
    TrailingMarker { filename: String, segment: String },

    #[error("Invalid entry name {0:?}: must be a non-empty file name without '#' or '/'")]
    EntryName(String),
}

/// Authenticated encryption errors
#[derive(Debug, Error)]
pub enum CryptoError {
    /// AEAD encryption failed
    #[error("encryption failed")]
    EncryptionFailed,

    /// Wrong key, truncated token or tampered ciphertext
    #[error("decryption failed: authentication failure")]
    DecryptionFailed,

    /// Key material was empty
    #[error("invalid key material: key must not be empty")]
    EmptyKey,

    /// Random number generation failed
    #[error("random generation failed: {0}")]
    RandomGenerationFailed(String),
}

/// Directory archive errors
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Archive I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Archive encoding error: {0}")]
    Encoding(String),

    #[error("Unsupported archive format version: {0}")]
    UnsupportedVersion(u32),

    #[error("Unsafe path in archive: {0:?}")]
    UnsafePath(String),

    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),
}

/// Dotfile, channel and repository errors
#[derive(Debug, Error)]
pub enum DotfileError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("Dotfile already linked: {0}")]
    AlreadyLinked(PathBuf),

    #[error("Dotfile is not linked: {0}")]
    NotLinked(PathBuf),

    #[error("Link path exists: {0} (use --force to overwrite)")]
    LinkTargetExists(PathBuf),

    #[error("Encrypted file exists in channel: {0}")]
    BlobExists(PathBuf),

    #[error("Failed to decrypt {path}: invalid key or corrupted data")]
    Decryption { path: PathBuf },

    #[error("Invalid source path {path}: {reason}")]
    SourceInvalid { path: PathBuf, reason: String },

    #[error("Channel {0} not found")]
    ChannelNotFound(String),

    #[error("Dotfile already exists in channel: {0}")]
    AlreadyTracked(PathBuf),

    #[error("No dotfile {name} in channel {channel}")]
    UnknownDotfile { channel: String, name: PathBuf },

    #[error("No conflict named {0}")]
    UnknownConflict(String),

    #[error("Dotfile is not encrypted: {0}")]
    NotEncrypted(PathBuf),

    #[error("Encrypted dotfile has no blob yet: {0}")]
    MissingBlob(PathBuf),

    #[error("No encryption key configured (set encryption.key or encryption.key_file)")]
    MissingKey,

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DotfileError {
    /// Link-state errors are recoverable: bulk operations skip the entry and continue.
    pub fn is_link_state(&self) -> bool {
        matches!(
            self,
            DotfileError::AlreadyLinked(_)
                | DotfileError::NotLinked(_)
                | DotfileError::LinkTargetExists(_)
        )
    }
}

impl From<config::ConfigError> for DotfileError {
    fn from(err: config::ConfigError) -> Self {
        DotfileError::Config(err.to_string())
    }
}
