//! Blob name codec
//!
//! An encrypted version of an entry is persisted as a single file whose name
//! carries all of its version metadata:
//!
//! ```text
//! <name>#<hash8>#<YYYYmmddHHMMSS>#<F|D>#CRYPT[#CONFLICT]
//! ```
//!
//! There is no index file; scanning a channel and decoding these names is the
//! only way version information is recovered.

use crate::error::ParseError;
use crate::tree::hasher::ContentHash;
use chrono::{DateTime, NaiveDateTime, Timelike, Utc};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Segment separator inside a blob filename
pub const SEPARATOR: char = '#';

/// Marker closing every blob filename
pub const CRYPT_MARKER: &str = "CRYPT";

/// Extra marker on blobs that diverged from the active version
pub const CONFLICT_MARKER: &str = "CONFLICT";

/// Timestamp layout inside blob filenames (UTC, whole seconds)
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

const TIMESTAMP_LEN: usize = 14;

/// Whether an entry is a single file or a directory subtree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Directory,
}

impl EntryKind {
    /// Single-letter code used in blob filenames
    pub fn code(self) -> char {
        match self {
            EntryKind::File => 'F',
            EntryKind::Directory => 'D',
        }
    }

    fn from_code(segment: &str) -> Option<Self> {
        match segment {
            "F" => Some(EntryKind::File),
            "D" => Some(EntryKind::Directory),
            _ => None,
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryKind::File => f.write_str("file"),
            EntryKind::Directory => f.write_str("directory"),
        }
    }
}

/// Current time as stored in blob names
pub fn now_timestamp() -> DateTime<Utc> {
    truncate_to_seconds(Utc::now())
}

fn truncate_to_seconds(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.with_nanosecond(0).unwrap_or(ts)
}

/// Decoded blob filename
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BlobName {
    name: String,
    hash: ContentHash,
    timestamp: DateTime<Utc>,
    kind: EntryKind,
    conflict: bool,
}

impl BlobName {
    /// Build an active blob name.
    ///
    /// `name` is the final component of the logical entry name; it must be
    /// non-empty and contain neither `#` nor a path separator. Sub-second
    /// precision of `timestamp` is dropped.
    pub fn new(
        name: &str,
        kind: EntryKind,
        hash: ContentHash,
        timestamp: DateTime<Utc>,
    ) -> Result<Self, ParseError> {
        let invalid = name.is_empty()
            || name.contains(SEPARATOR)
            || name.contains('/')
            || name.contains(std::path::MAIN_SEPARATOR)
            || name == "."
            || name == "..";
        if invalid {
            return Err(ParseError::EntryName(name.to_string()));
        }
        Ok(Self {
            name: name.to_string(),
            hash,
            timestamp: truncate_to_seconds(timestamp),
            kind,
            conflict: false,
        })
    }

    /// Parse a blob filename.
    ///
    /// Only the exact 5-segment active form and 6-segment conflict form are
    /// accepted.
    pub fn decode(filename: &str) -> Result<Self, ParseError> {
        let segments: Vec<&str> = filename.split(SEPARATOR).collect();
        if !(segments.len() == 5 || segments.len() == 6) {
            return Err(ParseError::SegmentCount {
                filename: filename.to_string(),
                found: segments.len(),
            });
        }

        let name = segments[0];
        if name.is_empty() {
            return Err(ParseError::EmptyName {
                filename: filename.to_string(),
            });
        }

        let hash = ContentHash::parse(segments[1]).ok_or_else(|| ParseError::Hash {
            filename: filename.to_string(),
            segment: segments[1].to_string(),
        })?;

        let timestamp = parse_timestamp(segments[2]).ok_or_else(|| ParseError::Timestamp {
            filename: filename.to_string(),
            segment: segments[2].to_string(),
        })?;

        let kind = EntryKind::from_code(segments[3]).ok_or_else(|| ParseError::Kind {
            filename: filename.to_string(),
            segment: segments[3].to_string(),
        })?;

        if segments[4] != CRYPT_MARKER {
            return Err(ParseError::MissingCryptMarker {
                filename: filename.to_string(),
            });
        }

        let conflict = match segments.get(5).copied() {
            None => false,
            Some(CONFLICT_MARKER) => true,
            Some(other) => {
                return Err(ParseError::TrailingMarker {
                    filename: filename.to_string(),
                    segment: other.to_string(),
                })
            }
        };

        Ok(Self {
            name: name.to_string(),
            hash,
            timestamp,
            kind,
            conflict,
        })
    }

    /// Render the filename for this blob
    pub fn encode(&self) -> String {
        let mut out = format!(
            "{name}{sep}{hash}{sep}{ts}{sep}{kind}{sep}{crypt}",
            name = self.name,
            hash = self.hash,
            ts = self.timestamp.format(TIMESTAMP_FORMAT),
            kind = self.kind.code(),
            crypt = CRYPT_MARKER,
            sep = SEPARATOR,
        );
        if self.conflict {
            out.push(SEPARATOR);
            out.push_str(CONFLICT_MARKER);
        }
        out
    }

    /// Same version, marked as a conflict
    pub fn as_conflict(&self) -> Self {
        Self {
            conflict: true,
            ..self.clone()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn hash(&self) -> &ContentHash {
        &self.hash
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn kind(&self) -> EntryKind {
        self.kind
    }

    pub fn is_conflict(&self) -> bool {
        self.conflict
    }
}

impl fmt::Display for BlobName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl FromStr for BlobName {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::decode(s)
    }
}

fn parse_timestamp(segment: &str) -> Option<DateTime<Utc>> {
    if segment.len() != TIMESTAMP_LEN || !segment.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    NaiveDateTime::parse_from_str(segment, TIMESTAMP_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

/// True if `filename` claims to be a blob and must decode as one
pub fn is_blob_candidate(filename: &str) -> bool {
    let crypt = format!("{SEPARATOR}{CRYPT_MARKER}");
    filename.ends_with(&crypt)
        || filename.ends_with(&format!("{crypt}{SEPARATOR}{CONFLICT_MARKER}"))
        || filename.contains(&format!("{crypt}{SEPARATOR}"))
}

/// Result of classifying a filename found while scanning a channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classified {
    /// Current encrypted version of an entry
    Active(BlobName),
    /// Divergent encrypted version, never promoted
    Conflict(BlobName),
    /// Not a blob at all
    Plain,
}

/// Classify a filename.
///
/// Blob candidates that fail to decode are an error, never plain files.
pub fn classify(filename: &str) -> Result<Classified, ParseError> {
    if !is_blob_candidate(filename) {
        return Ok(Classified::Plain);
    }
    let blob = BlobName::decode(filename)?;
    Ok(if blob.is_conflict() {
        Classified::Conflict(blob)
    } else {
        Classified::Active(blob)
    })
}

/// A blob file on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobFile {
    pub name: BlobName,
    pub path: PathBuf,
}

impl BlobFile {
    /// Blob named `name` inside directory `dir`
    pub fn in_dir(dir: &Path, name: BlobName) -> Self {
        let path = dir.join(name.encode());
        Self { name, path }
    }
}
