//! List presentation: dotfile and conflict rows as tables or json.

use crate::blob::{EntryKind, TIMESTAMP_FORMAT};
use crate::channel::Channel;
use crate::cli::presentation::shared::ColorScheme;
use crate::dotfile::{LinkState, SyncState};
use crate::error::DotfileError;
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DotfileRow {
    pub channel: String,
    pub name: PathBuf,
    pub kind: EntryKind,
    pub encrypted: bool,
    pub linked: bool,
    /// `synced`/`stale` for linked encrypted entries
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sync: Option<String>,
    /// Fingerprint embedded in the current blob
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    /// Creation time of the current blob
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    /// Plain object or blob inside the channel
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<PathBuf>,
    pub link_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConflictRow {
    pub channel: String,
    pub name: PathBuf,
    pub blob: String,
    pub kind: EntryKind,
    pub timestamp: String,
    pub marked: bool,
}

/// One row per indexed entry, channels in the order given
pub fn dotfile_rows(channels: &[Channel]) -> Result<Vec<DotfileRow>, DotfileError> {
    let mut rows = Vec::new();
    for channel in channels {
        for dotfile in channel.dotfiles() {
            let linked = dotfile.link_state() == LinkState::Linked;
            let sync = if linked {
                dotfile.sync_state()?.map(|s| match s {
                    SyncState::Synced => "synced".to_string(),
                    SyncState::Stale => "stale".to_string(),
                })
            } else {
                None
            };
            rows.push(DotfileRow {
                channel: channel.name().to_string(),
                name: dotfile.name().to_path_buf(),
                kind: dotfile.kind(),
                encrypted: dotfile.is_encrypted(),
                linked,
                sync,
                hash: dotfile.content_hash().map(|h| h.to_string()),
                timestamp: dotfile
                    .version_timestamp()
                    .map(|ts| ts.format(TIMESTAMP_FORMAT).to_string()),
                source: dotfile.source_path().map(Path::to_path_buf),
                link_path: dotfile.link_path().to_path_buf(),
            });
        }
    }
    Ok(rows)
}

pub fn conflict_rows(channels: &[Channel]) -> Vec<ConflictRow> {
    channels
        .iter()
        .flat_map(|channel| {
            channel.conflicts().iter().map(move |c| ConflictRow {
                channel: channel.name().to_string(),
                name: c.name().to_path_buf(),
                blob: c.filename(),
                kind: c.kind(),
                timestamp: c.version_timestamp().format(TIMESTAMP_FORMAT).to_string(),
                marked: c.is_marked(),
            })
        })
        .collect()
}

pub fn format_list_text(rows: &[DotfileRow], scheme: &ColorScheme) -> String {
    if rows.is_empty() {
        return "No dotfiles tracked.".to_string();
    }
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Channel", "Name", "Kind", "Encrypted", "Hash", "Timestamp", "State"]);
    for row in rows {
        let state = match (row.linked, row.sync.as_deref()) {
            (true, Some(sync)) => scheme.paint(&format!("linked ({})", sync), scheme.linked),
            (true, None) => scheme.paint("linked", scheme.linked),
            (false, _) => scheme.paint("unlinked", scheme.unlinked),
        };
        table.add_row(vec![
            scheme.paint(&row.channel, scheme.channel_name),
            row.name.display().to_string(),
            row.kind.to_string(),
            if row.encrypted { "yes" } else { "no" }.to_string(),
            row.hash.clone().unwrap_or_default(),
            row.timestamp.clone().unwrap_or_default(),
            state,
        ]);
    }
    format!("{}\n\n{}", scheme.heading("Dotfiles"), table)
}

pub fn format_list_json(rows: &[DotfileRow]) -> Result<String, DotfileError> {
    serde_json::to_string_pretty(rows)
        .map_err(|e| DotfileError::Config(format!("Failed to serialize list: {}", e)))
}

pub fn format_conflicts_text(rows: &[ConflictRow], scheme: &ColorScheme) -> String {
    if rows.is_empty() {
        return "No conflicts.".to_string();
    }
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Channel", "Name", "Timestamp", "Blob"]);
    for row in rows {
        table.add_row(vec![
            scheme.paint(&row.channel, scheme.channel_name),
            row.name.display().to_string(),
            row.timestamp.clone(),
            scheme.paint(&row.blob, scheme.conflict),
        ]);
    }
    format!(
        "{}\n\n{}\n\nExtract a version with `dotvault extract <blob> <dest>`.",
        scheme.heading("Conflicts"),
        table
    )
}

pub fn format_conflicts_json(rows: &[ConflictRow]) -> Result<String, DotfileError> {
    serde_json::to_string_pretty(rows)
        .map_err(|e| DotfileError::Config(format!("Failed to serialize conflicts: {}", e)))
}
