//! Shared presentation: color scheme and bulk-operation summaries.

use crate::channel::BulkReport;
use crate::config::{parse_color, ColorConfig};
use owo_colors::{AnsiColors, OwoColorize};
use std::io::IsTerminal;
use std::path::PathBuf;

/// Console colors resolved from `[colors]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorScheme {
    pub enabled: bool,
    pub channel_name: AnsiColors,
    pub linked: AnsiColors,
    pub unlinked: AnsiColors,
    pub conflict: AnsiColors,
}

impl ColorScheme {
    /// Resolve configured names; names that fail to parse fall back to the default color.
    pub fn from_config(colors: &ColorConfig, enabled: bool) -> Self {
        let resolve = |name: &str| parse_color(name).unwrap_or(AnsiColors::Default);
        Self {
            enabled,
            channel_name: resolve(&colors.channel_name),
            linked: resolve(&colors.linked),
            unlinked: resolve(&colors.unlinked),
            conflict: resolve(&colors.conflict),
        }
    }

    /// No escapes at all
    pub fn plain() -> Self {
        Self::from_config(&ColorConfig::default(), false)
    }

    /// Colors on when stdout is a terminal and NO_COLOR is unset
    pub fn detect(colors: &ColorConfig) -> Self {
        let enabled = std::io::stdout().is_terminal() && std::env::var_os("NO_COLOR").is_none();
        Self::from_config(colors, enabled)
    }

    pub fn paint(&self, text: &str, color: AnsiColors) -> String {
        if self.enabled {
            text.color(color).to_string()
        } else {
            text.to_string()
        }
    }

    /// Section heading with bold/underline
    pub fn heading(&self, title: &str) -> String {
        if self.enabled {
            format!("{}", title.bold().underline())
        } else {
            title.to_string()
        }
    }
}

/// Summarize a link-all/unlink-all run for one channel
pub fn format_bulk_report(
    verb: &str,
    channel: &str,
    report: &BulkReport,
    scheme: &ColorScheme,
) -> String {
    let channel = scheme.paint(channel, scheme.channel_name);
    if report.cancelled {
        return format!("{}: cancelled", channel);
    }
    if report.changed.is_empty() && report.skipped.is_empty() {
        return format!("{}: nothing to {}", channel, verb);
    }
    let mut out = format!(
        "{}: {} {}, {} skipped",
        channel,
        verb_past(verb),
        report.changed.len(),
        report.skipped.len()
    );
    for name in &report.changed {
        out.push_str(&format!("\n  {}", name.display()));
    }
    for (name, reason) in &report.skipped {
        out.push_str(&format!("\n  skipped {}: {}", name.display(), reason));
    }
    out
}

fn verb_past(verb: &str) -> String {
    format!("{}ed", verb)
}

/// List entries whose working copies were refreshed or re-encrypted
pub fn format_refreshed(action: &str, names: &[PathBuf]) -> String {
    if names.is_empty() {
        return format!("Nothing {}", action);
    }
    let mut lines = vec![format!("{} {} dotfile(s):", capitalize(action), names.len())];
    lines.extend(names.iter().map(|n| format!("  {}", n.display())));
    lines.join("\n")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
