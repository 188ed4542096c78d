//! CLI presentation: text and json formatters per command family.

mod list;
mod shared;

pub use list::{
    conflict_rows, dotfile_rows, format_conflicts_json, format_conflicts_text, format_list_json,
    format_list_text, ConflictRow, DotfileRow,
};
pub use shared::{format_bulk_report, format_refreshed, ColorScheme};
