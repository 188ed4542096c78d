//! CLI output: error mapping from domain errors to stable CLI surface.

use crate::error::DotfileError;

/// Map domain errors to a string for CLI output.
pub fn map_error(e: &DotfileError) -> String {
    match e {
        DotfileError::MissingKey => format!(
            "Error: {}\nHint: set encryption.key_file in the config file or DOTVAULT__ENCRYPTION__KEY_FILE",
            e
        ),
        DotfileError::ChannelNotFound(_) => {
            format!("Error: {}\nHint: create it with `dotvault init --channel <name> <path>`", e)
        }
        _ => format!("Error: {}", e),
    }
}
