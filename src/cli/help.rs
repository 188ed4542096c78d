//! CLI command-name contract for logging.

use crate::cli::parse::Commands;

/// Command name string used in log events (e.g. "link-all").
pub fn command_name(command: &Commands) -> &'static str {
    match command {
        Commands::List { .. } => "list",
        Commands::Link { .. } => "link",
        Commands::Unlink { .. } => "unlink",
        Commands::LinkAll { .. } => "link-all",
        Commands::UnlinkAll { .. } => "unlink-all",
        Commands::Init { .. } => "init",
        Commands::Update { .. } => "update",
        Commands::Decrypt { .. } => "decrypt",
        Commands::Conflicts { .. } => "conflicts",
        Commands::Extract { .. } => "extract",
        Commands::Watch { .. } => "watch",
        Commands::Config => "config",
    }
}
