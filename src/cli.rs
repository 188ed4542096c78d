//! CLI domain: parse, route, output, and presentation only.
//! No domain orchestration; single route table dispatches to the repository.

mod help;
mod output;
mod parse;
mod presentation;
mod route;

pub use help::command_name;
pub use output::map_error;
pub use parse::{Cli, Commands};
pub use presentation::ColorScheme;
pub use route::RunContext;
