//! CLI parse: clap types for dotvault. No behavior; definitions only.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// dotvault - channel-based dotfile repository with encrypted entries
#[derive(Parser, Debug)]
#[command(name = "dotvault")]
#[command(about = "Manage dotfiles in channels, linked into your home directory")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file path (overrides default config loading)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Repository root (overrides core.dotfiles_dir)
    #[arg(long, global = true)]
    pub dotfiles_dir: Option<PathBuf>,

    /// Answer yes to every confirmation prompt
    #[arg(short = 'y', long, global = true)]
    pub assume_yes: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long, global = true)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file)
    #[arg(long, global = true)]
    pub log_output: Option<String>,

    /// Log file path (if output is "file")
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List dotfiles and their link state
    List {
        /// Only this channel
        #[arg(long)]
        channel: Option<String>,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Link one dotfile into the home directory
    Link {
        /// Dotfile name (relative to home, or a path under home)
        name: PathBuf,
        /// Channel holding the dotfile (default: core.default_channel)
        #[arg(long)]
        channel: Option<String>,
        /// Replace an existing file at the link path
        #[arg(long)]
        force: bool,
    },
    /// Remove the home link of one dotfile
    Unlink {
        /// Dotfile name (relative to home, or a path under home)
        name: PathBuf,
        /// Channel holding the dotfile (default: core.default_channel)
        #[arg(long)]
        channel: Option<String>,
    },
    /// Link every unlinked dotfile
    LinkAll {
        /// Only this channel (default: all channels)
        #[arg(long)]
        channel: Option<String>,
        /// Replace existing files at link paths
        #[arg(long)]
        force: bool,
    },
    /// Unlink every linked dotfile
    UnlinkAll {
        /// Only this channel (default: all channels)
        #[arg(long)]
        channel: Option<String>,
    },
    /// Start tracking a file or directory from the home directory
    Init {
        /// Path to the file or directory
        path: PathBuf,
        /// Target channel (default: core.default_channel)
        #[arg(long)]
        channel: Option<String>,
        /// Store the entry encrypted
        #[arg(long)]
        encrypt: bool,
    },
    /// Re-encrypt edited working copies of encrypted dotfiles
    Update {
        /// Only this dotfile
        name: Option<PathBuf>,
        /// Channel holding the dotfile (default: all channels, or core.default_channel with a name)
        #[arg(long)]
        channel: Option<String>,
    },
    /// Refresh working copies after blobs changed on disk
    Decrypt {
        /// Changed blob paths (absolute or relative to the repository root)
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// List conflicting encrypted versions
    Conflicts {
        /// Only this channel
        #[arg(long)]
        channel: Option<String>,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Decrypt a conflicting version to a destination for comparison
    Extract {
        /// Blob filename of the conflict
        blob: String,
        /// Destination path (must not exist)
        dest: PathBuf,
        /// Only search this channel
        #[arg(long)]
        channel: Option<String>,
    },
    /// Watch the repository and refresh working copies as blobs change
    Watch {
        /// Batch window in milliseconds
        #[arg(long, default_value = "500")]
        batch_window_ms: u64,
    },
    /// Print the effective configuration
    Config,
}
