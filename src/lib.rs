//! dotvault: channel-based dotfile repository
//!
//! Dotfiles live in channel directories under a repository root and are
//! linked into the home directory. Entries can be stored encrypted as
//! versioned blobs; their plaintext working copies live outside the
//! repository and are refreshed when new versions arrive.

pub mod archive;
pub mod blob;
pub mod channel;
pub mod cli;
pub mod config;
pub mod confirm;
pub mod crypto;
pub mod dotfile;
pub mod error;
pub mod logging;
pub mod repository;
pub mod tree;
pub mod watch;
