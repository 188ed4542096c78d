//! Filesystem subtree utilities
//!
//! Walking, fingerprinting and placing the files and directories that make up
//! tracked dotfiles.

pub mod hasher;
pub mod path;
pub mod place;
pub mod walker;
