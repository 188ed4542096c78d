//! Adopting home files into a channel and linking them back

use crate::integration::test_utils::{is_symlink, Sandbox};
use dotvault::blob::EntryKind;
use dotvault::dotfile::SyncState;
use std::fs;
use std::path::Path;

#[test]
fn test_encrypted_init_then_link() {
    let sb = Sandbox::new();
    let vimrc = sb.write_home(".vimrc", "set number\n");
    let repo = sb.repository();
    let mut channel = repo.channel("common").unwrap();

    channel.init(&vimrc, true).unwrap();

    let blobs = sb.blobs("common", "");
    assert_eq!(blobs.len(), 1, "exactly one blob: {:?}", blobs);
    let segments: Vec<&str> = blobs[0].split('#').collect();
    assert_eq!(segments.len(), 5);
    assert_eq!(segments[0], ".vimrc");
    assert_eq!(segments[1].len(), 8);
    assert!(segments[1].chars().all(|c| c.is_ascii_hexdigit()));
    assert_eq!(segments[2].len(), 14);
    assert!(segments[2].chars().all(|c| c.is_ascii_digit()));
    assert_eq!(segments[3], "F");
    assert_eq!(segments[4], "CRYPT");

    assert!(is_symlink(&vimrc), "home file replaced by a link");
    assert!(fs::read_link(&vimrc).unwrap().starts_with(&sb.decrypted_dir));
    assert_eq!(fs::read_to_string(&vimrc).unwrap(), "set number\n");
    assert!(!sb.channel_dir("common").join(".vimrc").exists());

    let reopened = repo.channel("common").unwrap();
    let dotfile = reopened.get_dotfile(Path::new(".vimrc")).unwrap();
    assert!(dotfile.is_encrypted());
    assert!(dotfile.is_linked());
    assert_eq!(dotfile.sync_state().unwrap(), Some(SyncState::Synced));
}

#[test]
fn test_plain_init_moves_into_channel() {
    let sb = Sandbox::new();
    let bashrc = sb.write_home(".bashrc", "alias ll='ls -l'\n");
    let repo = sb.repository();
    let mut channel = repo.channel("common").unwrap();

    channel.init(&bashrc, false).unwrap();

    let stored = sb.channel_dir("common").join(".bashrc");
    assert_eq!(fs::read_to_string(&stored).unwrap(), "alias ll='ls -l'\n");
    assert!(is_symlink(&bashrc));
    assert_eq!(fs::read_link(&bashrc).unwrap(), stored);
    assert!(sb.blobs("common", "").is_empty());
}

#[test]
fn test_encrypted_directory_init() {
    let sb = Sandbox::new();
    sb.write_home(".config/nvim/init.lua", "vim.o.number = true\n");
    sb.write_home(".config/nvim/lua/plugins.lua", "return {}\n");
    let nvim = sb.home.join(".config/nvim");
    let repo = sb.repository();
    let mut channel = repo.channel("common").unwrap();

    let dotfile = channel.init(&nvim, true).unwrap();
    assert_eq!(dotfile.kind(), EntryKind::Directory);

    let blobs = sb.blobs("common", ".config");
    assert_eq!(blobs.len(), 1);
    assert!(blobs[0].starts_with("nvim#"));
    assert!(blobs[0].ends_with("#D#CRYPT"));

    assert!(is_symlink(&nvim));
    assert_eq!(
        fs::read_to_string(nvim.join("lua/plugins.lua")).unwrap(),
        "return {}\n"
    );
    assert_eq!(
        fs::read_to_string(nvim.join("init.lua")).unwrap(),
        "vim.o.number = true\n"
    );
}

#[test]
fn test_init_twice_is_rejected() {
    let sb = Sandbox::new();
    let vimrc = sb.write_home(".vimrc", "x");
    let repo = sb.repository();
    let mut channel = repo.channel("common").unwrap();
    channel.init(&vimrc, false).unwrap();

    fs::remove_file(&vimrc).unwrap();
    fs::write(&vimrc, "y").unwrap();
    let err = channel.init(&vimrc, false).unwrap_err();
    assert!(matches!(err, dotvault::error::DotfileError::AlreadyTracked(_)));
}
