//! Editing working copies and re-encrypting them

use crate::integration::test_utils::{is_symlink, Sandbox};
use dotvault::dotfile::SyncState;
use std::fs;
use std::path::Path;

#[test]
fn test_update_replaces_blob() {
    let sb = Sandbox::new();
    let vimrc = sb.write_home(".vimrc", "set number\n");
    let repo = sb.repository();
    repo.channel("common").unwrap().init(&vimrc, true).unwrap();
    let before = sb.blobs("common", "");
    assert_eq!(before.len(), 1);

    // Writes through the link land in the working copy
    fs::write(&vimrc, "set relativenumber\n").unwrap();

    let mut channel = repo.channel("common").unwrap();
    let dotfile = channel.get_dotfile_mut(Path::new(".vimrc")).unwrap();
    assert!(dotfile.is_changed().unwrap());
    assert_eq!(dotfile.sync_state().unwrap(), Some(SyncState::Stale));
    assert!(dotfile.update().unwrap());

    let after = sb.blobs("common", "");
    assert_eq!(after.len(), 1, "old blob removed: {:?}", after);
    let hash = |name: &str| name.split('#').nth(1).unwrap().to_string();
    assert_ne!(hash(&before[0]), hash(&after[0]));

    assert!(is_symlink(&vimrc));
    assert_eq!(fs::read_to_string(&vimrc).unwrap(), "set relativenumber\n");
    assert!(!dotfile.is_changed().unwrap());
    assert!(!dotfile.update().unwrap(), "second update is a no-op");
}

#[test]
fn test_directory_edit_is_detected() {
    let sb = Sandbox::new();
    sb.write_home(".config/fish/config.fish", "set -x EDITOR vim\n");
    sb.write_home(".config/fish/functions/ll.fish", "function ll; ls -l; end\n");
    let fish = sb.home.join(".config/fish");
    let repo = sb.repository();
    repo.channel("common").unwrap().init(&fish, true).unwrap();

    let channel = repo.channel("common").unwrap();
    let dotfile = channel.get_dotfile(Path::new(".config/fish")).unwrap();
    assert!(!dotfile.is_changed().unwrap());

    fs::write(fish.join("functions/ll.fish"), "function ll; ls -la; end\n").unwrap();
    assert!(dotfile.is_changed().unwrap());
}

#[test]
fn test_update_all_only_touches_changed_entries() {
    let sb = Sandbox::new();
    let netrc = sb.write_home(".netrc", "machine a login b\n");
    let gitconfig = sb.write_home(".gitconfig", "[user]\n");
    let repo = sb.repository();
    let mut channel = repo.channel("common").unwrap();
    channel.init(&netrc, true).unwrap();
    channel.init(&gitconfig, true).unwrap();

    fs::write(&netrc, "machine a login c\n").unwrap();
    let updated = repo.update_all().unwrap();
    assert_eq!(updated, vec![Path::new(".netrc").to_path_buf()]);
    assert_eq!(fs::read_to_string(&netrc).unwrap(), "machine a login c\n");
    assert!(repo.update_all().unwrap().is_empty());
}

#[test]
fn test_directory_update_replaces_blob() {
    let sb = Sandbox::new();
    sb.write_home(".config/fish/config.fish", "set -x EDITOR vim\n");
    sb.write_home(".config/fish/functions/ll.fish", "function ll; ls -l; end\n");
    let fish = sb.home.join(".config/fish");
    let repo = sb.repository();
    repo.channel("common").unwrap().init(&fish, true).unwrap();
    let before = sb.blobs("common", ".config");
    assert_eq!(before.len(), 1);

    fs::write(fish.join("functions/ll.fish"), "function ll; ls -la; end\n").unwrap();
    fs::write(fish.join("functions/la.fish"), "function la; ls -A; end\n").unwrap();

    let mut channel = repo.channel("common").unwrap();
    let dotfile = channel.get_dotfile_mut(Path::new(".config/fish")).unwrap();
    assert!(dotfile.update().unwrap());

    let after = sb.blobs("common", ".config");
    assert_eq!(after.len(), 1, "old blob removed: {:?}", after);
    assert!(after[0].starts_with("fish#"));
    assert!(after[0].ends_with("#D#CRYPT"));
    let hash = |name: &str| name.split('#').nth(1).unwrap().to_string();
    assert_ne!(hash(&before[0]), hash(&after[0]));

    assert!(is_symlink(&fish));
    assert_eq!(
        fs::read_to_string(fish.join("functions/ll.fish")).unwrap(),
        "function ll; ls -la; end\n"
    );
    assert_eq!(
        fs::read_to_string(fish.join("functions/la.fish")).unwrap(),
        "function la; ls -A; end\n"
    );
    assert_eq!(
        fs::read_to_string(fish.join("config.fish")).unwrap(),
        "set -x EDITOR vim\n"
    );
    assert!(!dotfile.is_changed().unwrap());
}
