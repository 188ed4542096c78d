//! Refreshing working copies after blobs change on disk

use crate::integration::test_utils::Sandbox;
use dotvault::repository::update_decrypted_from_encrypted;
use dotvault::tree::place::remove_path;
use std::fs;
use std::path::{Path, PathBuf};

/// Link `.netrc` from a blob written at second 10 and return the sandbox
fn linked_netrc() -> Sandbox {
    let sb = Sandbox::new();
    sb.put_blob("common", ".netrc", b"machine v1\n", 10, false);
    let mut channel = sb.repository().channel("common").unwrap();
    channel
        .get_dotfile_mut(Path::new(".netrc"))
        .unwrap()
        .link(false)
        .unwrap();
    sb
}

#[test]
fn test_synced_version_is_decrypted() {
    let sb = linked_netrc();
    let old = sb.blobs("common", "");
    remove_path(&sb.channel_dir("common").join(&old[0])).unwrap();
    let new = sb.put_blob("common", ".netrc", b"machine v2\n", 20, false);

    let rel = Path::new("common").join(new.name.encode());
    let refreshed = update_decrypted_from_encrypted(&sb.repository(), &[rel]).unwrap();
    assert_eq!(refreshed, vec![PathBuf::from(".netrc")]);
    assert_eq!(
        fs::read_to_string(sb.home.join(".netrc")).unwrap(),
        "machine v2\n"
    );
}

#[test]
fn test_absolute_paths_are_accepted() {
    let sb = linked_netrc();
    let new = sb.put_blob("common", ".netrc", b"machine v2\n", 20, false);
    let refreshed = update_decrypted_from_encrypted(&sb.repository(), &[new.path]).unwrap();
    assert_eq!(refreshed, vec![PathBuf::from(".netrc")]);
    assert_eq!(
        fs::read_to_string(sb.home.join(".netrc")).unwrap(),
        "machine v2\n"
    );
}

#[test]
fn test_irrelevant_paths_are_skipped() {
    let sb = linked_netrc();
    fs::write(sb.channel_dir("common").join(".bashrc"), "x").unwrap();
    let older = sb.put_blob("common", ".netrc", b"machine v0\n", 5, false);
    let marked = sb.put_blob("common", ".netrc", b"machine vX\n", 30, true);

    let paths = vec![
        PathBuf::from("common/.bashrc"),
        PathBuf::from("common/gone#1a2b3c4d#20240101120000#F#CRYPT"),
        PathBuf::from("/somewhere/else/.netrc#1a2b3c4d#20240101120000#F#CRYPT"),
        older.path,
        marked.path,
    ];
    let refreshed = update_decrypted_from_encrypted(&sb.repository(), &paths).unwrap();
    assert!(refreshed.is_empty());
    assert_eq!(
        fs::read_to_string(sb.home.join(".netrc")).unwrap(),
        "machine v1\n"
    );
}

#[test]
fn test_unlinked_entries_are_not_decrypted() {
    let sb = Sandbox::new();
    let blob = sb.put_blob("common", ".netrc", b"machine v1\n", 10, false);
    let refreshed = update_decrypted_from_encrypted(&sb.repository(), &[blob.path]).unwrap();
    assert!(refreshed.is_empty());
    assert!(!sb.decrypted_dir.join("common").join(".netrc").exists());
}
