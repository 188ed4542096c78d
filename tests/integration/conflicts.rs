//! Competing encrypted versions: detection, isolation and extraction

use crate::integration::test_utils::Sandbox;
use dotvault::cli::Commands;
use dotvault::confirm::AssumeYes;
use dotvault::error::DotfileError;
use std::fs;
use std::path::{Path, PathBuf};

#[test]
fn test_newest_version_wins() {
    let sb = Sandbox::new();
    let older = sb.put_blob("common", ".netrc", b"machine old\n", 10, false);
    let newer = sb.put_blob("common", ".netrc", b"machine new\n", 20, false);
    let marked = sb.put_blob("common", ".netrc", b"machine other\n", 30, true);

    let channel = sb.repository().channel("common").unwrap();
    let dotfile = channel.get_dotfile(Path::new(".netrc")).unwrap();
    assert_eq!(dotfile.blob().unwrap(), &newer);

    let names: Vec<String> = channel.conflicts().iter().map(|c| c.filename()).collect();
    assert_eq!(names, vec![marked.name.encode(), older.name.encode()]);
    assert!(channel.get_dotfile(Path::new(&marked.name.encode())).is_none());
}

#[test]
fn test_bulk_operations_leave_conflicts_alone() {
    let sb = Sandbox::new();
    let older = sb.put_blob("common", ".netrc", b"machine old\n", 10, false);
    sb.put_blob("common", ".netrc", b"machine new\n", 20, false);
    let before = fs::read(&older.path).unwrap();

    let mut channel = sb.repository().channel("common").unwrap();
    let report = channel.link_all(false, &AssumeYes).unwrap();
    assert_eq!(report.changed, vec![PathBuf::from(".netrc")]);
    assert_eq!(
        fs::read_to_string(sb.home.join(".netrc")).unwrap(),
        "machine new\n"
    );
    channel.unlink_all(&AssumeYes).unwrap();

    assert_eq!(fs::read(&older.path).unwrap(), before);
    assert_eq!(channel.conflicts().len(), 1);
}

#[test]
fn test_extract_conflict_for_comparison() {
    let sb = Sandbox::new();
    let older = sb.put_blob("common", ".netrc", b"machine old\n", 10, false);
    sb.put_blob("common", ".netrc", b"machine new\n", 20, false);
    let ctx = sb.context();
    let dest = sb.home.join("netrc.old");

    let out = ctx
        .execute(&Commands::Extract {
            blob: older.name.encode(),
            dest: dest.clone(),
            channel: None,
        })
        .unwrap();
    assert!(out.starts_with("Extracted .netrc (common)"));
    assert_eq!(fs::read_to_string(&dest).unwrap(), "machine old\n");

    let again = ctx.execute(&Commands::Extract {
        blob: older.name.encode(),
        dest: dest.clone(),
        channel: None,
    });
    assert!(matches!(again, Err(DotfileError::Io(_))), "destination exists");

    let unknown = ctx.execute(&Commands::Extract {
        blob: "nope#1a2b3c4d#20240101120000#F#CRYPT".to_string(),
        dest: sb.home.join("other"),
        channel: Some("common".to_string()),
    });
    assert!(matches!(unknown, Err(DotfileError::UnknownConflict(_))));
}

#[test]
fn test_conflicts_listing() {
    let sb = Sandbox::new();
    sb.put_blob("common", ".netrc", b"a", 10, false);
    sb.put_blob("common", ".netrc", b"b", 20, false);
    let ctx = sb.context();

    let json = ctx
        .execute(&Commands::Conflicts {
            channel: None,
            format: "json".to_string(),
        })
        .unwrap();
    let rows: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(rows.as_array().unwrap().len(), 1);
    assert_eq!(rows[0]["channel"], "common");
    assert_eq!(rows[0]["name"], ".netrc");
    assert_eq!(rows[0]["timestamp"], "20240101120010");
    assert_eq!(rows[0]["marked"], false);
}
