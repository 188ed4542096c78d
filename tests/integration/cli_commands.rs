//! Command routing through RunContext

use crate::integration::test_utils::{is_symlink, Sandbox};
use clap::Parser;
use dotvault::cli::{command_name, map_error, Cli, Commands};
use dotvault::error::DotfileError;
use std::fs;
use std::path::PathBuf;

fn run(sb: &Sandbox, args: &[&str]) -> Result<String, DotfileError> {
    let mut argv = vec!["dotvault"];
    argv.extend_from_slice(args);
    let cli = Cli::try_parse_from(argv).unwrap();
    sb.context().execute(&cli.command)
}

#[test]
fn test_init_link_list_unlink() {
    let sb = Sandbox::new();
    let vimrc = sb.write_home(".vimrc", "set number\n");
    let path = vimrc.to_string_lossy().into_owned();

    let out = run(&sb, &["init", "--encrypt", path.as_str()]).unwrap();
    assert!(out.starts_with("Tracking .vimrc in channel common (file, encrypted)"));
    assert!(is_symlink(&vimrc));

    let list = run(&sb, &["list", "--format", "json"]).unwrap();
    let rows: serde_json::Value = serde_json::from_str(&list).unwrap();
    assert_eq!(rows[0]["name"], ".vimrc");
    assert_eq!(rows[0]["encrypted"], true);
    assert_eq!(rows[0]["linked"], true);
    assert_eq!(rows[0]["sync"], "synced");
    let blob = sb.blobs("common", "").remove(0);
    let segments: Vec<&str> = blob.split('#').collect();
    assert_eq!(rows[0]["hash"], segments[1]);
    assert_eq!(rows[0]["timestamp"], segments[2]);
    assert_eq!(
        rows[0]["source"],
        sb.channel_dir("common").join(&blob).to_string_lossy().into_owned()
    );

    let out = run(&sb, &["unlink", ".vimrc"]).unwrap();
    assert!(out.starts_with("Unlinked"));
    assert!(!vimrc.exists());
    assert_eq!(run(&sb, &["unlink", ".vimrc"]).unwrap(), format!("Not linked: {}", vimrc.display()));

    // Absolute paths under home name the same entry
    let out = run(&sb, &["link", path.as_str()]).unwrap();
    assert!(out.starts_with("Linked"));
    assert_eq!(fs::read_to_string(&vimrc).unwrap(), "set number\n");
    assert!(run(&sb, &["link", ".vimrc"]).unwrap().starts_with("Already linked"));

    let text = run(&sb, &["list"]).unwrap();
    assert!(text.contains(".vimrc"));
    assert!(text.contains("linked (synced)"));
    assert!(text.contains(segments[1]));
}

#[test]
fn test_init_creates_missing_channel() {
    let sb = Sandbox::new();
    let gitconfig = sb.write_home(".gitconfig", "[user]\n");
    let path = gitconfig.to_string_lossy().into_owned();
    run(&sb, &["init", "--channel", "work", path.as_str()]).unwrap();
    assert!(sb.channel_dir("work").join(".gitconfig").is_file());
}

#[test]
fn test_bulk_commands() {
    let sb = Sandbox::new();
    fs::write(sb.channel_dir("common").join(".bashrc"), "b").unwrap();
    fs::write(sb.channel_dir("common").join(".zshrc"), "z").unwrap();
    fs::write(sb.home.join(".zshrc"), "existing").unwrap();

    let out = run(&sb, &["link-all"]).unwrap();
    assert!(out.starts_with("common: linked 1, 1 skipped"), "{}", out);
    assert!(is_symlink(&sb.home.join(".bashrc")));
    assert_eq!(fs::read_to_string(sb.home.join(".zshrc")).unwrap(), "existing");

    let out = run(&sb, &["link-all", "--force"]).unwrap();
    assert!(out.starts_with("common: linked 1, 0 skipped"), "{}", out);

    let out = run(&sb, &["unlink-all", "--channel", "common"]).unwrap();
    assert!(out.starts_with("common: unlinked 2"), "{}", out);
    assert!(!sb.home.join(".bashrc").exists());
}

#[test]
fn test_update_and_decrypt_commands() {
    let sb = Sandbox::new();
    let netrc = sb.write_home(".netrc", "v1\n");
    let path = netrc.to_string_lossy().into_owned();
    run(&sb, &["init", "--encrypt", path.as_str()]).unwrap();

    assert_eq!(run(&sb, &["update"]).unwrap(), "Nothing updated");
    fs::write(&netrc, "v2\n").unwrap();
    assert_eq!(run(&sb, &["update", ".netrc"]).unwrap(), "Updated .netrc");
    assert_eq!(run(&sb, &["update", ".netrc"]).unwrap(), ".netrc is unchanged");

    let blob = sb.blobs("common", "").remove(0);
    let rel = format!("common/{}", blob);
    let out = run(&sb, &["decrypt", rel.as_str()]).unwrap();
    assert_eq!(out, "Refreshed 1 dotfile(s):\n  .netrc");
}

#[test]
fn test_errors_surface() {
    let sb = Sandbox::new();
    let err = run(&sb, &["link", ".nothing"]).unwrap_err();
    assert!(matches!(err, DotfileError::UnknownDotfile { .. }));

    let err = run(&sb, &["list", "--channel", "missing"]).unwrap_err();
    assert!(matches!(err, DotfileError::ChannelNotFound(_)));
    assert!(map_error(&err).contains("Hint:"));

    fs::write(sb.channel_dir("common").join(".bashrc"), "b").unwrap();
    let err = run(&sb, &["update", ".bashrc"]).unwrap_err();
    assert!(matches!(err, DotfileError::NotEncrypted(_)));
}

#[test]
fn test_config_command_redacts_key() {
    let sb = Sandbox::new();
    let mut config = sb.config();
    config.encryption.key = Some("inline secret".to_string());
    let ctx = dotvault::cli::RunContext::with_parts(
        config,
        sb.home.clone(),
        Box::new(dotvault::confirm::AssumeYes),
    )
    .unwrap();
    let out = ctx.execute(&Commands::Config).unwrap();
    assert!(out.contains("[core]"));
    assert!(!out.contains("inline secret"));
}

#[test]
fn test_command_names() {
    let cli = Cli::try_parse_from(["dotvault", "link-all", "--force"]).unwrap();
    assert_eq!(command_name(&cli.command), "link-all");
    let cli = Cli::try_parse_from(["dotvault", "-y", "extract", "a#b", "/tmp/x"]).unwrap();
    assert!(cli.assume_yes);
    assert_eq!(command_name(&cli.command), "extract");
    assert!(matches!(
        cli.command,
        Commands::Extract { ref dest, .. } if dest == &PathBuf::from("/tmp/x")
    ));
}
