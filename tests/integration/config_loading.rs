//! Loading a config file and opening the repository it describes

use crate::integration::test_utils::Sandbox;
use dotvault::config::ConfigLoader;
use dotvault::repository::Repository;
use std::fs;
use std::sync::Mutex;

/// Serializes tests that read DOTVAULT__* variables
static ENV_MUTEX: Mutex<()> = Mutex::new(());

#[test]
fn test_config_file_drives_repository() {
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let sb = Sandbox::new();
    fs::create_dir_all(sb.home.join("dots/work")).unwrap();
    fs::write(sb.home.join(".vault-key"), "file key\n").unwrap();
    let config_file = sb.home.join("config.toml");
    fs::write(
        &config_file,
        r#"
[core]
dotfiles_dir = "~/dots"
decrypted_dir = "~/.cache/dotvault"
default_channel = "work"
channel_blacklist = ["archive"]

[encryption]
key_file = "~/.vault-key"
"#,
    )
    .unwrap();
    fs::create_dir_all(sb.home.join("dots/archive")).unwrap();

    let config = ConfigLoader::load_from_file(&config_file, &sb.home).unwrap();
    assert_eq!(config.core.dotfiles_dir, sb.home.join("dots"));
    assert_eq!(config.core.decrypted_dir, sb.home.join(".cache/dotvault"));
    assert_eq!(config.encryption.key_file, Some(sb.home.join(".vault-key")));

    let repo = Repository::from_config(&config, sb.home.clone()).unwrap();
    assert!(repo.key().is_some());
    assert_eq!(repo.channel_names().unwrap(), vec!["work".to_string()]);
}

#[test]
fn test_environment_overrides_file() {
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let sb = Sandbox::new();
    let config_file = sb.home.join("config.toml");
    fs::write(&config_file, "[core]\ndefault_channel = \"work\"\n").unwrap();

    std::env::set_var("DOTVAULT__CORE__DEFAULT_CHANNEL", "laptop");
    let loaded = ConfigLoader::load_from_file(&config_file, &sb.home);
    std::env::remove_var("DOTVAULT__CORE__DEFAULT_CHANNEL");

    assert_eq!(loaded.unwrap().core.default_channel, "laptop");
}

#[test]
fn test_invalid_config_reports_all_problems() {
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let sb = Sandbox::new();
    let config_file = sb.home.join("config.toml");
    fs::write(
        &config_file,
        "[colors]\nlinked = \"chartreuse\"\n\n[logging]\nformat = \"xml\"\n",
    )
    .unwrap();

    let err = ConfigLoader::load_from_file(&config_file, &sb.home).unwrap_err();
    let message = err.to_string();
    assert!(message.contains("chartreuse"), "{}", message);
    assert!(message.contains("xml"), "{}", message);
}

#[test]
fn test_environment_lists_are_comma_separated() {
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let sb = Sandbox::new();
    let config_file = sb.home.join("config.toml");
    fs::write(&config_file, "[core]\ncheck_dirs = [\".config\"]\n").unwrap();

    std::env::set_var("DOTVAULT__CORE__CHECK_DIRS", ".config,.local/share");
    std::env::set_var("DOTVAULT__CORE__CHANNEL_BLACKLIST", "archive");
    let loaded = ConfigLoader::load_from_file(&config_file, &sb.home);
    std::env::remove_var("DOTVAULT__CORE__CHECK_DIRS");
    std::env::remove_var("DOTVAULT__CORE__CHANNEL_BLACKLIST");

    let config = loaded.unwrap();
    assert_eq!(
        config.core.check_dirs,
        vec![".config".to_string(), ".local/share".to_string()]
    );
    assert_eq!(config.core.channel_blacklist, vec!["archive".to_string()]);
}
