//! Configuration System
//!
//! Layered configuration: built-in defaults, then the global config file, then
//! `DOTVAULT__SECTION__KEY` environment variables. Paths starting with `~/`
//! are expanded against the home directory after merging, and the merged
//! result is validated as a whole.

use crate::crypto::CryptoKey;
use crate::error::DotfileError;
use crate::logging::LoggingConfig;
use owo_colors::AnsiColors;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Component, Path, PathBuf};

mod facade;
mod merge;
mod sources;

pub use facade::ConfigLoader;
pub use sources::global_file::global_config_path;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DotvaultConfig {
    /// Repository layout and scanning
    #[serde(default)]
    pub core: CoreConfig,

    /// Key material for encrypted entries
    #[serde(default)]
    pub encryption: EncryptionConfig,

    /// Console colors
    #[serde(default)]
    pub colors: ColorConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Repository layout and scan behavior
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Repository root holding one directory per channel
    #[serde(default = "default_dotfiles_dir")]
    pub dotfiles_dir: PathBuf,

    /// Where decrypted working copies live
    #[serde(default = "default_decrypted_dir")]
    pub decrypted_dir: PathBuf,

    /// Channel-relative directories whose children are tracked individually
    #[serde(default = "default_check_dirs")]
    pub check_dirs: Vec<String>,

    /// Directory names under the root that are not channels
    #[serde(default)]
    pub channel_blacklist: Vec<String>,

    /// Names skipped while scanning a channel
    #[serde(default = "default_scan_exclude")]
    pub scan_exclude: Vec<String>,

    /// Channel used when a command does not name one
    #[serde(default = "default_channel")]
    pub default_channel: String,
}

pub(crate) fn default_dotfiles_dir() -> PathBuf {
    PathBuf::from("~/.dotfiles")
}

pub(crate) fn default_decrypted_dir() -> PathBuf {
    directories::ProjectDirs::from("", "", "dotvault")
        .map(|dirs| dirs.data_dir().join("decrypted"))
        .unwrap_or_else(|| PathBuf::from("~/.local/share/dotvault/decrypted"))
}

pub(crate) fn default_check_dirs() -> Vec<String> {
    vec![".config".to_string()]
}

pub(crate) fn default_scan_exclude() -> Vec<String> {
    [".git", ".hg", ".svn", ".DS_Store"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

pub(crate) fn default_channel() -> String {
    "common".to_string()
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            dotfiles_dir: default_dotfiles_dir(),
            decrypted_dir: default_decrypted_dir(),
            check_dirs: default_check_dirs(),
            channel_blacklist: Vec::new(),
            scan_exclude: default_scan_exclude(),
            default_channel: default_channel(),
        }
    }
}

/// Encryption key source: inline material or a file holding it
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EncryptionConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_file: Option<PathBuf>,
}

impl fmt::Debug for EncryptionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptionConfig")
            .field("key", &self.key.as_ref().map(|_| "<redacted>"))
            .field("key_file", &self.key_file)
            .finish()
    }
}

impl EncryptionConfig {
    pub fn is_configured(&self) -> bool {
        self.key.is_some() || self.key_file.is_some()
    }

    /// Load the configured key, if any
    pub fn load_key(&self) -> Result<Option<CryptoKey>, DotfileError> {
        match (&self.key, &self.key_file) {
            (Some(key), _) => Ok(Some(CryptoKey::from_material(key.as_bytes())?)),
            (None, Some(path)) => Ok(Some(CryptoKey::from_file(path)?)),
            (None, None) => Ok(None),
        }
    }

    /// Copy safe to print
    pub fn redacted(&self) -> Self {
        Self {
            key: self.key.as_ref().map(|_| "<redacted>".to_string()),
            key_file: self.key_file.clone(),
        }
    }
}

/// ANSI color names for console output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorConfig {
    #[serde(default = "default_channel_color")]
    pub channel_name: String,
    #[serde(default = "default_linked_color")]
    pub linked: String,
    #[serde(default = "default_unlinked_color")]
    pub unlinked: String,
    #[serde(default = "default_conflict_color")]
    pub conflict: String,
}

fn default_channel_color() -> String {
    "cyan".to_string()
}

fn default_linked_color() -> String {
    "green".to_string()
}

fn default_unlinked_color() -> String {
    "yellow".to_string()
}

fn default_conflict_color() -> String {
    "red".to_string()
}

impl Default for ColorConfig {
    fn default() -> Self {
        Self {
            channel_name: default_channel_color(),
            linked: default_linked_color(),
            unlinked: default_unlinked_color(),
            conflict: default_conflict_color(),
        }
    }
}

/// Map a color name (`red`, `bright_blue`, ...) to an ANSI color
pub fn parse_color(name: &str) -> Option<AnsiColors> {
    let color = match name.to_ascii_lowercase().replace('-', "_").as_str() {
        "black" => AnsiColors::Black,
        "red" => AnsiColors::Red,
        "green" => AnsiColors::Green,
        "yellow" => AnsiColors::Yellow,
        "blue" => AnsiColors::Blue,
        "magenta" => AnsiColors::Magenta,
        "cyan" => AnsiColors::Cyan,
        "white" => AnsiColors::White,
        "default" => AnsiColors::Default,
        "bright_black" => AnsiColors::BrightBlack,
        "bright_red" => AnsiColors::BrightRed,
        "bright_green" => AnsiColors::BrightGreen,
        "bright_yellow" => AnsiColors::BrightYellow,
        "bright_blue" => AnsiColors::BrightBlue,
        "bright_magenta" => AnsiColors::BrightMagenta,
        "bright_cyan" => AnsiColors::BrightCyan,
        "bright_white" => AnsiColors::BrightWhite,
        _ => return None,
    };
    Some(color)
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    Core(String),
    Encryption(String),
    Colors(String),
    Logging(String),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::Core(msg) => write!(f, "core: {}", msg),
            ValidationError::Encryption(msg) => write!(f, "encryption: {}", msg),
            ValidationError::Colors(msg) => write!(f, "colors: {}", msg),
            ValidationError::Logging(msg) => write!(f, "logging: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

fn is_plain_relative(path: &str) -> bool {
    !path.is_empty()
        && Path::new(path)
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
}

impl CoreConfig {
    fn validate(&self, errors: &mut Vec<ValidationError>) {
        if self.dotfiles_dir.as_os_str().is_empty() {
            errors.push(ValidationError::Core("dotfiles_dir cannot be empty".to_string()));
        }
        if self.decrypted_dir.as_os_str().is_empty() {
            errors.push(ValidationError::Core("decrypted_dir cannot be empty".to_string()));
        }
        if self.decrypted_dir == self.dotfiles_dir {
            errors.push(ValidationError::Core(
                "decrypted_dir must differ from dotfiles_dir".to_string(),
            ));
        }
        for dir in &self.check_dirs {
            if !is_plain_relative(dir.trim_matches('/')) {
                errors.push(ValidationError::Core(format!(
                    "check_dirs entry {:?} must be a relative path without '..'",
                    dir
                )));
            }
        }
        let mut single = self.channel_blacklist.iter().chain(&self.scan_exclude).collect::<Vec<_>>();
        single.push(&self.default_channel);
        for name in single {
            if !is_plain_relative(name) || name.contains('/') {
                errors.push(ValidationError::Core(format!(
                    "{:?} must be a single file name",
                    name
                )));
            }
        }
    }
}

impl DotvaultConfig {
    /// Validate the entire configuration, collecting every problem
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        self.core.validate(&mut errors);

        if self.encryption.key.is_some() && self.encryption.key_file.is_some() {
            errors.push(ValidationError::Encryption(
                "set either key or key_file, not both".to_string(),
            ));
        }
        if matches!(&self.encryption.key, Some(k) if k.is_empty()) {
            errors.push(ValidationError::Encryption("key cannot be empty".to_string()));
        }

        for (field, value) in [
            ("channel_name", &self.colors.channel_name),
            ("linked", &self.colors.linked),
            ("unlinked", &self.colors.unlinked),
            ("conflict", &self.colors.conflict),
        ] {
            if parse_color(value).is_none() {
                errors.push(ValidationError::Colors(format!(
                    "{}: unknown color {:?}",
                    field, value
                )));
            }
        }

        if !["text", "json"].contains(&self.logging.format.as_str()) {
            errors.push(ValidationError::Logging(format!(
                "invalid format {:?} (must be 'json' or 'text')",
                self.logging.format
            )));
        }
        if !["stdout", "stderr", "file"].contains(&self.logging.output.as_str()) {
            errors.push(ValidationError::Logging(format!(
                "invalid output {:?} (must be 'stdout', 'stderr' or 'file')",
                self.logging.output
            )));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Expand `~/` prefixes against `home`
    pub fn expand_paths(&mut self, home: &Path) {
        self.core.dotfiles_dir = expand_home(&self.core.dotfiles_dir, home);
        self.core.decrypted_dir = expand_home(&self.core.decrypted_dir, home);
        if let Some(key_file) = &self.encryption.key_file {
            self.encryption.key_file = Some(expand_home(key_file, home));
        }
        self.logging.file = expand_home(&self.logging.file, home);
    }

    /// Copy with secrets redacted, for display
    pub fn redacted(&self) -> Self {
        Self {
            encryption: self.encryption.redacted(),
            ..self.clone()
        }
    }

    /// Render as TOML
    pub fn to_toml(&self) -> Result<String, DotfileError> {
        toml::to_string_pretty(self)
            .map_err(|e| DotfileError::Config(format!("Failed to render config: {}", e)))
    }
}

/// Replace a leading `~` component with `home`
pub fn expand_home(path: &Path, home: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => home.join(rest),
        Err(_) => path.to_path_buf(),
    }
}

/// Home directory of the current user
pub fn home_dir() -> Result<PathBuf, DotfileError> {
    directories::BaseDirs::new()
        .map(|dirs| dirs.home_dir().to_path_buf())
        .ok_or_else(|| DotfileError::Config("Cannot determine home directory".to_string()))
}
