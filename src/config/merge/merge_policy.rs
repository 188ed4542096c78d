//! Merge rules: defaults first, every later source overrides earlier ones.

use config::Config;
use config::ConfigBuilder;
use config::ConfigError;

/// Create a Config builder with merge policy defaults applied.
pub fn builder_with_defaults() -> Result<ConfigBuilder<config::builder::DefaultState>, ConfigError>
{
    let decrypted_dir = crate::config::default_decrypted_dir();
    Config::builder()
        .set_default(
            "core.dotfiles_dir",
            crate::config::default_dotfiles_dir().to_string_lossy().into_owned(),
        )?
        .set_default("core.decrypted_dir", decrypted_dir.to_string_lossy().into_owned())?
        .set_default("core.check_dirs", crate::config::default_check_dirs())?
        .set_default("core.scan_exclude", crate::config::default_scan_exclude())?
        .set_default("core.default_channel", crate::config::default_channel())
}
