//! Loader facade over the layered config sources.

use super::merge::merge_policy;
use super::sources::{env, global_file};
use super::DotvaultConfig;
use crate::error::DotfileError;
use config::File;
use std::path::Path;

pub struct ConfigLoader;

impl ConfigLoader {
    /// Defaults, then the global config file, then environment overrides
    pub fn load(home: &Path) -> Result<DotvaultConfig, DotfileError> {
        let builder = merge_policy::builder_with_defaults()?;
        let builder = global_file::add_to_builder(builder)?;
        let builder = env::add_to_builder(builder);
        Self::finish(builder.build()?, home)
    }

    /// Defaults, then the given file (which must exist), then environment overrides
    pub fn load_from_file(path: &Path, home: &Path) -> Result<DotvaultConfig, DotfileError> {
        let builder = merge_policy::builder_with_defaults()?
            .add_source(File::from(path).required(true));
        let builder = env::add_to_builder(builder);
        Self::finish(builder.build()?, home)
    }

    /// Built-in defaults with `~` expanded
    pub fn default(home: &Path) -> DotvaultConfig {
        let mut config = DotvaultConfig::default();
        config.expand_paths(home);
        config
    }

    fn finish(raw: config::Config, home: &Path) -> Result<DotvaultConfig, DotfileError> {
        let mut config: DotvaultConfig = raw.try_deserialize()?;
        config.expand_paths(home);
        config.validate().map_err(|errors| {
            let msgs: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            DotfileError::Config(format!(
                "Configuration validation failed:\n{}",
                msgs.join("\n")
            ))
        })?;
        Ok(config)
    }
}
