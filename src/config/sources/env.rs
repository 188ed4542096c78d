//! Environment source: DOTVAULT__SECTION__KEY=value
//!
//! List settings take comma-separated values, e.g.
//! `DOTVAULT__CORE__CHECK_DIRS=.config,.local/share`.

use config::builder::DefaultState;
use config::ConfigBuilder;
use config::Environment;

/// Settings parsed as comma-separated lists
const LIST_KEYS: [&str; 3] = ["core.check_dirs", "core.channel_blacklist", "core.scan_exclude"];

/// Add environment overrides to builder.
pub fn add_to_builder(builder: ConfigBuilder<DefaultState>) -> ConfigBuilder<DefaultState> {
    let env = LIST_KEYS.iter().fold(
        Environment::with_prefix("DOTVAULT")
            .separator("__")
            .try_parsing(true)
            .list_separator(","),
        |env, key| env.with_list_parse_key(key),
    );
    builder.add_source(env)
}
