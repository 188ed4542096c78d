//! Logging System
//!
//! Structured logging implementation using the `tracing` crate. Provides configurable
//! log levels, output formats, and destinations. State changes of entries are
//! reported through [`notice!`] and [`detail!`], which tag every event with a
//! `scope` and a `verb`.

use crate::error::DotfileError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Emit a user-facing state change at `info`
///
/// ```ignore
/// notice!("link", "create", "{} -> {}", link.display(), target.display());
/// ```
#[macro_export]
macro_rules! notice {
    ($scope:expr, $verb:expr, $($arg:tt)+) => {
        ::tracing::info!(scope = $scope, verb = $verb, $($arg)+)
    };
}

/// Emit an intermediate step at `debug`
#[macro_export]
macro_rules! detail {
    ($scope:expr, $verb:expr, $($arg:tt)+) => {
        ::tracing::debug!(scope = $scope, verb = $verb, $($arg)+)
    };
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error, off
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format: json, text (default: text)
    #[serde(default = "default_format")]
    pub format: String,

    /// Output destination: stdout, stderr, file
    #[serde(default = "default_output")]
    pub output: String,

    /// Log file path (if output is "file")
    #[serde(default = "default_log_file")]
    pub file: PathBuf,

    /// Enable colored output (text format only, stdout/stderr only)
    #[serde(default = "default_true")]
    pub color: bool,

    /// Module-specific log levels
    #[serde(default)]
    pub modules: BTreeMap<String, String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_format() -> String {
    "text".to_string()
}

fn default_output() -> String {
    "stderr".to_string()
}

fn default_log_file() -> PathBuf {
    directories::ProjectDirs::from("", "", "dotvault")
        .map(|dirs| dirs.data_dir().join("dotvault.log"))
        .unwrap_or_else(|| PathBuf::from("dotvault.log"))
}

fn default_true() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_format(),
            output: default_output(),
            file: default_log_file(),
            color: default_true(),
            modules: BTreeMap::new(),
        }
    }
}

/// Initialize the logging system
///
/// Priority order (highest to lowest):
/// 1. Environment variables (DOTVAULT_LOG, DOTVAULT_LOG_FORMAT, etc.)
/// 2. Configuration (file or CLI flags folded into it)
/// 3. Defaults
///
/// Calling this twice fails because a global subscriber is already set.
pub fn init_logging(config: Option<&LoggingConfig>) -> Result<(), DotfileError> {
    let filter = build_env_filter(config)?;
    let format = determine_format(config)?;
    let output = determine_output(config)?;
    let use_color = config.map(|c| c.color).unwrap_or(true);

    let base_subscriber = Registry::default().with(filter);

    let get_file_writer = || -> Result<std::fs::File, DotfileError> {
        let log_file = config
            .map(|c| c.file.clone())
            .unwrap_or_else(default_log_file);

        if let Some(parent) = log_file.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DotfileError::Config(format!("Failed to create log directory: {}", e))
            })?;
        }
        std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .map_err(|e| {
                DotfileError::Config(format!("Failed to open log file {:?}: {}", log_file, e))
            })
    };

    let installed = match (format, output) {
        (LogFormat::Json, Output::File) => base_subscriber
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_writer(get_file_writer()?),
            )
            .try_init(),
        (LogFormat::Json, Output::Stdout) => base_subscriber
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_writer(std::io::stdout),
            )
            .try_init(),
        (LogFormat::Json, Output::Stderr) => base_subscriber
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_writer(std::io::stderr),
            )
            .try_init(),
        (LogFormat::Text, Output::File) => base_subscriber
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_ansi(false)
                    .with_writer(get_file_writer()?),
            )
            .try_init(),
        // Terminal text output stays compact: no timestamps or targets
        (LogFormat::Text, Output::Stdout) => base_subscriber
            .with(
                fmt::layer()
                    .with_target(false)
                    .without_time()
                    .with_ansi(use_color)
                    .with_writer(std::io::stdout),
            )
            .try_init(),
        (LogFormat::Text, Output::Stderr) => base_subscriber
            .with(
                fmt::layer()
                    .with_target(false)
                    .without_time()
                    .with_ansi(use_color)
                    .with_writer(std::io::stderr),
            )
            .try_init(),
    };

    installed.map_err(|e| DotfileError::Config(format!("Failed to install logger: {}", e)))
}

/// Build environment filter from config or environment variables
fn build_env_filter(config: Option<&LoggingConfig>) -> Result<EnvFilter, DotfileError> {
    if let Ok(filter) = EnvFilter::try_from_env("DOTVAULT_LOG") {
        return Ok(filter);
    }

    let level = config.map(|c| c.level.as_str()).unwrap_or("info");
    if level == "off" {
        return Ok(EnvFilter::new("off"));
    }

    let mut filter = EnvFilter::new(level);

    if let Some(config) = config {
        for (module, module_level) in &config.modules {
            filter = filter.add_directive(parse_directive(module, module_level)?);
        }
    }

    // DOTVAULT_LOG_MODULES=dotvault::channel=debug,dotvault::crypto=trace
    if let Ok(modules_str) = std::env::var("DOTVAULT_LOG_MODULES") {
        for module_spec in modules_str.split(',').filter(|s| !s.trim().is_empty()) {
            let parts: Vec<&str> = module_spec.split('=').collect();
            if parts.len() == 2 {
                filter = filter.add_directive(parse_directive(parts[0], parts[1])?);
            }
        }
    }

    Ok(filter)
}

fn parse_directive(
    module: &str,
    level: &str,
) -> Result<tracing_subscriber::filter::Directive, DotfileError> {
    format!("{}={}", module.trim(), level.trim())
        .parse()
        .map_err(|e| DotfileError::Config(format!("Invalid log directive: {}", e)))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LogFormat {
    Text,
    Json,
}

fn parse_format(format: &str) -> Result<LogFormat, DotfileError> {
    match format {
        "text" => Ok(LogFormat::Text),
        "json" => Ok(LogFormat::Json),
        other => Err(DotfileError::Config(format!(
            "Invalid log format: {} (must be 'json' or 'text')",
            other
        ))),
    }
}

/// Determine output format from config or environment
fn determine_format(config: Option<&LoggingConfig>) -> Result<LogFormat, DotfileError> {
    if let Ok(format) = std::env::var("DOTVAULT_LOG_FORMAT") {
        if let Ok(parsed) = parse_format(&format) {
            return Ok(parsed);
        }
    }
    parse_format(config.map(|c| c.format.as_str()).unwrap_or("text"))
}

/// Output destination
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Output {
    Stdout,
    Stderr,
    File,
}

/// Determine output destination from config or environment
fn determine_output(config: Option<&LoggingConfig>) -> Result<Output, DotfileError> {
    if let Ok(output) = std::env::var("DOTVAULT_LOG_OUTPUT") {
        return parse_output(&output);
    }
    parse_output(config.map(|c| c.output.as_str()).unwrap_or("stderr"))
}

fn parse_output(output: &str) -> Result<Output, DotfileError> {
    match output {
        "stdout" => Ok(Output::Stdout),
        "stderr" => Ok(Output::Stderr),
        "file" => Ok(Output::File),
        _ => Err(DotfileError::Config(format!(
            "Invalid log output: {} (must be 'stdout', 'stderr' or 'file')",
            output
        ))),
    }
}
