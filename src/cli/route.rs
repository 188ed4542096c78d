//! CLI route: single route table and run context. Dispatches to the repository and presentation.

use crate::channel::Channel;
use crate::cli::command_name;
use crate::cli::parse::Commands;
use crate::cli::presentation::{
    conflict_rows, dotfile_rows, format_bulk_report, format_conflicts_json,
    format_conflicts_text, format_list_json, format_list_text, format_refreshed, ColorScheme,
};
use crate::config::{expand_home, home_dir, ConfigLoader, DotvaultConfig};
use crate::confirm::{Confirm, DialoguerConfirm};
use crate::error::DotfileError;
use crate::repository::{update_decrypted_from_encrypted, Repository};
use crate::tree::path::absolutize;
use crate::watch::{WatchConfig, WatchDaemon};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

/// Runtime context for CLI execution: loaded config, repository and prompt.
pub struct RunContext {
    config: DotvaultConfig,
    repo: Repository,
    confirm: Box<dyn Confirm>,
    colors: ColorScheme,
}

impl RunContext {
    /// Load configuration and open the repository. Uses ConfigLoader only.
    pub fn new(
        config_path: Option<PathBuf>,
        dotfiles_dir: Option<PathBuf>,
        assume_yes: bool,
    ) -> Result<Self, DotfileError> {
        let home = home_dir()?;
        let mut config = match config_path {
            Some(ref path) => ConfigLoader::load_from_file(path, &home)?,
            None => ConfigLoader::load(&home)?,
        };
        if let Some(dir) = dotfiles_dir {
            config.core.dotfiles_dir = expand_home(&dir, &home);
        }
        let mut context = Self::with_parts(config, home, Box::new(DialoguerConfirm { assume_yes }))?;
        context.colors = ColorScheme::detect(&context.config.colors);
        Ok(context)
    }

    /// Build from already-loaded parts; output is uncolored.
    pub fn with_parts(
        config: DotvaultConfig,
        home: PathBuf,
        confirm: Box<dyn Confirm>,
    ) -> Result<Self, DotfileError> {
        let repo = Repository::from_config(&config, home)?;
        Ok(Self {
            colors: ColorScheme::plain(),
            config,
            repo,
            confirm,
        })
    }

    pub fn repository(&self) -> &Repository {
        &self.repo
    }

    pub fn config(&self) -> &DotvaultConfig {
        &self.config
    }

    /// Execute a command and return its printable output.
    pub fn execute(&self, command: &Commands) -> Result<String, DotfileError> {
        let started = Instant::now();
        let name = command_name(command);
        info!(command = name, "Executing command");
        let result = self.dispatch(command);
        debug!(
            command = name,
            ok = result.is_ok(),
            duration_ms = started.elapsed().as_millis() as u64,
            "Command finished"
        );
        result
    }

    fn dispatch(&self, command: &Commands) -> Result<String, DotfileError> {
        match command {
            Commands::List { channel, format } => {
                let channels = self.selected_channels(channel.as_deref())?;
                let rows = dotfile_rows(&channels)?;
                match format.as_str() {
                    "json" => format_list_json(&rows),
                    _ => Ok(format_list_text(&rows, &self.colors)),
                }
            }
            Commands::Link {
                name,
                channel,
                force,
            } => self.handle_link(name, channel.as_deref(), *force),
            Commands::Unlink { name, channel } => self.handle_unlink(name, channel.as_deref()),
            Commands::LinkAll { channel, force } => {
                let mut out = Vec::new();
                for mut ch in self.selected_channels(channel.as_deref())? {
                    let report = ch.link_all(*force, self.confirm.as_ref())?;
                    out.push(format_bulk_report("link", ch.name(), &report, &self.colors));
                }
                Ok(join_or(out, "No channels found."))
            }
            Commands::UnlinkAll { channel } => {
                let mut out = Vec::new();
                for mut ch in self.selected_channels(channel.as_deref())? {
                    let report = ch.unlink_all(self.confirm.as_ref())?;
                    out.push(format_bulk_report("unlink", ch.name(), &report, &self.colors));
                }
                Ok(join_or(out, "No channels found."))
            }
            Commands::Init {
                path,
                channel,
                encrypt,
            } => self.handle_init(path, channel.as_deref(), *encrypt),
            Commands::Update { name, channel } => {
                self.handle_update(name.as_deref(), channel.as_deref())
            }
            Commands::Decrypt { paths } => {
                let refreshed = update_decrypted_from_encrypted(&self.repo, paths)?;
                Ok(format_refreshed("refreshed", &refreshed))
            }
            Commands::Conflicts { channel, format } => {
                let channels = self.selected_channels(channel.as_deref())?;
                let rows = conflict_rows(&channels);
                match format.as_str() {
                    "json" => format_conflicts_json(&rows),
                    _ => Ok(format_conflicts_text(&rows, &self.colors)),
                }
            }
            Commands::Extract {
                blob,
                dest,
                channel,
            } => self.handle_extract(blob, dest, channel.as_deref()),
            Commands::Watch { batch_window_ms } => {
                let daemon = WatchDaemon::new(
                    self.repo.clone(),
                    WatchConfig {
                        batch_window_ms: *batch_window_ms,
                        ..WatchConfig::default()
                    },
                );
                daemon.run()?;
                Ok("Watch stopped".to_string())
            }
            Commands::Config => self.config.redacted().to_toml(),
        }
    }

    fn handle_link(
        &self,
        name: &Path,
        channel: Option<&str>,
        force: bool,
    ) -> Result<String, DotfileError> {
        let mut ch = self.repo.channel(self.channel_or_default(channel))?;
        let entry = self.entry_name(name)?;
        let dotfile = lookup_mut(&mut ch, &entry)?;
        match dotfile.link(force) {
            Ok(()) => Ok(format!(
                "Linked {} -> {}",
                dotfile.link_path().display(),
                dotfile.link_target().display()
            )),
            Err(DotfileError::AlreadyLinked(path)) => {
                Ok(format!("Already linked: {}", path.display()))
            }
            Err(e) => Err(e),
        }
    }

    fn handle_unlink(&self, name: &Path, channel: Option<&str>) -> Result<String, DotfileError> {
        let mut ch = self.repo.channel(self.channel_or_default(channel))?;
        let entry = self.entry_name(name)?;
        let dotfile = lookup_mut(&mut ch, &entry)?;
        match dotfile.unlink() {
            Ok(()) => Ok(format!("Unlinked {}", dotfile.link_path().display())),
            Err(DotfileError::NotLinked(path)) => Ok(format!("Not linked: {}", path.display())),
            Err(e) => Err(e),
        }
    }

    fn handle_init(
        &self,
        path: &Path,
        channel: Option<&str>,
        encrypt: bool,
    ) -> Result<String, DotfileError> {
        let channel = self.channel_or_default(channel);
        let Some(mut ch) = self.repo.create_channel(channel, self.confirm.as_ref())? else {
            return Ok("Cancelled".to_string());
        };
        let dotfile = ch.init(path, encrypt)?;
        Ok(format!(
            "Tracking {} in channel {} ({}{})\nLinked {} -> {}",
            dotfile.name().display(),
            self.colors.paint(channel, self.colors.channel_name),
            dotfile.kind(),
            if encrypt { ", encrypted" } else { "" },
            dotfile.link_path().display(),
            dotfile.link_target().display()
        ))
    }

    fn handle_update(
        &self,
        name: Option<&Path>,
        channel: Option<&str>,
    ) -> Result<String, DotfileError> {
        match (name, channel) {
            (Some(name), channel) => {
                let mut ch = self.repo.channel(self.channel_or_default(channel))?;
                let entry = self.entry_name(name)?;
                let dotfile = lookup_mut(&mut ch, &entry)?;
                if !dotfile.is_encrypted() {
                    return Err(DotfileError::NotEncrypted(entry));
                }
                if dotfile.update()? {
                    Ok(format!("Updated {}", entry.display()))
                } else {
                    Ok(format!("{} is unchanged", entry.display()))
                }
            }
            (None, Some(channel)) => {
                let mut ch = self.repo.channel(channel)?;
                let mut updated = Vec::new();
                for dotfile in ch.dotfiles_mut() {
                    if dotfile.is_encrypted() && dotfile.is_linked() && dotfile.update()? {
                        updated.push(dotfile.name().to_path_buf());
                    }
                }
                Ok(format_refreshed("updated", &updated))
            }
            (None, None) => Ok(format_refreshed("updated", &self.repo.update_all()?)),
        }
    }

    fn handle_extract(
        &self,
        blob: &str,
        dest: &Path,
        channel: Option<&str>,
    ) -> Result<String, DotfileError> {
        if dest.symlink_metadata().is_ok() {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("{} already exists", dest.display()),
            )
            .into());
        }
        let key = self.repo.key().ok_or(DotfileError::MissingKey)?;
        for ch in self.selected_channels(channel)? {
            if let Some(conflict) = ch.get_conflict(blob) {
                conflict.decrypt_to(key, dest)?;
                return Ok(format!(
                    "Extracted {} ({}) to {}",
                    conflict.name().display(),
                    ch.name(),
                    dest.display()
                ));
            }
        }
        Err(DotfileError::UnknownConflict(blob.to_string()))
    }

    fn channel_or_default<'a>(&'a self, channel: Option<&'a str>) -> &'a str {
        channel.unwrap_or(&self.config.core.default_channel)
    }

    /// One named channel, or every channel
    fn selected_channels(&self, channel: Option<&str>) -> Result<Vec<Channel>, DotfileError> {
        match channel {
            Some(name) => Ok(vec![self.repo.channel(name)?]),
            None => self.repo.channels(),
        }
    }

    /// Logical name from either a home-relative name or a path under home
    fn entry_name(&self, name: &Path) -> Result<PathBuf, DotfileError> {
        if !name.is_absolute() {
            return Ok(name.to_path_buf());
        }
        let home = absolutize(&self.repo.layout().home)?;
        absolutize(name)?
            .strip_prefix(&home)
            .map(Path::to_path_buf)
            .map_err(|_| DotfileError::SourceInvalid {
                path: name.to_path_buf(),
                reason: "not inside the home directory".to_string(),
            })
    }
}

fn lookup_mut<'a>(
    channel: &'a mut Channel,
    name: &Path,
) -> Result<&'a mut crate::dotfile::Dotfile, DotfileError> {
    let channel_name = channel.name().to_string();
    channel
        .get_dotfile_mut(name)
        .ok_or_else(|| DotfileError::UnknownDotfile {
            channel: channel_name,
            name: name.to_path_buf(),
        })
}

fn join_or(parts: Vec<String>, empty: &str) -> String {
    if parts.is_empty() {
        empty.to_string()
    } else {
        parts.join("\n")
    }
}
