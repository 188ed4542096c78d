//! Repository index: the channels under the dotfiles root
//!
//! Also hosts the reactive entry point that external sync tooling (or the
//! watch daemon) calls after blobs changed on disk.

use crate::blob::{classify, is_blob_candidate, Classified};
use crate::channel::{Channel, ScanConfig};
use crate::config::DotvaultConfig;
use crate::confirm::Confirm;
use crate::crypto::CryptoKey;
use crate::dotfile::{ChannelPaths, Dotfile};
use crate::error::DotfileError;
use crate::tree::path::absolutize;
use crate::{detail, notice};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Component, Path, PathBuf};

/// Directory names never treated as channels
const BUILTIN_BLACKLIST: &[&str] = &[".git"];

/// Filesystem layout of a repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    pub dotfiles_dir: PathBuf,
    pub decrypted_dir: PathBuf,
    pub home: PathBuf,
}

#[derive(Debug, Clone)]
pub struct Repository {
    layout: Layout,
    key: Option<CryptoKey>,
    scan: ScanConfig,
    channel_blacklist: Vec<String>,
}

impl Repository {
    pub fn new(
        layout: Layout,
        key: Option<CryptoKey>,
        scan: ScanConfig,
        channel_blacklist: Vec<String>,
    ) -> Self {
        Self {
            layout,
            key,
            scan,
            channel_blacklist,
        }
    }

    /// Build a repository from loaded configuration
    ///
    /// The key is loaded here if one is configured; its absence only fails
    /// operations that need it.
    pub fn from_config(config: &DotvaultConfig, home: PathBuf) -> Result<Self, DotfileError> {
        let key = config.encryption.load_key()?;
        Ok(Self::new(
            Layout {
                dotfiles_dir: config.core.dotfiles_dir.clone(),
                decrypted_dir: config.core.decrypted_dir.clone(),
                home,
            },
            key,
            ScanConfig {
                check_dirs: config.core.check_dirs.clone(),
                exclude: config.core.scan_exclude.clone(),
            },
            config.core.channel_blacklist.clone(),
        ))
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn key(&self) -> Option<&CryptoKey> {
        self.key.as_ref()
    }

    fn is_blacklisted(&self, name: &str) -> bool {
        if BUILTIN_BLACKLIST.contains(&name) || self.channel_blacklist.iter().any(|b| b == name) {
            return true;
        }
        // The decrypted tree may live inside the dotfiles root
        self.layout
            .decrypted_dir
            .strip_prefix(&self.layout.dotfiles_dir)
            .ok()
            .and_then(|rel| rel.components().next())
            .map(|first| first.as_os_str() == name)
            .unwrap_or(false)
    }

    /// Channel names, sorted
    pub fn channel_names(&self) -> Result<Vec<String>, DotfileError> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.layout.dotfiles_dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if !self.is_blacklisted(&name) {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }

    fn channel_paths(&self, name: &str) -> ChannelPaths {
        ChannelPaths::new(
            name,
            self.layout.dotfiles_dir.join(name),
            self.layout.home.clone(),
            &self.layout.decrypted_dir,
        )
    }

    /// Open every channel
    pub fn channels(&self) -> Result<Vec<Channel>, DotfileError> {
        self.channel_names()?
            .iter()
            .map(|name| self.channel(name))
            .collect()
    }

    /// Open one channel by name
    pub fn channel(&self, name: &str) -> Result<Channel, DotfileError> {
        let root = self.layout.dotfiles_dir.join(name);
        if self.is_blacklisted(name) || !is_single_component(name) || !root.is_dir() {
            return Err(DotfileError::ChannelNotFound(name.to_string()));
        }
        Channel::open(self.channel_paths(name), self.key.clone(), self.scan.clone())
    }

    /// Create a channel directory after confirmation
    ///
    /// Returns `None` if the prompt was declined.
    pub fn create_channel(
        &self,
        name: &str,
        confirm: &dyn Confirm,
    ) -> Result<Option<Channel>, DotfileError> {
        if !is_single_component(name) || self.is_blacklisted(name) {
            return Err(DotfileError::Config(format!("Invalid channel name: {:?}", name)));
        }
        let root = self.layout.dotfiles_dir.join(name);
        if !root.is_dir() {
            if !confirm.confirm(&format!("Channel {} does not exist. Create it?", name))? {
                return Ok(None);
            }
            fs::create_dir_all(&root)?;
            notice!("channel", "create", "{}", root.display());
        }
        self.channel(name).map(Some)
    }

    /// Encrypted entries across all channels, optionally only linked ones
    pub fn encrypted_dotfiles(&self, linked_only: bool) -> Result<Vec<Dotfile>, DotfileError> {
        let mut out = Vec::new();
        for channel in self.channels()? {
            out.extend(
                channel
                    .dotfiles()
                    .filter(|d| d.is_encrypted() && (!linked_only || d.is_linked()))
                    .cloned(),
            );
        }
        Ok(out)
    }

    /// Entries grouped by logical name across channels
    pub fn grouped_by_name(&self) -> Result<BTreeMap<PathBuf, Vec<Dotfile>>, DotfileError> {
        let mut grouped: BTreeMap<PathBuf, Vec<Dotfile>> = BTreeMap::new();
        for channel in self.channels()? {
            for dotfile in channel.dotfiles() {
                grouped
                    .entry(dotfile.name().to_path_buf())
                    .or_default()
                    .push(dotfile.clone());
            }
        }
        Ok(grouped)
    }

    /// Re-encrypt every linked encrypted entry whose working copy changed
    ///
    /// Returns the names of the entries that got a new version.
    pub fn update_all(&self) -> Result<Vec<PathBuf>, DotfileError> {
        let mut updated = Vec::new();
        for mut channel in self.channels()? {
            for dotfile in channel.dotfiles_mut() {
                if !dotfile.is_encrypted() || !dotfile.is_linked() {
                    continue;
                }
                if dotfile.update()? {
                    updated.push(dotfile.name().to_path_buf());
                }
            }
        }
        Ok(updated)
    }
}

fn is_single_component(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

/// Refresh working copies after blobs changed on disk
///
/// `changed_paths` may be absolute or relative to the dotfiles root. Paths
/// that are not blobs, lie outside the root, or no longer exist are skipped.
/// Linked entries whose active blob is among the changes are decrypted again;
/// conflict blobs are reported. Returns the names of the refreshed entries.
pub fn update_decrypted_from_encrypted(
    repo: &Repository,
    changed_paths: &[PathBuf],
) -> Result<Vec<PathBuf>, DotfileError> {
    let root = absolutize(&repo.layout().dotfiles_dir)?;
    let mut channels: HashMap<String, Channel> = HashMap::new();
    let mut refreshed = Vec::new();

    for changed in changed_paths {
        let absolute = if changed.is_absolute() {
            absolutize(changed)?
        } else {
            root.join(changed)
        };
        let Ok(rel) = absolute.strip_prefix(&root) else {
            detail!("sync", "skip", "{} is outside the repository", changed.display());
            continue;
        };
        let Some(filename) = absolute.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if !is_blob_candidate(filename) {
            detail!("sync", "skip", "{} is not a blob", rel.display());
            continue;
        }
        if !absolute.exists() {
            detail!("sync", "skip", "{} no longer exists", rel.display());
            continue;
        }
        let Some(Component::Normal(channel_name)) = rel.components().next() else {
            continue;
        };
        let channel_name = channel_name.to_string_lossy().into_owned();

        let blob = match classify(filename)? {
            Classified::Active(blob) => blob,
            Classified::Conflict(blob) => {
                notice!(
                    "sync",
                    "conflict",
                    "{}: conflicting version {}",
                    channel_name,
                    blob
                );
                continue;
            }
            Classified::Plain => continue,
        };

        if !channels.contains_key(&channel_name) {
            match repo.channel(&channel_name) {
                Ok(channel) => {
                    channels.insert(channel_name.clone(), channel);
                }
                Err(DotfileError::ChannelNotFound(_)) => continue,
                Err(e) => return Err(e),
            }
        }
        let Some(channel) = channels.get(&channel_name) else {
            continue;
        };

        let in_channel = rel.strip_prefix(&channel_name).unwrap_or(rel);
        let logical = match in_channel.parent() {
            Some(parent) => parent.join(blob.name()),
            None => PathBuf::from(blob.name()),
        };
        let Some(dotfile) = channel.get_dotfile(&logical) else {
            continue;
        };
        let is_active = dotfile
            .blob()
            .map(|b| b.name == blob)
            .unwrap_or(false);
        if !is_active {
            notice!(
                "sync",
                "conflict",
                "{}: {} is not the newest version of {}",
                channel_name,
                blob,
                logical.display()
            );
            continue;
        }
        if !dotfile.is_linked() {
            detail!("sync", "skip", "{} is not linked", logical.display());
            continue;
        }

        dotfile.decrypt()?;
        notice!("sync", "decrypt", "{}: {}", channel_name, logical.display());
        refreshed.push(logical);
    }
    Ok(refreshed)
}
