//! Shared sandbox for integration tests
//!
//! Every test gets its own home, repository root and decrypted directory
//! inside one temp dir, so nothing touches the real home directory.

use chrono::{TimeZone, Utc};
use dotvault::blob::{BlobFile, BlobName, EntryKind};
use dotvault::cli::RunContext;
use dotvault::config::DotvaultConfig;
use dotvault::confirm::AssumeYes;
use dotvault::crypto::{self, CryptoKey};
use dotvault::repository::Repository;
use dotvault::tree::hasher::compute_content_hash;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub struct Sandbox {
    _temp: TempDir,
    pub home: PathBuf,
    pub dotfiles_dir: PathBuf,
    pub decrypted_dir: PathBuf,
    pub key_file: PathBuf,
}

impl Sandbox {
    /// Sandbox with an empty `common` channel and a key file
    pub fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let home = temp.path().join("home");
        let dotfiles_dir = temp.path().join("dotfiles");
        let decrypted_dir = temp.path().join("decrypted");
        let key_file = temp.path().join("key");
        fs::create_dir_all(&home).unwrap();
        fs::create_dir_all(dotfiles_dir.join("common")).unwrap();
        fs::write(&key_file, "integration test key\n").unwrap();
        Self {
            _temp: temp,
            home,
            dotfiles_dir,
            decrypted_dir,
            key_file,
        }
    }

    pub fn config(&self) -> DotvaultConfig {
        let mut config = DotvaultConfig::default();
        config.core.dotfiles_dir = self.dotfiles_dir.clone();
        config.core.decrypted_dir = self.decrypted_dir.clone();
        config.encryption.key_file = Some(self.key_file.clone());
        config
    }

    pub fn key(&self) -> CryptoKey {
        CryptoKey::from_file(&self.key_file).unwrap()
    }

    pub fn repository(&self) -> Repository {
        Repository::from_config(&self.config(), self.home.clone()).unwrap()
    }

    pub fn context(&self) -> RunContext {
        RunContext::with_parts(self.config(), self.home.clone(), Box::new(AssumeYes)).unwrap()
    }

    pub fn channel_dir(&self, channel: &str) -> PathBuf {
        self.dotfiles_dir.join(channel)
    }

    /// Write a file under home, creating parents
    pub fn write_home(&self, rel: &str, content: &str) -> PathBuf {
        let path = self.home.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        path
    }

    /// Blob filenames directly inside `dir` (relative to the channel), sorted
    pub fn blobs(&self, channel: &str, dir: &str) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(self.channel_dir(channel).join(dir))
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|n| n.contains("#CRYPT"))
            .collect();
        names.sort();
        names
    }

    /// Encrypt `content` into a file blob as an external sync tool would
    pub fn put_blob(
        &self,
        channel: &str,
        name: &str,
        content: &[u8],
        second: u32,
        conflict: bool,
    ) -> BlobFile {
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, second).unwrap();
        let mut blob_name =
            BlobName::new(name, EntryKind::File, compute_content_hash(content), ts).unwrap();
        if conflict {
            blob_name = blob_name.as_conflict();
        }
        let blob = BlobFile::in_dir(&self.channel_dir(channel), blob_name);
        fs::write(&blob.path, crypto::encrypt(content, &self.key()).unwrap()).unwrap();
        blob
    }
}

pub fn is_symlink(path: &Path) -> bool {
    fs::symlink_metadata(path)
        .map(|m| m.file_type().is_symlink())
        .unwrap_or(false)
}
