//! Configuration file loading and command-line overrides.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use sluice_common::StorageClass;
use sluice_storage::StoreConfig;
use sluice_sync::SyncConfig;

/// Contents of the JSON configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub store: StoreConfig,
    pub sync: SyncConfig,
}

/// Default location of the configuration file.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("sluice").join("config.json"))
}

impl AppConfig {
    /// Parse a configuration document.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).context("Invalid configuration file")
    }

    /// Load configuration from `path`, or from the default location.
    ///
    /// An explicit path must exist. A missing default file yields the
    /// built-in defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, required) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => match default_config_path() {
                Some(path) => (path, false),
                None => return Ok(Self::default()),
            },
        };

        if !required && !path.exists() {
            debug!("No configuration file at {}", path.display());
            return Ok(Self::default());
        }

        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        debug!("Loaded configuration from {}", path.display());
        Self::from_json(&text).with_context(|| format!("In {}", path.display()))
    }

    /// Apply command-line overrides, then fill missing identity fields from
    /// the environment.
    pub fn resolve(mut self, overrides: Overrides) -> Result<Self> {
        overrides.apply(&mut self)?;
        self.store = self.store.with_env_fallback();
        Ok(self)
    }
}

/// Values given on the command line. Unset values leave the file untouched;
/// lists replace the file's lists when non-empty.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub provider: Option<String>,
    pub bucket: Option<String>,
    pub root: Option<PathBuf>,
    pub files: Vec<PathBuf>,
    pub directories: Vec<PathBuf>,
    pub omit_prefixes: Vec<String>,
    pub parallelism: Option<i64>,
    pub storage_class: Option<String>,
    pub skip_hidden: bool,
    pub dry_run: bool,
}

impl Overrides {
    fn apply(self, config: &mut AppConfig) -> Result<()> {
        if let Some(provider) = self.provider {
            config.store.provider = provider;
        }
        if self.bucket.is_some() {
            config.store.bucket = self.bucket;
        }
        if self.root.is_some() {
            config.store.root = self.root;
        }

        let sync = &mut config.sync;
        if !self.files.is_empty() {
            sync.files = self.files;
        }
        if !self.directories.is_empty() {
            sync.directories = self.directories;
        }
        if !self.omit_prefixes.is_empty() {
            sync.omit_path_prefixes = self.omit_prefixes;
        }
        if self.parallelism.is_some() {
            sync.parallelism = self.parallelism;
        }
        if let Some(class) = self.storage_class {
            sync.storage_class = StorageClass::new(class).context("Invalid --storage-class")?;
        }
        sync.skip_hidden |= self.skip_hidden;
        sync.dry_run |= self.dry_run;

        Ok(())
    }
}
