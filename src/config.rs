use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_ENV: &str = "REPORTSCRAPER_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "reportscraper.toml";

/// Destinations and limits of a batch ingestion run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// The accumulated dataset.
    pub canonical_path: PathBuf,
    /// Copies of the previous canonical file.
    pub backup_dir: PathBuf,
    /// Untouched copies of every ingested source.
    pub raw_backup_dir: PathBuf,
    /// Parquet ledger of completed runs.
    pub ledger_dir: PathBuf,
    pub malformed_sample_cap: usize,
    /// Newest backups kept per file; 0 keeps all.
    pub backup_retention: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            canonical_path: PathBuf::from("data/accumulated.csv"),
            backup_dir: PathBuf::from("data/backups"),
            raw_backup_dir: PathBuf::from("data/raw"),
            ledger_dir: PathBuf::from("data/history"),
            malformed_sample_cap: 10,
            backup_retention: 30,
        }
    }
}

impl IngestConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: Self =
            toml::from_str(&contents).with_context(|| format!("parsing config {}", path.display()))?;
        Ok(config)
    }

    /// An explicit path or `$REPORTSCRAPER_CONFIG` must load; otherwise
    /// `reportscraper.toml` is used when present, else defaults.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            return Self::load(path);
        }
        Ok(Self::from_env())
    }

    /// Load the default config file, falling back to defaults.
    pub fn from_env() -> Self {
        if !Path::new(DEFAULT_CONFIG_FILE).exists() {
            return Self::default();
        }
        Self::load(DEFAULT_CONFIG_FILE).unwrap_or_else(|e| {
            tracing::warn!("Using default ingest config ({}): {:#}", DEFAULT_CONFIG_FILE, e);
            Self::default()
        })
    }

    pub fn retention(&self) -> Option<usize> {
        (self.backup_retention > 0).then_some(self.backup_retention)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }
}
