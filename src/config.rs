//! Profile run configuration
//!
//! Tunables come from three layers, lowest precedence first: built-in
//! defaults, an optional TOML file, then command-line flags.
//!
//! ```toml
//! max_unique_values = 50
//! workers = 4
//! extension = "hl7"
//! vocabulary = "site-vocabulary.toml"
//! phi_fields = ["PID.3.1", "PID.5", "NK1.2"]
//! ```

use crate::aggregator::MAX_UNIQUE;
use crate::cli::Cli;
use crate::vocabulary::Vocabulary;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Upper bound on decoder workers when none is configured
pub const MAX_DEFAULT_WORKERS: usize = 8;

pub const DEFAULT_EXTENSION: &str = "hl7";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProfileConfig {
    /// Distinct values tracked per field before it overflows
    pub max_unique_values: usize,
    /// Decoder threads; `None` picks min(cores, files, 8)
    pub workers: Option<usize>,
    /// Message file extension, without the dot
    pub extension: String,
    /// TOML vocabulary path
    pub vocabulary: Option<PathBuf>,
    /// Directory with the three JSON vocabulary tables
    pub schema_dir: Option<PathBuf>,
    /// Replacement PHI allow-list
    pub phi_fields: Option<Vec<String>>,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            max_unique_values: MAX_UNIQUE,
            workers: None,
            extension: DEFAULT_EXTENSION.to_string(),
            vocabulary: None,
            schema_dir: None,
            phi_fields: None,
        }
    }
}

impl ProfileConfig {
    /// Load and validate a TOML configuration file
    ///
    /// Relative vocabulary paths are resolved against the file's directory.
    pub fn from_toml<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let mut config: ProfileConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config: {}", path.display()))?;

        if let Some(dir) = path.parent() {
            config.vocabulary = config.vocabulary.map(|p| dir.join(p));
            config.schema_dir = config.schema_dir.map(|p| dir.join(p));
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.max_unique_values == 0 {
            bail!("max_unique_values must be at least 1");
        }
        if self.workers == Some(0) {
            bail!("workers must be at least 1");
        }
        if self.extension.trim().is_empty() {
            bail!("extension must not be empty");
        }
        if self.vocabulary.is_some() && self.schema_dir.is_some() {
            bail!("vocabulary and schema_dir are mutually exclusive");
        }
        Ok(())
    }

    /// Build the effective configuration: config file (if any) overlaid by CLI flags
    pub fn resolve(cli: &Cli) -> Result<Self> {
        let mut config = match &cli.config {
            Some(path) => Self::from_toml(path)?,
            None => Self::default(),
        };

        if let Some(n) = cli.max_unique {
            config.max_unique_values = usize::try_from(n).context("--max-unique out of range")?;
        }
        if let Some(n) = cli.workers {
            config.workers = Some(n);
        }
        if let Some(ext) = &cli.extension {
            config.extension = ext.clone();
        }
        if let Some(path) = &cli.vocabulary {
            config.vocabulary = Some(path.clone());
            config.schema_dir = None;
        }
        if let Some(dir) = &cli.schema_dir {
            config.schema_dir = Some(dir.clone());
            config.vocabulary = None;
        }

        config.extension = config.extension.trim_start_matches('.').to_string();
        config.validate()?;
        Ok(config)
    }

    /// Load the configured vocabulary (embedded default when none is set)
    pub fn load_vocabulary(&self) -> Result<Vocabulary> {
        let vocabulary = match (&self.vocabulary, &self.schema_dir) {
            (Some(path), _) => Vocabulary::from_toml(path)?,
            (None, Some(dir)) => Vocabulary::from_schema_dir(dir)?,
            (None, None) => Vocabulary::default_hl7()?,
        };

        let vocabulary = match &self.phi_fields {
            Some(entries) => vocabulary.with_phi_fields(entries.iter().cloned()),
            None => vocabulary,
        };

        info!(fields = vocabulary.field_count(), "vocabulary loaded");
        Ok(vocabulary)
    }

    /// Worker count for `files` inputs: configured value, or min(cores, files, 8)
    pub fn worker_count(&self, files: usize) -> usize {
        match self.workers {
            Some(n) => n.max(1),
            None => {
                let cores = std::thread::available_parallelism()
                    .map(|n| n.get())
                    .unwrap_or(1);
                cores.min(files).min(MAX_DEFAULT_WORKERS).max(1)
            }
        }
    }
}
