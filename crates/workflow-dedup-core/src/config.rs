use log::LevelFilter;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::dedup::Threshold;
use crate::error::{Error, Result};
use crate::normalize::DEFAULT_MAX_TREE_DEPTH;

/// Log level for the application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

/// Configuration for the workflow deduplication process
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Drop documents closer than this percentage to the baseline;
    /// `None` only reports distances
    pub delete_threshold: Option<f64>,

    /// Whether to run without making changes
    pub dry_run: bool,

    /// Copy dropped documents here before deleting them
    pub backup_dir: Option<PathBuf>,

    /// Maximum directory depth for scanning (1 = the directory itself)
    pub max_depth: Option<usize>,

    /// File extensions treated as documents, case-insensitive
    pub extensions: Vec<String>,

    /// Whether to ignore `._*` macOS resource-fork files
    pub skip_hidden_resource_forks: bool,

    /// Nesting bound for normalizing and flattening a document
    pub max_tree_depth: usize,

    /// Log level
    pub log_level: LogLevel,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            delete_threshold: None,
            dry_run: false,
            backup_dir: None,
            max_depth: Some(1),
            extensions: vec!["json".to_string()],
            skip_hidden_resource_forks: true,
            max_tree_depth: DEFAULT_MAX_TREE_DEPTH,
            log_level: LogLevel::Info,
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)
            .map_err(|e| Error::Configuration(format!("Failed to open config file: {}", e)))?;

        let config: Config = serde_json::from_reader(std::io::BufReader::new(file))
            .map_err(|e| Error::Configuration(format!("Failed to parse config file: {}", e)))?;

        Ok(config)
    }

    /// Save configuration to a file
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let file = std::fs::File::create(path)
            .map_err(|e| Error::Configuration(format!("Failed to create config file: {}", e)))?;

        serde_json::to_writer_pretty(file, self)
            .map_err(|e| Error::Configuration(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if let Some(threshold) = self.delete_threshold {
            Threshold::new(threshold)?;
        }

        if self.extensions.iter().all(|ext| ext.trim().is_empty()) {
            return Err(Error::Configuration(
                "At least one document extension must be specified".to_string(),
            ));
        }

        if self.max_tree_depth == 0 {
            return Err(Error::Configuration(
                "Maximum tree depth must be at least 1".to_string(),
            ));
        }

        if self.max_depth == Some(0) {
            return Err(Error::Configuration(
                "Maximum directory depth must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    /// Returns true if documents may be removed from disk
    pub fn is_deletion_mode(&self) -> bool {
        self.delete_threshold.is_some() && !self.dry_run
    }
}
