//! Core functionality for finding and removing near-duplicate workflow snapshots.
//!
//! This library provides the components for metadata deduplication:
//! - Document discovery and loading
//! - Normalization of volatile fields (seeds, control toggles)
//! - Flattening into leaf paths and a percentage distance metric
//! - The chained keep/drop engine and safe file removal

// -- External Dependencies --
use log::info;
use std::path::{Path, PathBuf};

// -- Internal Modules --
mod error;

// -- Public Re-exports --
pub use config::{Config, LogLevel};
pub use dedup::{ChainDeduper, DocumentRemover, RetentionChain, Threshold};
pub use error::{Error, Result};
pub use metric::{difference_percent, Fingerprint, PathDiff};
pub use normalize::normalize;
pub use types::*;

// -- Public Modules --
pub mod config;
pub mod dedup;
pub mod discovery;
pub mod flatten;
pub mod logging;
pub mod metric;
pub mod normalize;
pub mod safety;
pub mod types;

/// Distance between two documents along with the leaves that differ
#[derive(Debug, Clone)]
pub struct Comparison {
    pub distance_percent: f64,
    pub diff: PathDiff,
}

/// Main entry point for the deduplication process
pub struct WorkflowDeduper {
    config: Config,
    safety_manager: safety::SafetyManager,
}

impl WorkflowDeduper {
    /// Create a new WorkflowDeduper, rejecting an invalid configuration
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let safety_manager = safety::SafetyManager::new(&config);

        Ok(Self {
            config,
            safety_manager,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Discover all documents in the provided directory
    pub fn discover_documents(&self, directory: &Path) -> Result<Vec<PathBuf>> {
        discovery::discover_documents(directory, &self.config)
    }

    /// Run the full deduplication pipeline over one directory
    pub fn run(&mut self, directory: &Path) -> Result<DedupReport> {
        let engine = ChainDeduper::from_config(&self.config)?;

        info!(
            "Comparing documents in '{}' (delete threshold: {}, dry run: {}, deleting: {})",
            directory.display(),
            self.config
                .delete_threshold
                .map_or_else(|| "None".to_string(), |t| t.to_string()),
            self.config.dry_run,
            self.config.is_deletion_mode()
        );

        let paths = self.discover_documents(directory)?;
        if paths.is_empty() {
            info!("No documents found in '{}'", directory.display());
            return Ok(engine.finish());
        }
        info!("Found {} documents", paths.len());

        // Parallel pre-pass; the chain itself is folded sequentially
        let fingerprints =
            discovery::load_fingerprints(&paths, directory, self.config.max_tree_depth);

        let report = engine.run_fingerprints(fingerprints, &mut self.safety_manager);
        info!(
            "Processed {}, compared {}, dropped {}, deleted {}, errors {}",
            report.summary.total_processed,
            report.summary.total_compared,
            report.summary.total_dropped,
            report.summary.total_deleted,
            report.summary.total_errors
        );

        Ok(report)
    }

    /// Compare two documents on disk
    pub fn compare(&self, left: &Path, right: &Path) -> Result<Comparison> {
        let max_depth = self.config.max_tree_depth;
        let load = |path: &Path| -> Result<Fingerprint> {
            let root = path.parent().unwrap_or(Path::new(""));
            let document = discovery::load_document(path, root)?;
            Fingerprint::from_document(&document, max_depth)
        };

        let left = load(left)?;
        let right = load(right)?;

        Ok(Comparison {
            distance_percent: left.distance(&right),
            diff: metric::diff_paths(&left.paths, &right.paths),
        })
    }
}
