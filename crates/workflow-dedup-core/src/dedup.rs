//! Chained near-duplicate elimination.
//!
//! Documents are processed in filename order and each one is compared
//! against the last *retained* document, never simply the previous one.
//! A run of near-duplicates therefore collapses onto a single surviving
//! representative, and small consecutive deltas cannot accumulate into a
//! large unnoticed change.
//!
//! The fold is inherently sequential: every decision depends on the
//! baseline left behind by the previous one.

use log::error;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::logging::log_report_entry;
use crate::metric::Fingerprint;
use crate::normalize::DEFAULT_MAX_TREE_DEPTH;
use crate::types::{
    ComparisonRecord, Decision, DedupReport, Document, DocumentError, Outcome, ReportEntry,
};

/// Deletion threshold, a percentage in `[0, 100]`.
///
/// A document is dropped when its distance to the baseline is strictly
/// below the threshold. Exact duplicates (distance 0) are always dropped,
/// which makes `0` the "exact duplicates only" threshold.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Threshold(f64);

impl Threshold {
    /// Validate `percent` and wrap it
    pub fn new(percent: f64) -> Result<Self> {
        if !percent.is_finite() || !(0.0..=100.0).contains(&percent) {
            return Err(Error::Configuration(format!(
                "Delete threshold must be between 0 and 100, got {}",
                percent
            )));
        }
        Ok(Self(percent))
    }

    pub fn percent(&self) -> f64 {
        self.0
    }

    /// Returns true if a document at `distance` from the baseline is dropped
    pub fn drops(&self, distance: f64) -> bool {
        distance < self.0 || distance == 0.0
    }
}

/// Removes dropped documents from the corpus
pub trait DocumentRemover {
    fn remove(&mut self, document: &Fingerprint) -> Result<()>;
}

/// The engine's memory: the last retained document.
///
/// Only updated on KEEP; dropped documents never become a baseline.
#[derive(Debug, Default)]
pub struct RetentionChain {
    baseline: Option<Fingerprint>,
}

impl RetentionChain {
    pub fn baseline(&self) -> Option<&Fingerprint> {
        self.baseline.as_ref()
    }

    pub fn retain(&mut self, fingerprint: Fingerprint) {
        self.baseline = Some(fingerprint);
    }
}

/// Stateful keep/drop engine over an ordered document sequence
#[derive(Debug)]
pub struct ChainDeduper {
    threshold: Option<Threshold>,
    dry_run: bool,
    max_tree_depth: usize,
    chain: RetentionChain,
    report: DedupReport,
}

impl ChainDeduper {
    /// Create an engine; without a threshold every document is kept and
    /// distances are only reported
    pub fn new(threshold: Option<Threshold>) -> Self {
        Self {
            threshold,
            dry_run: false,
            max_tree_depth: DEFAULT_MAX_TREE_DEPTH,
            chain: RetentionChain::default(),
            report: DedupReport {
                threshold: threshold.map(|t| t.percent()),
                ..Default::default()
            },
        }
    }

    /// Build an engine from a validated configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        let threshold = config.delete_threshold.map(Threshold::new).transpose()?;
        Ok(Self::new(threshold)
            .with_dry_run(config.dry_run)
            .with_max_tree_depth(config.max_tree_depth))
    }

    /// Report DROP decisions without removing anything
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Configure the nesting bound used when fingerprinting documents
    pub fn with_max_tree_depth(mut self, max_tree_depth: usize) -> Self {
        self.max_tree_depth = max_tree_depth;
        self
    }

    /// Run the chain over parsed documents
    pub fn run<I, R>(self, documents: I, remover: &mut R) -> DedupReport
    where
        I: IntoIterator<Item = std::result::Result<Document, DocumentError>>,
        R: DocumentRemover + ?Sized,
    {
        let max_depth = self.max_tree_depth;
        let fingerprints = documents.into_iter().map(|loaded| {
            loaded.and_then(|document| {
                Fingerprint::from_document(&document, max_depth)
                    .map_err(|e| DocumentError::new(document.name.clone(), &e))
            })
        });
        self.run_fingerprints(fingerprints, remover)
    }

    /// Run the chain over documents fingerprinted ahead of time
    pub fn run_fingerprints<I, R>(mut self, fingerprints: I, remover: &mut R) -> DedupReport
    where
        I: IntoIterator<Item = std::result::Result<Fingerprint, DocumentError>>,
        R: DocumentRemover + ?Sized,
    {
        for fingerprint in fingerprints {
            self.push(fingerprint, remover);
        }
        self.finish()
    }

    /// Process the next document in sequence and return its report line
    pub fn push<R>(
        &mut self,
        loaded: std::result::Result<Fingerprint, DocumentError>,
        remover: &mut R,
    ) -> &ReportEntry
    where
        R: DocumentRemover + ?Sized,
    {
        self.report.summary.total_processed += 1;

        let fingerprint = match loaded {
            Ok(fingerprint) => fingerprint,
            Err(skipped) => {
                self.report.summary.total_errors += 1;
                return self.record(ReportEntry::Skipped(skipped));
            }
        };

        let (distance, compared_against) = match self.chain.baseline() {
            Some(baseline) => (baseline.distance(&fingerprint), baseline.name.clone()),
            None => {
                let name = fingerprint.name.clone();
                self.chain.retain(fingerprint);
                return self.record(ReportEntry::Initial(name));
            }
        };

        self.report.summary.total_compared += 1;

        let decision = match self.threshold {
            Some(threshold) if threshold.drops(distance) => Decision::Drop,
            _ => Decision::Keep,
        };

        let outcome = match decision {
            Decision::Keep => Outcome::Kept,
            Decision::Drop => self.drop_document(&fingerprint, remover),
        };

        let record = ComparisonRecord {
            filename: fingerprint.name.clone(),
            compared_against,
            distance_percent: distance,
            decision,
            outcome,
        };

        if decision == Decision::Keep {
            self.chain.retain(fingerprint);
        }

        self.record(ReportEntry::Compared(record))
    }

    /// Consume the engine and return the accumulated report
    pub fn finish(self) -> DedupReport {
        self.report
    }

    fn drop_document<R>(&mut self, fingerprint: &Fingerprint, remover: &mut R) -> Outcome
    where
        R: DocumentRemover + ?Sized,
    {
        self.report.summary.total_dropped += 1;

        if self.dry_run {
            return Outcome::WouldDelete;
        }

        match remover.remove(fingerprint) {
            Ok(()) => {
                self.report.summary.total_deleted += 1;
                Outcome::Deleted
            }
            Err(e) => {
                error!("Failed to delete {}: {}", fingerprint.name, e);
                self.report.summary.total_errors += 1;
                let message = match e {
                    Error::Delete { source, .. } => source.to_string(),
                    other => other.to_string(),
                };
                Outcome::DeleteFailed(message)
            }
        }
    }

    fn record(&mut self, entry: ReportEntry) -> &ReportEntry {
        log_report_entry(&entry);
        self.report.entries.push(entry);
        &self.report.entries[self.report.entries.len() - 1]
    }
}
