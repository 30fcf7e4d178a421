use log::{debug, warn};
use rayon::prelude::*;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::metric::Fingerprint;
use crate::types::{Document, DocumentError, MetadataTree};

/// Prefix of macOS resource-fork files
const RESOURCE_FORK_PREFIX: &str = "._";

/// Discover document files under `directory`, sorted by path.
///
/// A missing or unlistable directory is fatal; unreadable entries below it
/// are logged and skipped. Symlinked documents are followed.
pub fn discover_documents(directory: &Path, config: &Config) -> Result<Vec<PathBuf>> {
    if !directory.is_dir() {
        return Err(Error::FileNotFound(directory.to_path_buf()));
    }

    let max_depth = config.max_depth.unwrap_or(usize::MAX);
    let mut documents = Vec::new();

    for entry in WalkDir::new(directory)
        .max_depth(max_depth)
        .follow_links(true)
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.depth() == 0 => return Err(Error::Io(e.into())),
            Err(e) => {
                warn!("Error reading directory entry: {}", e);
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        if config.skip_hidden_resource_forks && is_resource_fork(path) {
            debug!("Skipping resource fork: {}", path.display());
            continue;
        }

        if has_document_extension(path, &config.extensions) {
            documents.push(path.to_path_buf());
        }
    }

    // Byte order of the whole path, so "a.json" sorts before "a/x.json"
    documents.sort_by(|a, b| a.as_os_str().cmp(b.as_os_str()));
    Ok(documents)
}

/// Returns true if the path has one of the given extensions, ignoring case
pub fn has_document_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
}

fn is_resource_fork(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.starts_with(RESOURCE_FORK_PREFIX))
}

/// Name a document by its path relative to the scanned root
pub fn document_name(path: &Path, root: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .into_owned()
}

/// Load and parse one document
pub fn load_document(path: &Path, root: &Path) -> Result<Document> {
    let file = File::open(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => Error::FileNotFound(path.to_path_buf()),
        _ => Error::Io(e),
    })?;

    let tree: MetadataTree =
        serde_json::from_reader(BufReader::new(file)).map_err(|source| Error::Parse {
            path: path.to_path_buf(),
            source,
        })?;

    Ok(Document::with_path(document_name(path, root), path, tree))
}

/// Load and fingerprint documents in parallel, preserving input order.
///
/// Only the path sets are kept; the parsed trees are dropped as soon as
/// they have been fingerprinted.
pub fn load_fingerprints(
    paths: &[PathBuf],
    root: &Path,
    max_tree_depth: usize,
) -> Vec<std::result::Result<Fingerprint, DocumentError>> {
    paths
        .par_iter()
        .map(|path| {
            load_document(path, root)
                .and_then(|document| Fingerprint::from_document(&document, max_tree_depth))
                .map_err(|e| DocumentError::new(document_name(path, root), &e))
        })
        .collect()
}

// -- Tests --
