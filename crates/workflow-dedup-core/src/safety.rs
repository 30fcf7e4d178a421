use std::fs;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::dedup::DocumentRemover;
use crate::error::{Error, Result};
use crate::logging::{log_file_error, log_fs_modification};
use crate::metric::Fingerprint;

/// Removes dropped documents from disk, optionally keeping a backup copy
pub struct SafetyManager {
    backup_dir: Option<PathBuf>,
}

impl SafetyManager {
    /// Create a new SafetyManager with the provided configuration
    pub fn new(config: &Config) -> Self {
        Self {
            backup_dir: config.backup_dir.clone(),
        }
    }

    /// Copy `document` into the backup directory, never overwriting
    fn backup(&self, backup_dir: &Path, document: &Fingerprint) -> std::io::Result<PathBuf> {
        let relative = Path::new(&document.name);
        let target = if relative.is_relative() {
            backup_dir.join(relative)
        } else {
            backup_dir.join(document.path.file_name().unwrap_or(relative.as_os_str()))
        };
        let target = unique_path(target);

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(&document.path, &target)?;
        Ok(target)
    }
}

impl DocumentRemover for SafetyManager {
    fn remove(&mut self, document: &Fingerprint) -> Result<()> {
        let path = &document.path;

        if let Some(backup_dir) = &self.backup_dir {
            match self.backup(backup_dir, document) {
                Ok(target) => {
                    let details = format!("Backup at {}", target.display());
                    log_fs_modification("backup", path, Some(&details));
                }
                Err(source) => {
                    log_file_error(path, "backup", &source);
                    return Err(Error::Delete {
                        path: path.clone(),
                        source,
                    });
                }
            }
        }

        if let Err(source) = fs::remove_file(path) {
            log_file_error(path, "remove", &source);
            return Err(Error::Delete {
                path: path.clone(),
                source,
            });
        }

        log_fs_modification("delete", path, None);
        Ok(())
    }
}

/// `target`, or `stem.N.ext` for the first N that does not exist yet
fn unique_path(target: PathBuf) -> PathBuf {
    if !target.exists() {
        return target;
    }

    let stem = target
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = target
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    let mut n = 1;
    loop {
        let candidate = target.with_file_name(format!("{}.{}{}", stem, n, extension));
        if !candidate.exists() {
            return candidate;
        }
        n += 1;
    }
}
