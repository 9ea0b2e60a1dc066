//! `skipped/` and `to-check/` folders of snapshot copies.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::OutputSink;
use crate::error::{RegenError, Result};
use crate::files::filename;
use crate::snapshots::Snapshot;

pub const SKIPPED_DIR: &str = "skipped";
pub const TO_CHECK_DIR: &str = "to-check";

/// Copies snapshots under `<root>/skipped/<service>/<type>/` and
/// `<root>/to-check/<service>/<type>/`.
#[derive(Debug)]
pub struct ReviewOutput {
    root: PathBuf,
    bytes_written: u64,
}

impl ReviewOutput {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| RegenError::access(&root, e))?;
        Ok(Self {
            root,
            bytes_written: 0,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn skipped_path(&self) -> PathBuf {
        self.root.join(SKIPPED_DIR)
    }

    pub fn to_check_path(&self) -> PathBuf {
        self.root.join(TO_CHECK_DIR)
    }

    /// Create one folder per document in both trees.
    pub fn init_folders(&self, documents: &[(String, String)]) -> Result<()> {
        for folder in [self.skipped_path(), self.to_check_path()] {
            for (service_id, document_type) in documents {
                let path = document_folder(&folder, service_id, document_type);
                fs::create_dir_all(&path).map_err(|e| RegenError::access(&path, e))?;
            }
        }
        Ok(())
    }

    fn write(&mut self, folder: PathBuf, snapshot: &Snapshot) -> Result<PathBuf> {
        let dir = document_folder(&folder, &snapshot.service_id, &snapshot.document_type);
        fs::create_dir_all(&dir).map_err(|e| RegenError::access(&dir, e))?;

        let path = dir.join(filename::snapshot_filename(
            &snapshot.fetch_date,
            &snapshot.id,
            "html",
        ));
        fs::write(&path, &snapshot.content).map_err(|e| RegenError::access(&path, e))?;
        self.bytes_written += snapshot.content.len() as u64;
        Ok(path)
    }
}

fn document_folder(folder: &Path, service_id: &str, document_type: &str) -> PathBuf {
    folder
        .join(filename::sanitize(service_id))
        .join(filename::sanitize(document_type))
}

impl OutputSink for ReviewOutput {
    fn save_skipped(&mut self, snapshot: &Snapshot) -> Result<PathBuf> {
        self.write(self.skipped_path(), snapshot)
    }

    fn save_for_review(&mut self, snapshot: &Snapshot) -> Result<PathBuf> {
        self.write(self.to_check_path(), snapshot)
    }

    fn finalize(&mut self) -> Result<()> {
        for folder in [self.skipped_path(), self.to_check_path()] {
            if folder.exists() {
                prune_empty(&folder, 2)?;
            }
        }
        Ok(())
    }

    fn bytes_written(&self) -> u64 {
        self.bytes_written
    }
}

/// Remove empty directories up to `depth` levels below `dir`, deepest first.
fn prune_empty(dir: &Path, depth: usize) -> Result<()> {
    if depth == 0 {
        return Ok(());
    }

    let entries = fs::read_dir(dir).map_err(|e| RegenError::access(dir, e))?;
    for entry in entries {
        let path = entry.map_err(|e| RegenError::access(dir, e))?.path();
        if !path.is_dir() {
            continue;
        }
        prune_empty(&path, depth - 1)?;

        let is_empty = fs::read_dir(&path)
            .map_err(|e| RegenError::access(&path, e))?
            .next()
            .is_none();
        if is_empty {
            debug!("Removing empty folder {}", path.display());
            fs::remove_dir(&path).map_err(|e| RegenError::access(&path, e))?;
        }
    }
    Ok(())
}
