//! Directory-backed version store.
//!
//! Layout:
//!
//! ```text
//! <root>/versions.jsonl                          one line per accepted version
//! <root>/<service>/<type>.md                     latest content of each document
//! <root>/.history/<service>/<type>/<file>.md     every accepted version
//! ```

use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{VersionRecord, VersionRepository};
use crate::error::{RegenError, Result};
use crate::files::{filename, write_atomic};

pub const VERSIONS_INDEX: &str = "versions.jsonl";
const HISTORY_DIR: &str = ".history";

/// Metadata line of the version index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionEntry {
    pub id: String,
    pub service_id: String,
    pub document_type: String,
    pub snapshot_ids: Vec<String>,
    pub fetch_date: DateTime<Utc>,
    pub mime_type: String,
    /// Archived copy, relative to the store root.
    pub path: String,
}

#[derive(Debug)]
pub struct FsVersionRepository {
    root: PathBuf,
    entries: Vec<VersionEntry>,
}

impl FsVersionRepository {
    /// Open the store at `root`. A missing index is an empty store.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let index_path = root.join(VERSIONS_INDEX);

        let mut entries = Vec::new();
        if index_path.exists() {
            let file = fs::File::open(&index_path).map_err(|e| RegenError::access(&index_path, e))?;
            for line in BufReader::new(file).lines() {
                let line = line.map_err(|e| RegenError::access(&index_path, e))?;
                if line.trim().is_empty() {
                    continue;
                }
                entries.push(serde_json::from_str(&line)?);
            }
        }
        debug!("Loaded {} version entries from {}", entries.len(), root.display());

        Ok(Self { root, entries })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn entries(&self) -> &[VersionEntry] {
        &self.entries
    }

    /// Path of the latest content of a document.
    pub fn latest_path(&self, service_id: &str, document_type: &str) -> PathBuf {
        self.root
            .join(filename::sanitize(service_id))
            .join(format!("{}.md", filename::sanitize(document_type)))
    }

    fn history_relative_path(record: &VersionRecord, id: &str) -> String {
        format!(
            "{}/{}/{}/{}",
            HISTORY_DIR,
            filename::sanitize(&record.service_id),
            filename::sanitize(&record.document_type),
            filename::snapshot_filename(&record.fetch_date, &id[..12], "md")
        )
    }
}

impl VersionRepository for FsVersionRepository {
    fn find_latest(&self, service_id: &str, document_type: &str) -> Result<Option<String>> {
        let path = self.latest_path(service_id, document_type);
        match fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(RegenError::access(&path, e)),
        }
    }

    fn save(&mut self, record: &VersionRecord) -> Result<String> {
        let id = record.id();

        if let Some(last) = self
            .entries
            .iter()
            .rev()
            .find(|e| e.service_id == record.service_id && e.document_type == record.document_type)
        {
            if last.fetch_date > record.fetch_date {
                warn!(
                    "Recording a version of {} - {} older than the previous one ({} < {})",
                    record.service_id, record.document_type, record.fetch_date, last.fetch_date
                );
            }
        }

        let relative = Self::history_relative_path(record, &id);
        write_atomic(&self.root.join(&relative), record.content.as_bytes())?;
        write_atomic(
            &self.latest_path(&record.service_id, &record.document_type),
            record.content.as_bytes(),
        )?;

        let entry = VersionEntry {
            id: id.clone(),
            service_id: record.service_id.clone(),
            document_type: record.document_type.clone(),
            snapshot_ids: record.snapshot_ids.clone(),
            fetch_date: record.fetch_date,
            mime_type: record.mime_type.clone(),
            path: relative,
        };

        let index_path = self.root.join(VERSIONS_INDEX);
        let mut index = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&index_path)
            .map_err(|e| RegenError::access(&index_path, e))?;
        writeln!(index, "{}", serde_json::to_string(&entry)?)
            .map_err(|e| RegenError::access(&index_path, e))?;

        self.entries.push(entry);
        Ok(id)
    }

    /// Removes what this store wrote: the index, the history folder and the
    /// latest copies of every recorded document. Other files are left alone.
    fn remove_all(&mut self) -> Result<()> {
        let history = self.root.join(HISTORY_DIR);
        if history.exists() {
            fs::remove_dir_all(&history).map_err(|e| RegenError::access(&history, e))?;
        }

        for entry in &self.entries {
            let latest = self.latest_path(&entry.service_id, &entry.document_type);
            match fs::remove_file(&latest) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(RegenError::access(&latest, e)),
            }
            if let Some(service_dir) = latest.parent() {
                // Only succeeds once the folder is empty
                let _ = fs::remove_dir(service_dir);
            }
        }

        let index_path = self.root.join(VERSIONS_INDEX);
        if index_path.exists() {
            fs::remove_file(&index_path).map_err(|e| RegenError::access(&index_path, e))?;
        }

        debug!("Removed {} versions from {}", self.entries.len(), self.root.display());
        self.entries.clear();
        Ok(())
    }

    fn count(&self) -> Result<usize> {
        Ok(self.entries.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn record(content: &str, day: u32) -> VersionRecord {
        VersionRecord::new(
            "svc",
            "Terms of Service",
            content,
            vec![format!("snap-{}", day)],
            Utc.with_ymd_and_hms(2023, 1, day, 0, 0, 0).unwrap(),
        )
    }

    #[test]
    fn missing_document_has_no_latest_version() {
        let dir = TempDir::new().unwrap();
        let repo = FsVersionRepository::open(dir.path()).unwrap();
        assert_eq!(repo.find_latest("svc", "Terms of Service").unwrap(), None);
    }

    #[test]
    fn save_updates_latest_and_index() {
        let dir = TempDir::new().unwrap();
        let mut repo = FsVersionRepository::open(dir.path()).unwrap();

        let first = repo.save(&record("Hello world", 1)).unwrap();
        repo.save(&record("Hello world v2", 2)).unwrap();

        assert_eq!(
            repo.find_latest("svc", "Terms of Service").unwrap().as_deref(),
            Some("Hello world v2")
        );

        let reopened = FsVersionRepository::open(dir.path()).unwrap();
        assert_eq!(reopened.count().unwrap(), 2);
        assert_eq!(reopened.entries()[0].id, first);
        assert_eq!(reopened.entries()[0].snapshot_ids, vec!["snap-1"]);
        let archived = dir.path().join(&reopened.entries()[0].path);
        assert_eq!(fs::read_to_string(archived).unwrap(), "Hello world");
    }

    #[test]
    fn remove_all_keeps_unrelated_files() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("README.md"), "keep me").unwrap();
        let mut repo = FsVersionRepository::open(dir.path()).unwrap();
        repo.save(&record("Hello world", 1)).unwrap();

        repo.remove_all().unwrap();

        assert_eq!(repo.count().unwrap(), 0);
        assert_eq!(repo.find_latest("svc", "Terms of Service").unwrap(), None);
        assert!(!dir.path().join(VERSIONS_INDEX).exists());
        assert!(!dir.path().join("svc").exists());
        assert!(dir.path().join("README.md").exists());
    }
}
