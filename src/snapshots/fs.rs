//! Directory-backed snapshot store.
//!
//! Layout:
//!
//! ```text
//! <root>/index.jsonl                      one metadata line per snapshot
//! <root>/<service>/<type>/<file>.html     raw captured content
//! ```
//!
//! The index is small and read once; content files are only read when the
//! corresponding snapshot is yielded.

use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{Snapshot, SnapshotFilter, SnapshotIter, SnapshotRepository};
use crate::error::{RegenError, Result};
use crate::files::filename;

pub const INDEX_FILENAME: &str = "index.jsonl";

/// Metadata line of the snapshot index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotEntry {
    pub id: String,
    pub service_id: String,
    pub document_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_id: Option<String>,
    pub fetch_date: DateTime<Utc>,
    pub mime_type: String,
    /// Content file, relative to the store root.
    pub path: String,
}

impl SnapshotEntry {
    fn matches(&self, filter: &SnapshotFilter) -> bool {
        filter.matches(&self.service_id, &self.document_type, self.page_id.as_deref())
    }
}

pub struct FsSnapshotRepository {
    root: PathBuf,
    entries: Vec<SnapshotEntry>,
}

impl FsSnapshotRepository {
    /// Open the store at `root`. A missing index is an empty store.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let index_path = root.join(INDEX_FILENAME);

        let mut entries = Vec::new();
        if index_path.exists() {
            let file = fs::File::open(&index_path).map_err(|e| RegenError::access(&index_path, e))?;
            for (line_num, line) in BufReader::new(file).lines().enumerate() {
                let line = line.map_err(|e| RegenError::access(&index_path, e))?;
                if line.trim().is_empty() {
                    continue;
                }
                let entry: SnapshotEntry = serde_json::from_str(&line).map_err(|e| {
                    RegenError::access(
                        &index_path,
                        std::io::Error::new(
                            std::io::ErrorKind::InvalidData,
                            format!("line {}: {}", line_num + 1, e),
                        ),
                    )
                })?;
                entries.push(entry);
            }
        }

        // Stable: captures sharing a fetch date keep their index order
        entries.sort_by_key(|e| e.fetch_date);
        debug!("Loaded {} snapshot entries from {}", entries.len(), root.display());

        Ok(Self { root, entries })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn entries(&self) -> &[SnapshotEntry] {
        &self.entries
    }

    /// Store a new snapshot: content file first, then its index line.
    pub fn add(&mut self, snapshot: &Snapshot) -> Result<()> {
        let mut document_dir = filename::sanitize(&snapshot.document_type);
        if let Some(page) = &snapshot.page_id {
            document_dir = format!("{} #{}", document_dir, filename::sanitize(page));
        }
        let relative = format!(
            "{}/{}/{}",
            filename::sanitize(&snapshot.service_id),
            document_dir,
            filename::snapshot_filename(
                &snapshot.fetch_date,
                &snapshot.id,
                filename::extension_for_mime(&snapshot.mime_type),
            )
        );

        let content_path = self.root.join(&relative);
        if let Some(parent) = content_path.parent() {
            fs::create_dir_all(parent).map_err(|e| RegenError::access(parent, e))?;
        }
        fs::write(&content_path, &snapshot.content).map_err(|e| RegenError::access(&content_path, e))?;

        let entry = SnapshotEntry {
            id: snapshot.id.clone(),
            service_id: snapshot.service_id.clone(),
            document_type: snapshot.document_type.clone(),
            page_id: snapshot.page_id.clone(),
            fetch_date: snapshot.fetch_date,
            mime_type: snapshot.mime_type.clone(),
            path: relative,
        };

        let index_path = self.root.join(INDEX_FILENAME);
        let mut index = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&index_path)
            .map_err(|e| RegenError::access(&index_path, e))?;
        writeln!(index, "{}", serde_json::to_string(&entry)?)
            .map_err(|e| RegenError::access(&index_path, e))?;

        // Keep the in-memory order identical to what a fresh open() would see
        let position = self
            .entries
            .partition_point(|e| e.fetch_date <= entry.fetch_date);
        self.entries.insert(position, entry);
        Ok(())
    }

    fn load(&self, entry: &SnapshotEntry) -> Result<Snapshot> {
        let path = self.root.join(&entry.path);
        let bytes = fs::read(&path).map_err(|e| RegenError::access(&path, e))?;

        // Binary captures and legacy charsets are left to extraction to reject
        let content = match String::from_utf8(bytes) {
            Ok(content) => content,
            Err(e) => {
                warn!(
                    "Snapshot {} ({}) is not valid UTF-8, decoding lossily",
                    entry.id, entry.mime_type
                );
                String::from_utf8_lossy(e.as_bytes()).into_owned()
            }
        };

        Ok(Snapshot {
            id: entry.id.clone(),
            service_id: entry.service_id.clone(),
            document_type: entry.document_type.clone(),
            page_id: entry.page_id.clone(),
            fetch_date: entry.fetch_date,
            content,
            mime_type: entry.mime_type.clone(),
        })
    }

    fn start_position(&self, resume_from: Option<&str>) -> Result<usize> {
        match resume_from {
            None => Ok(0),
            Some(id) => self
                .entries
                .iter()
                .position(|e| e.id == id)
                .map(|pos| pos + 1)
                .ok_or_else(|| RegenError::NotFound { id: id.to_string() }),
        }
    }
}

impl SnapshotRepository for FsSnapshotRepository {
    fn count(&self) -> Result<usize> {
        Ok(self.entries.len())
    }

    fn count_matching(&self, filter: &SnapshotFilter) -> Result<usize> {
        Ok(self.entries.iter().filter(|e| e.matches(filter)).count())
    }

    fn iterate<'a>(
        &'a self,
        filter: &SnapshotFilter,
        resume_from: Option<&str>,
    ) -> Result<SnapshotIter<'a>> {
        let start = self.start_position(resume_from)?;
        let filter = filter.clone();

        Ok(Box::new(
            self.entries[start..]
                .iter()
                .filter(move |e| e.matches(&filter))
                .map(move |e| self.load(e)),
        ))
    }

    fn find_by_id(&self, id: &str) -> Result<Snapshot> {
        let entry = self
            .entries
            .iter()
            .find(|e| e.id == id)
            .ok_or_else(|| RegenError::NotFound { id: id.to_string() })?;
        self.load(entry)
    }

    fn latest_fetch_date(&self, filter: &SnapshotFilter) -> Result<Option<DateTime<Utc>>> {
        Ok(self
            .entries
            .iter()
            .rev()
            .find(|e| e.matches(filter))
            .map(|e| e.fetch_date))
    }
}
