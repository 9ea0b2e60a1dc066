//! Target store of regenerated versions.
//!
//! The pipeline only ever asks two things of it: what is the last accepted
//! content of a document, and record this new one.

mod fs;
mod memory;

pub use fs::{FsVersionRepository, VersionEntry, VERSIONS_INDEX};
pub use memory::MemoryVersionRepository;

use chrono::{DateTime, SecondsFormat, Utc};
use sha2::{Digest, Sha256};

use crate::error::Result;

/// MIME type of every regenerated version.
pub const VERSION_MIME_TYPE: &str = "text/markdown";

/// Extracted content of a document at one point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRecord {
    pub content: String,
    pub service_id: String,
    pub document_type: String,
    /// Source snapshots, in declared page order for multi-page documents.
    pub snapshot_ids: Vec<String>,
    pub fetch_date: DateTime<Utc>,
    pub mime_type: String,
}

impl VersionRecord {
    pub fn new(
        service_id: impl Into<String>,
        document_type: impl Into<String>,
        content: impl Into<String>,
        snapshot_ids: Vec<String>,
        fetch_date: DateTime<Utc>,
    ) -> Self {
        Self {
            content: content.into(),
            service_id: service_id.into(),
            document_type: document_type.into(),
            snapshot_ids,
            fetch_date,
            mime_type: VERSION_MIME_TYPE.to_string(),
        }
    }

    /// Content-addressed id: SHA-256 of document, fetch date and content.
    pub fn id(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.service_id.as_bytes());
        hasher.update([0]);
        hasher.update(self.document_type.as_bytes());
        hasher.update([0]);
        hasher.update(
            self.fetch_date
                .to_rfc3339_opts(SecondsFormat::Millis, true)
                .as_bytes(),
        );
        hasher.update([0]);
        hasher.update(self.content.as_bytes());
        hex::encode(hasher.finalize())
    }
}

/// Backing store of accepted versions.
pub trait VersionRepository {
    /// Content of the last accepted version, `None` when there is none.
    fn find_latest(&self, service_id: &str, document_type: &str) -> Result<Option<String>>;

    /// Record a version and return its id.
    fn save(&mut self, record: &VersionRecord) -> Result<String>;

    /// Drop every recorded version.
    fn remove_all(&mut self) -> Result<()>;

    fn count(&self) -> Result<usize>;
}
