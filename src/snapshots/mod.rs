//! Snapshot source: ordered, filterable, resumable access to raw captures.
//!
//! A [`SnapshotRepository`] yields snapshots in absolute order (fetch date,
//! ties kept in storage order). Filtering never reorders, and resuming from a
//! snapshot id starts strictly after that id in the absolute order, which is
//! what makes an interrupted run continue exactly where it stopped.

mod fs;
mod memory;

pub use fs::{FsSnapshotRepository, SnapshotEntry, INDEX_FILENAME};
pub use memory::MemorySnapshotRepository;

use chrono::{DateTime, Utc};

use crate::error::Result;

/// One immutable capture of one page at one point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub id: String,
    pub service_id: String,
    pub document_type: String,
    /// Set for pages of multi-page documents.
    pub page_id: Option<String>,
    pub fetch_date: DateTime<Utc>,
    pub content: String,
    pub mime_type: String,
}

impl Snapshot {
    /// `(service_id, document_type)` pair identifying the document.
    pub fn document_key(&self) -> (String, String) {
        (self.service_id.clone(), self.document_type.clone())
    }

    /// Path-like name used for filtering, e.g. `svc/Terms of Service` or
    /// `svc/Terms of Service #page` for pages of multi-page documents.
    pub fn path_key(&self) -> String {
        path_key(&self.service_id, &self.document_type, self.page_id.as_deref())
    }
}

pub(crate) fn path_key(service_id: &str, document_type: &str, page_id: Option<&str>) -> String {
    match page_id {
        Some(page) => format!("{}/{} #{}", service_id, document_type, page),
        None => format!("{}/{}", service_id, document_type),
    }
}

/// Restricts iteration to some services and document types.
///
/// Both fields accept `*` wildcards. A filter on a document type also matches
/// the page-qualified names of that document's pages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotFilter {
    pub service_id: String,
    pub document_type: String,
}

impl Default for SnapshotFilter {
    fn default() -> Self {
        Self::all()
    }
}

impl SnapshotFilter {
    pub fn new(service_id: impl Into<String>, document_type: impl Into<String>) -> Self {
        Self {
            service_id: service_id.into(),
            document_type: document_type.into(),
        }
    }

    /// Matches every snapshot.
    pub fn all() -> Self {
        Self::new("*", "*")
    }

    /// Whether the filter restricts anything at all.
    pub fn is_restricted(&self) -> bool {
        self.service_id != "*" || self.document_type != "*"
    }

    /// Whether it designates exactly one document.
    pub fn is_single_document(&self) -> bool {
        !self.service_id.contains('*') && !self.document_type.contains('*')
    }

    /// Glob patterns tested against snapshot path keys.
    pub fn patterns(&self) -> [String; 2] {
        let base = format!("{}/{}", self.service_id, self.document_type);
        let paged = format!("{} #*", base);
        [base, paged]
    }

    pub fn matches(&self, service_id: &str, document_type: &str, page_id: Option<&str>) -> bool {
        let key = path_key(service_id, document_type, page_id);
        self.patterns()
            .iter()
            .any(|pattern| glob_match(pattern, &key))
    }

    pub fn matches_snapshot(&self, snapshot: &Snapshot) -> bool {
        self.matches(
            &snapshot.service_id,
            &snapshot.document_type,
            snapshot.page_id.as_deref(),
        )
    }
}

/// Minimal glob matching where `*` matches any run of characters.
pub fn glob_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();

    let (mut p, mut t) = (0, 0);
    let mut star: Option<usize> = None;
    let mut star_t = 0;

    while t < text.len() {
        if p < pattern.len() && pattern[p] != '*' && pattern[p] == text[t] {
            p += 1;
            t += 1;
        } else if p < pattern.len() && pattern[p] == '*' {
            star = Some(p);
            star_t = t;
            p += 1;
        } else if let Some(s) = star {
            p = s + 1;
            star_t += 1;
            t = star_t;
        } else {
            return false;
        }
    }

    pattern[p..].iter().all(|&c| c == '*')
}

/// Lazy sequence of snapshots produced by a repository.
pub type SnapshotIter<'a> = Box<dyn Iterator<Item = Result<Snapshot>> + 'a>;

/// Backing store of captured snapshots.
pub trait SnapshotRepository {
    /// Total number of snapshots, irrespective of any filter.
    fn count(&self) -> Result<usize>;

    /// Number of snapshots a filter would yield from the start.
    fn count_matching(&self, filter: &SnapshotFilter) -> Result<usize>;

    /// Ordered snapshots matching `filter`.
    ///
    /// With `resume_from`, iteration starts strictly after that snapshot in
    /// the absolute order. An unknown id is a [`RegenError::NotFound`].
    ///
    /// [`RegenError::NotFound`]: crate::RegenError::NotFound
    fn iterate<'a>(
        &'a self,
        filter: &SnapshotFilter,
        resume_from: Option<&str>,
    ) -> Result<SnapshotIter<'a>>;

    /// Fetch one snapshot by id.
    fn find_by_id(&self, id: &str) -> Result<Snapshot>;

    /// Fetch date of the last snapshot a filter would yield.
    fn latest_fetch_date(&self, filter: &SnapshotFilter) -> Result<Option<DateTime<Utc>>>;
}
