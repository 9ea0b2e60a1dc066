//! Buffering of page snapshots until a multi-page document is complete.

use indexmap::IndexMap;
use tracing::debug;

use crate::declarations::DocumentDeclaration;
use crate::error::{RegenError, Result};
use crate::snapshots::Snapshot;

/// What happened to a submitted snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    /// Every declared page is present, in declared page order.
    Complete(Vec<Snapshot>),
    /// `page` of `total` pages collected so far.
    Waiting { page: usize, total: usize },
}

/// One buffer per `(serviceId, documentType)`, holding the pages of the
/// capture cycle in flight.
#[derive(Debug, Default)]
pub struct MultiPageAggregator {
    buffers: IndexMap<(String, String), Vec<Snapshot>>,
}

impl MultiPageAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a snapshot to the buffer of its document.
    ///
    /// Single-page documents complete immediately. A snapshot referring to a
    /// page the declaration does not have is a
    /// [`RegenError::PageDeclarationMismatch`]. A page already buffered is
    /// replaced by the newer capture.
    pub fn submit(
        &mut self,
        snapshot: Snapshot,
        declaration: &DocumentDeclaration,
    ) -> Result<Submission> {
        if declaration.page_for(snapshot.page_id.as_deref()).is_none() {
            return Err(RegenError::PageDeclarationMismatch {
                snapshot_id: snapshot.id.clone(),
                service_id: declaration.service_id.clone(),
                document_type: declaration.document_type.clone(),
                page_id: snapshot.page_id.clone().unwrap_or_default(),
            });
        }

        if !declaration.is_multi_page() {
            return Ok(Submission::Complete(vec![snapshot]));
        }

        let key = (
            declaration.service_id.clone(),
            declaration.document_type.clone(),
        );
        let buffer = self.buffers.entry(key.clone()).or_default();
        if let Some(existing) = buffer.iter().position(|s| s.page_id == snapshot.page_id) {
            debug!(
                "Replacing buffered page {:?} ({} → {})",
                snapshot.page_id, buffer[existing].id, snapshot.id
            );
            buffer.remove(existing);
        }
        buffer.push(snapshot);

        let total = declaration.pages.len();
        if buffer.len() < total {
            return Ok(Submission::Waiting {
                page: buffer.len(),
                total,
            });
        }

        let mut pages = self.buffers.shift_remove(&key).unwrap_or_default();
        pages.sort_by_key(|s| {
            s.page_id
                .as_deref()
                .and_then(|id| declaration.page_index(id))
                .unwrap_or(usize::MAX)
        });
        Ok(Submission::Complete(pages))
    }

    /// Ids of every buffered snapshot, in arrival order per document.
    pub fn pending_ids(&self) -> Vec<String> {
        self.buffers
            .values()
            .flatten()
            .map(|s| s.id.clone())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }
}
