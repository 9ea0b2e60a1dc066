//! Classification of new content against the last accepted version.

use tracing::debug;

use super::diff::TextDiff;
use crate::error::Result;
use crate::versions::VersionRepository;

pub const IDENTICAL_REASON: &str = "version is identical to previous";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// No previous version: always accepted.
    First,
    Duplicate { reason: String },
    Changed { diff: TextDiff },
}

impl Classification {
    pub fn is_skip(&self) -> bool {
        matches!(self, Self::Duplicate { .. })
    }
}

pub struct DiffDeduplicator<'a> {
    versions: &'a dyn VersionRepository,
}

impl<'a> DiffDeduplicator<'a> {
    pub fn new(versions: &'a dyn VersionRepository) -> Self {
        Self { versions }
    }

    /// A store that cannot find anything for the document counts as "no
    /// previous version", not as a failure.
    pub fn classify(
        &self,
        service_id: &str,
        document_type: &str,
        content: &str,
    ) -> Result<Classification> {
        let previous = match self.versions.find_latest(service_id, document_type) {
            Ok(previous) => previous,
            Err(e) if e.is_not_found() => {
                debug!("No previous version accessible: {}", e);
                None
            }
            Err(e) => return Err(e),
        };

        let Some(previous) = previous else {
            return Ok(Classification::First);
        };

        if previous == content {
            return Ok(Classification::Duplicate {
                reason: IDENTICAL_REASON.to_string(),
            });
        }

        Ok(Classification::Changed {
            diff: TextDiff::lines(&previous, content),
        })
    }
}
