//! In-memory version store (tests and dry runs).

use super::{VersionRecord, VersionRepository};
use crate::error::Result;

#[derive(Debug, Default, Clone)]
pub struct MemoryVersionRepository {
    records: Vec<VersionRecord>,
}

impl MemoryVersionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every recorded version, oldest first.
    pub fn records(&self) -> &[VersionRecord] {
        &self.records
    }
}

impl VersionRepository for MemoryVersionRepository {
    fn find_latest(&self, service_id: &str, document_type: &str) -> Result<Option<String>> {
        Ok(self
            .records
            .iter()
            .rev()
            .find(|r| r.service_id == service_id && r.document_type == document_type)
            .map(|r| r.content.clone()))
    }

    fn save(&mut self, record: &VersionRecord) -> Result<String> {
        self.records.push(record.clone());
        Ok(record.id())
    }

    fn remove_all(&mut self) -> Result<()> {
        self.records.clear();
        Ok(())
    }

    fn count(&self) -> Result<usize> {
        Ok(self.records.len())
    }
}
