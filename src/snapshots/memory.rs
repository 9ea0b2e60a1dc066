//! In-memory snapshot store (tests and fixtures).

use chrono::{DateTime, Utc};

use super::{Snapshot, SnapshotFilter, SnapshotIter, SnapshotRepository};
use crate::error::{RegenError, Result};

#[derive(Debug, Default, Clone)]
pub struct MemorySnapshotRepository {
    snapshots: Vec<Snapshot>,
}

impl MemorySnapshotRepository {
    pub fn new(mut snapshots: Vec<Snapshot>) -> Self {
        snapshots.sort_by_key(|s| s.fetch_date);
        Self { snapshots }
    }

    pub fn push(&mut self, snapshot: Snapshot) {
        let position = self
            .snapshots
            .partition_point(|s| s.fetch_date <= snapshot.fetch_date);
        self.snapshots.insert(position, snapshot);
    }
}

impl SnapshotRepository for MemorySnapshotRepository {
    fn count(&self) -> Result<usize> {
        Ok(self.snapshots.len())
    }

    fn count_matching(&self, filter: &SnapshotFilter) -> Result<usize> {
        Ok(self
            .snapshots
            .iter()
            .filter(|s| filter.matches_snapshot(s))
            .count())
    }

    fn iterate<'a>(
        &'a self,
        filter: &SnapshotFilter,
        resume_from: Option<&str>,
    ) -> Result<SnapshotIter<'a>> {
        let start = match resume_from {
            None => 0,
            Some(id) => {
                self.snapshots
                    .iter()
                    .position(|s| s.id == id)
                    .ok_or_else(|| RegenError::NotFound { id: id.to_string() })?
                    + 1
            }
        };
        let filter = filter.clone();

        Ok(Box::new(
            self.snapshots[start..]
                .iter()
                .filter(move |s| filter.matches_snapshot(s))
                .cloned()
                .map(Ok),
        ))
    }

    fn find_by_id(&self, id: &str) -> Result<Snapshot> {
        self.snapshots
            .iter()
            .find(|s| s.id == id)
            .cloned()
            .ok_or_else(|| RegenError::NotFound { id: id.to_string() })
    }

    fn latest_fetch_date(&self, filter: &SnapshotFilter) -> Result<Option<DateTime<Utc>>> {
        Ok(self
            .snapshots
            .iter()
            .rev()
            .find(|s| filter.matches_snapshot(s))
            .map(|s| s.fetch_date))
    }
}
