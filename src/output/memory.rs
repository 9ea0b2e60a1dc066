use std::path::PathBuf;

use super::OutputSink;
use crate::error::Result;
use crate::snapshots::Snapshot;

/// Sink recording snapshot ids only.
#[derive(Debug, Default, Clone)]
pub struct MemoryOutput {
    pub skipped: Vec<String>,
    pub to_check: Vec<String>,
    pub finalized: bool,
}

impl MemoryOutput {
    pub fn new() -> Self {
        Self::default()
    }
}

impl OutputSink for MemoryOutput {
    fn save_skipped(&mut self, snapshot: &Snapshot) -> Result<PathBuf> {
        self.skipped.push(snapshot.id.clone());
        Ok(PathBuf::from("skipped").join(&snapshot.id))
    }

    fn save_for_review(&mut self, snapshot: &Snapshot) -> Result<PathBuf> {
        self.to_check.push(snapshot.id.clone());
        Ok(PathBuf::from("to-check").join(&snapshot.id))
    }

    fn finalize(&mut self) -> Result<()> {
        self.finalized = true;
        Ok(())
    }
}
