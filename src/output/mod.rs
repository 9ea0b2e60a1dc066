//! Review artifacts written while regenerating.
//!
//! Skipped snapshots and snapshots an operator should look at are copied out
//! of the snapshot store so they can be opened in a browser.

mod memory;
mod review;

pub use memory::MemoryOutput;
pub use review::{ReviewOutput, SKIPPED_DIR, TO_CHECK_DIR};

use std::path::PathBuf;

use crate::error::Result;
use crate::snapshots::Snapshot;

pub trait OutputSink {
    /// Keep a copy of a snapshot that did not produce a version.
    fn save_skipped(&mut self, snapshot: &Snapshot) -> Result<PathBuf>;

    /// Keep a copy of a snapshot that needs a human look.
    fn save_for_review(&mut self, snapshot: &Snapshot) -> Result<PathBuf>;

    /// Prune folders left empty.
    fn finalize(&mut self) -> Result<()>;

    /// Total size of the artifacts written so far.
    fn bytes_written(&self) -> u64 {
        0
    }
}
