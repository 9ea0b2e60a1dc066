//! Per-snapshot state machine, outcomes and run counters.

use std::fmt;
use std::time::Duration;

use super::dedup::Classification;
use super::evaluator::Evaluation;
use crate::error::RegenError;
use crate::snapshots::Snapshot;
use crate::versions::VersionRecord;

/// Where a snapshot stands while it is being handled.
///
/// Operator decisions that change rules or declarations move a snapshot back
/// to [`SnapshotState::Pending`]; the pipeline loops instead of recursing.
#[derive(Debug)]
pub enum SnapshotState {
    Pending,
    Evaluated(Evaluation),
    /// Pages of a document ready to be extracted, in declared order.
    Assembled(Vec<Snapshot>),
    Classified {
        record: VersionRecord,
        classification: Classification,
    },
    /// A per-snapshot failure (extraction, page mismatch).
    Failed(RegenError),
    Terminal(Outcome),
}

/// Final result of handling one snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Accepted { version_id: String, first: bool },
    SnapshotSkipped { reason: String },
    VersionSkipped { reason: String },
    Waiting { page: usize, total: usize },
    DeclarationAbsent,
    /// Unprocessable content identical to one already marked as such.
    KnownUnprocessable,
    Failed { reason: String },
}

/// What the operator chose for a version or a failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Record the version.
    Keep,
    /// Decide later: record the version if there is one, move on otherwise.
    Bypass,
    /// Declarations were edited: reload them and handle the snapshot again.
    Retry,
    /// Mark the snapshot as unprocessable.
    SkipSnapshot,
    SkipContent { selector: String, value: String },
    SkipSelector(String),
    SkipMissingSelector(String),
    /// Archive the declaration in use into the service history.
    UpdateHistory,
}

impl Decision {
    /// Whether the snapshot has to be handled again afterwards.
    pub fn re_enters(&self) -> bool {
        matches!(
            self,
            Self::Retry
                | Self::SkipContent { .. }
                | Self::SkipSelector(_)
                | Self::SkipMissingSelector(_)
                | Self::UpdateHistory
        )
    }
}

/// What to do once every snapshot of a single document has been reviewed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndDecision {
    MarkAsDone,
    RestartNonInteractive,
    Quit,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStats {
    pub processed: usize,
    pub accepted: usize,
    pub snapshots_skipped: usize,
    pub duplicates: usize,
    pub waiting: usize,
    pub failures: usize,
    pub declaration_absent: usize,
    pub known_unprocessable: usize,
    pub elapsed: Duration,
    pub interrupted: bool,
}

impl RunStats {
    pub fn record(&mut self, outcome: &Outcome) {
        self.processed += 1;
        match outcome {
            Outcome::Accepted { .. } => self.accepted += 1,
            Outcome::SnapshotSkipped { .. } => self.snapshots_skipped += 1,
            Outcome::VersionSkipped { .. } => self.duplicates += 1,
            Outcome::Waiting { .. } => self.waiting += 1,
            Outcome::DeclarationAbsent => self.declaration_absent += 1,
            Outcome::KnownUnprocessable => self.known_unprocessable += 1,
            Outcome::Failed { .. } => self.failures += 1,
        }
    }
}

impl fmt::Display for RunStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} snapshots processed: {} versions generated, {} identical versions, {} snapshots skipped, {} pages waiting, {} failures, {} without declaration",
            self.processed,
            self.accepted,
            self.duplicates,
            self.snapshots_skipped + self.known_unprocessable,
            self.waiting,
            self.failures,
            self.declaration_absent
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_count_each_outcome() {
        let mut stats = RunStats::default();
        stats.record(&Outcome::Accepted {
            version_id: "v".into(),
            first: true,
        });
        stats.record(&Outcome::VersionSkipped {
            reason: "version is identical to previous".into(),
        });
        stats.record(&Outcome::Waiting { page: 1, total: 2 });
        stats.record(&Outcome::KnownUnprocessable);

        assert_eq!(stats.processed, 4);
        assert_eq!(stats.accepted, 1);
        assert_eq!(stats.duplicates, 1);
        assert_eq!(stats.waiting, 1);
        assert_eq!(
            stats.to_string(),
            "4 snapshots processed: 1 versions generated, 1 identical versions, 1 snapshots skipped, 1 pages waiting, 0 failures, 0 without declaration"
        );
    }

    #[test]
    fn rule_decisions_re_enter() {
        assert!(Decision::Retry.re_enters());
        assert!(Decision::SkipSelector(".banner".into()).re_enters());
        assert!(!Decision::Keep.re_enters());
        assert!(!Decision::SkipSnapshot.re_enters());
    }
}
