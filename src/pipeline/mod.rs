//! Snapshot → version regeneration pipeline.
//!
//! ```text
//! snapshot ─► RuleEvaluator ─► MultiPageAggregator ─► Extractor ─► DiffDeduplicator ─► VersionRepository
//!                  │ skip               │ waiting                       │ duplicate
//!                  ▼                    ▼                               ▼
//!            OutputSink (skipped/)   checkpoint                     next snapshot
//! ```

pub mod adjudicate;
pub mod aggregator;
pub mod dedup;
pub mod diff;
pub mod evaluator;
pub mod regenerator;
pub mod state;

pub use adjudicate::{Adjudicator, AutoAdjudicator, Presentation, Review};
pub use aggregator::{MultiPageAggregator, Submission};
pub use dedup::{Classification, DiffDeduplicator, IDENTICAL_REASON};
pub use diff::TextDiff;
pub use evaluator::{Evaluation, RuleEvaluator};
pub use regenerator::{Regenerator, RunOptions, PAGE_SEPARATOR, UNPROCESSABLE_REASON};
pub use state::{Decision, EndDecision, Outcome, RunStats, SnapshotState};
