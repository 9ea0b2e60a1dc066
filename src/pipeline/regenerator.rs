//! The regeneration loop.
//!
//! Snapshots are handled one at a time, in the order the snapshot store
//! yields them. Each one goes through the [`SnapshotState`] machine until it
//! reaches a terminal [`Outcome`], then the checkpoint moves past it.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, SecondsFormat, Utc};
use tracing::{debug, error, info, warn};

use super::adjudicate::{Adjudicator, AutoAdjudicator, Presentation, Review};
use super::aggregator::{MultiPageAggregator, Submission};
use super::dedup::{Classification, DiffDeduplicator};
use super::evaluator::{Evaluation, RuleEvaluator};
use super::state::{Decision, EndDecision, Outcome, RunStats, SnapshotState};
use crate::declarations::{Declarations, DocumentDeclaration};
use crate::error::{RegenError, Result};
use crate::extract::{fingerprint, Extractor, HtmlExtractor};
use crate::output::OutputSink;
use crate::rules::{RuleStore, RuleUpdate, WILDCARD};
use crate::snapshots::{Snapshot, SnapshotFilter, SnapshotRepository};
use crate::versions::{VersionRecord, VersionRepository};

/// Reason given for snapshots listed in `skipCommit`.
pub const UNPROCESSABLE_REASON: &str = "snapshot is marked as unprocessable";

/// Separator between the texts of the pages of a multi-page document.
pub const PAGE_SEPARATOR: &str = "\n\n";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    /// Service id or `*`.
    pub service_id: String,
    /// Document type or `*`.
    pub document_type: String,
    /// Ask the adjudicator about every version and failure.
    pub interactive: bool,
    /// Drop the checkpoint and start over.
    pub restart: bool,
    /// Review a document already marked as done.
    pub force: bool,
    /// Base URL of the snapshot repository, for operator links.
    pub snapshot_repository_url: Option<String>,
    /// Log throughput every that many snapshots; 0 disables it.
    pub progress_log_interval: usize,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            service_id: WILDCARD.to_string(),
            document_type: WILDCARD.to_string(),
            interactive: false,
            restart: false,
            force: false,
            snapshot_repository_url: None,
            progress_log_interval: 10,
        }
    }
}

impl RunOptions {
    pub fn filter(&self) -> SnapshotFilter {
        SnapshotFilter::new(&self.service_id, &self.document_type)
    }
}

pub struct Regenerator<'a> {
    rules: &'a mut RuleStore,
    declarations: &'a mut Declarations,
    snapshots: &'a dyn SnapshotRepository,
    versions: &'a mut dyn VersionRepository,
    output: &'a mut dyn OutputSink,
    extractor: Box<dyn Extractor + 'a>,
    adjudicator: Box<dyn Adjudicator + 'a>,
    evaluator: RuleEvaluator,
    aggregator: MultiPageAggregator,
    stop: Arc<AtomicBool>,
    /// Generic extractions of snapshots marked as unprocessable
    fingerprints: Vec<String>,
    /// Fetch date of the previous snapshot of each document
    previous_fetch_dates: HashMap<(String, String), DateTime<Utc>>,
    stats: RunStats,
}

impl<'a> Regenerator<'a> {
    pub fn new(
        rules: &'a mut RuleStore,
        declarations: &'a mut Declarations,
        snapshots: &'a dyn SnapshotRepository,
        versions: &'a mut dyn VersionRepository,
        output: &'a mut dyn OutputSink,
    ) -> Self {
        Self {
            rules,
            declarations,
            snapshots,
            versions,
            output,
            extractor: Box::new(HtmlExtractor),
            adjudicator: Box::new(AutoAdjudicator::silent()),
            evaluator: RuleEvaluator,
            aggregator: MultiPageAggregator::new(),
            stop: Arc::new(AtomicBool::new(false)),
            fingerprints: Vec::new(),
            previous_fetch_dates: HashMap::new(),
            stats: RunStats::default(),
        }
    }

    pub fn with_extractor(mut self, extractor: Box<dyn Extractor + 'a>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn with_adjudicator(mut self, adjudicator: Box<dyn Adjudicator + 'a>) -> Self {
        self.adjudicator = adjudicator;
        self
    }

    /// Setting the flag stops the run after the snapshot being handled.
    pub fn with_stop_flag(mut self, stop: Arc<AtomicBool>) -> Self {
        self.stop = stop;
        self
    }

    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    /// Replay every matching snapshot, resuming after the stored checkpoint
    /// unless `options.restart` is set. A run without checkpoint starts from
    /// an empty version store.
    pub fn run(&mut self, options: &RunOptions) -> Result<RunStats> {
        let started = Instant::now();
        let filter = options.filter();
        self.stats = RunStats::default();
        self.previous_fetch_dates.clear();

        if options.interactive
            && filter.is_single_document()
            && !options.force
            && self
                .rules
                .is_document_done(&filter.service_id, &filter.document_type)
        {
            return Err(RegenError::DocumentDone {
                service_id: filter.service_id.clone(),
                document_type: filter.document_type.clone(),
            });
        }

        let to_process = self.snapshots.count_matching(&filter)?;
        debug!(
            "Number of snapshots in the repository: {}",
            self.snapshots.count()?
        );
        if filter.is_restricted() {
            debug!("Number of snapshots for the specified service: {}", to_process);
        }

        if options.restart {
            self.rules.reset_progress()?;
        }
        let (resume_from, mut index) = match self.rules.progress().cloned() {
            Some(progress) => {
                info!(
                    "Resuming from snapshot {} (saved {})",
                    progress.snapshot_id, progress.date
                );
                self.restore_pending(&progress.pending)?;
                (Some(progress.snapshot_id), progress.index)
            }
            None => {
                self.versions.remove_all()?;
                (None, 1)
            }
        };

        self.fingerprints = self.load_fingerprints(&filter)?;

        let snapshots = self.snapshots;
        for snapshot in snapshots.iterate(&filter, resume_from.as_deref())? {
            if self.stop.load(Ordering::SeqCst) {
                warn!("Stop requested, progress has been saved");
                self.stats.interrupted = true;
                break;
            }

            let mut snapshot = snapshot?;
            snapshot.document_type = self
                .rules
                .canonical_document_type(&snapshot.document_type)
                .to_string();
            let key = snapshot.document_key();
            let previous_fetch_date = *self
                .previous_fetch_dates
                .entry(key.clone())
                .or_insert(snapshot.fetch_date);

            self.log_snapshot(index, to_process, &snapshot);
            let outcome = self.handle(&snapshot, previous_fetch_date, options)?;
            self.stats.record(&outcome);

            index += 1;
            self.previous_fetch_dates.insert(key, snapshot.fetch_date);
            if options.progress_log_interval > 0 && index % options.progress_log_interval == 0 {
                let elapsed = started.elapsed();
                debug!(
                    "{} snapshots handled in {:.1?} ({:.1} snapshots/s)",
                    self.stats.processed,
                    elapsed,
                    self.stats.processed as f64 / elapsed.as_secs_f64().max(f64::EPSILON)
                );
            }

            self.rules
                .save_progress(&snapshot.id, index, self.aggregator.pending_ids())?;
        }

        self.output.finalize()?;
        self.stats.elapsed = started.elapsed();
        info!("Total execution time: {:.2?}", self.stats.elapsed);
        info!("{}", self.stats);
        Ok(self.stats.clone())
    }

    /// End-of-review question for interactive runs on a single document.
    pub fn conclude(&mut self, options: &RunOptions) -> Result<Option<EndDecision>> {
        let filter = options.filter();
        if !options.interactive || !filter.is_single_document() || self.stats.interrupted {
            return Ok(None);
        }

        let decision = self
            .adjudicator
            .conclude(&filter.service_id, &filter.document_type)?;
        if decision == EndDecision::MarkAsDone {
            self.rules
                .mark_as_done(&filter.service_id, &filter.document_type)?;
            info!(
                "{} - {} has been marked as done",
                filter.service_id, filter.document_type
            );
        }
        Ok(Some(decision))
    }

    fn handle(
        &mut self,
        snapshot: &Snapshot,
        previous_fetch_date: DateTime<Utc>,
        options: &RunOptions,
    ) -> Result<Outcome> {
        // Other pages of an assembled document, re-buffered on re-entry
        let mut companions: Vec<Snapshot> = Vec::new();
        let mut state = SnapshotState::Pending;

        loop {
            state = match state {
                SnapshotState::Terminal(outcome) => return Ok(outcome),

                SnapshotState::Pending => {
                    let Some(declaration) = self.declaration_for(snapshot) else {
                        debug!("    ↳ Skipped snapshot: {}", absent(snapshot));
                        state = SnapshotState::Terminal(Outcome::DeclarationAbsent);
                        continue;
                    };

                    for page in companions.drain(..) {
                        if let Err(e) = self.aggregator.submit(page, &declaration) {
                            debug!("Could not buffer page again: {}", e);
                        }
                    }

                    let skip_ids = self
                        .rules
                        .snapshot_ids_to_skip(&snapshot.service_id, &snapshot.document_type);
                    if skip_ids.contains(&snapshot.id) {
                        SnapshotState::Evaluated(Evaluation::Skip {
                            reason: UNPROCESSABLE_REASON.to_string(),
                        })
                    } else {
                        let rules = self
                            .rules
                            .document_rules(&snapshot.service_id, &snapshot.document_type);
                        SnapshotState::Evaluated(self.evaluator.should_skip(snapshot, &rules)?)
                    }
                }

                SnapshotState::Evaluated(Evaluation::Skip { reason }) => {
                    debug!("    ↳ Skipped snapshot: {}", reason);
                    self.output.save_skipped(snapshot)?;
                    SnapshotState::Terminal(Outcome::SnapshotSkipped { reason })
                }

                SnapshotState::Evaluated(Evaluation::Continue) => {
                    let Some(declaration) = self.declaration_for(snapshot) else {
                        state = SnapshotState::Terminal(Outcome::DeclarationAbsent);
                        continue;
                    };
                    match self.aggregator.submit(snapshot.clone(), &declaration) {
                        Ok(Submission::Waiting { page, total }) => {
                            debug!(
                                "    ↳ Wait for all pages to generate version: {}/{}",
                                page, total
                            );
                            SnapshotState::Terminal(Outcome::Waiting { page, total })
                        }
                        Ok(Submission::Complete(pages)) => SnapshotState::Assembled(pages),
                        Err(e) if e.is_per_snapshot() => SnapshotState::Failed(e),
                        Err(e) => return Err(e),
                    }
                }

                SnapshotState::Assembled(pages) => {
                    companions = pages
                        .iter()
                        .filter(|page| page.id != snapshot.id)
                        .cloned()
                        .collect();

                    match self.assemble(snapshot, &pages) {
                        Ok(record) => {
                            let classification = DiffDeduplicator::new(&*self.versions).classify(
                                &record.service_id,
                                &record.document_type,
                                &record.content,
                            )?;
                            SnapshotState::Classified {
                                record,
                                classification,
                            }
                        }
                        Err(e) if e.is_per_snapshot() => SnapshotState::Failed(e),
                        Err(e) => return Err(e),
                    }
                }

                SnapshotState::Classified {
                    record,
                    classification,
                } => self.review_version(snapshot, record, classification, previous_fetch_date, options)?,

                SnapshotState::Failed(e) => {
                    self.review_failure(snapshot, e, previous_fetch_date, options)?
                }
            };
        }
    }

    /// Extract every page and build the version record.
    fn assemble(&self, snapshot: &Snapshot, pages: &[Snapshot]) -> Result<VersionRecord> {
        let declaration = self
            .declaration_for(snapshot)
            .ok_or_else(|| absent(snapshot))?;

        let mut texts = Vec::with_capacity(pages.len());
        for page in pages {
            let page_declaration = declaration
                .page_for(page.page_id.as_deref())
                .ok_or_else(|| RegenError::PageDeclarationMismatch {
                    snapshot_id: page.id.clone(),
                    service_id: declaration.service_id.clone(),
                    document_type: declaration.document_type.clone(),
                    page_id: page.page_id.clone().unwrap_or_default(),
                })?;
            texts.push(
                self.extractor
                    .extract(&page.content, &page.mime_type, page_declaration)?,
            );
        }

        let fetch_date = pages
            .iter()
            .map(|page| page.fetch_date)
            .max()
            .unwrap_or(snapshot.fetch_date);

        Ok(VersionRecord::new(
            &snapshot.service_id,
            &snapshot.document_type,
            texts.join(PAGE_SEPARATOR),
            pages.iter().map(|page| page.id.clone()).collect(),
            fetch_date,
        ))
    }

    fn review_version(
        &mut self,
        snapshot: &Snapshot,
        record: VersionRecord,
        classification: Classification,
        previous_fetch_date: DateTime<Utc>,
        options: &RunOptions,
    ) -> Result<SnapshotState> {
        let first = match &classification {
            Classification::Duplicate { reason } => {
                debug!("    ↳ Skipped version: {}", reason);
                return Ok(SnapshotState::Terminal(Outcome::VersionSkipped {
                    reason: reason.clone(),
                }));
            }
            Classification::First => {
                self.adjudicator.present(Presentation::First {
                    content: &record.content,
                });
                true
            }
            Classification::Changed { diff } => {
                self.adjudicator.present(Presentation::Changed { diff });
                false
            }
        };

        if options.interactive {
            let question = format!(
                "A new version is available for \"{} - {}\", is it valid?",
                snapshot.service_id, snapshot.document_type
            );
            match self.ask(question, snapshot, Some(&record.content), options)? {
                Decision::Keep | Decision::Bypass => {}
                Decision::SkipSnapshot => return self.mark_unprocessable(snapshot),
                decision => {
                    self.apply(decision, snapshot, previous_fetch_date)?;
                    return Ok(SnapshotState::Pending);
                }
            }
        }

        let version_id = self.versions.save(&record)?;
        info!("    ↳ Generated new version: {}", version_id);
        Ok(SnapshotState::Terminal(Outcome::Accepted { version_id, first }))
    }

    fn review_failure(
        &mut self,
        snapshot: &Snapshot,
        failure: RegenError,
        previous_fetch_date: DateTime<Utc>,
        options: &RunOptions,
    ) -> Result<SnapshotState> {
        let print = fingerprint(&*self.extractor, snapshot);
        if !print.is_empty() && self.fingerprints.contains(&print) {
            debug!("    ↳ Skipped: snapshot content is identical to one already skipped");
            return Ok(SnapshotState::Terminal(Outcome::KnownUnprocessable));
        }

        error!("    ↳ An error occured while filtering: {}", failure);

        if options.interactive {
            let question = format!(
                "A version can not be created from the snapshot of \"{} - {}\". What do you want to do?",
                snapshot.service_id, snapshot.document_type
            );
            match self.ask(question, snapshot, None, options)? {
                Decision::Keep | Decision::Bypass => {}
                Decision::SkipSnapshot => return self.mark_unprocessable(snapshot),
                decision => {
                    self.apply(decision, snapshot, previous_fetch_date)?;
                    return Ok(SnapshotState::Pending);
                }
            }
        }

        Ok(SnapshotState::Terminal(Outcome::Failed {
            reason: failure.to_string(),
        }))
    }

    fn ask(
        &mut self,
        question: String,
        snapshot: &Snapshot,
        version: Option<&str>,
        options: &RunOptions,
    ) -> Result<Decision> {
        let review_path = self.output.save_for_review(snapshot)?;
        let declaration = self.declaration_for(snapshot);
        let print = fingerprint(&*self.extractor, snapshot);

        let review = Review {
            question,
            snapshot,
            declaration: declaration.as_ref(),
            version,
            fingerprint: &print,
            review_path: &review_path,
            snapshot_url: options
                .snapshot_repository_url
                .as_deref()
                .map(|url| format!("{}/commit/{}", url.trim_end_matches('/'), snapshot.id)),
        };
        self.adjudicator.decide(&review)
    }

    fn mark_unprocessable(&mut self, snapshot: &Snapshot) -> Result<SnapshotState> {
        let print = fingerprint(&*self.extractor, snapshot);
        if !print.is_empty() {
            self.fingerprints.push(print);
        }
        self.rules.update_document(
            &snapshot.service_id,
            &snapshot.document_type,
            RuleUpdate::SkipCommit(snapshot.id.clone()),
        )?;
        Ok(SnapshotState::Terminal(Outcome::SnapshotSkipped {
            reason: UNPROCESSABLE_REASON.to_string(),
        }))
    }

    /// Apply a decision that changes rules or declarations.
    fn apply(
        &mut self,
        decision: Decision,
        snapshot: &Snapshot,
        previous_fetch_date: DateTime<Utc>,
    ) -> Result<()> {
        let (service_id, document_type) = (&snapshot.service_id, &snapshot.document_type);
        match decision {
            Decision::Retry => {
                debug!("Reloading declarations…");
                self.declarations.reload()?;
            }
            Decision::SkipContent { selector, value } => {
                self.rules.update_document(
                    service_id,
                    document_type,
                    RuleUpdate::SkipContent { selector, value },
                )?;
            }
            Decision::SkipSelector(selector) => {
                self.rules.update_document(
                    service_id,
                    document_type,
                    RuleUpdate::SkipSelector(selector),
                )?;
            }
            Decision::SkipMissingSelector(selector) => {
                self.rules.update_document(
                    service_id,
                    document_type,
                    RuleUpdate::SkipMissingSelector(selector),
                )?;
            }
            Decision::UpdateHistory => match self.declaration_for(snapshot) {
                Some(declaration) => {
                    self.declarations
                        .append_history(&declaration, previous_fetch_date)?;
                    warn!("History has been updated, you now need to fix the current declaration");
                }
                None => warn!("No declaration to archive: {}", absent(snapshot)),
            },
            Decision::Keep | Decision::Bypass | Decision::SkipSnapshot => {}
        }
        Ok(())
    }

    fn declaration_for(&self, snapshot: &Snapshot) -> Option<DocumentDeclaration> {
        self.declarations.resolve(
            &snapshot.service_id,
            &snapshot.document_type,
            &snapshot.fetch_date,
        )
    }

    /// Generic extraction of every snapshot marked as unprocessable.
    fn load_fingerprints(&self, filter: &SnapshotFilter) -> Result<Vec<String>> {
        let mut prints = Vec::new();
        for id in self
            .rules
            .snapshot_ids_to_skip(&filter.service_id, &filter.document_type)
        {
            match self.snapshots.find_by_id(&id) {
                Ok(snapshot) => {
                    let print = fingerprint(&*self.extractor, &snapshot);
                    if !print.is_empty() {
                        prints.push(print);
                    }
                }
                Err(e) if e.is_not_found() => {
                    warn!("Snapshot {} marked as unprocessable does not exist", id)
                }
                Err(e) => return Err(e),
            }
        }
        debug!("Loaded {} contents to skip", prints.len());
        Ok(prints)
    }

    /// Put the pages of an interrupted multi-page cycle back in the buffer.
    fn restore_pending(&mut self, ids: &[String]) -> Result<()> {
        for id in ids {
            let mut snapshot = match self.snapshots.find_by_id(id) {
                Ok(snapshot) => snapshot,
                Err(e) if e.is_not_found() => {
                    warn!("Buffered page {} no longer exists", id);
                    continue;
                }
                Err(e) => return Err(e),
            };
            snapshot.document_type = self
                .rules
                .canonical_document_type(&snapshot.document_type)
                .to_string();

            let Some(declaration) = self.declaration_for(&snapshot) else {
                warn!("Buffered page {} has no declaration anymore", id);
                continue;
            };
            if let Err(e) = self.aggregator.submit(snapshot, &declaration) {
                warn!("Buffered page {} dropped: {}", id, e);
            }
        }
        if !ids.is_empty() {
            debug!("Restored {} buffered pages", ids.len());
        }
        Ok(())
    }

    fn log_snapshot(&self, index: usize, total: usize, snapshot: &Snapshot) {
        let valid_until = self
            .declaration_for(snapshot)
            .and_then(|declaration| declaration.valid_until)
            .map(|date| date.to_rfc3339_opts(SecondsFormat::Millis, true))
            .unwrap_or_else(|| "now".to_string());
        debug!(
            "{:>5} / {} {} - {}   Snapshot {} fetched at {} valid until {}",
            index,
            total,
            snapshot.service_id,
            snapshot.document_type,
            snapshot.id,
            snapshot.fetch_date.to_rfc3339_opts(SecondsFormat::Millis, true),
            valid_until
        );
    }
}

fn absent(snapshot: &Snapshot) -> RegenError {
    RegenError::DeclarationAbsent {
        service_id: snapshot.service_id.clone(),
        document_type: snapshot.document_type.clone(),
        fetch_date: snapshot
            .fetch_date
            .to_rfc3339_opts(SecondsFormat::Millis, true),
    }
}
