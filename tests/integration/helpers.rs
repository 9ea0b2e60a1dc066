//! Shared fixtures for integration tests

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use tempfile::TempDir;

use regen::declarations::{Declarations, DocumentSpec, PageDeclaration, ServiceDeclaration};
use regen::output::MemoryOutput;
use regen::pipeline::adjudicate::render;
use regen::pipeline::{
    Adjudicator, Decision, EndDecision, Presentation, Regenerator, Review, RunOptions, RunStats,
};
use regen::rules::RuleStore;
use regen::snapshots::{MemorySnapshotRepository, Snapshot};
use regen::theme::Theme;
use regen::versions::MemoryVersionRepository;

pub fn date(day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2023, 1, day, 12, 0, 0).unwrap()
}

pub fn text_snapshot(id: &str, service_id: &str, document_type: &str, day: u32, content: &str) -> Snapshot {
    Snapshot {
        id: id.to_string(),
        service_id: service_id.to_string(),
        document_type: document_type.to_string(),
        page_id: None,
        fetch_date: date(day),
        content: content.to_string(),
        mime_type: "text/plain".to_string(),
    }
}

pub fn html_snapshot(id: &str, day: u32, html: &str) -> Snapshot {
    Snapshot {
        mime_type: "text/html".to_string(),
        ..text_snapshot(id, "svc", "tos", day, html)
    }
}

pub fn page_snapshot(id: &str, page_id: &str, day: u32, content: &str) -> Snapshot {
    Snapshot {
        page_id: Some(page_id.to_string()),
        ..text_snapshot(id, "svc", "tos", day, content)
    }
}

pub fn single(select: &str) -> DocumentSpec {
    DocumentSpec::Single(PageDeclaration::new("https://example.com/tos", select))
}

pub fn combined(page_ids: &[&str]) -> DocumentSpec {
    DocumentSpec::Combine {
        combine: page_ids
            .iter()
            .map(|id| PageDeclaration::new(format!("https://example.com/{}", id), "main").with_id(*id))
            .collect(),
    }
}

/// Everything a run needs, held in memory except the rules file.
pub struct Archive {
    pub dir: TempDir,
    pub rules: RuleStore,
    pub declarations: Declarations,
    pub snapshots: MemorySnapshotRepository,
    pub versions: MemoryVersionRepository,
    pub output: MemoryOutput,
}

impl Archive {
    pub fn new(services: Vec<ServiceDeclaration>, snapshots: Vec<Snapshot>) -> Self {
        let dir = TempDir::new().unwrap();
        let rules = RuleStore::open(dir.path().join("cleaning/index.json")).unwrap();
        let declarations = Declarations::from_services(dir.path().join("declarations"), services);
        Self {
            dir,
            rules,
            declarations,
            snapshots: MemorySnapshotRepository::new(snapshots),
            versions: MemoryVersionRepository::new(),
            output: MemoryOutput::new(),
        }
    }

    /// Single `svc`/`tos` document extracted from `main`.
    pub fn tos(snapshots: Vec<Snapshot>) -> Self {
        Self::new(
            vec![ServiceDeclaration::new("svc").with_document("tos", single("main"))],
            snapshots,
        )
    }

    pub fn run(&mut self, options: &RunOptions) -> RunStats {
        self.run_with(Script::default(), options)
    }

    pub fn run_with(&mut self, script: Script, options: &RunOptions) -> RunStats {
        let stop = Arc::clone(&script.stop);
        let mut regenerator = Regenerator::new(
            &mut self.rules,
            &mut self.declarations,
            &self.snapshots,
            &mut self.versions,
            &mut self.output,
        )
        .with_adjudicator(Box::new(script))
        .with_stop_flag(stop);

        let stats = regenerator.run(options).unwrap();
        regenerator.conclude(options).unwrap();
        stats
    }

    pub fn contents(&self) -> Vec<String> {
        self.versions
            .records()
            .iter()
            .map(|r| r.content.clone())
            .collect()
    }
}

/// What a [`Script`] saw during a run.
#[derive(Debug, Default)]
pub struct Transcript {
    pub presented: Vec<String>,
    pub questions: Vec<String>,
}

/// Adjudicator answering from a list of decisions, Keep/Bypass once exhausted.
#[derive(Default)]
pub struct Script {
    pub decisions: VecDeque<Decision>,
    pub end: Option<EndDecision>,
    /// Request a stop after that many presented versions
    pub stop_after: Option<usize>,
    pub stop: Arc<AtomicBool>,
    pub transcript: Rc<RefCell<Transcript>>,
}

impl Script {
    pub fn answering(decisions: Vec<Decision>) -> Self {
        Self {
            decisions: decisions.into(),
            ..Self::default()
        }
    }

    pub fn transcript(&self) -> Rc<RefCell<Transcript>> {
        Rc::clone(&self.transcript)
    }
}

impl Adjudicator for Script {
    fn present(&mut self, presentation: Presentation<'_>) {
        let mut transcript = self.transcript.borrow_mut();
        transcript
            .presented
            .push(render(&Theme::plain(), presentation));
        if self.stop_after == Some(transcript.presented.len()) {
            self.stop.store(true, Ordering::SeqCst);
        }
    }

    fn decide(&mut self, review: &Review<'_>) -> regen::Result<Decision> {
        self.transcript
            .borrow_mut()
            .questions
            .push(review.question.clone());
        Ok(self.decisions.pop_front().unwrap_or(if review.version.is_some() {
            Decision::Keep
        } else {
            Decision::Bypass
        }))
    }

    fn conclude(&mut self, _service_id: &str, _document_type: &str) -> regen::Result<EndDecision> {
        Ok(self.end.unwrap_or(EndDecision::Quit))
    }
}
