//! Human adjudication seam.
//!
//! The pipeline reports every generated version through [`Adjudicator::present`]
//! and, in interactive runs, asks [`Adjudicator::decide`] what to do with a
//! version or a failure. Implementations may block as long as they need.

use std::path::Path;

use super::diff::TextDiff;
use super::state::{Decision, EndDecision};
use crate::declarations::DocumentDeclaration;
use crate::error::Result;
use crate::snapshots::Snapshot;
use crate::theme::Theme;

/// A generated version about to be recorded.
#[derive(Debug, Clone, Copy)]
pub enum Presentation<'a> {
    First { content: &'a str },
    Changed { diff: &'a TextDiff },
}

/// Everything an operator may want to look at before deciding.
#[derive(Debug)]
pub struct Review<'a> {
    pub question: String,
    pub snapshot: &'a Snapshot,
    pub declaration: Option<&'a DocumentDeclaration>,
    /// Extracted version, absent when extraction failed.
    pub version: Option<&'a str>,
    /// Generic extraction of the snapshot.
    pub fingerprint: &'a str,
    /// Copy of the snapshot under `to-check/`.
    pub review_path: &'a Path,
    pub snapshot_url: Option<String>,
}

pub trait Adjudicator {
    fn present(&mut self, presentation: Presentation<'_>);

    fn decide(&mut self, review: &Review<'_>) -> Result<Decision>;

    /// Asked once a single document has been fully reviewed.
    fn conclude(&mut self, _service_id: &str, _document_type: &str) -> Result<EndDecision> {
        Ok(EndDecision::Quit)
    }
}

/// Keeps every version and moves past every failure. Optionally prints what
/// it is shown.
#[derive(Debug, Clone)]
pub struct AutoAdjudicator {
    echo: bool,
    theme: Theme,
}

impl AutoAdjudicator {
    /// Prints versions and diffs to stdout.
    pub fn echo(theme: Theme) -> Self {
        Self { echo: true, theme }
    }

    pub fn silent() -> Self {
        Self {
            echo: false,
            theme: Theme::plain(),
        }
    }
}

impl Adjudicator for AutoAdjudicator {
    fn present(&mut self, presentation: Presentation<'_>) {
        if self.echo {
            println!("{}", render(&self.theme, presentation));
        }
    }

    fn decide(&mut self, review: &Review<'_>) -> Result<Decision> {
        Ok(if review.version.is_some() {
            Decision::Keep
        } else {
            Decision::Bypass
        })
    }
}

/// First versions in full, later ones as a diff.
pub fn render(theme: &Theme, presentation: Presentation<'_>) -> String {
    match presentation {
        Presentation::First { content } => theme.success_text(content),
        Presentation::Changed { diff } => diff.render(theme),
    }
}
