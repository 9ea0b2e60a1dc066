//! Skip decision taken on raw snapshot content, before extraction.

use scraper::{Html, Selector};

use crate::error::{RegenError, Result};
use crate::rules::DocumentRules;
use crate::snapshots::Snapshot;

/// Result of evaluating the skip rules of a document against a snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Evaluation {
    Continue,
    Skip { reason: String },
}

impl Evaluation {
    pub fn is_skip(&self) -> bool {
        matches!(self, Self::Skip { .. })
    }
}

/// Checks `skipSelector`, `skipMissingSelector` and `skipContent`, in that
/// order, stopping at the first match.
#[derive(Debug, Default, Clone, Copy)]
pub struct RuleEvaluator;

impl RuleEvaluator {
    pub fn new() -> Self {
        Self
    }

    /// Content is parsed at most once, and not at all when no rule needs it.
    pub fn should_skip(&self, snapshot: &Snapshot, rules: &DocumentRules) -> Result<Evaluation> {
        if !rules.has_content_rules() {
            return Ok(Evaluation::Continue);
        }

        let document = Html::parse_document(&snapshot.content);

        for selector in &rules.skip_selector {
            if document.select(&parse(selector)?).next().is_some() {
                return Ok(Evaluation::Skip {
                    reason: format!("its content matches a selector to skip: \"{}\"", selector),
                });
            }
        }

        for selector in &rules.skip_missing_selector {
            if document.select(&parse(selector)?).next().is_none() {
                return Ok(Evaluation::Skip {
                    reason: format!(
                        "its content does not match a required selector: \"{}\"",
                        selector
                    ),
                });
            }
        }

        for (selector, value) in &rules.skip_content {
            let inner = document.select(&parse(selector)?).next().map(|el| el.inner_html());
            if inner.as_deref() == Some(value.as_str()) {
                return Ok(Evaluation::Skip {
                    reason: format!(
                        "its content matches a content to skip: \"{}\" => \"{}\"",
                        selector, value
                    ),
                });
            }
        }

        Ok(Evaluation::Continue)
    }
}

fn parse(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| RegenError::InvalidSelector {
        selector: selector.to_string(),
        message: e.to_string(),
    })
}
