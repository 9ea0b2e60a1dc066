//! Serialized shape of the rule file.

use chrono::{DateTime, Utc};
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

/// Key matching any service id or any document type.
pub const WILDCARD: &str = "*";

/// Whole rule document: `{ documents, documentTypes, progression? }`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RulesFile {
    /// serviceId (or `*`) → documentType (or `*`) → rules
    #[serde(default)]
    pub documents: IndexMap<String, IndexMap<String, DocumentRules>>,
    /// Raw document type → canonical document type
    #[serde(default)]
    pub document_types: IndexMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progression: Option<ProgressCheckpoint>,
}

/// Operator-authored skip rules of one `(serviceId, documentType)` entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRules {
    /// Selector → exact expected inner HTML
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub skip_content: IndexMap<String, String>,
    /// Skip when any of these selectors is present
    #[serde(default, skip_serializing_if = "IndexSet::is_empty")]
    pub skip_selector: IndexSet<String>,
    /// Skip when any of these selectors is absent
    #[serde(default, skip_serializing_if = "IndexSet::is_empty")]
    pub skip_missing_selector: IndexSet<String>,
    /// Snapshot ids marked unprocessable
    #[serde(default, skip_serializing_if = "IndexSet::is_empty")]
    pub skip_commit: IndexSet<String>,
    /// Set once the document has been reviewed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub done: Option<String>,
}

impl DocumentRules {
    /// Whether any rule requires looking into snapshot content.
    pub fn has_content_rules(&self) -> bool {
        !self.skip_content.is_empty()
            || !self.skip_selector.is_empty()
            || !self.skip_missing_selector.is_empty()
    }

    /// Fold `other` into `self`: sets are unioned, `skipContent` entries of
    /// `other` override those already present.
    pub fn merge(&mut self, other: &DocumentRules) {
        for (selector, value) in &other.skip_content {
            self.skip_content.insert(selector.clone(), value.clone());
        }
        self.skip_selector.extend(other.skip_selector.iter().cloned());
        self.skip_missing_selector
            .extend(other.skip_missing_selector.iter().cloned());
        self.skip_commit.extend(other.skip_commit.iter().cloned());
        if other.done.is_some() {
            self.done = other.done.clone();
        }
    }
}

/// Resumable cursor of a regeneration run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressCheckpoint {
    /// Last fully handled snapshot
    pub snapshot_id: String,
    /// Ordinal of the next snapshot to handle (1-indexed)
    pub index: usize,
    /// When the checkpoint was written, RFC 2822
    pub date: String,
    /// Pages of an incomplete multi-page cycle, oldest first
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pending: Vec<String>,
}

/// One operator decision applied to a document entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleUpdate {
    SkipContent { selector: String, value: String },
    SkipSelector(String),
    SkipMissingSelector(String),
    SkipCommit(String),
    Done(DateTime<Utc>),
}

impl RuleUpdate {
    /// Field name in the rule file.
    pub fn field(&self) -> &'static str {
        match self {
            Self::SkipContent { .. } => "skipContent",
            Self::SkipSelector(_) => "skipSelector",
            Self::SkipMissingSelector(_) => "skipMissingSelector",
            Self::SkipCommit(_) => "skipCommit",
            Self::Done(_) => "done",
        }
    }

    /// Apply to an entry: merge for mappings, insert for sets, replace for `done`.
    pub fn apply(self, rules: &mut DocumentRules) {
        match self {
            Self::SkipContent { selector, value } => {
                rules.skip_content.insert(selector, value);
            }
            Self::SkipSelector(selector) => {
                rules.skip_selector.insert(selector);
            }
            Self::SkipMissingSelector(selector) => {
                rules.skip_missing_selector.insert(selector);
            }
            Self::SkipCommit(snapshot_id) => {
                rules.skip_commit.insert(snapshot_id);
            }
            Self::Done(date) => {
                rules.done = Some(date.to_rfc3339_opts(chrono::SecondsFormat::Millis, true));
            }
        }
    }
}
