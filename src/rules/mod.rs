//! Durable store of skip rules, document type aliases, "done" markers and
//! the progress checkpoint.
//!
//! Everything lives in a single JSON document (see [`RulesFile`]). The store
//! reads it once, serves reads from memory and flushes every mutation with an
//! atomic write, so an interrupted run never leaves a truncated rule file.
//! Nothing else in the crate reads or writes that file.

mod types;

pub use types::{DocumentRules, ProgressCheckpoint, RuleUpdate, RulesFile, WILDCARD};

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::debug;

use crate::error::{RegenError, Result};
use crate::files::write_atomic;

/// Default file name of the rule document.
pub const RULES_FILENAME: &str = "index.json";

#[derive(Debug)]
pub struct RuleStore {
    path: PathBuf,
    rules: RulesFile,
}

impl RuleStore {
    /// Open the rule file at `path`, creating `{documents: {}, documentTypes: {}}`
    /// when it does not exist yet.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let mut store = Self {
            path: path.into(),
            rules: RulesFile::default(),
        };
        store.load()?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Re-read the rule file from disk, replacing the cached copy.
    pub fn load(&mut self) -> Result<&RulesFile> {
        if !self.path.exists() {
            self.save(RulesFile::default())?;
            return Ok(&self.rules);
        }

        let raw = fs::read_to_string(&self.path).map_err(|e| RegenError::access(&self.path, e))?;
        self.rules = serde_json::from_str(&raw).map_err(|e| RegenError::MalformedRules {
            path: self.path.clone(),
            message: e.to_string(),
        })?;
        Ok(&self.rules)
    }

    /// Cached rule document.
    pub fn rules(&self) -> &RulesFile {
        &self.rules
    }

    /// Replace the whole rule document and flush it.
    pub fn save(&mut self, rules: RulesFile) -> Result<()> {
        let mut json = serde_json::to_string_pretty(&rules)?;
        json.push('\n');
        write_atomic(&self.path, json.as_bytes())?;
        self.rules = rules;
        Ok(())
    }

    /// Read-modify-write of one `(serviceId, documentType)` entry.
    pub fn update_document(
        &mut self,
        service_id: &str,
        document_type: &str,
        update: RuleUpdate,
    ) -> Result<()> {
        let mut rules = self.rules.clone();
        debug!(
            "Updating {} of {} - {}",
            update.field(),
            service_id,
            document_type
        );
        let entry = rules
            .documents
            .entry(service_id.to_string())
            .or_default()
            .entry(document_type.to_string())
            .or_default();
        update.apply(entry);
        self.save(rules)
    }

    /// Rules applying to a concrete document, wildcard entries included.
    ///
    /// Entries are folded from least to most specific: `(*, *)`, `(*, type)`,
    /// `(service, *)`, `(service, type)`.
    pub fn document_rules(&self, service_id: &str, document_type: &str) -> DocumentRules {
        let mut merged = DocumentRules::default();
        for (service_key, document_key) in [
            (WILDCARD, WILDCARD),
            (WILDCARD, document_type),
            (service_id, WILDCARD),
            (service_id, document_type),
        ] {
            if let Some(rules) = self
                .rules
                .documents
                .get(service_key)
                .and_then(|docs| docs.get(document_key))
            {
                merged.merge(rules);
            }
        }
        merged
    }

    /// Snapshot ids marked unprocessable for every entry matching the query.
    ///
    /// An entry stored under `*` matches any concrete value on that axis, and
    /// a `*` query matches every entry on that axis.
    pub fn snapshot_ids_to_skip(&self, service_id: &str, document_type: &str) -> Vec<String> {
        let mut ids = indexmap::IndexSet::new();
        for (service_key, documents) in &self.rules.documents {
            if !axis_matches(service_key, service_id) {
                continue;
            }
            for (document_key, rules) in documents {
                if axis_matches(document_key, document_type) {
                    ids.extend(rules.skip_commit.iter().cloned());
                }
            }
        }
        ids.into_iter().collect()
    }

    /// Canonical name of a raw document type.
    pub fn canonical_document_type<'a>(&'a self, document_type: &'a str) -> &'a str {
        self.rules
            .document_types
            .get(document_type)
            .map(String::as_str)
            .unwrap_or(document_type)
    }

    pub fn is_document_done(&self, service_id: &str, document_type: &str) -> bool {
        self.rules
            .documents
            .get(service_id)
            .and_then(|docs| docs.get(document_type))
            .is_some_and(|rules| rules.done.is_some())
    }

    pub fn mark_as_done(&mut self, service_id: &str, document_type: &str) -> Result<()> {
        self.update_document(service_id, document_type, RuleUpdate::Done(Utc::now()))
    }

    pub fn add_document_type_alias(&mut self, raw: &str, canonical: &str) -> Result<()> {
        let mut rules = self.rules.clone();
        rules
            .document_types
            .insert(raw.to_string(), canonical.to_string());
        self.save(rules)
    }

    /// Checkpoint after `snapshot_id`; `index` is the ordinal of the next one.
    pub fn save_progress(&mut self, snapshot_id: &str, index: usize, pending: Vec<String>) -> Result<()> {
        let mut rules = self.rules.clone();
        rules.progression = Some(ProgressCheckpoint {
            snapshot_id: snapshot_id.to_string(),
            index,
            date: Utc::now().to_rfc2822(),
            pending,
        });
        self.save(rules)
    }

    pub fn progress(&self) -> Option<&ProgressCheckpoint> {
        self.rules.progression.as_ref()
    }

    pub fn reset_progress(&mut self) -> Result<()> {
        if self.rules.progression.is_none() {
            return Ok(());
        }
        let mut rules = self.rules.clone();
        rules.progression = None;
        self.save(rules)
    }
}

fn axis_matches(key: &str, query: &str) -> bool {
    key == WILDCARD || query == WILDCARD || key == query
}
