//! Service declarations: how to extract each document, over time.
//!
//! A service lives in `<root>/<serviceId>.json`; superseded declarations live
//! in `<root>/<serviceId>.history.json`. Resolving a document for a snapshot
//! walks the history by ascending `validUntil` and falls back to the current
//! declaration.

mod history;
mod page;

pub use history::{HistoryEntry, HistoryUpdate};
pub use page::{DocumentSpec, PageDeclaration};

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::error::{RegenError, Result};

const HISTORY_SUFFIX: &str = ".history.json";

/// Ordered pages describing one document, valid up to a date.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentDeclaration {
    pub service_id: String,
    pub service_name: String,
    pub document_type: String,
    pub pages: Vec<PageDeclaration>,
    /// `None` for the current declaration and open-ended history entries.
    pub valid_until: Option<DateTime<Utc>>,
}

impl DocumentDeclaration {
    pub fn is_multi_page(&self) -> bool {
        self.pages.len() > 1
    }

    /// Position of a page in declared order.
    pub fn page_index(&self, page_id: &str) -> Option<usize> {
        self.pages.iter().position(|p| p.page_id() == page_id)
    }

    /// Page a snapshot refers to. Snapshots without a page id map to the
    /// single page of single-page documents only.
    pub fn page_for(&self, page_id: Option<&str>) -> Option<&PageDeclaration> {
        match page_id {
            Some(id) => self.page_index(id).map(|i| &self.pages[i]),
            None if !self.is_multi_page() => self.pages.first(),
            None => None,
        }
    }

    pub fn spec(&self) -> DocumentSpec {
        DocumentSpec::from_pages(self.pages.clone())
    }

    /// Declaration rendered the way it is written in a service file.
    pub fn to_json(&self) -> Value {
        let mut documents = serde_json::Map::new();
        documents.insert(
            self.document_type.clone(),
            serde_json::to_value(self.spec()).unwrap_or(Value::Null),
        );
        serde_json::json!({
            "name": self.service_name,
            "documents": documents,
        })
    }
}

#[derive(Debug, Deserialize)]
struct ServiceFile {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    documents: IndexMap<String, DocumentSpec>,
}

/// Current and historical declarations of one service.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServiceDeclaration {
    pub id: String,
    pub name: String,
    pub documents: IndexMap<String, DocumentSpec>,
    /// Per document type, sorted by ascending `validUntil`, open-ended last.
    pub history: IndexMap<String, Vec<HistoryEntry>>,
}

impl ServiceDeclaration {
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            ..Default::default()
        }
    }

    pub fn with_document(mut self, document_type: impl Into<String>, spec: DocumentSpec) -> Self {
        self.documents.insert(document_type.into(), spec);
        self
    }

    pub fn with_history(
        mut self,
        document_type: impl Into<String>,
        spec: DocumentSpec,
        valid_until: DateTime<Utc>,
    ) -> Self {
        let entries = self.history.entry(document_type.into()).or_default();
        entries.push((spec, Some(valid_until)));
        entries.sort_by_key(|(_, date)| history::entry_order(date));
        self
    }

    /// Declaration in force at `fetch_date`.
    pub fn document_declaration(
        &self,
        document_type: &str,
        fetch_date: &DateTime<Utc>,
    ) -> Option<DocumentDeclaration> {
        let historical = self.history.get(document_type).and_then(|entries| {
            entries
                .iter()
                .find(|(_, valid_until)| valid_until.map_or(true, |until| *fetch_date <= until))
                .map(|(spec, valid_until)| (spec, *valid_until))
        });

        let (spec, valid_until) = match historical {
            Some(found) => found,
            None => (self.documents.get(document_type)?, None),
        };

        Some(DocumentDeclaration {
            service_id: self.id.clone(),
            service_name: self.name.clone(),
            document_type: document_type.to_string(),
            pages: spec.pages(),
            valid_until,
        })
    }

    /// Every document type known either currently or in history.
    pub fn document_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.documents.keys().cloned().collect();
        for document_type in self.history.keys() {
            if !types.contains(document_type) {
                types.push(document_type.clone());
            }
        }
        types
    }
}

/// Every loaded service, keyed by service id.
#[derive(Debug, Clone)]
pub struct Declarations {
    root: PathBuf,
    only: Option<String>,
    /// Whether services come from files under `root` (and can be reloaded).
    from_files: bool,
    services: BTreeMap<String, ServiceDeclaration>,
}

impl Declarations {
    /// Load all services under `root`, or only `only` when given.
    pub fn load(root: impl Into<PathBuf>, only: Option<&str>) -> Result<Self> {
        let mut declarations = Self {
            root: root.into(),
            only: only.map(str::to_string),
            from_files: true,
            services: BTreeMap::new(),
        };
        declarations.reload()?;
        Ok(declarations)
    }

    /// Declarations held in memory only. `root` is where history updates go.
    pub fn from_services(root: impl Into<PathBuf>, services: Vec<ServiceDeclaration>) -> Self {
        Self {
            root: root.into(),
            only: None,
            from_files: false,
            services: services.into_iter().map(|s| (s.id.clone(), s)).collect(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Re-read every service file from disk.
    pub fn reload(&mut self) -> Result<()> {
        if !self.from_files {
            return Ok(());
        }
        if !self.root.exists() {
            debug!("Declarations folder {} does not exist", self.root.display());
            return Ok(());
        }

        let mut services = BTreeMap::new();
        let entries = fs::read_dir(&self.root).map_err(|e| RegenError::access(&self.root, e))?;
        for entry in entries {
            let path = entry.map_err(|e| RegenError::access(&self.root, e))?.path();
            let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if !file_name.ends_with(".json") || file_name.ends_with(HISTORY_SUFFIX) {
                continue;
            }
            let service_id = file_name.trim_end_matches(".json").to_string();
            if self.only.as_deref().is_some_and(|only| only != service_id) {
                continue;
            }

            let service = self.load_service(&service_id)?;
            services.insert(service_id, service);
        }

        debug!("Loaded {} service declarations", services.len());
        self.services = services;
        Ok(())
    }

    fn load_service(&self, service_id: &str) -> Result<ServiceDeclaration> {
        let path = self.service_path(service_id);
        let file: ServiceFile = read_json(&path)?;

        let mut service = ServiceDeclaration {
            id: service_id.to_string(),
            name: file.name.unwrap_or_else(|| service_id.to_string()),
            documents: file.documents,
            history: IndexMap::new(),
        };

        let history_path = self.history_path(service_id);
        if history_path.exists() {
            let raw: IndexMap<String, Vec<Value>> = read_json(&history_path)?;
            service.history = history::parse_history(&history_path, raw)?;
        }

        Ok(service)
    }

    pub fn service_path(&self, service_id: &str) -> PathBuf {
        self.root.join(format!("{}.json", service_id))
    }

    pub fn history_path(&self, service_id: &str) -> PathBuf {
        self.root.join(format!("{}{}", service_id, HISTORY_SUFFIX))
    }

    pub fn service(&self, service_id: &str) -> Option<&ServiceDeclaration> {
        self.services.get(service_id)
    }

    pub fn services(&self) -> impl Iterator<Item = &ServiceDeclaration> {
        self.services.values()
    }

    /// Declaration of a document in force at `fetch_date`.
    pub fn resolve(
        &self,
        service_id: &str,
        document_type: &str,
        fetch_date: &DateTime<Utc>,
    ) -> Option<DocumentDeclaration> {
        self.services
            .get(service_id)?
            .document_declaration(document_type, fetch_date)
    }

    /// `(serviceId, documentType)` pairs sorted by service id.
    pub fn document_types(&self) -> Vec<(String, String)> {
        self.services
            .values()
            .flat_map(|service| {
                service
                    .document_types()
                    .into_iter()
                    .map(move |document_type| (service.id.clone(), document_type))
            })
            .collect()
    }

    /// Record `declaration` in the service history as valid until `valid_until`.
    pub fn append_history(
        &mut self,
        declaration: &DocumentDeclaration,
        valid_until: DateTime<Utc>,
    ) -> Result<HistoryUpdate> {
        let path = self.history_path(&declaration.service_id);
        let update = history::append(&path, &declaration.document_type, &declaration.spec(), valid_until)?;

        if let Some(service) = self.services.get_mut(&declaration.service_id) {
            let raw: IndexMap<String, Vec<Value>> = read_json(&path)?;
            service.history = history::parse_history(&path, raw)?;
        }
        Ok(update)
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = fs::read_to_string(path).map_err(|e| RegenError::access(path, e))?;
    serde_json::from_str(&raw).map_err(|e| RegenError::MalformedDeclaration {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}
