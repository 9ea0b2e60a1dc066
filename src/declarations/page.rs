//! Page and document declaration formats.

use serde::{Deserialize, Serialize};

/// How to extract the content of one page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageDeclaration {
    #[serde(rename = "fetch")]
    pub location: String,
    #[serde(
        rename = "select",
        default,
        with = "one_or_many",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub content_selectors: Vec<String>,
    #[serde(
        rename = "remove",
        default,
        with = "one_or_many",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub noise_selectors: Vec<String>,
    /// Names of filter functions; kept for display and history equality.
    #[serde(rename = "filter", default, skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<String>,
    #[serde(
        rename = "executeClientScripts",
        default,
        skip_serializing_if = "std::ops::Not::not"
    )]
    pub execute_client_scripts: bool,
    /// Page identifier used by page-qualified snapshots.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl PageDeclaration {
    pub fn new(location: impl Into<String>, select: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            content_selectors: vec![select.into()],
            noise_selectors: Vec::new(),
            filters: Vec::new(),
            execute_client_scripts: false,
            id: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_noise(mut self, selector: impl Into<String>) -> Self {
        self.noise_selectors.push(selector.into());
        self
    }

    /// Explicit id, or the fetch location.
    pub fn page_id(&self) -> &str {
        self.id.as_deref().unwrap_or(&self.location)
    }
}

/// A document as written in a service file: one page, or `{ "combine": [...] }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DocumentSpec {
    Combine { combine: Vec<PageDeclaration> },
    Single(PageDeclaration),
}

impl DocumentSpec {
    pub fn pages(&self) -> Vec<PageDeclaration> {
        match self {
            Self::Combine { combine } => combine.clone(),
            Self::Single(page) => vec![page.clone()],
        }
    }

    pub fn from_pages(mut pages: Vec<PageDeclaration>) -> Self {
        if pages.len() == 1 {
            Self::Single(pages.remove(0))
        } else {
            Self::Combine { combine: pages }
        }
    }
}

/// `"a"` and `["a", "b"]` both read as a list; a single item is written back
/// as a plain string.
mod one_or_many {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    pub fn serialize<S: Serializer>(values: &[String], serializer: S) -> Result<S::Ok, S::Error> {
        if values.len() == 1 {
            values[0].serialize(serializer)
        } else {
            values.serialize(serializer)
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
        Ok(match OneOrMany::deserialize(deserializer)? {
            OneOrMany::One(value) => vec![value],
            OneOrMany::Many(values) => values,
        })
    }
}
