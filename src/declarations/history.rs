//! `<serviceId>.history.json` reading and appending.

use std::fs;
use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use indexmap::IndexMap;
use serde_json::{Map, Value};
use tracing::{debug, info};

use super::page::DocumentSpec;
use crate::error::{RegenError, Result};
use crate::files::write_atomic;

const VALID_UNTIL: &str = "validUntil";

/// What [`append`] did to the history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryUpdate {
    /// Latest entry was identical; only its `validUntil` moved.
    Extended,
    /// A new entry was added.
    Appended,
}

/// One superseded declaration. `None` means open-ended: valid up to now.
pub type HistoryEntry = (DocumentSpec, Option<DateTime<Utc>>);

/// Sort key placing dated entries by ascending date and open-ended ones last.
pub(super) fn entry_order(valid_until: &Option<DateTime<Utc>>) -> (bool, Option<DateTime<Utc>>) {
    (valid_until.is_none(), *valid_until)
}

pub(super) fn parse_history(
    path: &Path,
    raw: IndexMap<String, Vec<Value>>,
) -> Result<IndexMap<String, Vec<HistoryEntry>>> {
    let mut history = IndexMap::new();

    for (document_type, entries) in raw {
        let mut parsed = Vec::with_capacity(entries.len());
        for entry in entries {
            let Value::Object(mut fields) = entry else {
                return Err(malformed(path, format!("entry of \"{}\" is not an object", document_type)));
            };

            let valid_until = match fields.remove(VALID_UNTIL) {
                Some(Value::String(date)) => Some(
                    DateTime::parse_from_rfc3339(&date)
                        .map_err(|e| malformed(path, format!("invalid validUntil \"{}\": {}", date, e)))?
                        .with_timezone(&Utc),
                ),
                None | Some(Value::Null) => {
                    debug!(
                        "History entry of \"{}\" in {} is open-ended",
                        document_type,
                        path.display()
                    );
                    None
                }
                Some(other) => {
                    return Err(malformed(path, format!("invalid validUntil {}", other)));
                }
            };

            let spec: DocumentSpec = serde_json::from_value(Value::Object(fields))
                .map_err(|e| malformed(path, e.to_string()))?;
            parsed.push((spec, valid_until));
        }
        parsed.sort_by_key(|(_, date)| entry_order(date));
        history.insert(document_type, parsed);
    }

    Ok(history)
}

/// Append `spec` to the history of `document_type`.
///
/// When the latest entry is structurally identical to `spec` (ignoring
/// `validUntil` and null fields) its `validUntil` is updated instead.
pub(super) fn append(
    path: &Path,
    document_type: &str,
    spec: &DocumentSpec,
    valid_until: DateTime<Utc>,
) -> Result<HistoryUpdate> {
    let mut history: IndexMap<String, Vec<Value>> = if path.exists() {
        let raw = fs::read_to_string(path).map_err(|e| RegenError::access(path, e))?;
        serde_json::from_str(&raw).map_err(|e| malformed(path, e.to_string()))?
    } else {
        IndexMap::new()
    };

    let current = strip(serde_json::to_value(spec)?);
    let valid_until_value = Value::String(valid_until.to_rfc3339_opts(SecondsFormat::Millis, true));
    let entries = history.entry(document_type.to_string()).or_default();

    let latest = entries.iter_mut().max_by_key(|entry| {
        let date = entry
            .get(VALID_UNTIL)
            .and_then(Value::as_str)
            .and_then(|date| DateTime::parse_from_rfc3339(date).ok())
            .map(|date| date.with_timezone(&Utc));
        entry_order(&date)
    });

    let update = match latest {
        Some(Value::Object(fields)) if same_declaration(fields, &current) => {
            info!("History entry is already present, updating validUntil to {}", valid_until);
            fields.insert(VALID_UNTIL.to_string(), valid_until_value);
            HistoryUpdate::Extended
        }
        _ => {
            info!("History entry does not exist, creating one");
            let mut fields = match current {
                Value::Object(fields) => fields,
                _ => Map::new(),
            };
            fields.insert(VALID_UNTIL.to_string(), valid_until_value);
            entries.push(Value::Object(fields));
            HistoryUpdate::Appended
        }
    };

    let mut json = serde_json::to_string_pretty(&history)?;
    json.push('\n');
    write_atomic(path, json.as_bytes())?;
    Ok(update)
}

fn same_declaration(entry: &Map<String, Value>, current: &Value) -> bool {
    let mut entry = entry.clone();
    entry.remove(VALID_UNTIL);
    strip(Value::Object(entry)) == *current
}

/// Drop null fields, recursively.
fn strip(value: Value) -> Value {
    match value {
        Value::Object(fields) => Value::Object(
            fields
                .into_iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k, strip(v)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(strip).collect()),
        other => other,
    }
}

fn malformed(path: &Path, message: String) -> RegenError {
    RegenError::MalformedDeclaration {
        path: path.to_path_buf(),
        message,
    }
}
