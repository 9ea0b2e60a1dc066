//! Filename generation and sanitization for archive artifacts.
//!
//! Snapshot copies are written as `<fetch date>-<snapshot id>.<ext>` inside
//! `<service>/<document type>/` folders. Service ids and document types come
//! from operator-authored declarations, so every path component goes through
//! [`sanitize`] first.

use chrono::{DateTime, SecondsFormat, Utc};
use deunicode::deunicode;

/// Characters that are invalid in filenames on common filesystems.
const INVALID_CHARS: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Windows reserved device names that cannot be used as filenames.
const WINDOWS_RESERVED: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// Fallback name when sanitization produces an empty result.
const FALLBACK_NAME: &str = "unnamed";

/// Maximum filename length for most filesystems.
pub const MAX_FILENAME_LENGTH: usize = 255;

/// Sanitizes a single path component.
///
/// Document types such as `Terms of Service` keep their spaces: they are part
/// of the archive layout operators already know. Only characters that cannot
/// appear in a path component are dropped.
///
/// 1. Unicode → ASCII transliteration
/// 2. Invalid filesystem characters removed, control characters dropped
/// 3. Leading/trailing dots and spaces trimmed
/// 4. Windows reserved names prefixed with `_`
/// 5. Empty results → "unnamed"
pub fn sanitize(input: &str) -> String {
    let ascii = deunicode(input);

    let cleaned: String = ascii
        .chars()
        .filter(|c| !INVALID_CHARS.contains(c) && !c.is_control())
        .collect();

    let trimmed = cleaned.trim_matches(|c| c == '.' || c == ' ');
    let name = handle_reserved_name(trimmed);

    if name.is_empty() {
        FALLBACK_NAME.to_string()
    } else {
        truncate_to_length(&name, MAX_FILENAME_LENGTH)
    }
}

/// File name of a snapshot copy: fetch date without milliseconds, `:` and `.`
/// replaced by `-`, followed by the snapshot id.
///
/// `2023-01-02T10:00:00.123Z` + `abc` → `2023-01-02T10-00-00Z-abc.html`
pub fn snapshot_filename(fetch_date: &DateTime<Utc>, snapshot_id: &str, extension: &str) -> String {
    let date = fetch_date
        .to_rfc3339_opts(SecondsFormat::Secs, true)
        .replace([':', '.'], "-");

    format!("{}-{}.{}", date, sanitize(snapshot_id), extension)
}

/// File extension used when storing content of the given MIME type.
pub fn extension_for_mime(mime_type: &str) -> &'static str {
    match mime_type.split(';').next().unwrap_or("").trim() {
        "text/html" | "application/xhtml+xml" => "html",
        "text/markdown" => "md",
        "text/plain" => "txt",
        "application/pdf" => "pdf",
        _ => "html",
    }
}

fn truncate_to_length(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        s.to_string()
    } else {
        s.chars().take(max_len).collect()
    }
}

/// Checks if a name is a Windows reserved name and prefixes it if so.
///
/// Handles both exact matches (CON) and names with extensions (CON.txt).
fn handle_reserved_name(name: &str) -> String {
    let base_name = match name.find('.') {
        Some(pos) => &name[..pos],
        None => name,
    };

    let upper = base_name.to_uppercase();
    if WINDOWS_RESERVED.iter().any(|reserved| upper == *reserved) {
        return format!("_{}", name);
    }
    name.to_string()
}
