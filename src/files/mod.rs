//! File naming helpers shared by the stores and the review output.

pub mod filename;

use std::fs;
use std::io::Write;
use std::path::Path;

use crate::error::{RegenError, Result};

/// Write `contents` to `path` atomically.
///
/// Data goes to a sibling temporary file first which is then renamed over the
/// target, so readers never observe a partially written file.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| RegenError::access(parent, e))?;
    }

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp_path = path.with_file_name(format!(".{}.tmp", file_name));

    let mut file = fs::File::create(&tmp_path).map_err(|e| RegenError::access(&tmp_path, e))?;
    file.write_all(contents)
        .and_then(|_| file.sync_all())
        .map_err(|e| RegenError::access(&tmp_path, e))?;
    drop(file);

    fs::rename(&tmp_path, path).map_err(|e| RegenError::access(path, e))?;
    Ok(())
}
