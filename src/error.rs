//! Errors raised while regenerating versions.

use std::path::PathBuf;

/// Result alias used by the pipeline components.
pub type Result<T, E = RegenError> = std::result::Result<T, E>;

/// Errors that can occur while replaying snapshots.
///
/// The first three variants are per-snapshot conditions: the pipeline turns
/// them into an outcome and moves on. Everything else aborts the run.
#[derive(Debug, thiserror::Error)]
pub enum RegenError {
    #[error("Content is inaccessible or unprocessable: {reason}")]
    ExtractionFailure { reason: String },

    #[error("No declaration of \"{document_type}\" for {service_id} is valid at {fetch_date}")]
    DeclarationAbsent {
        service_id: String,
        document_type: String,
        fetch_date: String,
    },

    #[error("Snapshot {snapshot_id} refers to page \"{page_id}\" which is not declared for {service_id} - {document_type}")]
    PageDeclarationMismatch {
        snapshot_id: String,
        service_id: String,
        document_type: String,
        page_id: String,
    },

    #[error("{service_id} - {document_type} has already been marked as done. If you're sure of what you're doing, remove \"done\" from the rules file or pass --force")]
    DocumentDone {
        service_id: String,
        document_type: String,
    },

    #[error("Snapshot not found: {id}")]
    NotFound { id: String },

    #[error("Malformed rules file {path}: {message}")]
    MalformedRules { path: PathBuf, message: String },

    #[error("Malformed declaration file {path}: {message}")]
    MalformedDeclaration { path: PathBuf, message: String },

    #[error("Invalid CSS selector \"{selector}\": {message}")]
    InvalidSelector { selector: String, message: String },

    #[error("Failed to access {path}: {source}")]
    Access {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl RegenError {
    /// Build an [`RegenError::Access`] for a failed filesystem call.
    pub fn access(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Access {
            path: path.into(),
            source,
        }
    }

    pub fn extraction(reason: impl Into<String>) -> Self {
        Self::ExtractionFailure {
            reason: reason.into(),
        }
    }

    /// Whether this error only concerns the snapshot being processed.
    pub fn is_per_snapshot(&self) -> bool {
        matches!(
            self,
            Self::ExtractionFailure { .. }
                | Self::DeclarationAbsent { .. }
                | Self::PageDeclarationMismatch { .. }
        )
    }

    /// Whether this error means "nothing stored there yet".
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound { .. } => true,
            Self::Access { source, .. } | Self::Io(source) => {
                source.kind() == std::io::ErrorKind::NotFound
            }
            _ => false,
        }
    }
}
