//! Extraction boundary: raw snapshot content → version text.
//!
//! The pipeline assumes extraction is a pure function of
//! `(content, mime type, page declaration)`: replaying the same snapshot with
//! the same declaration always yields the same text, which is what makes
//! comparing against the previous version meaningful.

mod html;

pub use html::{HtmlExtractor, STRIP_LINK_QUERIES};

use crate::declarations::PageDeclaration;
use crate::error::Result;
use crate::snapshots::Snapshot;

/// Location used by the generic declaration to resolve relative links.
pub const GENERIC_LOCATION: &str = "http://service.example";

/// Turns one page capture into text.
pub trait Extractor {
    /// Fails with [`RegenError::ExtractionFailure`] when nothing usable can
    /// be extracted.
    ///
    /// [`RegenError::ExtractionFailure`]: crate::RegenError::ExtractionFailure
    fn extract(&self, content: &str, mime_type: &str, page: &PageDeclaration) -> Result<String>;
}

/// Declaration selecting the whole document, used to fingerprint snapshots
/// independently of any service declaration.
pub fn generic_page_declaration() -> PageDeclaration {
    let mut page = PageDeclaration::new(GENERIC_LOCATION, "html");
    page.filters.push(STRIP_LINK_QUERIES.to_string());
    page
}

/// Content fingerprint of a snapshot: its generic extraction, or an empty
/// string when even that fails.
pub fn fingerprint(extractor: &dyn Extractor, snapshot: &Snapshot) -> String {
    extractor
        .extract(&snapshot.content, &snapshot.mime_type, &generic_page_declaration())
        .unwrap_or_default()
}
