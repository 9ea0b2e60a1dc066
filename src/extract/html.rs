//! HTML extraction with CSS selectors and Markdown conversion.

use scraper::{Html, Node, Selector};
use tracing::debug;
use url::Url;

use super::Extractor;
use crate::declarations::PageDeclaration;
use crate::error::{RegenError, Result};

/// Filter name removing query strings from every link.
pub const STRIP_LINK_QUERIES: &str = "stripLinkQueries";

/// Selects declared content, drops noise, converts to Markdown.
///
/// Plain text and Markdown captures pass through trimmed. Named filters other
/// than [`STRIP_LINK_QUERIES`] are not executable here and are ignored.
#[derive(Debug, Default, Clone, Copy)]
pub struct HtmlExtractor;

impl HtmlExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Extractor for HtmlExtractor {
    fn extract(&self, content: &str, mime_type: &str, page: &PageDeclaration) -> Result<String> {
        let essence = mime_type.split(';').next().unwrap_or("").trim();
        match essence {
            "text/plain" | "text/markdown" => return non_empty(content.trim().to_string()),
            "application/pdf" => {
                return Err(RegenError::extraction("PDF content cannot be extracted"));
            }
            _ => {}
        }

        let mut document = Html::parse_document(content);
        if page.filters.iter().any(|f| f == STRIP_LINK_QUERIES) {
            strip_link_queries(&mut document, &page.location);
        }

        if !page.noise_selectors.is_empty() {
            let noise = parse_selector(&page.noise_selectors.join(", "))?;
            let ids: Vec<_> = document.select(&noise).map(|el| el.id()).collect();
            for id in ids {
                if let Some(mut node) = document.tree.get_mut(id) {
                    node.detach();
                }
            }
        }

        let selectors = if page.content_selectors.is_empty() {
            "body".to_string()
        } else {
            page.content_selectors.join(", ")
        };
        let selector = parse_selector(&selectors)?;

        // Document order, even across several selectors
        let fragments: Vec<String> = document.select(&selector).map(|el| el.html()).collect();
        if fragments.is_empty() {
            return Err(RegenError::extraction(format!(
                "The provided selector \"{}\" has no match in the web page at {}",
                selectors, page.location
            )));
        }

        let markdown = htmd::convert(&fragments.join("\n"))
            .map_err(|e| RegenError::extraction(format!("Markdown conversion failed: {}", e)))?;
        non_empty(markdown.trim().to_string())
    }
}

fn non_empty(text: String) -> Result<String> {
    if text.is_empty() {
        Err(RegenError::extraction("Extracted content is empty"))
    } else {
        Ok(text)
    }
}

fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector)
        .map_err(|e| RegenError::extraction(format!("Invalid selector \"{}\": {}", selector, e)))
}

/// Rewrite every link `href` without its query string, resolved against
/// `location`.
fn strip_link_queries(document: &mut Html, location: &str) {
    let Ok(base) = Url::parse(location) else {
        return;
    };
    let Ok(links) = Selector::parse("a[href]") else {
        return;
    };

    let ids: Vec<_> = document.select(&links).map(|el| el.id()).collect();
    for id in ids {
        let Some(mut node) = document.tree.get_mut(id) else {
            continue;
        };
        let Node::Element(element) = node.value() else {
            continue;
        };

        for (name, value) in element.attrs.iter_mut() {
            if name.local.as_ref() != "href" {
                continue;
            }
            let href: &str = value;
            let Ok(mut url) = base.join(href) else {
                continue;
            };
            if url.query().is_none() {
                continue;
            }
            url.set_query(None);
            debug!("Stripping query from link {}", href);
            *value = url.as_str().into();
        }
    }
}
