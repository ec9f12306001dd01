//! Resource discovery
//!
//! Given a fetched document and the address it came from, finds the
//! stylesheets, scripts and images it references and resolves them to
//! absolute URLs.

mod tag;

pub use tag::Tag;

use crate::resource::Resource;
use crate::DiscoveryError;
use scraper::{Html, Selector};
use url::Url;

/// Extracts the resources a document references
pub trait Discoverer: Send + Sync {
    /// Returns the referenced resources in document order
    ///
    /// References are resolved against `base`, the address of the document:
    /// root-relative (`/path`) ones against its scheme and host,
    /// scheme-relative (`//host/path`) ones against its scheme, and
    /// document-relative (`img/a.png`) ones against its path.
    fn discover(&self, base: &Url, body: &[u8]) -> Result<Vec<Resource>, DiscoveryError>;
}

/// Discoverer that scans HTML for link, script and img tags
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlDiscoverer;

impl Discoverer for HtmlDiscoverer {
    fn discover(&self, base: &Url, body: &[u8]) -> Result<Vec<Resource>, DiscoveryError> {
        extract_resources(base, body)
    }
}

/// Parses `body` as HTML and returns every referenced remote resource
///
/// # Extraction Rules
///
/// **Include:**
/// - `<link rel="stylesheet" href>` as stylesheets
/// - `<link rel="icon" href>` and the other icon rels as images
/// - `<script src>` as scripts
/// - `<img src>` as images
///
/// **Exclude:**
/// - Empty and fragment-only references
/// - Anything that does not resolve to an HTTP(S) URL (`data:`, `javascript:`)
///
/// # Example
///
/// ```
/// use pageweight::discovery::extract_resources;
/// use url::Url;
///
/// let base = Url::parse("https://example.com/blog/post.html").unwrap();
/// let body = br#"<script src="/app.js"></script><img src="img/a.png">"#;
/// let resources = extract_resources(&base, body).unwrap();
/// assert_eq!(resources[0].url, "https://example.com/app.js");
/// assert_eq!(resources[1].url, "https://example.com/blog/img/a.png");
/// ```
pub fn extract_resources(base: &Url, body: &[u8]) -> Result<Vec<Resource>, DiscoveryError> {
    if base.cannot_be_a_base() {
        return Err(DiscoveryError::InvalidBase(base.to_string()));
    }

    let selector =
        Selector::parse(Tag::SELECTOR).map_err(|e| DiscoveryError::Selector(e.to_string()))?;
    let document = Html::parse_document(&String::from_utf8_lossy(body));

    let mut resources = Vec::new();
    for element in document.select(&selector) {
        let Some(tag) = Tag::from_name(element.value().name()) else {
            continue;
        };
        let Some((reference, kind)) = tag.reference(element.value()) else {
            continue;
        };
        if let Some(url) = resolve_reference(&reference, base) {
            resources.push(Resource::new(url, kind));
        }
    }

    Ok(resources)
}

/// Resolves a reference against the document address, dropping non-fetchable ones
fn resolve_reference(reference: &str, base: &Url) -> Option<String> {
    let reference = reference.trim();

    if reference.is_empty() || reference.starts_with('#') {
        return None;
    }

    match base.join(reference) {
        Ok(absolute) if absolute.scheme() == "http" || absolute.scheme() == "https" => {
            Some(absolute.to_string())
        }
        _ => None,
    }
}
