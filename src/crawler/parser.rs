//! HTML parser for extracting links, title and text
//!
//! This module handles parsing HTML content to extract:
//! - Links to follow (from <a> tags and canonical links)
//! - Page title
//! - Visible text content

use scraper::{Html, Selector};
use url::Url;

/// Elements whose text is never shown to a reader
const HIDDEN_ELEMENTS: &[&str] = &["head", "script", "style", "noscript", "template"];

/// Extracted information from an HTML page
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedPage {
    /// The page title (from <title> tag)
    pub title: Option<String>,

    /// All links found on the page (absolute URLs), in document order
    pub links: Vec<String>,

    /// Visible text with whitespace collapsed
    pub text: String,
}

/// Parses HTML content and extracts links, title and text
///
/// # Link Extraction Rules
///
/// **Include:**
/// - `<a href="...">` tags
/// - `<link rel="canonical" href="...">`
///
/// **Exclude:**
/// - `<a href="..." download>`
/// - `javascript:`, `mailto:`, `tel:` links
/// - Data URIs and fragment-only links
/// - Anything that does not resolve to http(s)
///
/// `rel="nofollow"` links are followed.
///
/// # Arguments
///
/// * `html` - The HTML document
/// * `base_url` - URL the document was fetched from, used to resolve relative links
///
/// # Returns
///
/// A [`ParsedPage`] with the title (if any), absolute links in document order and
/// the visible text
///
/// # Example
///
/// ```
/// use sumi_crawl::crawler::parse_html;
/// use url::Url;
///
/// let html = r#"<html><head><title>Test</title></head><body><a href="/page">Link</a></body></html>"#;
/// let base_url = Url::parse("https://example.com/").unwrap();
/// let parsed = parse_html(html, &base_url);
/// assert_eq!(parsed.title, Some("Test".to_string()));
/// assert_eq!(parsed.links, vec!["https://example.com/page".to_string()]);
/// assert_eq!(parsed.text, "Link");
/// ```
pub fn parse_html(html: &str, base_url: &Url) -> ParsedPage {
    let document = Html::parse_document(html);

    ParsedPage {
        title: extract_title(&document),
        links: extract_links(&document, base_url),
        text: extract_text(&document),
    }
}

/// Schemes that never lead to a fetchable page
const SKIPPED_SCHEMES: &[&str] = &["javascript:", "mailto:", "tel:", "data:"];

fn selector(css: &str) -> Option<Selector> {
    Selector::parse(css).ok()
}

fn extract_title(document: &Html) -> Option<String> {
    let title = document.select(&selector("title")?).next()?;
    let text = title.text().collect::<String>();
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

/// Anchor hrefs in document order, followed by canonical links
fn extract_links(document: &Html, base_url: &Url) -> Vec<String> {
    let anchors = selector("a[href]")
        .map(|s| {
            document
                .select(&s)
                .filter(|a| a.value().attr("download").is_none())
                .filter_map(|a| a.value().attr("href"))
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();

    let canonical = selector("link[rel='canonical'][href]")
        .map(|s| {
            document
                .select(&s)
                .filter_map(|l| l.value().attr("href"))
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();

    anchors
        .into_iter()
        .chain(canonical)
        .filter_map(|href| resolve_link(href, base_url))
        .collect()
}

/// Collects text nodes outside of hidden elements and collapses whitespace
fn extract_text(document: &Html) -> String {
    let mut raw = String::new();

    for node in document.root_element().descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };

        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|element| HIDDEN_ELEMENTS.contains(&element.name()))
        });
        if !hidden {
            raw.push_str(text);
            raw.push(' ');
        }
    }

    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Absolute http(s) form of `href`, or `None` when it should not be followed
fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();
    let lowered = href.to_ascii_lowercase();
    if href.is_empty() || href.starts_with('#') || SKIPPED_SCHEMES.iter().any(|s| lowered.starts_with(s)) {
        return None;
    }

    let absolute = base_url.join(href).ok()?;
    matches!(absolute.scheme(), "http" | "https").then(|| absolute.to_string())
}
