//! HTML snapshot parsing
//!
//! The pipeline never scripts the page; it reads the rendered page source and
//! parses it here to extract:
//! - Anchors with their resolved URL and visible label
//! - Page title and description-style metadata

use scraper::{Html, Selector};
use url::Url;

/// An anchor found in the page
#[derive(Debug, Clone, PartialEq)]
pub struct PageLink {
    /// Absolute URL the anchor points at
    pub url: Url,

    /// Visible text, whitespace-collapsed
    pub text: String,
}

/// Extracted information from a rendered page
#[derive(Debug, Clone, Default)]
pub struct ParsedPage {
    /// The page title (from <title> tag)
    pub title: Option<String>,

    /// `og:title`, `og:description` and `description` values, in that order
    pub metadata: Vec<String>,

    /// All followable anchors, in document order
    pub links: Vec<PageLink>,
}

impl ParsedPage {
    /// Every metadata value, then the title
    pub fn text_sources(&self) -> impl Iterator<Item = &str> {
        self.metadata
            .iter()
            .map(String::as_str)
            .chain(self.title.as_deref())
    }
}

/// Parses rendered HTML and extracts anchors and metadata
///
/// # Link Extraction Rules
///
/// **Include:** `<a href="...">` resolved against `base_url`
///
/// **Exclude:** `javascript:`, `mailto:`, `tel:`, `data:` and fragment-only
/// hrefs, and anything that is not HTTP(S) after resolution
///
/// # Example
///
/// ```
/// use outreach_scout::pipeline::parse_page;
/// use url::Url;
///
/// let html = r#"<html><head><title>Post</title></head><body><a href="/alice/">alice</a></body></html>"#;
/// let base_url = Url::parse("https://www.example.com/p/abc/").unwrap();
/// let parsed = parse_page(html, &base_url);
/// assert_eq!(parsed.title.as_deref(), Some("Post"));
/// assert_eq!(parsed.links[0].url.as_str(), "https://www.example.com/alice/");
/// ```
pub fn parse_page(html: &str, base_url: &Url) -> ParsedPage {
    let document = Html::parse_document(html);

    ParsedPage {
        title: extract_title(&document),
        metadata: extract_metadata(&document),
        links: extract_links(&document, base_url),
    }
}

/// Extracts the page title from the HTML document
fn extract_title(document: &Html) -> Option<String> {
    let title_selector = Selector::parse("title").ok()?;

    document
        .select(&title_selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Extracts description-style metadata values
fn extract_metadata(document: &Html) -> Vec<String> {
    let selectors = [
        "meta[property='og:title'][content]",
        "meta[property='og:description'][content]",
        "meta[name='description'][content]",
    ];

    let mut values = Vec::new();
    for css in selectors {
        let Ok(selector) = Selector::parse(css) else {
            continue;
        };
        for element in document.select(&selector) {
            if let Some(content) = element.value().attr("content") {
                let content = content.trim();
                if !content.is_empty() {
                    values.push(content.to_string());
                }
            }
        }
    }
    values
}

/// Extracts all followable anchors from the HTML document
fn extract_links(document: &Html, base_url: &Url) -> Vec<PageLink> {
    let mut links = Vec::new();

    if let Ok(a_selector) = Selector::parse("a[href]") {
        for element in document.select(&a_selector) {
            if let Some(href) = element.value().attr("href") {
                if let Some(url) = resolve_link(href, base_url) {
                    let text = element
                        .text()
                        .collect::<Vec<_>>()
                        .join(" ")
                        .split_whitespace()
                        .collect::<Vec<_>>()
                        .join(" ");
                    links.push(PageLink { url, text });
                }
            }
        }
    }

    links
}

/// Resolves a link href to an absolute URL and validates it
///
/// Returns None if the link should be excluded:
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - Fragment-only links
/// - Non-HTTP(S) URLs after resolution
fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    // Skip special schemes
    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    match base_url.join(href) {
        Ok(absolute_url)
            if absolute_url.scheme() == "http" || absolute_url.scheme() == "https" =>
        {
            Some(absolute_url)
        }
        _ => None,
    }
}
