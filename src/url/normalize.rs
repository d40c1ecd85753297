use crate::url::handle::{is_reserved_segment, Handle};
use crate::UrlError;
use url::Url;

/// Path markers that introduce a content item id
const CONTENT_MARKERS: &[&str] = &["p", "reel", "tv"];

/// Normalizes a content-item URL so the same post always compares equal
///
/// # Normalization Steps
///
/// 1. Parse the URL, resolving relative links against `base`
/// 2. Reject schemes other than HTTP(S)
/// 3. Lowercase the host
/// 4. Drop the query string and fragment (tracking parameters, `img_index`)
/// 5. Ensure the path ends with a single `/`
///
/// The path itself keeps its case: content ids are case-sensitive.
///
/// # Examples
///
/// ```
/// use outreach_scout::url::normalize_content_url;
/// use url::Url;
///
/// let base = Url::parse("https://www.example.com/").unwrap();
/// let url = normalize_content_url("/p/AbC123?img_index=2#x", &base).unwrap();
/// assert_eq!(url.as_str(), "https://www.example.com/p/AbC123/");
/// ```
pub fn normalize_content_url(href: &str, base: &Url) -> Result<Url, UrlError> {
    let mut url = base
        .join(href.trim())
        .map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    if let Some(host) = url.host_str() {
        let lowered = host.to_lowercase();
        url.set_host(Some(&lowered))
            .map_err(|e| UrlError::Parse(format!("Failed to set host: {}", e)))?;
    }

    url.set_query(None);
    url.set_fragment(None);

    let trimmed = url.path().trim_end_matches('/').to_string();
    url.set_path(&format!("{}/", trimmed));

    Ok(url)
}

/// Returns true if the URL points at a single content item
///
/// Accepts both `/p/<id>/` and the owner-prefixed `/<handle>/p/<id>/` shape.
pub fn is_content_url(url: &Url) -> bool {
    let segments: Vec<&str> = path_segments(url);
    match segments.as_slice() {
        [marker, _id] => CONTENT_MARKERS.contains(marker),
        [owner, marker, _id] => !is_reserved_segment(owner) && CONTENT_MARKERS.contains(marker),
        _ => false,
    }
}

/// Returns the owner handle embedded in a `/<handle>/p/<id>/` content URL
pub fn content_owner_segment(url: &Url) -> Option<Handle> {
    match path_segments(url).as_slice() {
        [owner, marker, _id] if CONTENT_MARKERS.contains(marker) => Handle::parse(owner).ok(),
        _ => None,
    }
}

/// Builds the platform search URL for a keyword
pub fn search_url(base: &Url, keyword: &str) -> Result<Url, UrlError> {
    let mut url = base
        .join("/explore/search/keyword/")
        .map_err(|e| UrlError::Parse(e.to_string()))?;
    url.query_pairs_mut().append_pair("q", keyword.trim());
    Ok(url)
}

/// Builds the direct tag URL for a keyword (`career tips` → `/explore/tags/careertips/`)
///
/// Used as the single fallback refinement when search suggestions are unavailable.
pub fn tag_url(base: &Url, keyword: &str) -> Result<Url, UrlError> {
    let tag: String = keyword
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_')
        .flat_map(|c| c.to_lowercase())
        .collect();

    if tag.is_empty() {
        return Err(UrlError::Parse(format!(
            "Keyword '{}' has no tag characters",
            keyword
        )));
    }

    base.join(&format!("/explore/tags/{}/", tag))
        .map_err(|e| UrlError::Parse(e.to_string()))
}

/// Builds the profile URL for a handle
pub fn profile_url(base: &Url, handle: &Handle) -> Result<Url, UrlError> {
    base.join(&format!("/{}/", handle.as_str()))
        .map_err(|e| UrlError::Parse(e.to_string()))
}

fn path_segments(url: &Url) -> Vec<&str> {
    url.path_segments()
        .map(|segments| segments.filter(|s| !s.is_empty()).collect())
        .unwrap_or_default()
}
