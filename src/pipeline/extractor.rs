//! Content-item owner resolution
//!
//! Given the rendered page of a post or reel, find the handle of the account
//! that owns it. Strategies are tried from most to least reliable:
//!
//! | Strategy   | Evidence                                                  |
//! |------------|-----------------------------------------------------------|
//! | Structural | `<a href="/name/">name</a>`: label equals the path segment |
//! | Metadata   | `@name` or `name on <Platform>` in title/description meta  |
//! | URL        | owner-prefixed content URL `/name/p/<id>/`                 |
//!
//! Reserved navigation segments (`explore`, `reels`, ...) are never accepted.

use crate::pipeline::page::{parse_page, ParsedPage};
use crate::url::{content_owner_segment, is_reserved_segment, Handle};
use crate::OutreachError;
use regex::Regex;
use std::fmt;
use url::Url;

/// Which strategy resolved the handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Structural,
    Metadata,
    UrlPattern,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Structural => "structural",
            Self::Metadata => "metadata",
            Self::UrlPattern => "url-pattern",
        };
        write!(f, "{}", name)
    }
}

/// A resolved owner handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    pub handle: Handle,
    pub strategy: Strategy,
}

pub struct ContentExtractor {
    at_handle: Regex,
    on_platform: Regex,
}

impl ContentExtractor {
    /// Builds an extractor for a platform display name (used in `name on <Platform>`)
    pub fn new(platform_name: &str) -> Self {
        let at_handle = Regex::new(r"(?:^|[^A-Za-z0-9._])@([A-Za-z0-9._]{1,30})")
            .expect("static regex is valid");
        let on_platform = Regex::new(&format!(
            r"(?i)(?:^|[\s(•|-])([A-Za-z0-9._]{{1,30}}) on {}\b",
            regex::escape(platform_name.trim())
        ))
        .expect("escaped platform name forms a valid regex");

        Self {
            at_handle,
            on_platform,
        }
    }

    /// Resolves the owner of the content page rendered as `html` at `page_url`
    ///
    /// Returns `OutreachError::Extraction` when every strategy fails.
    pub fn extract(&self, html: &str, page_url: &Url) -> Result<Extraction, OutreachError> {
        let page = parse_page(html, page_url);

        let found = self
            .structural(&page, page_url)
            .map(|h| (h, Strategy::Structural))
            .or_else(|| self.metadata(&page).map(|h| (h, Strategy::Metadata)))
            .or_else(|| content_owner_segment(page_url).map(|h| (h, Strategy::UrlPattern)));

        match found {
            Some((handle, strategy)) => {
                tracing::debug!("Resolved {} via {} for {}", handle, strategy, page_url);
                Ok(Extraction { handle, strategy })
            }
            None => Err(OutreachError::Extraction {
                url: page_url.to_string(),
            }),
        }
    }

    /// An anchor to a same-host, single-segment path whose label is that segment
    fn structural(&self, page: &ParsedPage, page_url: &Url) -> Option<Handle> {
        page.links.iter().find_map(|link| {
            if link.url.host_str() != page_url.host_str() {
                return None;
            }

            let mut segments = link.url.path_segments()?.filter(|s| !s.is_empty());
            let segment = segments.next()?;
            if segments.next().is_some() || is_reserved_segment(segment) {
                return None;
            }

            if !link.text.trim().eq_ignore_ascii_case(segment) {
                return None;
            }

            Handle::parse(segment).ok()
        })
    }

    fn metadata(&self, page: &ParsedPage) -> Option<Handle> {
        let sources: Vec<&str> = page.text_sources().collect();

        let from_at = sources.iter().find_map(|text| {
            self.at_handle
                .captures_iter(text)
                .find_map(|caps| Handle::parse(&caps[1]).ok())
        });

        from_at.or_else(|| {
            sources.iter().find_map(|text| {
                self.on_platform
                    .captures_iter(text)
                    .find_map(|caps| Handle::parse(&caps[1]).ok())
            })
        })
    }
}
