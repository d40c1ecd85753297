//! Keyword → content URL expansion
//!
//! A keyword is submitted to platform search in a Search-level context. The
//! search-assist suggestions (bounded) are then visited one by one in that same
//! context and their content-item links collected. When the platform offers no
//! suggestions the keyword's direct tag page stands in as the only refinement,
//! so discovery degrades instead of halting.

use crate::browser::{wait_for, BrowserError, TabLevel, TabLifecycleManager};
use crate::config::Config;
use crate::pipeline::page::parse_page;
use crate::url::{is_content_url, normalize_content_url, search_url, tag_url};
use crate::OutreachError;
use scraper::{Html, Selector};
use std::collections::HashSet;
use url::Url;

/// Selector that matches once a results grid has rendered
const CONTENT_LINK_SELECTOR: &str = "a[href*='/p/'], a[href*='/reel/']";

pub struct SearchExplorer<'a> {
    config: &'a Config,
    base_url: Url,
    suggestion_selector: Selector,
}

impl<'a> SearchExplorer<'a> {
    pub fn new(config: &'a Config) -> Result<Self, OutreachError> {
        let suggestion_selector = Selector::parse(&config.selectors.suggestion).map_err(|e| {
            crate::ConfigError::InvalidSelector(format!(
                "suggestion '{}': {:?}",
                config.selectors.suggestion, e
            ))
        })?;

        Ok(Self {
            config,
            base_url: Url::parse(&config.platform.base_url)?,
            suggestion_selector,
        })
    }

    /// Expands `keyword` into ordered, deduplicated content URLs
    ///
    /// Leaves the Search-level context open; the caller closes it once every
    /// content item derived from it has been processed.
    pub async fn expand(
        &self,
        tabs: &mut TabLifecycleManager,
        keyword: &str,
    ) -> Result<Vec<Url>, OutreachError> {
        let query = search_url(&self.base_url, keyword)?;
        tabs.open_level(TabLevel::Search, &query).await?;

        let mut refinements = self.read_suggestions(tabs, &query).await?;
        if refinements.is_empty() {
            let fallback = tag_url(&self.base_url, keyword)?;
            tracing::info!(
                "No suggestions for '{}', falling back to {}",
                keyword,
                fallback
            );
            refinements.push(fallback);
        } else {
            tracing::info!("'{}' expanded into {} suggestions", keyword, refinements.len());
        }

        let mut seen = HashSet::new();
        let mut content = Vec::new();

        for refinement in &refinements {
            match self.collect_content(tabs, refinement).await {
                Ok(urls) => {
                    let before = content.len();
                    for url in urls {
                        if seen.insert(url.clone()) {
                            content.push(url);
                        }
                    }
                    tracing::debug!(
                        "{} yielded {} new content items",
                        refinement,
                        content.len() - before
                    );
                }
                Err(OutreachError::Browser(BrowserError::SessionLost(msg))) => {
                    return Err(BrowserError::SessionLost(msg).into());
                }
                Err(e) => {
                    tracing::warn!("Skipping refinement {}: {}", refinement, e);
                }
            }
        }

        tracing::info!("'{}' produced {} content items", keyword, content.len());
        Ok(content)
    }

    async fn read_suggestions(
        &self,
        tabs: &TabLifecycleManager,
        query: &Url,
    ) -> Result<Vec<Url>, OutreachError> {
        let driver = tabs.driver();
        let pacing = &self.config.pacing;

        let rendered = wait_for(
            driver,
            &self.config.selectors.suggestion,
            pacing.element_timeout(),
            pacing.poll_interval(),
        )
        .await?;
        if rendered.is_none() {
            return Ok(Vec::new());
        }

        let html = driver.page_source().await?;
        let document = Html::parse_document(&html);

        let mut suggestions: Vec<Url> = Vec::new();
        for element in document.select(&self.suggestion_selector) {
            let Some(href) = element.value().attr("href") else {
                continue;
            };
            let Ok(url) = query.join(href.trim()) else {
                continue;
            };
            if &url == query || suggestions.contains(&url) {
                continue;
            }
            suggestions.push(url);
            if suggestions.len() >= self.config.search.max_suggestions {
                break;
            }
        }

        Ok(suggestions)
    }

    async fn collect_content(
        &self,
        tabs: &TabLifecycleManager,
        refinement: &Url,
    ) -> Result<Vec<Url>, OutreachError> {
        let driver = tabs.driver();
        let pacing = &self.config.pacing;

        driver.navigate(refinement).await?;
        wait_for(
            driver,
            CONTENT_LINK_SELECTOR,
            pacing.element_timeout(),
            pacing.poll_interval(),
        )
        .await?;

        let html = driver.page_source().await?;
        let page = parse_page(&html, refinement);

        let mut urls = Vec::new();
        for link in page.links {
            if !is_content_url(&link.url) {
                continue;
            }
            let Ok(url) = normalize_content_url(link.url.as_str(), refinement) else {
                continue;
            };
            if !urls.contains(&url) {
                urls.push(url);
            }
            if urls.len() >= self.config.search.max_items_per_suggestion {
                break;
            }
        }

        Ok(urls)
    }
}
