//! The browser abstraction the pipeline is written against

use crate::browser::error::BrowserResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use url::Url;

/// WebDriver key code for the Enter key
pub const ENTER_KEY: &str = "\u{E007}";

/// Opaque identifier of a browser context (a tab/window handle)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContextId(pub String);

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque reference to an element in the current context
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementId(pub String);

/// A browser cookie, in W3C WebDriver shape
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cookie {
    pub name: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secure: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_only: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub same_site: Option<String>,
}

/// Everything the pipeline needs from a browser
///
/// All commands act on the *current* context, as in the WebDriver protocol.
/// `new_context` opens a tab without focusing it; callers switch explicitly.
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    /// Handle of the focused context
    async fn current_context(&self) -> BrowserResult<ContextId>;

    /// Opens a new, unfocused tab
    async fn new_context(&self) -> BrowserResult<ContextId>;

    async fn switch_to(&self, context: &ContextId) -> BrowserResult<()>;

    /// Closes the focused context; focus is undefined until the next `switch_to`
    async fn close_current(&self) -> BrowserResult<()>;

    async fn navigate(&self, url: &Url) -> BrowserResult<()>;

    async fn current_url(&self) -> BrowserResult<Url>;

    async fn page_source(&self) -> BrowserResult<String>;

    /// Finds the first element matching a CSS selector, if any
    async fn find(&self, css: &str) -> BrowserResult<Option<ElementId>>;

    async fn click(&self, element: &ElementId) -> BrowserResult<()>;

    /// Sends keystrokes to an element in one command
    async fn type_text(&self, element: &ElementId, text: &str) -> BrowserResult<()>;

    /// PNG screenshot of the focused context, base64-encoded
    async fn screenshot_base64(&self) -> BrowserResult<String>;

    async fn cookies(&self) -> BrowserResult<Vec<Cookie>>;

    async fn add_cookie(&self, cookie: &Cookie) -> BrowserResult<()>;
}

/// Polls for an element until it appears or `timeout` elapses
///
/// Returns `Ok(None)` on timeout. Each poll yields to the runtime, so the
/// control task is suspended rather than blocked while it waits.
pub async fn wait_for(
    driver: &dyn BrowserDriver,
    css: &str,
    timeout: Duration,
    poll_interval: Duration,
) -> BrowserResult<Option<ElementId>> {
    let deadline = tokio::time::Instant::now() + timeout;

    loop {
        if let Some(element) = driver.find(css).await? {
            return Ok(Some(element));
        }

        let now = tokio::time::Instant::now();
        if now >= deadline {
            tracing::debug!("Timed out after {:?} waiting for '{}'", timeout, css);
            return Ok(None);
        }

        tokio::time::sleep(poll_interval.min(deadline - now)).await;
    }
}
