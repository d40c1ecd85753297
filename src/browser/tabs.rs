//! Scoped lifecycle of nested browser contexts
//!
//! The pipeline navigates a fixed three-level shape:
//!
//! ```text
//! Root (operator's main tab)
//!  └─ Search   (keyword search / suggestion pages)
//!      └─ Content  (one post or reel)
//!          └─ Profile  (the owner's profile and message thread)
//! ```
//!
//! Contexts are held on an explicit stack whose levels strictly increase from
//! bottom to top. Closing always pops, even when the browser reports an error,
//! so the stack never disagrees with what the caller believes is open.
//! [`TabLifecycleManager::unwind_to`] is the release path every caller runs
//! after a unit of work, whatever its outcome.

use crate::browser::driver::{BrowserDriver, ContextId};
use crate::browser::error::{BrowserError, BrowserResult};
use std::fmt;
use std::sync::Arc;
use url::Url;

/// Nesting level of a browser context
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TabLevel {
    Root = 0,
    Search = 1,
    Content = 2,
    Profile = 3,
}

impl fmt::Display for TabLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Root => "root",
            Self::Search => "search",
            Self::Content => "content",
            Self::Profile => "profile",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone)]
struct OpenContext {
    level: TabLevel,
    id: ContextId,
}

pub struct TabLifecycleManager {
    driver: Arc<dyn BrowserDriver>,
    root: ContextId,
    stack: Vec<OpenContext>,
}

impl TabLifecycleManager {
    /// Adopts the currently focused context as the root
    pub async fn attach(driver: Arc<dyn BrowserDriver>) -> BrowserResult<Self> {
        let root = driver.current_context().await?;
        Ok(Self {
            driver,
            root,
            stack: Vec::new(),
        })
    }

    pub fn driver(&self) -> &dyn BrowserDriver {
        self.driver.as_ref()
    }

    /// Level of the innermost open context
    pub fn top_level(&self) -> TabLevel {
        self.stack.last().map(|c| c.level).unwrap_or(TabLevel::Root)
    }

    /// Number of open contexts at `level`
    pub fn open_count(&self, level: TabLevel) -> usize {
        self.stack.iter().filter(|c| c.level == level).count()
    }

    /// Number of open contexts above the root
    pub fn open_total(&self) -> usize {
        self.stack.len()
    }

    /// Opens a context nested below the current top and navigates it to `url`
    ///
    /// `level` must be deeper than every open context. The search path opens
    /// each level in turn; queued sends and follow-ups open `Profile` straight
    /// from the root. The new context is pushed before navigation, so a failed
    /// navigation is still released by the next `unwind_to`.
    pub async fn open_level(&mut self, level: TabLevel, url: &Url) -> BrowserResult<ContextId> {
        if level == TabLevel::Root || level <= self.top_level() {
            return Err(BrowserError::TabMisuse(format!(
                "cannot open {} context while {} is on top",
                level,
                self.top_level()
            )));
        }

        let id = self.driver.new_context().await?;
        self.stack.push(OpenContext {
            level,
            id: id.clone(),
        });
        tracing::trace!("Opened {} context {} -> {}", level, id, url);

        self.driver.switch_to(&id).await?;
        self.driver.navigate(url).await?;
        Ok(id)
    }

    /// Closes the innermost context, which must be `id`, and refocuses its parent
    pub async fn close_level(&mut self, id: &ContextId) -> BrowserResult<()> {
        match self.stack.last() {
            Some(top) if &top.id == id => {}
            _ => {
                return Err(BrowserError::TabMisuse(format!(
                    "context {} is not the innermost open context",
                    id
                )))
            }
        }

        let closed = self.pop_and_close().await;
        let refocused = self.focus_top().await;
        closed.and(refocused)
    }

    /// Closes every context nested deeper than `level` and refocuses the new top
    ///
    /// Never fails: close errors are logged and the stack still shrinks.
    pub async fn unwind_to(&mut self, level: TabLevel) {
        let mut closed = 0;
        while self.top_level() > level {
            if let Err(e) = self.pop_and_close().await {
                tracing::warn!("Failed to close browser context: {}", e);
            }
            closed += 1;
        }

        if closed > 0 {
            tracing::trace!("Unwound {} contexts to {}", closed, level);
            if let Err(e) = self.focus_top().await {
                tracing::warn!("Failed to refocus {} context: {}", level, e);
            }
        }
    }

    async fn pop_and_close(&mut self) -> BrowserResult<()> {
        let Some(context) = self.stack.pop() else {
            return Ok(());
        };

        let closed = match self.driver.switch_to(&context.id).await {
            Ok(()) => self.driver.close_current().await,
            Err(e) => Err(e),
        };
        match closed {
            // Already gone (closed by the page itself): nothing left to release
            Err(BrowserError::NoSuchContext(_)) => Ok(()),
            other => other,
        }
    }

    async fn focus_top(&self) -> BrowserResult<()> {
        let target = self
            .stack
            .last()
            .map(|c| c.id.clone())
            .unwrap_or_else(|| self.root.clone());
        self.driver.switch_to(&target).await
    }
}

impl Drop for TabLifecycleManager {
    fn drop(&mut self) {
        if !self.stack.is_empty() {
            tracing::warn!(
                "Tab manager dropped with {} contexts still open",
                self.stack.len()
            );
        }
    }
}
