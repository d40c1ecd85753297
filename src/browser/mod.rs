//! Browser automation layer
//!
//! This module contains everything that touches the live browser:
//! - `BrowserDriver`: the async trait the pipeline programs against
//! - `WebDriverClient`: a W3C WebDriver implementation over HTTP
//! - `TabLifecycleManager`: the scoped stack of nested browser contexts
//! - `SessionManager`: cookie reuse, liveness probing and re-login

mod driver;
mod error;
mod session;
mod tabs;
mod webdriver;

pub use driver::{wait_for, BrowserDriver, ContextId, Cookie, ElementId, ENTER_KEY};
pub use error::{BrowserError, BrowserResult};
pub use session::SessionManager;
pub use tabs::{TabLevel, TabLifecycleManager};
pub use webdriver::WebDriverClient;
