//! Shared fixtures: an in-memory browser serving scripted pages, a counting
//! classifier and a fast test configuration.

use async_trait::async_trait;
use outreach_scout::browser::{
    BrowserDriver, BrowserError, BrowserResult, ContextId, Cookie, ElementId, ENTER_KEY,
};
use outreach_scout::classifier::{ClassificationRequest, Classifier, ClassifierError, Verdict};
use outreach_scout::config::{
    Config, FollowUpConfig, MessagesConfig, PacingConfig, PlatformConfig, SearchConfig,
    SelectorConfig, StorageConfig, WebDriverConfig,
};
use scraper::{Html, Selector};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use url::{Position, Url};

pub const BASE_URL: &str = "https://platform.test/";
pub const OPERATOR: &str = "my_studio";

/// One submitted message part
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub to: String,
    pub text: String,
}

#[derive(Default)]
struct BrowserState {
    next_id: u32,
    open: Vec<ContextId>,
    focused: Option<ContextId>,
    urls: HashMap<ContextId, Url>,
    drafts: HashMap<ContextId, String>,
    sent: Vec<SentMessage>,
    navigations: Vec<String>,
    enters: HashMap<String, usize>,
    max_open: usize,
}

/// Browser double serving pages keyed by `path?query`
///
/// Unknown paths render as an empty document. Typing `ENTER_KEY` into any
/// element submits the focused context's draft as a message to the handle in
/// the context's URL.
pub struct FakeBrowser {
    pages: HashMap<String, String>,
    session_lost_on: Option<String>,
    load_timeout_on: Option<String>,
    click_intercepted_on: Option<String>,
    enter_fails_on: Option<(String, usize)>,
    state: Mutex<BrowserState>,
}

impl FakeBrowser {
    pub fn new(pages: HashMap<String, String>) -> Self {
        let root = ContextId("ctx-0".to_string());
        let mut state = BrowserState {
            next_id: 1,
            max_open: 1,
            ..Default::default()
        };
        state.open.push(root.clone());
        state
            .urls
            .insert(root.clone(), Url::parse(BASE_URL).unwrap());
        state.focused = Some(root);

        Self {
            pages,
            session_lost_on: None,
            load_timeout_on: None,
            click_intercepted_on: None,
            enter_fails_on: None,
            state: Mutex::new(state),
        }
    }

    /// Makes navigation to `path` fail as if the WebDriver session died
    pub fn with_session_lost_on(mut self, path: &str) -> Self {
        self.session_lost_on = Some(path.to_string());
        self
    }

    /// Makes navigation to `path` time out
    pub fn with_load_timeout_on(mut self, path: &str) -> Self {
        self.load_timeout_on = Some(path.to_string());
        self
    }

    /// Makes every click on the page at `path` land on an overlay
    pub fn with_click_intercepted_on(mut self, path: &str) -> Self {
        self.click_intercepted_on = Some(path.to_string());
        self
    }

    /// Makes the `nth` submission (1-based) on the page at `path` fail
    pub fn with_enter_failing_on(mut self, path: &str, nth: usize) -> Self {
        self.enter_fails_on = Some((path.to_string(), nth));
        self
    }

    /// Contexts currently open, root included
    pub fn open_contexts(&self) -> usize {
        self.state.lock().unwrap().open.len()
    }

    /// Highest number of simultaneously open contexts, root included
    pub fn max_open_contexts(&self) -> usize {
        self.state.lock().unwrap().max_open
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.state.lock().unwrap().sent.clone()
    }

    pub fn sent_to(&self, handle: &str) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter(|m| m.to == handle)
            .map(|m| m.text)
            .collect()
    }

    pub fn navigations(&self) -> Vec<String> {
        self.state.lock().unwrap().navigations.clone()
    }

    fn focused(&self) -> BrowserResult<(ContextId, Url)> {
        let state = self.state.lock().unwrap();
        let id = state
            .focused
            .clone()
            .ok_or_else(|| BrowserError::NoSuchContext("no focused context".to_string()))?;
        let url = state
            .urls
            .get(&id)
            .cloned()
            .ok_or_else(|| BrowserError::NoSuchContext(id.to_string()))?;
        Ok((id, url))
    }

    fn html_for(&self, url: &Url) -> String {
        self.pages
            .get(page_key(url))
            .cloned()
            .unwrap_or_else(|| "<html><body></body></html>".to_string())
    }
}

fn page_key(url: &Url) -> &str {
    &url[Position::BeforePath..]
}

fn protocol_error(command: &str, error: &str, message: &str) -> BrowserError {
    BrowserError::Protocol {
        command: command.to_string(),
        error: error.to_string(),
        message: message.to_string(),
    }
}

#[async_trait]
impl BrowserDriver for FakeBrowser {
    async fn current_context(&self) -> BrowserResult<ContextId> {
        Ok(self.focused()?.0)
    }

    async fn new_context(&self) -> BrowserResult<ContextId> {
        let mut state = self.state.lock().unwrap();
        let id = ContextId(format!("ctx-{}", state.next_id));
        state.next_id += 1;
        state.open.push(id.clone());
        state
            .urls
            .insert(id.clone(), Url::parse("about:blank").unwrap());
        state.max_open = state.max_open.max(state.open.len());
        Ok(id)
    }

    async fn switch_to(&self, context: &ContextId) -> BrowserResult<()> {
        let mut state = self.state.lock().unwrap();
        if !state.open.contains(context) {
            return Err(BrowserError::NoSuchContext(context.to_string()));
        }
        state.focused = Some(context.clone());
        Ok(())
    }

    async fn close_current(&self) -> BrowserResult<()> {
        let mut state = self.state.lock().unwrap();
        let id = state
            .focused
            .take()
            .ok_or_else(|| BrowserError::NoSuchContext("no focused context".to_string()))?;
        state.open.retain(|c| c != &id);
        state.urls.remove(&id);
        state.drafts.remove(&id);
        Ok(())
    }

    async fn navigate(&self, url: &Url) -> BrowserResult<()> {
        let key = page_key(url).to_string();
        if self.session_lost_on.as_deref() == Some(key.as_str()) {
            return Err(BrowserError::SessionLost("invalid session id".to_string()));
        }
        if self.load_timeout_on.as_deref() == Some(key.as_str()) {
            return Err(protocol_error("navigate to", "timeout", "page load timed out"));
        }

        let mut state = self.state.lock().unwrap();
        let id = state
            .focused
            .clone()
            .ok_or_else(|| BrowserError::NoSuchContext("no focused context".to_string()))?;
        state.urls.insert(id, url.clone());
        state.navigations.push(key);
        Ok(())
    }

    async fn current_url(&self) -> BrowserResult<Url> {
        Ok(self.focused()?.1)
    }

    async fn page_source(&self) -> BrowserResult<String> {
        let (_, url) = self.focused()?;
        Ok(self.html_for(&url))
    }

    async fn find(&self, css: &str) -> BrowserResult<Option<ElementId>> {
        let (_, url) = self.focused()?;
        let selector = Selector::parse(css).map_err(|e| BrowserError::Protocol {
            command: "find".to_string(),
            error: "invalid selector".to_string(),
            message: format!("{:?}", e),
        })?;

        let document = Html::parse_document(&self.html_for(&url));
        let found = document.select(&selector).next().is_some();
        Ok(found.then(|| ElementId(css.to_string())))
    }

    async fn click(&self, _element: &ElementId) -> BrowserResult<()> {
        let (_, url) = self.focused()?;
        if self.click_intercepted_on.as_deref() == Some(page_key(&url)) {
            return Err(protocol_error(
                "element click",
                "element click intercepted",
                "overlay",
            ));
        }
        Ok(())
    }

    async fn type_text(&self, _element: &ElementId, text: &str) -> BrowserResult<()> {
        let (id, url) = self.focused()?;
        let mut state = self.state.lock().unwrap();

        if text == ENTER_KEY {
            let key = page_key(&url).to_string();
            let attempt = {
                let count = state.enters.entry(key.clone()).or_insert(0);
                *count += 1;
                *count
            };
            if let Some((path, nth)) = &self.enter_fails_on {
                if *path == key && *nth == attempt {
                    return Err(protocol_error(
                        "element send keys",
                        "stale element reference",
                        "element is not attached to the page document",
                    ));
                }
            }

            let draft = state.drafts.remove(&id).unwrap_or_default();
            let to = url
                .path_segments()
                .and_then(|mut s| s.next())
                .unwrap_or_default()
                .to_string();
            state.sent.push(SentMessage { to, text: draft });
        } else {
            state.drafts.entry(id).or_default().push_str(text);
        }
        Ok(())
    }

    async fn screenshot_base64(&self) -> BrowserResult<String> {
        // 8-byte PNG signature
        Ok("iVBORw0KGgo=".to_string())
    }

    async fn cookies(&self) -> BrowserResult<Vec<Cookie>> {
        Ok(Vec::new())
    }

    async fn add_cookie(&self, _cookie: &Cookie) -> BrowserResult<()> {
        Ok(())
    }
}

/// Classifier double returning a fixed verdict and counting calls
pub struct CountingClassifier {
    is_match: bool,
    category: Option<String>,
    calls: Arc<AtomicUsize>,
}

impl CountingClassifier {
    pub fn new(is_match: bool, category: Option<&str>) -> (Self, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Self {
                is_match,
                category: category.map(str::to_string),
                calls: calls.clone(),
            },
            calls,
        )
    }
}

#[async_trait]
impl Classifier for CountingClassifier {
    async fn classify(&self, _request: &ClassificationRequest) -> Result<Verdict, ClassifierError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Verdict {
            is_match: self.is_match,
            category: self.category.clone(),
        })
    }
}

pub fn calls(counter: &Arc<AtomicUsize>) -> usize {
    counter.load(Ordering::SeqCst)
}

/// Configuration with zero pauses and short waits, storing state under `dir`
pub fn test_config(dir: &Path, keywords: &[&str]) -> Config {
    Config {
        platform: PlatformConfig {
            name: "Instagram".to_string(),
            base_url: BASE_URL.to_string(),
            operator_handle: OPERATOR.to_string(),
        },
        webdriver: WebDriverConfig {
            endpoint: "http://localhost:4444".to_string(),
            browser_name: "chrome".to_string(),
            args: vec![],
        },
        search: SearchConfig {
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            max_suggestions: 5,
            max_items_per_suggestion: 24,
        },
        selectors: SelectorConfig::default(),
        messages: MessagesConfig {
            parts: vec![
                "{greeting} @{handle}!".to_string(),
                "Loved your recent post.".to_string(),
            ],
            follow_up: vec!["Just checking in.".to_string()],
            greeting: "Hi".to_string(),
            greetings: HashMap::from([("student".to_string(), "Hey".to_string())]),
        },
        classifier: None,
        pacing: PacingConfig {
            pause_between_parts_ms: 0,
            pause_between_candidates_ms: 0,
            element_timeout_ms: 30,
            poll_interval_ms: 5,
            max_sends_per_run: 20,
        },
        storage: StorageConfig {
            state_path: dir.join("candidates.json").display().to_string(),
            session_path: dir.join("session.json").display().to_string(),
            diagnostics_dir: dir.join("diagnostics").display().to_string(),
        },
        follow_up: FollowUpConfig { window_days: 3 },
    }
}

/// Scripted platform pages
#[derive(Default)]
pub struct Site {
    pages: HashMap<String, String>,
}

impl Site {
    pub fn new() -> Self {
        Self::default()
    }

    /// Search page for `keyword` offering `suggestions` (paths)
    pub fn search(mut self, keyword: &str, suggestions: &[&str]) -> Self {
        let mut url = Url::parse(BASE_URL).unwrap();
        url.set_path("/explore/search/keyword/");
        url.query_pairs_mut().append_pair("q", keyword);

        let links: String = suggestions
            .iter()
            .map(|s| format!(r#"<a href="{}">{}</a>"#, s, s))
            .collect();
        self.pages.insert(
            page_key(&url).to_string(),
            format!("<html><body><nav>{}</nav></body></html>", links),
        );
        self
    }

    /// Results grid at `path` linking to `items` (content paths)
    pub fn grid(mut self, path: &str, items: &[&str]) -> Self {
        let links: String = items
            .iter()
            .map(|item| format!(r#"<a href="{}"><img alt="post"></a>"#, item))
            .collect();
        self.pages.insert(
            path.to_string(),
            format!(
                r#"<html><body><main><a href="/explore/">Explore</a>{}</main></body></html>"#,
                links
            ),
        );
        self
    }

    /// Content item at `path` owned by `owner`
    pub fn content(mut self, path: &str, owner: &str) -> Self {
        self.pages.insert(
            path.to_string(),
            format!(
                r#"<html><head><title>Post</title></head><body><main><article>
                <header><a href="/explore/">Explore</a><a href="/{owner}/">{owner}</a></header>
                <p>great advice</p></article></main></body></html>"#,
                owner = owner
            ),
        );
        self
    }

    /// Content item at `path` with no identifiable owner
    pub fn anonymous_content(mut self, path: &str) -> Self {
        self.pages.insert(
            path.to_string(),
            r#"<html><body><main><article><p>no owner here</p></article></main></body></html>"#
                .to_string(),
        );
        self
    }

    /// Profile page with a working message thread
    pub fn profile(self, handle: &str) -> Self {
        self.profile_page(handle, true, false)
    }

    /// Profile page whose message button is missing
    pub fn unreachable_profile(self, handle: &str) -> Self {
        self.profile_page(handle, false, false)
    }

    /// Profile page whose thread already holds a reply from the candidate
    pub fn replied_profile(self, handle: &str) -> Self {
        self.profile_page(handle, true, true)
    }

    fn profile_page(mut self, handle: &str, messageable: bool, replied: bool) -> Self {
        let entry = if messageable {
            r#"<div role="button" aria-label="Message">Message</div>
            <div role="textbox" contenteditable="true"></div>"#
        } else {
            ""
        };
        let thread = if replied {
            r#"<div data-scope="messages_table"><div data-sender="other">thanks!</div></div>"#
        } else {
            r#"<div data-scope="messages_table"></div>"#
        };

        self.pages.insert(
            format!("/{}/", handle),
            format!(
                "<html><body><main><h2>{}</h2>{}{}</main></body></html>",
                handle, entry, thread
            ),
        );
        self
    }

    /// The `career tips` fixture: alice_grad owns items 1 and 3, bob_codes item 2
    pub fn career_tips() -> Self {
        Self::new()
            .search("career tips", &["/explore/tags/careertips/"])
            .grid(
                "/explore/tags/careertips/",
                &["/p/item1/", "/p/item2/", "/p/item3/"],
            )
            .content("/p/item1/", "alice_grad")
            .content("/p/item2/", "bob_codes")
            .content("/p/item3/", "alice_grad")
            .profile("alice_grad")
            .profile("bob_codes")
    }

    pub fn browser(self) -> Arc<FakeBrowser> {
        Arc::new(self.fake())
    }

    /// Unshared browser, for attaching failure hooks before use
    pub fn fake(self) -> FakeBrowser {
        FakeBrowser::new(self.pages)
    }

    pub fn into_pages(self) -> HashMap<String, String> {
        self.pages
    }
}
