//! W3C WebDriver client
//!
//! Speaks the WebDriver HTTP protocol to chromedriver, geckodriver or a
//! Selenium grid. Each browser context maps onto a WebDriver window handle.

use crate::browser::driver::{BrowserDriver, ContextId, Cookie, ElementId};
use crate::browser::error::{BrowserError, BrowserResult};
use crate::config::WebDriverConfig;
use async_trait::async_trait;
use reqwest::{Client, Method};
use serde_json::{json, Value};
use std::time::Duration;
use url::Url;

/// Key under which WebDriver returns element references
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

pub struct WebDriverClient {
    client: Client,
    endpoint: String,
    session_id: String,
}

impl WebDriverClient {
    /// Creates a new WebDriver session
    ///
    /// # Arguments
    ///
    /// * `config` - The WebDriver endpoint and browser capabilities
    ///
    /// # Returns
    ///
    /// * `Ok(WebDriverClient)` - A live session
    /// * `Err(BrowserError)` - The server refused or could not be reached
    pub async fn connect(config: &WebDriverConfig) -> BrowserResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(90))
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        let endpoint = config.endpoint.trim_end_matches('/').to_string();

        let capabilities = json!({
            "capabilities": {
                "alwaysMatch": {
                    "browserName": config.browser_name,
                    "goog:chromeOptions": { "args": config.args },
                    "moz:firefoxOptions": { "args": config.args },
                }
            }
        });

        let response = client
            .post(format!("{}/session", endpoint))
            .json(&capabilities)
            .send()
            .await?;
        let value = unwrap_response("new session", response).await?;

        let session_id = value
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| BrowserError::MalformedResponse {
                command: "new session".to_string(),
                message: "missing sessionId".to_string(),
            })?
            .to_string();

        tracing::info!("WebDriver session {} started", session_id);

        Ok(Self {
            client,
            endpoint,
            session_id,
        })
    }

    /// Ends the WebDriver session and closes the browser
    pub async fn quit(&self) -> BrowserResult<()> {
        self.command(Method::DELETE, "", None, "delete session")
            .await?;
        tracing::info!("WebDriver session {} closed", self.session_id);
        Ok(())
    }

    async fn command(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        name: &str,
    ) -> BrowserResult<Value> {
        let url = format!("{}/session/{}{}", self.endpoint, self.session_id, path);
        let mut request = self.client.request(method, url);
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await?;
        unwrap_response(name, response).await
    }
}

/// Extracts `value` from a WebDriver response, mapping protocol errors
async fn unwrap_response(command: &str, response: reqwest::Response) -> BrowserResult<Value> {
    let status = response.status();
    let text = response.text().await?;

    let parsed: Value = serde_json::from_str(&text).map_err(|e| {
        BrowserError::MalformedResponse {
            command: command.to_string(),
            message: format!("HTTP {}: {} ({})", status.as_u16(), e, text),
        }
    })?;
    let value = parsed.get("value").cloned().unwrap_or(Value::Null);

    if status.is_success() {
        return Ok(value);
    }

    let error = value
        .get("error")
        .and_then(Value::as_str)
        .unwrap_or("unknown error")
        .to_string();
    let message = value
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    Err(match error.as_str() {
        "no such window" => BrowserError::NoSuchContext(message),
        "invalid session id" => BrowserError::SessionLost(message),
        _ => BrowserError::Protocol {
            command: command.to_string(),
            error,
            message,
        },
    })
}

fn element_from(command: &str, value: &Value) -> BrowserResult<ElementId> {
    value
        .get(ELEMENT_KEY)
        .and_then(Value::as_str)
        .map(|id| ElementId(id.to_string()))
        .ok_or_else(|| BrowserError::MalformedResponse {
            command: command.to_string(),
            message: "missing element reference".to_string(),
        })
}

fn string_from(command: &str, value: Value) -> BrowserResult<String> {
    match value {
        Value::String(s) => Ok(s),
        other => Err(BrowserError::MalformedResponse {
            command: command.to_string(),
            message: format!("expected string, got {}", other),
        }),
    }
}

#[async_trait]
impl BrowserDriver for WebDriverClient {
    async fn current_context(&self) -> BrowserResult<ContextId> {
        let value = self
            .command(Method::GET, "/window", None, "get window handle")
            .await?;
        Ok(ContextId(string_from("get window handle", value)?))
    }

    async fn new_context(&self) -> BrowserResult<ContextId> {
        let value = self
            .command(
                Method::POST,
                "/window/new",
                Some(json!({ "type": "tab" })),
                "new window",
            )
            .await?;

        value
            .get("handle")
            .and_then(Value::as_str)
            .map(|h| ContextId(h.to_string()))
            .ok_or_else(|| BrowserError::MalformedResponse {
                command: "new window".to_string(),
                message: "missing handle".to_string(),
            })
    }

    async fn switch_to(&self, context: &ContextId) -> BrowserResult<()> {
        self.command(
            Method::POST,
            "/window",
            Some(json!({ "handle": context.0 })),
            "switch to window",
        )
        .await?;
        Ok(())
    }

    async fn close_current(&self) -> BrowserResult<()> {
        self.command(Method::DELETE, "/window", None, "close window")
            .await?;
        Ok(())
    }

    async fn navigate(&self, url: &Url) -> BrowserResult<()> {
        self.command(
            Method::POST,
            "/url",
            Some(json!({ "url": url.as_str() })),
            "navigate to",
        )
        .await?;
        Ok(())
    }

    async fn current_url(&self) -> BrowserResult<Url> {
        let value = self
            .command(Method::GET, "/url", None, "get current url")
            .await?;
        let raw = string_from("get current url", value)?;
        Url::parse(&raw).map_err(|e| BrowserError::MalformedResponse {
            command: "get current url".to_string(),
            message: format!("{}: {}", raw, e),
        })
    }

    async fn page_source(&self) -> BrowserResult<String> {
        let value = self
            .command(Method::GET, "/source", None, "get page source")
            .await?;
        string_from("get page source", value)
    }

    async fn find(&self, css: &str) -> BrowserResult<Option<ElementId>> {
        let result = self
            .command(
                Method::POST,
                "/element",
                Some(json!({ "using": "css selector", "value": css })),
                "find element",
            )
            .await;

        match result {
            Ok(value) => element_from("find element", &value).map(Some),
            Err(BrowserError::Protocol { error, .. }) if error == "no such element" => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn click(&self, element: &ElementId) -> BrowserResult<()> {
        self.command(
            Method::POST,
            &format!("/element/{}/click", element.0),
            Some(json!({})),
            "element click",
        )
        .await?;
        Ok(())
    }

    async fn type_text(&self, element: &ElementId, text: &str) -> BrowserResult<()> {
        self.command(
            Method::POST,
            &format!("/element/{}/value", element.0),
            Some(json!({ "text": text })),
            "element send keys",
        )
        .await?;
        Ok(())
    }

    async fn screenshot_base64(&self) -> BrowserResult<String> {
        let value = self
            .command(Method::GET, "/screenshot", None, "take screenshot")
            .await?;
        string_from("take screenshot", value)
    }

    async fn cookies(&self) -> BrowserResult<Vec<Cookie>> {
        let value = self
            .command(Method::GET, "/cookie", None, "get all cookies")
            .await?;
        serde_json::from_value(value).map_err(|e| BrowserError::MalformedResponse {
            command: "get all cookies".to_string(),
            message: e.to_string(),
        })
    }

    async fn add_cookie(&self, cookie: &Cookie) -> BrowserResult<()> {
        self.command(
            Method::POST,
            "/cookie",
            Some(json!({ "cookie": cookie })),
            "add cookie",
        )
        .await?;
        Ok(())
    }
}
