//! Authenticated session handling
//!
//! Cookies are saved after a successful login and restored on later runs so
//! the operator does not re-authenticate every time. A session is considered
//! alive while an authenticated-only element (the liveness probe) can be found.

use crate::browser::driver::{wait_for, BrowserDriver, Cookie, ENTER_KEY};
use crate::browser::error::{BrowserError, BrowserResult};
use crate::config::{Config, Credentials, PacingConfig, SelectorConfig};
use crate::storage::write_atomic;
use crate::OutreachError;
use std::path::{Path, PathBuf};
use url::Url;

pub struct SessionManager {
    cookie_path: PathBuf,
    base_url: Url,
    selectors: SelectorConfig,
    pacing: PacingConfig,
}

impl SessionManager {
    pub fn new(config: &Config) -> Result<Self, OutreachError> {
        Ok(Self {
            cookie_path: PathBuf::from(&config.storage.session_path),
            base_url: Url::parse(&config.platform.base_url)?,
            selectors: config.selectors.clone(),
            pacing: config.pacing.clone(),
        })
    }

    /// Makes sure the focused context is logged in
    ///
    /// Tries saved cookies first, then falls back to a fresh login. Returns
    /// `SessionInvalid` if neither yields a live session.
    pub async fn ensure_authenticated(
        &self,
        driver: &dyn BrowserDriver,
        credentials: &Credentials,
    ) -> Result<(), OutreachError> {
        driver.navigate(&self.base_url).await?;

        match self.restore_cookies(driver).await {
            Ok(0) => tracing::info!("No saved session, logging in"),
            Ok(count) => {
                tracing::debug!("Restored {} session cookies", count);
                driver.navigate(&self.base_url).await?;
                if self.is_alive(driver).await? {
                    tracing::info!("Reusing saved session");
                    return Ok(());
                }
                tracing::info!("Saved session is stale, logging in again");
            }
            Err(e) => tracing::warn!("Could not restore saved session: {}", e),
        }

        self.login(driver, credentials).await?;
        self.save_cookies(driver).await?;
        Ok(())
    }

    /// Probes the current page for the authenticated-only element
    pub async fn is_alive(&self, driver: &dyn BrowserDriver) -> BrowserResult<bool> {
        let probe = wait_for(
            driver,
            &self.selectors.authenticated_probe,
            self.pacing.element_timeout(),
            self.pacing.poll_interval(),
        )
        .await?;
        Ok(probe.is_some())
    }

    /// Reloads the home page in the focused context and probes it
    pub async fn check_alive(&self, driver: &dyn BrowserDriver) -> Result<(), OutreachError> {
        driver.navigate(&self.base_url).await?;
        if self.is_alive(driver).await? {
            Ok(())
        } else {
            Err(OutreachError::SessionInvalid(
                "authenticated-only element no longer present".to_string(),
            ))
        }
    }

    async fn login(
        &self,
        driver: &dyn BrowserDriver,
        credentials: &Credentials,
    ) -> Result<(), OutreachError> {
        let login_url = self.base_url.join("/accounts/login/")?;
        driver.navigate(&login_url).await?;

        let timeout = self.pacing.element_timeout();
        let poll = self.pacing.poll_interval();

        let username = wait_for(driver, &self.selectors.login_username, timeout, poll)
            .await?
            .ok_or_else(|| OutreachError::SessionInvalid("login form not found".to_string()))?;
        driver.type_text(&username, &credentials.username).await?;

        let password = driver
            .find(&self.selectors.login_password)
            .await?
            .ok_or_else(|| OutreachError::SessionInvalid("password field not found".to_string()))?;
        driver.type_text(&password, &credentials.password).await?;

        match driver.find(&self.selectors.login_submit).await? {
            Some(submit) => driver.click(&submit).await?,
            None => driver.type_text(&password, ENTER_KEY).await?,
        }

        // Logging in redirects through interstitials; give it a few probe windows
        for _ in 0..3 {
            if self.is_alive(driver).await? {
                tracing::info!("Logged in as {}", credentials.username);
                return Ok(());
            }
        }

        Err(OutreachError::SessionInvalid(
            "login did not reach an authenticated page".to_string(),
        ))
    }

    async fn restore_cookies(&self, driver: &dyn BrowserDriver) -> BrowserResult<usize> {
        let cookies = match load_cookie_file(&self.cookie_path)? {
            Some(cookies) => cookies,
            None => return Ok(0),
        };

        for cookie in &cookies {
            driver.add_cookie(cookie).await?;
        }
        Ok(cookies.len())
    }

    async fn save_cookies(&self, driver: &dyn BrowserDriver) -> BrowserResult<()> {
        let cookies = driver.cookies().await?;
        save_cookie_file(&self.cookie_path, &cookies)?;
        tracing::debug!(
            "Saved {} session cookies to {}",
            cookies.len(),
            self.cookie_path.display()
        );
        Ok(())
    }
}

fn load_cookie_file(path: &Path) -> BrowserResult<Option<Vec<Cookie>>> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(BrowserError::SessionFile(e.to_string())),
    };

    let cookies: Vec<Cookie> = serde_json::from_str(&content)
        .map_err(|e| BrowserError::SessionFile(format!("{}: {}", path.display(), e)))?;
    Ok(Some(cookies))
}

fn save_cookie_file(path: &Path, cookies: &[Cookie]) -> BrowserResult<()> {
    let json = serde_json::to_vec_pretty(cookies)
        .map_err(|e| BrowserError::SessionFile(e.to_string()))?;
    write_atomic(path, &json)
        .map_err(|e| BrowserError::SessionFile(format!("{}: {}", path.display(), e)))
}
