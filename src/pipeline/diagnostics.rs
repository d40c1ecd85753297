//! Failure snapshots for offline triage
//!
//! Each capture writes three files sharing one stem:
//! - `<stem>.png`: screenshot of the focused context
//! - `<stem>.html`: rendered page source
//! - `<stem>.links.txt`: every anchor on the page (`url<TAB>label`)
//!
//! Capturing is best-effort. A failed capture is logged and never turns into
//! a pipeline error.

use crate::browser::BrowserDriver;
use crate::pipeline::page::parse_page;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::Utc;
use std::path::{Path, PathBuf};

pub struct DiagnosticsCapture {
    dir: PathBuf,
}

impl DiagnosticsCapture {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
        }
    }

    /// Snapshots the focused context; returns the stem path on success
    pub async fn capture(&self, driver: &dyn BrowserDriver, label: &str) -> Option<PathBuf> {
        match self.try_capture(driver, label).await {
            Ok(stem) => {
                tracing::info!("Diagnostics for '{}' saved to {}.*", label, stem.display());
                Some(stem)
            }
            Err(e) => {
                tracing::warn!("Diagnostics capture for '{}' failed: {}", label, e);
                None
            }
        }
    }

    async fn try_capture(
        &self,
        driver: &dyn BrowserDriver,
        label: &str,
    ) -> Result<PathBuf, Box<dyn std::error::Error + Send + Sync>> {
        std::fs::create_dir_all(&self.dir)?;
        let stem = self.dir.join(format!(
            "{}_{}",
            Utc::now().format("%Y%m%dT%H%M%S%3f"),
            sanitize(label)
        ));

        // Structure before screenshot; a failed screenshot still leaves the HTML
        let url = driver.current_url().await?;
        let html = driver.page_source().await?;
        std::fs::write(stem.with_extension("html"), &html)?;

        let links: Vec<String> = parse_page(&html, &url)
            .links
            .into_iter()
            .map(|link| format!("{}\t{}", link.url, link.text))
            .collect();
        std::fs::write(
            stem.with_extension("links.txt"),
            format!("# {}\n{}\n", url, links.join("\n")),
        )?;

        let png = STANDARD.decode(driver.screenshot_base64().await?)?;
        std::fs::write(stem.with_extension("png"), png)?;

        Ok(stem)
    }
}

/// Keeps labels filesystem-safe
fn sanitize(label: &str) -> String {
    let cleaned: String = label
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '-'
            }
        })
        .take(60)
        .collect();

    if cleaned.is_empty() {
        "capture".to_string()
    } else {
        cleaned
    }
}
