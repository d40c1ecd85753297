//! Multi-part message delivery
//!
//! Runs in the candidate's Profile-level context. Each part is typed and
//! submitted as its own message, with a fixed pause between parts. Nothing is retried
//! within a run: a candidate whose dispatch stops early is recorded `failed`
//! and the whole sequence is sent again on a later run.

use crate::browser::{wait_for, BrowserDriver, ENTER_KEY};
use crate::config::{PacingConfig, SelectorConfig};
use crate::url::Handle;
use crate::OutreachError;

/// Result of one dispatch attempt
#[derive(Debug)]
pub struct DispatchReport {
    pub parts_sent: u32,
    pub total: u32,
    /// Why dispatch stopped early, if it did
    pub error: Option<OutreachError>,
}

impl DispatchReport {
    /// True only if every part went out
    pub fn is_complete(&self) -> bool {
        self.error.is_none() && self.parts_sent == self.total
    }
}

pub struct MessageDispatcher<'a> {
    selectors: &'a SelectorConfig,
    pacing: &'a PacingConfig,
}

impl<'a> MessageDispatcher<'a> {
    pub fn new(selectors: &'a SelectorConfig, pacing: &'a PacingConfig) -> Self {
        Self { selectors, pacing }
    }

    /// Sends `parts` in order to the profile open in the focused context
    pub async fn send(
        &self,
        driver: &dyn BrowserDriver,
        handle: &Handle,
        parts: &[String],
    ) -> DispatchReport {
        match self.open_thread(driver, handle).await {
            Ok(()) => self.deliver(driver, handle, parts).await,
            Err(e) => self.report(handle, 0, parts.len() as u32, Some(e)),
        }
    }

    /// Sends `parts` into a thread that is already open
    pub async fn deliver(
        &self,
        driver: &dyn BrowserDriver,
        handle: &Handle,
        parts: &[String],
    ) -> DispatchReport {
        let mut parts_sent = 0;
        let error = self
            .send_parts(driver, handle, parts, &mut parts_sent)
            .await
            .err();
        self.report(handle, parts_sent, parts.len() as u32, error)
    }

    fn report(
        &self,
        handle: &Handle,
        parts_sent: u32,
        total: u32,
        error: Option<OutreachError>,
    ) -> DispatchReport {
        if let Some(e) = &error {
            tracing::warn!(
                "Dispatch to {} stopped after {}/{} parts: {}",
                handle,
                parts_sent,
                total,
                e
            );
        } else {
            tracing::info!("Sent {} parts to {}", total, handle);
        }

        DispatchReport {
            parts_sent,
            total,
            error,
        }
    }

    /// Opens the message thread from the profile page
    pub async fn open_thread(
        &self,
        driver: &dyn BrowserDriver,
        handle: &Handle,
    ) -> Result<(), OutreachError> {
        let timeout = self.pacing.element_timeout();
        let poll = self.pacing.poll_interval();

        let entry = wait_for(driver, &self.selectors.message_entry, timeout, poll)
            .await?
            .ok_or_else(|| OutreachError::DispatchEntryNotFound {
                handle: handle.to_string(),
            })?;
        driver.click(&entry).await?;

        wait_for(driver, &self.selectors.message_input, timeout, poll)
            .await?
            .ok_or_else(|| OutreachError::DispatchInputNotFound {
                handle: handle.to_string(),
            })?;
        Ok(())
    }

    async fn send_parts(
        &self,
        driver: &dyn BrowserDriver,
        handle: &Handle,
        parts: &[String],
        parts_sent: &mut u32,
    ) -> Result<(), OutreachError> {
        for (index, part) in parts.iter().enumerate() {
            // The compose box is re-rendered after each send; look it up every time
            let input = wait_for(
                driver,
                &self.selectors.message_input,
                self.pacing.element_timeout(),
                self.pacing.poll_interval(),
            )
            .await?
            .ok_or_else(|| OutreachError::DispatchInputNotFound {
                handle: handle.to_string(),
            })?;

            driver.type_text(&input, part).await?;
            driver.type_text(&input, ENTER_KEY).await?;
            *parts_sent += 1;
            tracing::debug!("Part {}/{} sent to {}", index + 1, parts.len(), handle);

            if index + 1 < parts.len() {
                tokio::time::sleep(self.pacing.pause_between_parts()).await;
            }
        }
        Ok(())
    }
}
