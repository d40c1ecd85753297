//! Pipeline coordinator - main outreach orchestration logic
//!
//! This module contains the run loop that coordinates:
//! - Keyword expansion into content items (Search level)
//! - Handle extraction per content item (Content level)
//! - Admission, screening and dispatch per candidate (Profile level)
//! - Persisting each candidate's outcome before the next one starts
//! - The follow-up sweep over previously contacted candidates
//!
//! Every unit of work is followed by `TabLifecycleManager::unwind_to` back to
//! the level it started from, whether the work succeeded or not.

use crate::browser::{
    wait_for, BrowserDriver, BrowserError, SessionManager, TabLevel, TabLifecycleManager,
};
use crate::classifier::Classifier;
use crate::config::Config;
use crate::pipeline::diagnostics::DiagnosticsCapture;
use crate::pipeline::dispatcher::MessageDispatcher;
use crate::pipeline::explorer::SearchExplorer;
use crate::pipeline::extractor::ContentExtractor;
use crate::pipeline::gate::{Admission, CandidateGate, RejectReason, Screening};
use crate::state::{CandidateStatus, Source};
use crate::storage::{CandidateLedger, StateStore};
use crate::url::{profile_url, Handle};
use crate::OutreachError;
use chrono::Utc;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use url::Url;

/// Selector that matches once a content item or profile has rendered
const PAGE_READY_SELECTOR: &str = "main, article";

/// What a run does
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Record candidates as `discovered` without contacting anyone
    Discover,
    /// Discover for every keyword first, then send to every pending candidate
    DiscoverAndSend,
    /// Send to each candidate as soon as it is found
    SearchAndSend,
    /// Reply detection and follow-up messages for contacted candidates
    FollowUp,
}

/// Terminal result of one unit of work
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CandidateOutcome {
    Discovered,
    /// Known from an earlier run and still awaiting a send
    AlreadyPending,
    Sent,
    Failed,
    ScreenedOut,
    Rejected(RejectReason),
    ExtractionFailed,
    Replied,
    FollowedUp,
    FollowUpFailed,
}

/// Counters for one run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub keywords: usize,
    pub content_items: usize,
    pub discovered: usize,
    pub already_pending: usize,
    pub sent: usize,
    pub failed: usize,
    pub screened_out: usize,
    pub rejected: usize,
    pub extraction_failures: usize,
    pub replied: usize,
    pub followed_up: usize,
    pub follow_up_failures: usize,
}

impl RunSummary {
    fn record(&mut self, outcome: &CandidateOutcome) {
        match outcome {
            CandidateOutcome::Discovered => self.discovered += 1,
            CandidateOutcome::AlreadyPending => self.already_pending += 1,
            CandidateOutcome::Sent => self.sent += 1,
            CandidateOutcome::Failed => self.failed += 1,
            CandidateOutcome::ScreenedOut => self.screened_out += 1,
            CandidateOutcome::Rejected(_) => self.rejected += 1,
            CandidateOutcome::ExtractionFailed => self.extraction_failures += 1,
            CandidateOutcome::Replied => self.replied += 1,
            CandidateOutcome::FollowedUp => self.followed_up += 1,
            CandidateOutcome::FollowUpFailed => self.follow_up_failures += 1,
        }
    }
}

/// Main pipeline coordinator structure
pub struct Coordinator<'a, S: StateStore> {
    config: &'a Config,
    driver: Arc<dyn BrowserDriver>,
    tabs: TabLifecycleManager,
    ledger: CandidateLedger<S>,
    gate: CandidateGate,
    extractor: ContentExtractor,
    diagnostics: DiagnosticsCapture,
    session: Option<SessionManager>,
    base_url: Url,
    sends_this_run: u32,
    summary: RunSummary,
}

impl<'a, S: StateStore> Coordinator<'a, S> {
    /// Creates a coordinator bound to the driver's focused context
    ///
    /// Loads the full candidate mapping from `store`. `classifier: None`
    /// disables screening.
    pub async fn new(
        config: &'a Config,
        driver: Arc<dyn BrowserDriver>,
        store: S,
        classifier: Option<Box<dyn Classifier>>,
    ) -> Result<Self, OutreachError> {
        let operator = Handle::parse(&config.platform.operator_handle)?;
        let question = config
            .classifier
            .as_ref()
            .map(|c| c.question.clone())
            .unwrap_or_default();

        let tabs = TabLifecycleManager::attach(driver.clone()).await?;
        let ledger = CandidateLedger::open(store)?;

        Ok(Self {
            config,
            driver,
            tabs,
            ledger,
            gate: CandidateGate::new(operator, classifier, question),
            extractor: ContentExtractor::new(&config.platform.name),
            diagnostics: DiagnosticsCapture::new(Path::new(&config.storage.diagnostics_dir)),
            session: None,
            base_url: Url::parse(&config.platform.base_url)?,
            sends_this_run: 0,
            summary: RunSummary::default(),
        })
    }

    /// Enables the session liveness probe before each keyword and sweep
    pub fn with_session(mut self, session: SessionManager) -> Self {
        self.session = Some(session);
        self
    }

    pub fn ledger(&self) -> &CandidateLedger<S> {
        &self.ledger
    }

    /// Runs `mode` to completion
    ///
    /// The ledger is flushed and every context above the root closed before
    /// this returns, on success and on error alike.
    pub async fn run(&mut self, mode: Mode) -> Result<RunSummary, OutreachError> {
        tracing::info!("Starting {:?} run", mode);
        let start_time = Instant::now();

        let result = match mode {
            Mode::Discover => self.run_keywords(false).await,
            Mode::SearchAndSend => self.run_keywords(true).await,
            Mode::DiscoverAndSend => self.run_discover_and_send().await,
            Mode::FollowUp => self.run_follow_up().await,
        };

        self.tabs.unwind_to(TabLevel::Root).await;
        let flushed = self.ledger.flush();

        match (&result, &flushed) {
            (Err(e), _) => tracing::error!("Run aborted: {}", e),
            (Ok(()), Err(e)) => tracing::error!("Final state flush failed: {}", e),
            (Ok(()), Ok(())) => tracing::info!(
                "Run completed in {:?}: {} sent, {} failed, {} screened out",
                start_time.elapsed(),
                self.summary.sent,
                self.summary.failed,
                self.summary.screened_out
            ),
        }

        if self.send_cap_reached() {
            tracing::info!(
                "Send cap of {} reached for this run",
                self.config.pacing.max_sends_per_run
            );
        }

        result?;
        flushed?;
        Ok(self.summary.clone())
    }

    async fn run_discover_and_send(&mut self) -> Result<(), OutreachError> {
        self.run_keywords(false).await?;
        self.gate.begin_pass();
        self.run_send_phase().await
    }

    /// Walks every configured keyword; `send` contacts candidates inline
    async fn run_keywords(&mut self, send: bool) -> Result<(), OutreachError> {
        let config = self.config;

        for keyword in &config.search.keywords {
            if send && self.send_cap_reached() {
                break;
            }

            self.check_session().await?;
            self.summary.keywords += 1;

            let result = self.process_keyword(keyword, send).await;
            self.tabs.unwind_to(TabLevel::Root).await;
            result?;
        }

        Ok(())
    }

    async fn process_keyword(&mut self, keyword: &str, send: bool) -> Result<(), OutreachError> {
        let explorer = SearchExplorer::new(self.config)?;

        let content_urls = match explorer.expand(&mut self.tabs, keyword).await {
            Ok(urls) => urls,
            Err(OutreachError::Browser(BrowserError::SessionLost(msg))) => {
                return Err(BrowserError::SessionLost(msg).into())
            }
            Err(e @ (OutreachError::Browser(_) | OutreachError::UrlError(_))) => {
                tracing::warn!("Skipping keyword '{}': {}", keyword, e);
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        for content_url in content_urls {
            if send && self.send_cap_reached() {
                break;
            }
            self.summary.content_items += 1;

            let result = self.process_content_item(keyword, &content_url, send).await;
            self.tabs.unwind_to(TabLevel::Search).await;
            self.settle(result).await?;
        }

        Ok(())
    }

    /// Content level → handle → gate → (optionally) Profile level and dispatch
    ///
    /// A content page that cannot be loaded counts as an extraction failure.
    async fn process_content_item(
        &mut self,
        keyword: &str,
        content_url: &Url,
        send: bool,
    ) -> Result<CandidateOutcome, OutreachError> {
        match self.visit_content_item(keyword, content_url, send).await {
            Err(e) if e.is_candidate_local() => {
                tracing::warn!("Could not load {}: {}", content_url, e);
                self.diagnostics
                    .capture(self.driver.as_ref(), &format!("load_{}", content_url.path()))
                    .await;
                Ok(CandidateOutcome::ExtractionFailed)
            }
            other => other,
        }
    }

    async fn visit_content_item(
        &mut self,
        keyword: &str,
        content_url: &Url,
        send: bool,
    ) -> Result<CandidateOutcome, OutreachError> {
        let driver = self.driver.clone();

        self.tabs.open_level(TabLevel::Content, content_url).await?;
        let rendered = self.page_ready(content_url).await?;

        let html = driver.page_source().await?;
        let extraction = match self.extractor.extract(&html, content_url) {
            Ok(extraction) => extraction,
            Err(e) => {
                tracing::warn!("{}", e);
                let stage = if rendered { "extract" } else { "extract_unrendered" };
                self.diagnostics
                    .capture(driver.as_ref(), &format!("{}_{}", stage, content_url.path()))
                    .await;
                return Ok(CandidateOutcome::ExtractionFailed);
            }
        };

        let handle = extraction.handle;
        tracing::debug!(
            "{} resolved to {} ({:?})",
            content_url,
            handle,
            extraction.strategy
        );

        if let Admission::Reject(reason) = self.gate.admit(&handle, self.ledger.status(&handle)) {
            tracing::debug!("Skipping {}: {}", handle, reason);
            return Ok(CandidateOutcome::Rejected(reason));
        }

        let created = self.ledger.record_discovery(
            &handle,
            Source::Search {
                keyword: keyword.to_string(),
            },
            Some(content_url.to_string()),
            Utc::now(),
        );

        if !send {
            if created {
                self.ledger.flush()?;
                tracing::info!("Discovered {}", handle);
                return Ok(CandidateOutcome::Discovered);
            }
            return Ok(CandidateOutcome::AlreadyPending);
        }

        self.contact(&handle).await
    }

    /// Sends to every pending candidate, oldest sighting first
    async fn run_send_phase(&mut self) -> Result<(), OutreachError> {
        let pending = self.ledger.pending_sends();
        tracing::info!("{} candidates awaiting a send", pending.len());
        if !pending.is_empty() {
            self.check_session().await?;
        }

        for handle in pending {
            if self.send_cap_reached() {
                break;
            }

            if let Admission::Reject(reason) = self.gate.admit(&handle, self.ledger.status(&handle)) {
                tracing::debug!("Skipping {}: {}", handle, reason);
                self.summary.record(&CandidateOutcome::Rejected(reason));
                continue;
            }

            let result = self.contact(&handle).await;
            self.tabs.unwind_to(TabLevel::Root).await;
            self.settle(result).await?;
        }

        Ok(())
    }

    /// Opens the candidate's profile, screens, dispatches and finalizes the record
    ///
    /// The record must already exist in the ledger. Every page-level failure
    /// leaves it `failed`; only run-level errors are returned.
    async fn contact(&mut self, handle: &Handle) -> Result<CandidateOutcome, OutreachError> {
        match self.try_contact(handle).await {
            Err(e) if e.is_candidate_local() => {
                tracing::warn!("Could not reach {}: {}", handle, e);
                self.record_failure(handle, 0, None, e.to_string()).await?;
                Ok(CandidateOutcome::Failed)
            }
            other => other,
        }
    }

    async fn try_contact(&mut self, handle: &Handle) -> Result<CandidateOutcome, OutreachError> {
        let driver = self.driver.clone();
        let config = self.config;

        let profile = profile_url(&self.base_url, handle)?;
        self.tabs.open_level(TabLevel::Profile, &profile).await?;

        let snapshot = if self.gate.classification_enabled() {
            self.page_ready(&profile).await?;
            match driver.screenshot_base64().await {
                Ok(png) => Some(png),
                Err(e) => {
                    tracing::warn!("Profile snapshot for {} failed: {}", handle, e);
                    None
                }
            }
        } else {
            None
        };

        let category = match self.gate.screen(handle, snapshot).await {
            Screening::Pass { category } => category,
            Screening::Reject => {
                self.ledger
                    .finalize(handle, CandidateStatus::ScreenedOut, Utc::now(), |_| {})?;
                return Ok(CandidateOutcome::ScreenedOut);
            }
        };

        let parts = config.messages.render(
            &config.messages.parts,
            handle.as_str(),
            category.as_deref(),
        );
        let template = config.messages.fingerprint();
        let report = MessageDispatcher::new(&config.selectors, &config.pacing)
            .send(driver.as_ref(), handle, &parts)
            .await;

        // Counts against the cap even when it stops early: messages may have gone out
        if report.parts_sent > 0 {
            self.sends_this_run += 1;
        }

        if report.is_complete() {
            self.ledger
                .finalize(handle, CandidateStatus::Sent, Utc::now(), |record| {
                    record.parts_sent = report.parts_sent;
                    record.category = category;
                    record.template = Some(template);
                })?;
            return Ok(CandidateOutcome::Sent);
        }

        let error = report.error;
        let fatal = matches!(&error, Some(e) if !e.is_candidate_local());
        let last_error = error
            .as_ref()
            .map(|e| e.to_string())
            .unwrap_or_else(|| "dispatch incomplete".to_string());
        self.record_failure(handle, report.parts_sent, category, last_error)
            .await?;

        match error {
            Some(e) if fatal => Err(e),
            _ => Ok(CandidateOutcome::Failed),
        }
    }

    /// Snapshots the page and leaves the candidate `failed` for a later retry
    async fn record_failure(
        &mut self,
        handle: &Handle,
        parts_sent: u32,
        category: Option<String>,
        last_error: String,
    ) -> Result<(), OutreachError> {
        self.diagnostics
            .capture(self.driver.as_ref(), &format!("dispatch_{}", handle))
            .await;

        let template = self.config.messages.fingerprint();
        self.ledger
            .finalize(handle, CandidateStatus::Failed, Utc::now(), |record| {
                record.parts_sent = parts_sent;
                record.category = category;
                record.last_error = Some(last_error);
                record.template = Some(template);
            })?;
        Ok(())
    }

    /// Replies become `replied`; silent threads get the follow-up parts
    async fn run_follow_up(&mut self) -> Result<(), OutreachError> {
        if self.config.messages.follow_up.is_empty() {
            return Err(crate::ConfigError::Validation(
                "messages.follow-up must contain at least one part for a follow-up sweep"
                    .to_string(),
            )
            .into());
        }

        let due = self
            .ledger
            .follow_up_due(Utc::now(), self.config.follow_up.window());
        tracing::info!("{} candidates due for follow-up", due.len());
        if !due.is_empty() {
            self.check_session().await?;
        }

        for handle in due {
            if self.send_cap_reached() {
                break;
            }

            let result = self.follow_up_one(&handle).await;
            self.tabs.unwind_to(TabLevel::Root).await;
            self.settle(result).await?;
        }

        Ok(())
    }

    /// Page-level failures leave the record `sent` for the next sweep
    async fn follow_up_one(&mut self, handle: &Handle) -> Result<CandidateOutcome, OutreachError> {
        match self.try_follow_up(handle).await {
            Err(e) if e.is_candidate_local() => {
                tracing::warn!("Follow-up to {} failed: {}", handle, e);
                self.diagnostics
                    .capture(self.driver.as_ref(), &format!("follow_up_{}", handle))
                    .await;
                Ok(CandidateOutcome::FollowUpFailed)
            }
            other => other,
        }
    }

    async fn try_follow_up(&mut self, handle: &Handle) -> Result<CandidateOutcome, OutreachError> {
        let driver = self.driver.clone();
        let config = self.config;
        let dispatcher = MessageDispatcher::new(&config.selectors, &config.pacing);

        let profile = profile_url(&self.base_url, handle)?;
        self.tabs.open_level(TabLevel::Profile, &profile).await?;
        dispatcher.open_thread(driver.as_ref(), handle).await?;

        if driver.find(&config.selectors.incoming_message).await?.is_some() {
            self.ledger
                .finalize(handle, CandidateStatus::Replied, Utc::now(), |_| {})?;
            tracing::info!("{} replied", handle);
            return Ok(CandidateOutcome::Replied);
        }

        let category = self.ledger.get(handle).and_then(|r| r.category.clone());
        let parts = config.messages.render(
            &config.messages.follow_up,
            handle.as_str(),
            category.as_deref(),
        );
        let report = dispatcher.deliver(driver.as_ref(), handle, &parts).await;
        if report.parts_sent > 0 {
            self.sends_this_run += 1;
        }
        if let Some(e) = report.error {
            return Err(e);
        }

        self.ledger
            .finalize(handle, CandidateStatus::FollowedUp, Utc::now(), |_| {})?;
        Ok(CandidateOutcome::FollowedUp)
    }

    /// Tallies one unit of work; candidate-local errors are logged and absorbed
    async fn settle(
        &mut self,
        result: Result<CandidateOutcome, OutreachError>,
    ) -> Result<(), OutreachError> {
        let outcome = match result {
            Ok(outcome) => outcome,
            Err(e) if e.is_candidate_local() => {
                tracing::warn!("Skipping candidate: {}", e);
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        self.summary.record(&outcome);

        let reached_inbox = matches!(
            outcome,
            CandidateOutcome::Sent
                | CandidateOutcome::Failed
                | CandidateOutcome::FollowedUp
                | CandidateOutcome::FollowUpFailed
        );
        if reached_inbox && !self.send_cap_reached() {
            tokio::time::sleep(self.config.pacing.pause_between_candidates()).await;
        }

        Ok(())
    }

    /// Waits for the focused page to render; false if it never did
    async fn page_ready(&self, url: &Url) -> Result<bool, OutreachError> {
        let pacing = &self.config.pacing;
        let ready = wait_for(
            self.driver.as_ref(),
            PAGE_READY_SELECTOR,
            pacing.element_timeout(),
            pacing.poll_interval(),
        )
        .await?;

        if ready.is_none() {
            tracing::warn!(
                "{} did not render within {:?}; continuing with what loaded",
                url,
                pacing.element_timeout()
            );
        }
        Ok(ready.is_some())
    }

    async fn check_session(&self) -> Result<(), OutreachError> {
        if let Some(session) = &self.session {
            session.check_alive(self.driver.as_ref()).await?;
        }
        Ok(())
    }

    fn send_cap_reached(&self) -> bool {
        self.sends_this_run >= self.config.pacing.max_sends_per_run
    }
}
