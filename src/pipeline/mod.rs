//! Pipeline module for discovery and outreach
//!
//! This module contains the core pipeline logic, including:
//! - Keyword expansion through platform search
//! - Content page parsing and handle extraction
//! - Candidate admission and screening
//! - Multi-part message dispatch
//! - Failure diagnostics
//! - Overall run coordination

mod coordinator;
mod diagnostics;
mod dispatcher;
mod explorer;
mod extractor;
mod gate;
mod page;

pub use coordinator::{CandidateOutcome, Coordinator, Mode, RunSummary};
pub use diagnostics::DiagnosticsCapture;
pub use dispatcher::{DispatchReport, MessageDispatcher};
pub use explorer::SearchExplorer;
pub use extractor::{ContentExtractor, Extraction, Strategy};
pub use gate::{Admission, CandidateGate, RejectReason, Screening};
pub use page::{parse_page, PageLink, ParsedPage};

use crate::browser::{BrowserDriver, SessionManager, WebDriverClient};
use crate::classifier::{Classifier, HttpClassifier};
use crate::config::{Config, Credentials};
use crate::storage::open_store;
use crate::OutreachError;
use std::path::Path;
use std::sync::Arc;

/// Runs a complete pipeline operation
///
/// This is the main entry point for a run. It will:
/// 1. Start a WebDriver session
/// 2. Restore or establish the authenticated session
/// 3. Load the state file
/// 4. Run `mode` to completion
/// 5. End the WebDriver session, whatever the outcome
pub async fn run(
    config: &Config,
    credentials: &Credentials,
    mode: Mode,
) -> Result<RunSummary, OutreachError> {
    let classifier = build_classifier(config, credentials)?;

    let client = Arc::new(WebDriverClient::connect(&config.webdriver).await?);
    let driver: Arc<dyn BrowserDriver> = client.clone();

    let result = run_with_driver(config, credentials, mode, driver, classifier).await;

    if let Err(e) = client.quit().await {
        tracing::warn!("Failed to end WebDriver session: {}", e);
    }
    result
}

async fn run_with_driver(
    config: &Config,
    credentials: &Credentials,
    mode: Mode,
    driver: Arc<dyn BrowserDriver>,
    classifier: Option<Box<dyn Classifier>>,
) -> Result<RunSummary, OutreachError> {
    let session = SessionManager::new(config)?;
    session
        .ensure_authenticated(driver.as_ref(), credentials)
        .await?;

    let store = open_store(Path::new(&config.storage.state_path));
    let mut coordinator = Coordinator::new(config, driver, store, classifier)
        .await?
        .with_session(session);
    coordinator.run(mode).await
}

/// Builds the classification provider when it is both configured and keyed
fn build_classifier(
    config: &Config,
    credentials: &Credentials,
) -> Result<Option<Box<dyn Classifier>>, OutreachError> {
    let Some(classifier_config) = &config.classifier else {
        return Ok(None);
    };

    match &credentials.classifier_key {
        Some(key) => Ok(Some(Box::new(HttpClassifier::new(classifier_config, key)?))),
        None => {
            tracing::warn!(
                "[classifier] is configured but {} is not set; screening disabled",
                crate::config::CLASSIFIER_KEY_VAR
            );
            Ok(None)
        }
    }
}
