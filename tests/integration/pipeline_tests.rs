//! End-to-end runs of the coordinator against the scripted browser

use crate::support::{calls, test_config, CountingClassifier, Site};
use chrono::{Duration, Utc};
use outreach_scout::browser::BrowserDriver;
use outreach_scout::classifier::Classifier;
use outreach_scout::config::Config;
use outreach_scout::pipeline::{Coordinator, Mode, RunSummary};
use outreach_scout::state::{CandidateRecord, CandidateStatus, Source};
use outreach_scout::storage::{CandidateMap, JsonFileStore, StateStore};
use outreach_scout::url::Handle;
use outreach_scout::OutreachError;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

fn handle(s: &str) -> Handle {
    Handle::parse(s).unwrap()
}

fn load_state(config: &Config) -> CandidateMap {
    JsonFileStore::new(Path::new(&config.storage.state_path))
        .load()
        .unwrap()
}

async fn run(
    config: &Config,
    driver: Arc<dyn BrowserDriver>,
    classifier: Option<Box<dyn Classifier>>,
    mode: Mode,
) -> Result<RunSummary, OutreachError> {
    let store = JsonFileStore::new(Path::new(&config.storage.state_path));
    let mut coordinator = Coordinator::new(config, driver, store, classifier).await?;
    coordinator.run(mode).await
}

#[tokio::test]
async fn test_career_tips_search_send() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path(), &["career tips"]);
    let browser = Site::career_tips().browser();
    let (classifier, counter) = CountingClassifier::new(true, Some("student"));

    let summary = run(
        &config,
        browser.clone(),
        Some(Box::new(classifier)),
        Mode::SearchAndSend,
    )
    .await
    .unwrap();

    // alice_grad is reached via items 1 and 3 but screened and messaged once
    assert_eq!(calls(&counter), 2);
    assert_eq!(
        browser.sent_to("alice_grad"),
        vec!["Hey @alice_grad!", "Loved your recent post."]
    );
    assert_eq!(browser.sent_to("bob_codes").len(), 2);

    assert_eq!(summary.content_items, 3);
    assert_eq!(summary.sent, 2);
    assert_eq!(summary.rejected, 1);

    let state = load_state(&config);
    let alice = &state[&handle("alice_grad")];
    assert_eq!(alice.status, CandidateStatus::Sent);
    assert_eq!(alice.parts_sent, 2);
    assert_eq!(alice.category.as_deref(), Some("student"));
    assert!(alice.sent_at.is_some());
    assert_eq!(
        alice.source,
        Source::Search {
            keyword: "career tips".to_string()
        }
    );
    assert_eq!(alice.content_ref.as_deref(), Some("https://platform.test/p/item1/"));
    assert_eq!(
        alice.template.as_deref(),
        Some(config.messages.fingerprint().as_str())
    );
    assert_eq!(state[&handle("bob_codes")].status, CandidateStatus::Sent);
}

#[tokio::test]
async fn test_tabs_balanced_after_run() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path(), &["career tips"]);
    let browser = Site::career_tips().browser();

    run(&config, browser.clone(), None, Mode::SearchAndSend)
        .await
        .unwrap();

    assert_eq!(browser.open_contexts(), 1);
    // Root + search + content + profile, never more
    assert_eq!(browser.max_open_contexts(), 4);
}

#[tokio::test]
async fn test_second_run_sends_nothing() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path(), &["career tips"]);

    let first = Site::career_tips().browser();
    run(&config, first.clone(), None, Mode::SearchAndSend)
        .await
        .unwrap();
    assert_eq!(first.sent().len(), 4);

    let second = Site::career_tips().browser();
    let (classifier, counter) = CountingClassifier::new(true, None);
    let summary = run(
        &config,
        second.clone(),
        Some(Box::new(classifier)),
        Mode::SearchAndSend,
    )
    .await
    .unwrap();

    assert!(second.sent().is_empty());
    assert_eq!(calls(&counter), 0);
    assert_eq!(summary.sent, 0);
    assert_eq!(summary.rejected, 3);
    // Known candidates are rejected before any profile is opened
    assert!(!second.navigations().iter().any(|n| n == "/alice_grad/"));
}

#[tokio::test]
async fn test_discover_records_without_sending() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path(), &["career tips"]);
    let browser = Site::career_tips().browser();

    let summary = run(&config, browser.clone(), None, Mode::Discover)
        .await
        .unwrap();

    assert!(browser.sent().is_empty());
    assert_eq!(summary.discovered, 2);

    let state = load_state(&config);
    assert_eq!(state.len(), 2);
    assert!(state
        .values()
        .all(|r| r.status == CandidateStatus::Discovered && r.sent_at.is_none()));
}

#[tokio::test]
async fn test_discover_send_contacts_pending_candidates() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path(), &["career tips"]);

    run(&config, Site::career_tips().browser(), None, Mode::Discover)
        .await
        .unwrap();

    let browser = Site::career_tips().browser();
    let summary = run(&config, browser.clone(), None, Mode::DiscoverAndSend)
        .await
        .unwrap();

    assert_eq!(summary.discovered, 0);
    assert_eq!(summary.already_pending, 2);
    assert_eq!(summary.sent, 2);
    assert_eq!(browser.sent_to("alice_grad").len(), 2);
    assert_eq!(browser.sent_to("bob_codes").len(), 2);
    assert_eq!(browser.open_contexts(), 1);

    let state = load_state(&config);
    assert!(state.values().all(|r| r.status == CandidateStatus::Sent));
}

#[tokio::test]
async fn test_dispatch_failure_is_retried_next_run() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path(), &["career tips"]);

    let broken = Site::career_tips().unreachable_profile("bob_codes").browser();
    let summary = run(&config, broken.clone(), None, Mode::SearchAndSend)
        .await
        .unwrap();

    assert_eq!(summary.sent, 1);
    assert_eq!(summary.failed, 1);
    assert!(broken.sent_to("bob_codes").is_empty());
    assert_eq!(broken.open_contexts(), 1);

    let bob = &load_state(&config)[&handle("bob_codes")];
    assert_eq!(bob.status, CandidateStatus::Failed);
    assert_eq!(bob.parts_sent, 0);
    assert!(bob.last_error.as_deref().unwrap().contains("bob_codes"));
    assert!(bob.sent_at.is_none());

    let diagnostics: Vec<_> = std::fs::read_dir(&config.storage.diagnostics_dir)
        .unwrap()
        .collect();
    assert_eq!(diagnostics.len(), 3);

    let fixed = Site::career_tips().browser();
    run(&config, fixed.clone(), None, Mode::SearchAndSend)
        .await
        .unwrap();

    assert!(fixed.sent_to("alice_grad").is_empty());
    assert_eq!(fixed.sent_to("bob_codes").len(), 2);
    let bob = &load_state(&config)[&handle("bob_codes")];
    assert_eq!(bob.status, CandidateStatus::Sent);
    assert!(bob.last_error.is_none());
}

#[tokio::test]
async fn test_intercepted_click_fails_only_that_candidate() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path(), &["career tips"]);
    let browser = Arc::new(
        Site::career_tips()
            .fake()
            .with_click_intercepted_on("/alice_grad/"),
    );

    let summary = run(&config, browser.clone(), None, Mode::SearchAndSend)
        .await
        .unwrap();

    assert_eq!(summary.failed, 1);
    assert_eq!(summary.sent, 1);
    assert!(browser.sent_to("alice_grad").is_empty());
    assert_eq!(browser.sent_to("bob_codes").len(), 2);
    assert_eq!(browser.open_contexts(), 1);

    let state = load_state(&config);
    let alice = &state[&handle("alice_grad")];
    assert_eq!(alice.status, CandidateStatus::Failed);
    assert_eq!(alice.parts_sent, 0);
    assert!(alice
        .last_error
        .as_deref()
        .unwrap()
        .contains("element click intercepted"));
    assert_eq!(state[&handle("bob_codes")].status, CandidateStatus::Sent);
}

#[tokio::test]
async fn test_partial_send_is_failed_and_fully_resent() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path(), &["career tips"]);
    let flaky = Arc::new(
        Site::career_tips()
            .fake()
            .with_enter_failing_on("/alice_grad/", 2),
    );

    let summary = run(&config, flaky.clone(), None, Mode::SearchAndSend)
        .await
        .unwrap();

    assert_eq!(summary.failed, 1);
    assert_eq!(summary.sent, 1);
    assert_eq!(flaky.sent_to("alice_grad"), vec!["Hi @alice_grad!"]);
    assert_eq!(flaky.sent_to("bob_codes").len(), 2);
    assert_eq!(flaky.open_contexts(), 1);

    let alice = &load_state(&config)[&handle("alice_grad")];
    assert_eq!(alice.status, CandidateStatus::Failed);
    assert_eq!(alice.parts_sent, 1);
    assert!(alice.sent_at.is_none());
    assert!(alice
        .last_error
        .as_deref()
        .unwrap()
        .contains("stale element reference"));

    let diagnostics = std::fs::read_dir(&config.storage.diagnostics_dir)
        .unwrap()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_name().to_string_lossy().contains("dispatch_alice_grad"))
        .count();
    assert_eq!(diagnostics, 3);

    // The next run starts the sequence over
    let fixed = Site::career_tips().browser();
    run(&config, fixed.clone(), None, Mode::SearchAndSend)
        .await
        .unwrap();

    assert_eq!(
        fixed.sent_to("alice_grad"),
        vec!["Hi @alice_grad!", "Loved your recent post."]
    );
    assert!(fixed.sent_to("bob_codes").is_empty());
    let alice = &load_state(&config)[&handle("alice_grad")];
    assert_eq!(alice.status, CandidateStatus::Sent);
    assert_eq!(alice.parts_sent, 2);
    assert!(alice.last_error.is_none());
}

#[tokio::test]
async fn test_partial_send_counts_against_cap() {
    let dir = TempDir::new().unwrap();
    let mut config = test_config(dir.path(), &["career tips"]);
    config.pacing.max_sends_per_run = 1;
    let browser = Arc::new(
        Site::career_tips()
            .fake()
            .with_enter_failing_on("/alice_grad/", 2),
    );

    let summary = run(&config, browser.clone(), None, Mode::SearchAndSend)
        .await
        .unwrap();

    assert_eq!(summary.failed, 1);
    assert_eq!(summary.sent, 0);
    assert!(browser.sent_to("bob_codes").is_empty());
    assert!(!load_state(&config).contains_key(&handle("bob_codes")));
}

#[tokio::test]
async fn test_content_load_timeout_skips_item() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path(), &["career tips"]);
    let browser = Arc::new(
        Site::career_tips()
            .fake()
            .with_load_timeout_on("/p/item2/"),
    );

    let summary = run(&config, browser.clone(), None, Mode::SearchAndSend)
        .await
        .unwrap();

    assert_eq!(summary.extraction_failures, 1);
    assert_eq!(summary.sent, 1);
    assert_eq!(browser.sent_to("alice_grad").len(), 2);
    assert_eq!(browser.open_contexts(), 1);
    assert!(!load_state(&config).contains_key(&handle("bob_codes")));
}

#[tokio::test]
async fn test_profile_load_timeout_fails_candidate() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path(), &["career tips"]);
    let browser = Arc::new(
        Site::career_tips()
            .fake()
            .with_load_timeout_on("/alice_grad/"),
    );

    let summary = run(&config, browser.clone(), None, Mode::SearchAndSend)
        .await
        .unwrap();

    assert_eq!(summary.failed, 1);
    assert_eq!(browser.sent_to("bob_codes").len(), 2);
    assert_eq!(browser.open_contexts(), 1);

    let alice = &load_state(&config)[&handle("alice_grad")];
    assert_eq!(alice.status, CandidateStatus::Failed);
    assert!(alice.last_error.as_deref().unwrap().contains("timeout"));
}

#[tokio::test]
async fn test_unrendered_content_is_flagged_in_diagnostics() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path(), &["career tips"]);
    // Linked from the grid but never served: the page stays blank
    let browser = Site::new()
        .search("career tips", &["/explore/tags/careertips/"])
        .grid("/explore/tags/careertips/", &["/p/blank/"])
        .browser();

    let summary = run(&config, browser.clone(), None, Mode::Discover)
        .await
        .unwrap();

    assert_eq!(summary.extraction_failures, 1);
    let names: Vec<String> = std::fs::read_dir(&config.storage.diagnostics_dir)
        .unwrap()
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .collect();
    assert!(!names.is_empty());
    assert!(names.iter().all(|n| n.contains("extract_unrendered")));
}

#[tokio::test]
async fn test_screened_out_is_final() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path(), &["career tips"]);

    let (rejecting, _) = CountingClassifier::new(false, None);
    let browser = Site::career_tips().browser();
    let summary = run(
        &config,
        browser.clone(),
        Some(Box::new(rejecting)),
        Mode::SearchAndSend,
    )
    .await
    .unwrap();

    assert_eq!(summary.screened_out, 2);
    assert!(browser.sent().is_empty());

    let (accepting, counter) = CountingClassifier::new(true, None);
    let again = Site::career_tips().browser();
    run(
        &config,
        again.clone(),
        Some(Box::new(accepting)),
        Mode::SearchAndSend,
    )
    .await
    .unwrap();

    assert_eq!(calls(&counter), 0);
    assert!(again.sent().is_empty());
    assert!(load_state(&config)
        .values()
        .all(|r| r.status == CandidateStatus::ScreenedOut));
}

#[tokio::test]
async fn test_extraction_failure_skips_item() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path(), &["career tips"]);
    let browser = Site::career_tips()
        .anonymous_content("/p/item2/")
        .browser();

    let summary = run(&config, browser.clone(), None, Mode::SearchAndSend)
        .await
        .unwrap();

    assert_eq!(summary.extraction_failures, 1);
    assert_eq!(summary.sent, 1);
    assert_eq!(browser.sent_to("alice_grad").len(), 2);
    assert_eq!(browser.open_contexts(), 1);
    assert!(!load_state(&config).contains_key(&handle("bob_codes")));
}

#[tokio::test]
async fn test_operator_never_contacted() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path(), &["career tips"]);
    let browser = Site::career_tips()
        .content("/p/item2/", "my_studio")
        .profile("my_studio")
        .browser();

    run(&config, browser.clone(), None, Mode::SearchAndSend)
        .await
        .unwrap();

    assert!(browser.sent_to("my_studio").is_empty());
    assert!(!load_state(&config).contains_key(&handle("my_studio")));
}

#[tokio::test]
async fn test_send_cap_stops_run() {
    let dir = TempDir::new().unwrap();
    let mut config = test_config(dir.path(), &["career tips"]);
    config.pacing.max_sends_per_run = 1;
    let browser = Site::career_tips().browser();

    let summary = run(&config, browser.clone(), None, Mode::SearchAndSend)
        .await
        .unwrap();

    assert_eq!(summary.sent, 1);
    assert_eq!(browser.sent_to("alice_grad").len(), 2);
    assert!(browser.sent_to("bob_codes").is_empty());
    assert_eq!(browser.open_contexts(), 1);
}

#[tokio::test]
async fn test_session_loss_saves_progress_and_unwinds() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path(), &["career tips"]);
    let browser = Arc::new(
        crate::support::FakeBrowser::new(Site::career_tips().into_pages())
            .with_session_lost_on("/bob_codes/"),
    );

    let result = run(&config, browser.clone(), None, Mode::SearchAndSend).await;

    assert!(matches!(result, Err(OutreachError::Browser(_))));
    assert_eq!(browser.open_contexts(), 1);

    let state = load_state(&config);
    assert_eq!(state[&handle("alice_grad")].status, CandidateStatus::Sent);
    // Found but never attempted: still awaiting a send
    assert_eq!(state[&handle("bob_codes")].status, CandidateStatus::Discovered);
}

#[tokio::test]
async fn test_missing_search_page_falls_back_to_tag() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path(), &["Career Tips!"]);
    // No search page at all: only the tag grid exists
    let browser = Site::new()
        .grid("/explore/tags/careertips/", &["/p/item1/"])
        .content("/p/item1/", "alice_grad")
        .browser();

    let summary = run(&config, browser.clone(), None, Mode::Discover)
        .await
        .unwrap();

    assert_eq!(summary.discovered, 1);
    assert!(browser
        .navigations()
        .iter()
        .any(|n| n == "/explore/tags/careertips/"));
}

fn sent_record(days_ago: i64) -> CandidateRecord {
    let now = Utc::now();
    let mut record = CandidateRecord::discovered(
        Source::Search {
            keyword: "career tips".to_string(),
        },
        None,
        now - Duration::days(days_ago + 1),
    );
    record.status = CandidateStatus::Sent;
    record.sent_at = Some(now - Duration::days(days_ago));
    record.parts_sent = 2;
    record
}

#[tokio::test]
async fn test_follow_up_sweep() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path(), &[]);

    let mut seeded = CandidateMap::new();
    seeded.insert(handle("carol"), sent_record(5));
    seeded.insert(handle("dave"), sent_record(4));
    seeded.insert(handle("erin"), sent_record(1));
    JsonFileStore::new(Path::new(&config.storage.state_path))
        .save(&seeded)
        .unwrap();

    let browser = Site::new()
        .replied_profile("carol")
        .profile("dave")
        .profile("erin")
        .browser();

    let summary = run(&config, browser.clone(), None, Mode::FollowUp)
        .await
        .unwrap();

    assert_eq!(summary.replied, 1);
    assert_eq!(summary.followed_up, 1);
    assert!(browser.sent_to("carol").is_empty());
    assert_eq!(browser.sent_to("dave"), vec!["Just checking in."]);
    assert!(browser.sent_to("erin").is_empty());
    assert!(!browser.navigations().iter().any(|n| n == "/erin/"));
    assert_eq!(browser.open_contexts(), 1);

    let state = load_state(&config);
    assert_eq!(state[&handle("carol")].status, CandidateStatus::Replied);
    assert_eq!(state[&handle("dave")].status, CandidateStatus::FollowedUp);
    assert!(state[&handle("dave")].followed_up_at.is_some());
    assert_eq!(state[&handle("erin")].status, CandidateStatus::Sent);

    // A second sweep has nothing left to do
    let again = Site::new().profile("dave").browser();
    let summary = run(&config, again.clone(), None, Mode::FollowUp)
        .await
        .unwrap();
    assert_eq!(summary.followed_up, 0);
    assert!(again.sent().is_empty());
}

#[tokio::test]
async fn test_failed_follow_up_stays_sent() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path(), &[]);

    let mut seeded = CandidateMap::new();
    seeded.insert(handle("dave"), sent_record(4));
    JsonFileStore::new(Path::new(&config.storage.state_path))
        .save(&seeded)
        .unwrap();

    let browser = Site::new().unreachable_profile("dave").browser();
    let summary = run(&config, browser.clone(), None, Mode::FollowUp)
        .await
        .unwrap();

    assert_eq!(summary.follow_up_failures, 1);
    assert_eq!(
        load_state(&config)[&handle("dave")].status,
        CandidateStatus::Sent
    );
}

#[tokio::test]
async fn test_follow_up_requires_messages() {
    let dir = TempDir::new().unwrap();
    let mut config = test_config(dir.path(), &[]);
    config.messages.follow_up.clear();

    let result = run(&config, Site::new().browser(), None, Mode::FollowUp).await;
    assert!(matches!(result, Err(OutreachError::Config(_))));
}
