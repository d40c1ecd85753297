use serde::{Deserialize, Deserializer};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

/// Main configuration structure for Outreach-Scout
///
/// Built once at startup and passed by reference into every component.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    pub platform: PlatformConfig,
    pub webdriver: WebDriverConfig,
    pub search: SearchConfig,
    #[serde(default)]
    pub selectors: SelectorConfig,
    pub messages: MessagesConfig,
    #[serde(default)]
    pub classifier: Option<ClassifierConfig>,
    #[serde(default)]
    pub pacing: PacingConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub follow_up: FollowUpConfig,
}

/// Target platform identity
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PlatformConfig {
    /// Display name used in metadata patterns (`alice on Instagram`)
    pub name: String,

    /// Root URL of the platform web client
    pub base_url: String,

    /// The operator's own handle; never contacted
    pub operator_handle: String,
}

/// WebDriver endpoint configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct WebDriverConfig {
    /// URL of the WebDriver server (chromedriver, geckodriver, Selenium)
    pub endpoint: String,

    #[serde(default = "default_browser_name")]
    pub browser_name: String,

    /// Extra browser command-line arguments
    #[serde(default)]
    pub args: Vec<String>,
}

/// Keyword search configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SearchConfig {
    /// Keywords, processed in this order
    pub keywords: Vec<String>,

    /// Maximum number of platform suggestions expanded per keyword
    #[serde(default = "default_max_suggestions")]
    pub max_suggestions: usize,

    /// Maximum number of content items collected per suggestion
    #[serde(default = "default_max_items")]
    pub max_items_per_suggestion: usize,
}

/// CSS selectors for the platform UI
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct SelectorConfig {
    /// Search-assist suggestion links on the search page
    pub suggestion: String,

    /// Element only present for an authenticated session
    pub authenticated_probe: String,

    pub login_username: String,
    pub login_password: String,
    pub login_submit: String,

    /// Button on a profile page that opens the message thread
    pub message_entry: String,

    /// Compose box inside the message thread
    pub message_input: String,

    /// Message bubble authored by the other party in a thread
    pub incoming_message: String,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            suggestion: "a[href*='/explore/search/keyword/'], a[href*='/explore/tags/']"
                .to_string(),
            authenticated_probe: "svg[aria-label='Home']".to_string(),
            login_username: "input[name='username']".to_string(),
            login_password: "input[name='password']".to_string(),
            login_submit: "button[type='submit']".to_string(),
            message_entry: "div[role='button'][aria-label='Message'], a[href^='/direct/']"
                .to_string(),
            message_input: "div[role='textbox'][contenteditable='true']".to_string(),
            incoming_message: "div[data-scope='messages_table'] div[data-sender='other']"
                .to_string(),
        }
    }
}

/// Outreach message content (opaque to the pipeline)
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct MessagesConfig {
    /// Ordered parts, each sent as its own message
    pub parts: Vec<String>,

    /// Parts sent by the follow-up sweep
    #[serde(default)]
    pub follow_up: Vec<String>,

    /// Greeting substituted for `{greeting}` when no category-specific one exists
    #[serde(default = "default_greeting")]
    pub greeting: String,

    /// Category → greeting overrides, keyed by lowercased classification category
    #[serde(default, deserialize_with = "lowercase_keys")]
    pub greetings: HashMap<String, String>,
}

impl MessagesConfig {
    /// Renders `parts` for one candidate, substituting `{handle}` and `{greeting}`
    pub fn render(&self, parts: &[String], handle: &str, category: Option<&str>) -> Vec<String> {
        let greeting = category
            .and_then(|c| self.greetings.get(&c.to_lowercase()))
            .unwrap_or(&self.greeting);

        parts
            .iter()
            .map(|part| {
                part.replace("{handle}", handle)
                    .replace("{greeting}", greeting)
            })
            .collect()
    }

    /// Short digest of the initial-contact template
    ///
    /// Stored on each `sent` record so outcomes can be compared across
    /// template revisions. Greeting overrides are hashed in key order.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for part in &self.parts {
            hasher.update(part.as_bytes());
            hasher.update([0]);
        }
        hasher.update(self.greeting.as_bytes());
        let ordered: BTreeMap<_, _> = self.greetings.iter().collect();
        for (category, greeting) in ordered {
            hasher.update([0]);
            hasher.update(category.as_bytes());
            hasher.update([0]);
            hasher.update(greeting.as_bytes());
        }
        let mut digest = hex::encode(hasher.finalize());
        digest.truncate(FINGERPRINT_LEN);
        digest
    }
}

const FINGERPRINT_LEN: usize = 12;

/// Categories come back from the classifier in arbitrary case
fn lowercase_keys<'de, D>(deserializer: D) -> Result<HashMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    let raw = HashMap::<String, String>::deserialize(deserializer)?;
    let mut greetings = HashMap::with_capacity(raw.len());
    for (category, greeting) in raw {
        let key = category.to_lowercase();
        if greetings.insert(key.clone(), greeting).is_some() {
            return Err(D::Error::custom(format!(
                "greeting category '{}' is listed more than once",
                key
            )));
        }
    }
    Ok(greetings)
}

/// External classification provider
///
/// The provider key is read from the environment; without it classification
/// is disabled and every candidate passes.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ClassifierConfig {
    pub endpoint: String,

    /// Natural-language acceptance question sent with the profile snapshot
    pub question: String,

    #[serde(default = "default_classifier_timeout")]
    pub timeout_secs: u64,
}

/// Pacing and wait bounds
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct PacingConfig {
    /// Fixed pause after each message part (milliseconds)
    pub pause_between_parts_ms: u64,

    /// Fixed pause after each contacted candidate (milliseconds)
    pub pause_between_candidates_ms: u64,

    /// Upper bound for any element wait (milliseconds)
    pub element_timeout_ms: u64,

    /// Polling interval while waiting for elements (milliseconds)
    pub poll_interval_ms: u64,

    /// Stop sending after this many successful sends in one run
    pub max_sends_per_run: u32,
}

impl PacingConfig {
    pub fn pause_between_parts(&self) -> Duration {
        Duration::from_millis(self.pause_between_parts_ms)
    }

    pub fn pause_between_candidates(&self) -> Duration {
        Duration::from_millis(self.pause_between_candidates_ms)
    }

    pub fn element_timeout(&self) -> Duration {
        Duration::from_millis(self.element_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            pause_between_parts_ms: 4_000,
            pause_between_candidates_ms: 90_000,
            element_timeout_ms: 10_000,
            poll_interval_ms: 250,
            max_sends_per_run: 20,
        }
    }
}

/// File locations
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct StorageConfig {
    /// JSON candidate state file
    pub state_path: String,

    /// Saved session cookies
    pub session_path: String,

    /// Directory for failure snapshots
    pub diagnostics_dir: String,
}

/// Follow-up sweep configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct FollowUpConfig {
    /// Minimum days between the outreach and a follow-up
    pub window_days: i64,
}

impl FollowUpConfig {
    pub fn window(&self) -> chrono::Duration {
        chrono::Duration::days(self.window_days)
    }
}

impl Default for FollowUpConfig {
    fn default() -> Self {
        Self { window_days: 3 }
    }
}

fn default_browser_name() -> String {
    "chrome".to_string()
}

fn default_max_suggestions() -> usize {
    5
}

fn default_max_items() -> usize {
    24
}

fn default_greeting() -> String {
    "Hi".to_string()
}

fn default_classifier_timeout() -> u64 {
    30
}
