use crate::config::types::{
    ClassifierConfig, Config, FollowUpConfig, MessagesConfig, PacingConfig, PlatformConfig,
    SearchConfig, SelectorConfig, StorageConfig, WebDriverConfig,
};
use crate::url::Handle;
use crate::ConfigError;
use scraper::Selector;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_platform_config(&config.platform)?;
    validate_webdriver_config(&config.webdriver)?;
    validate_search_config(&config.search)?;
    validate_selector_config(&config.selectors)?;
    validate_messages_config(&config.messages)?;
    if let Some(classifier) = &config.classifier {
        validate_classifier_config(classifier)?;
    }
    validate_pacing_config(&config.pacing)?;
    validate_storage_config(&config.storage)?;
    validate_follow_up_config(&config.follow_up)?;
    Ok(())
}

/// Validates platform identity
fn validate_platform_config(config: &PlatformConfig) -> Result<(), ConfigError> {
    if config.name.trim().is_empty() {
        return Err(ConfigError::Validation(
            "platform name cannot be empty".to_string(),
        ));
    }

    validate_http_url("base-url", &config.base_url)?;

    Handle::parse(&config.operator_handle).map_err(|e| {
        ConfigError::Validation(format!("operator-handle is not a valid handle: {}", e))
    })?;

    Ok(())
}

/// Validates the WebDriver endpoint
fn validate_webdriver_config(config: &WebDriverConfig) -> Result<(), ConfigError> {
    validate_http_url("webdriver endpoint", &config.endpoint)?;

    if config.browser_name.trim().is_empty() {
        return Err(ConfigError::Validation(
            "browser-name cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates keyword search settings
fn validate_search_config(config: &SearchConfig) -> Result<(), ConfigError> {
    if config.keywords.is_empty() {
        return Err(ConfigError::Validation(
            "at least one search keyword is required".to_string(),
        ));
    }

    if let Some(blank) = config.keywords.iter().position(|k| k.trim().is_empty()) {
        return Err(ConfigError::Validation(format!(
            "keyword #{} is empty",
            blank + 1
        )));
    }

    if config.max_suggestions < 1 || config.max_suggestions > 20 {
        return Err(ConfigError::Validation(format!(
            "max-suggestions must be between 1 and 20, got {}",
            config.max_suggestions
        )));
    }

    if config.max_items_per_suggestion < 1 || config.max_items_per_suggestion > 100 {
        return Err(ConfigError::Validation(format!(
            "max-items-per-suggestion must be between 1 and 100, got {}",
            config.max_items_per_suggestion
        )));
    }

    Ok(())
}

/// Validates that every selector is parseable CSS
fn validate_selector_config(config: &SelectorConfig) -> Result<(), ConfigError> {
    let selectors = [
        ("suggestion", &config.suggestion),
        ("authenticated-probe", &config.authenticated_probe),
        ("login-username", &config.login_username),
        ("login-password", &config.login_password),
        ("login-submit", &config.login_submit),
        ("message-entry", &config.message_entry),
        ("message-input", &config.message_input),
        ("incoming-message", &config.incoming_message),
    ];

    for (name, css) in selectors {
        Selector::parse(css)
            .map_err(|e| ConfigError::InvalidSelector(format!("{} '{}': {:?}", name, css, e)))?;
    }

    Ok(())
}

/// Validates message content
fn validate_messages_config(config: &MessagesConfig) -> Result<(), ConfigError> {
    if config.parts.is_empty() {
        return Err(ConfigError::Validation(
            "messages.parts must contain at least one message".to_string(),
        ));
    }

    let all_parts = config.parts.iter().chain(config.follow_up.iter());
    for part in all_parts {
        if part.trim().is_empty() {
            return Err(ConfigError::Validation(
                "message parts cannot be empty".to_string(),
            ));
        }
    }

    Ok(())
}

/// Validates the classification provider
fn validate_classifier_config(config: &ClassifierConfig) -> Result<(), ConfigError> {
    validate_http_url("classifier endpoint", &config.endpoint)?;

    if config.question.trim().is_empty() {
        return Err(ConfigError::Validation(
            "classifier question cannot be empty".to_string(),
        ));
    }

    if config.timeout_secs < 1 || config.timeout_secs > 300 {
        return Err(ConfigError::Validation(format!(
            "classifier timeout-secs must be between 1 and 300, got {}",
            config.timeout_secs
        )));
    }

    Ok(())
}

/// Validates pacing bounds
fn validate_pacing_config(config: &PacingConfig) -> Result<(), ConfigError> {
    if config.pause_between_parts_ms < 1_000 {
        return Err(ConfigError::Validation(format!(
            "pause-between-parts-ms must be >= 1000ms, got {}ms",
            config.pause_between_parts_ms
        )));
    }

    if config.pause_between_candidates_ms < 5_000 {
        return Err(ConfigError::Validation(format!(
            "pause-between-candidates-ms must be >= 5000ms, got {}ms",
            config.pause_between_candidates_ms
        )));
    }

    if config.element_timeout_ms < 1_000 {
        return Err(ConfigError::Validation(format!(
            "element-timeout-ms must be >= 1000ms, got {}ms",
            config.element_timeout_ms
        )));
    }

    if config.poll_interval_ms < 50 || config.poll_interval_ms > config.element_timeout_ms {
        return Err(ConfigError::Validation(format!(
            "poll-interval-ms must be between 50ms and element-timeout-ms, got {}ms",
            config.poll_interval_ms
        )));
    }

    if config.max_sends_per_run < 1 {
        return Err(ConfigError::Validation(
            "max-sends-per-run must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates file locations
fn validate_storage_config(config: &StorageConfig) -> Result<(), ConfigError> {
    let paths = [
        ("state-path", &config.state_path),
        ("session-path", &config.session_path),
        ("diagnostics-dir", &config.diagnostics_dir),
    ];

    for (name, path) in paths {
        if path.trim().is_empty() {
            return Err(ConfigError::Validation(format!("{} cannot be empty", name)));
        }
    }

    if config.state_path == config.session_path {
        return Err(ConfigError::Validation(
            "state-path and session-path must differ".to_string(),
        ));
    }

    Ok(())
}

/// Validates the follow-up window
fn validate_follow_up_config(config: &FollowUpConfig) -> Result<(), ConfigError> {
    if config.window_days < 3 {
        return Err(ConfigError::Validation(format!(
            "follow-up window-days must be >= 3, got {}",
            config.window_days
        )));
    }

    Ok(())
}

/// Validates an absolute HTTP(S) URL
fn validate_http_url(name: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", name, value, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "{} '{}' must use HTTP or HTTPS",
            name, value
        )));
    }

    Ok(())
}
