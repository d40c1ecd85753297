//! Outreach-Scout: a resumable keyword-to-inbox outreach pipeline
//!
//! This crate discovers candidate accounts through platform keyword search,
//! resolves each content item to its owner's handle, screens the candidate and
//! delivers a multi-part message. Every candidate's outcome is persisted before
//! the next one starts, so an interrupted run resumes without double-sending.

pub mod browser;
pub mod classifier;
pub mod config;
pub mod output;
pub mod pipeline;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for Outreach-Scout operations
#[derive(Debug, Error)]
pub enum OutreachError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Browser error: {0}")]
    Browser(#[from] browser::BrowserError),

    #[error("Classification error: {0}")]
    Classification(#[from] classifier::ClassifierError),

    #[error("Could not resolve a handle from {url}")]
    Extraction { url: String },

    #[error("Message entry control not found for {handle}")]
    DispatchEntryNotFound { handle: String },

    #[error("Message input not found for {handle}")]
    DispatchInputNotFound { handle: String },

    #[error("Session is not authenticated: {0}")]
    SessionInvalid(String),

    #[error("Missing credential: environment variable {0} is not set")]
    MissingCredential(&'static str),

    #[error("Invalid state transition for {handle}: {from} -> {to}")]
    InvalidTransition {
        handle: String,
        from: state::CandidateStatus,
        to: state::CandidateStatus,
    },

    #[error("No record for candidate {0}")]
    UnknownCandidate(String),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl OutreachError {
    /// Returns true if this error only affects the candidate being processed
    ///
    /// WebDriver command failures (an intercepted click, a stale element, a
    /// page-load timeout, a tab closed underneath us) are tied to one page.
    /// Session loss, an unreachable WebDriver server, storage failures and
    /// tab-stack misuse stop the run after the state file has been flushed.
    pub fn is_candidate_local(&self) -> bool {
        match self {
            Self::Extraction { .. }
            | Self::Classification(_)
            | Self::DispatchEntryNotFound { .. }
            | Self::DispatchInputNotFound { .. } => true,
            Self::Browser(e) => e.is_page_local(),
            _ => false,
        }
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid selector in config: {0}")]
    InvalidSelector(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Invalid handle: {0}")]
    InvalidHandle(String),
}

/// Result type alias for Outreach-Scout operations
pub type Result<T> = std::result::Result<T, OutreachError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use state::{CandidateRecord, CandidateStatus};
pub use url::{normalize_content_url, Handle};
