use thiserror::Error;

pub type BrowserResult<T> = std::result::Result<T, BrowserError>;

/// Errors raised by the browser automation layer
#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("Network error talking to WebDriver: {0}")]
    Network(String),

    #[error("WebDriver command {command} failed ({error}): {message}")]
    Protocol {
        command: String,
        error: String,
        message: String,
    },

    #[error("Malformed WebDriver response for {command}: {message}")]
    MalformedResponse { command: String, message: String },

    #[error("Browser context no longer exists: {0}")]
    NoSuchContext(String),

    #[error("WebDriver session was lost: {0}")]
    SessionLost(String),

    #[error("Tab stack misuse: {0}")]
    TabMisuse(String),

    #[error("Session file error: {0}")]
    SessionFile(String),
}

impl BrowserError {
    /// True for command failures confined to the page that raised them
    pub fn is_page_local(&self) -> bool {
        matches!(
            self,
            Self::Protocol { .. } | Self::MalformedResponse { .. } | Self::NoSuchContext(_)
        )
    }
}

impl From<reqwest::Error> for BrowserError {
    fn from(err: reqwest::Error) -> Self {
        BrowserError::Network(err.to_string())
    }
}
