use crate::UrlError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Path segments the platform uses for its own navigation
///
/// None of these can ever be an account handle, so every extraction strategy
/// ignores them.
pub const RESERVED_SEGMENTS: &[&str] = &[
    "about",
    "accounts",
    "api",
    "challenge",
    "developer",
    "direct",
    "emails",
    "explore",
    "legal",
    "locations",
    "p",
    "privacy",
    "reel",
    "reels",
    "session",
    "stories",
    "tags",
    "terms",
    "tv",
    "web",
];

/// Maximum length of a platform handle
const MAX_HANDLE_LEN: usize = 30;

/// Returns true if the segment is a reserved platform path
pub fn is_reserved_segment(segment: &str) -> bool {
    let lowered = segment.to_ascii_lowercase();
    RESERVED_SEGMENTS.contains(&lowered.as_str())
}

/// A validated, lowercased account handle
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Handle(String);

impl Handle {
    /// Parses a handle, accepting an optional leading `@`
    ///
    /// Handles are 1-30 characters of ASCII letters, digits, `.` and `_`, and
    /// may not start or end with a dot. Reserved navigation segments are rejected.
    ///
    /// # Examples
    ///
    /// ```
    /// use outreach_scout::url::Handle;
    ///
    /// let handle = Handle::parse("@Alice_Grad").unwrap();
    /// assert_eq!(handle.as_str(), "alice_grad");
    /// assert!(Handle::parse("explore").is_err());
    /// ```
    pub fn parse(raw: &str) -> Result<Self, UrlError> {
        let trimmed = raw.trim().trim_start_matches('@').to_ascii_lowercase();

        if trimmed.is_empty() || trimmed.len() > MAX_HANDLE_LEN {
            return Err(UrlError::InvalidHandle(raw.to_string()));
        }

        if !trimmed
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_')
        {
            return Err(UrlError::InvalidHandle(raw.to_string()));
        }

        if trimmed.starts_with('.') || trimmed.ends_with('.') {
            return Err(UrlError::InvalidHandle(raw.to_string()));
        }

        if is_reserved_segment(&trimmed) {
            return Err(UrlError::InvalidHandle(format!("{} is reserved", raw)));
        }

        Ok(Self(trimmed))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for Handle {
    type Error = UrlError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Handle> for String {
    fn from(handle: Handle) -> Self {
        handle.0
    }
}
