//! Credentials read from the environment
//!
//! Secrets never live in the TOML file. `main` loads a `.env` file (if any)
//! before calling [`Credentials::from_env`].

use crate::OutreachError;
use std::fmt;

pub const USERNAME_VAR: &str = "OUTREACH_USERNAME";
pub const PASSWORD_VAR: &str = "OUTREACH_PASSWORD";
pub const CLASSIFIER_KEY_VAR: &str = "OUTREACH_CLASSIFIER_KEY";

#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,

    /// Classification provider key; `None` disables classification
    pub classifier_key: Option<String>,
}

impl Credentials {
    /// Reads credentials from the process environment
    ///
    /// Fails with `MissingCredential` if the login pair is absent or empty.
    pub fn from_env() -> Result<Self, OutreachError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, OutreachError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &'static str| {
            lookup(name)
                .filter(|v| !v.trim().is_empty())
                .ok_or(OutreachError::MissingCredential(name))
        };

        Ok(Self {
            username: required(USERNAME_VAR)?,
            password: required(PASSWORD_VAR)?,
            classifier_key: lookup(CLASSIFIER_KEY_VAR).filter(|v| !v.trim().is_empty()),
        })
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field(
                "classifier_key",
                &self.classifier_key.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}
