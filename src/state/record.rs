use crate::state::CandidateStatus;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Provenance of a candidate: which discovery path produced it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case", deny_unknown_fields)]
pub enum Source {
    /// Found through keyword search expansion
    Search { keyword: String },
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Search { keyword } => write!(f, "search:{}", keyword),
        }
    }
}

/// Persisted record for one candidate, keyed by handle in the state file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CandidateRecord {
    pub status: CandidateStatus,

    pub source: Source,

    /// Content item that led to discovery
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_ref: Option<String>,

    #[serde(default)]
    pub discovered_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub sent_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub followed_up_at: Option<DateTime<Utc>>,

    /// Auxiliary category returned by classification, used to pick a greeting
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    /// Message parts delivered by the most recent dispatch attempt
    #[serde(default)]
    pub parts_sent: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,

    /// Fingerprint of the message template used for the most recent attempt
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
}

impl CandidateRecord {
    /// Creates a fresh `discovered` record
    pub fn discovered(source: Source, content_ref: Option<String>, now: DateTime<Utc>) -> Self {
        Self {
            status: CandidateStatus::Discovered,
            source,
            content_ref,
            discovered_at: Some(now),
            sent_at: None,
            followed_up_at: None,
            category: None,
            parts_sent: 0,
            last_error: None,
            template: None,
        }
    }

    /// True iff the last attempt failed and a later run should retry it
    pub fn retry_eligible(&self) -> bool {
        self.status.is_retry_eligible()
    }

    /// True if this record is `sent` and the follow-up window has elapsed
    pub fn follow_up_due(&self, now: DateTime<Utc>, window: Duration) -> bool {
        if self.status != CandidateStatus::Sent {
            return false;
        }

        match self.sent_at {
            Some(sent_at) => now - sent_at >= window,
            None => false,
        }
    }

    /// Applies a state-machine transition, stamping the matching timestamp
    ///
    /// Returns the rejected pair if the transition is not allowed.
    pub fn apply(
        &mut self,
        next: CandidateStatus,
        now: DateTime<Utc>,
    ) -> Result<(), (CandidateStatus, CandidateStatus)> {
        if !self.status.can_transition_to(next) {
            return Err((self.status, next));
        }

        match next {
            CandidateStatus::Sent => {
                self.sent_at = Some(now);
                self.last_error = None;
            }
            CandidateStatus::FollowedUp => self.followed_up_at = Some(now),
            _ => {}
        }

        self.status = next;
        Ok(())
    }
}
