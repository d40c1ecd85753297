/// Candidate status definitions for the outreach state machine
///
/// ```text
/// discovered ──> screened_out
///      │
///      ├──> sent ──> replied
///      │      └────> followed_up
///      └──> failed ──> (retried on a later run)
/// ```
use serde::{Deserialize, Serialize};
use std::fmt;

/// Represents where a candidate is in the outreach lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateStatus {
    // ===== Active States =====
    /// Handle was resolved from a content item and has not been contacted yet
    Discovered,

    /// The last dispatch attempt did not complete; retried on a later run
    Failed,

    // ===== Terminal States =====
    /// Classification rejected the candidate
    ScreenedOut,

    /// Every message part was delivered
    Sent,

    /// The candidate answered after being contacted
    Replied,

    /// No reply within the follow-up window; the follow-up was delivered
    FollowedUp,
}

impl CandidateStatus {
    /// Returns true if the pipeline must never process this candidate again
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Discovered | Self::Failed)
    }

    /// Returns true if the candidate has already received the outreach message
    pub fn is_contacted(&self) -> bool {
        matches!(self, Self::Sent | Self::Replied | Self::FollowedUp)
    }

    /// Returns true if a later run should retry this candidate automatically
    pub fn is_retry_eligible(&self) -> bool {
        matches!(self, Self::Failed)
    }

    /// Returns true if the state machine allows moving from `self` to `next`
    pub fn can_transition_to(&self, next: CandidateStatus) -> bool {
        use CandidateStatus::*;

        matches!(
            (self, next),
            (Discovered, Discovered | ScreenedOut | Sent | Failed)
                | (Failed, Failed | ScreenedOut | Sent)
                | (Sent, Replied | FollowedUp)
        )
    }

    /// Converts the status to its persisted string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Discovered => "discovered",
            Self::Failed => "failed",
            Self::ScreenedOut => "screened_out",
            Self::Sent => "sent",
            Self::Replied => "replied",
            Self::FollowedUp => "followed_up",
        }
    }

    /// Returns all statuses in lifecycle order
    pub fn all_states() -> Vec<Self> {
        vec![
            Self::Discovered,
            Self::Failed,
            Self::ScreenedOut,
            Self::Sent,
            Self::Replied,
            Self::FollowedUp,
        ]
    }
}

impl fmt::Display for CandidateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
