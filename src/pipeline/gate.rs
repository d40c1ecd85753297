//! Candidate admission
//!
//! Checks run cheapest first, so a known candidate never costs a profile visit:
//!
//! 1. never contact the operator's own account
//! 2. state-file idempotency (`sent`/`replied`/`followed_up`/`screened_out` stop here)
//! 3. in-run dedup (a handle reached via two content items is admitted once)
//! 4. optional classification of the profile snapshot, failing open

use crate::classifier::{ClassificationRequest, Classifier};
use crate::state::CandidateStatus;
use crate::url::Handle;
use std::collections::HashSet;
use std::fmt;

/// Why a candidate was not admitted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    SelfIdentity,
    AlreadyContacted,
    PreviouslyRejected,
    SeenThisRun,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::SelfIdentity => "operator's own account",
            Self::AlreadyContacted => "already contacted",
            Self::PreviouslyRejected => "previously rejected",
            Self::SeenThisRun => "already admitted this run",
        };
        write!(f, "{}", text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Admit,
    Reject(RejectReason),
}

/// Outcome of the classification step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Screening {
    /// Proceed to dispatch; carries the category when the provider gave one
    Pass { category: Option<String> },
    /// The provider judged the profile out of audience
    Reject,
}

pub struct CandidateGate {
    operator: Handle,
    classifier: Option<Box<dyn Classifier>>,
    question: String,
    admitted: HashSet<Handle>,
}

impl CandidateGate {
    /// Creates a gate; `classifier: None` disables step 4 (every screening passes)
    pub fn new(
        operator: Handle,
        classifier: Option<Box<dyn Classifier>>,
        question: impl Into<String>,
    ) -> Self {
        Self {
            operator,
            classifier,
            question: question.into(),
            admitted: HashSet::new(),
        }
    }

    pub fn classification_enabled(&self) -> bool {
        self.classifier.is_some()
    }

    /// Forgets in-run admissions before a second traversal of the same run
    ///
    /// `discover-send` admits every handle while discovering and again while
    /// sending; only the sending pass may dispatch.
    pub fn begin_pass(&mut self) {
        self.admitted.clear();
    }

    /// Runs checks 1-3 and marks the handle admitted for this run on success
    ///
    /// `status` is the candidate's persisted status at the time of the check,
    /// `None` for a first sighting.
    pub fn admit(&mut self, handle: &Handle, status: Option<CandidateStatus>) -> Admission {
        if handle == &self.operator {
            return Admission::Reject(RejectReason::SelfIdentity);
        }

        match status {
            Some(s) if s.is_contacted() => {
                return Admission::Reject(RejectReason::AlreadyContacted)
            }
            Some(CandidateStatus::ScreenedOut) => {
                return Admission::Reject(RejectReason::PreviouslyRejected)
            }
            // Absent, discovered or failed: first attempt or retry
            _ => {}
        }

        if !self.admitted.insert(handle.clone()) {
            return Admission::Reject(RejectReason::SeenThisRun);
        }

        Admission::Admit
    }

    /// Runs check 4 against a base64 PNG of the candidate's profile
    ///
    /// Provider errors of any kind (timeout, HTTP status, malformed body) pass
    /// the candidate.
    pub async fn screen(&self, handle: &Handle, snapshot_base64: Option<String>) -> Screening {
        let Some(classifier) = &self.classifier else {
            return Screening::Pass { category: None };
        };

        let Some(image_base64) = snapshot_base64 else {
            tracing::warn!("No profile snapshot for {}, passing unscreened", handle);
            return Screening::Pass { category: None };
        };

        let request = ClassificationRequest {
            image_base64,
            question: self.question.clone(),
        };

        match classifier.classify(&request).await {
            Ok(verdict) if verdict.is_match => {
                tracing::debug!("{} matched (category {:?})", handle, verdict.category);
                Screening::Pass {
                    category: verdict.category,
                }
            }
            Ok(_) => {
                tracing::info!("{} screened out by classification", handle);
                Screening::Reject
            }
            Err(e) => {
                tracing::warn!("Classification failed for {}, failing open: {}", handle, e);
                Screening::Pass { category: None }
            }
        }
    }
}
