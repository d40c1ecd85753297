//! State module for tracking candidate progress
//!
//! # Components
//!
//! - `CandidateStatus`: the per-candidate state machine
//! - `CandidateRecord`: the persisted record keyed by handle

mod candidate_status;
mod record;

// Re-export main types
pub use candidate_status::CandidateStatus;
pub use record::{CandidateRecord, Source};
