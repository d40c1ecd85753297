//! Storage traits and error types
//!
//! This module defines the trait interface for state backends and
//! associated error types.

use crate::state::CandidateRecord;
use crate::url::Handle;
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Malformed state file {path}: {source}")]
    Malformed {
        path: String,
        source: serde_json::Error,
    },

    #[error("Unsupported state file version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// The full candidate mapping, ordered by handle for stable files
pub type CandidateMap = BTreeMap<Handle, CandidateRecord>;

/// Trait for durable candidate-state backends
///
/// The contract is deliberately coarse: the whole mapping is read once at run
/// start and rewritten in full after every finalised candidate. Backends must
/// make `save` atomic so an interrupted write never leaves a torn file.
/// Concurrent runs against the same store are unsupported (last writer wins).
pub trait StateStore {
    /// Reads the full mapping; a missing store yields an empty map
    fn load(&self) -> StorageResult<CandidateMap>;

    /// Atomically replaces the stored mapping
    fn save(&self, candidates: &CandidateMap) -> StorageResult<()>;
}
