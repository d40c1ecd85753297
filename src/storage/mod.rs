//! Storage module for persisting candidate state
//!
//! This module handles everything the pipeline needs from durable state:
//! - The `StateStore` trait (`load` / `save` of the full handle → record map)
//! - A JSON file backend with atomic full-file rewrites
//! - The in-memory `CandidateLedger` the run loop mutates and flushes

mod atomic;
mod json_file;
mod ledger;
mod traits;

pub use atomic::write_atomic;
pub use json_file::JsonFileStore;
pub use ledger::CandidateLedger;
pub use traits::{CandidateMap, StateStore, StorageError, StorageResult};

use std::path::Path;

/// Opens the JSON state file at `path`
///
/// The file does not need to exist yet; a missing file loads as an empty map.
pub fn open_store(path: &Path) -> JsonFileStore {
    JsonFileStore::new(path)
}
