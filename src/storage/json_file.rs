//! JSON file state backend
//!
//! File shape:
//!
//! ```json
//! { "version": 1, "candidates": { "alice_grad": { "status": "sent", ... } } }
//! ```
//!
//! Files written before the envelope existed (a bare `handle → record` object)
//! are upgraded transparently on load and rewritten in the current shape on the
//! next save.

use crate::storage::atomic::write_atomic;
use crate::storage::traits::{CandidateMap, StateStore, StorageError, StorageResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Current on-disk format version
pub const STATE_FILE_VERSION: u32 = 1;

#[derive(Serialize)]
struct EnvelopeRef<'a> {
    version: u32,
    candidates: &'a CandidateMap,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct Envelope {
    version: u32,
    candidates: CandidateMap,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OnDisk {
    Current(Envelope),
    Legacy(CandidateMap),
}

/// State store backed by a single JSON file
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> StorageError {
        StorageError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }
}

impl StateStore for JsonFileStore {
    fn load(&self) -> StorageResult<CandidateMap> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No state file at {}, starting empty", self.path.display());
                return Ok(CandidateMap::new());
            }
            Err(e) => return Err(self.io_error(e)),
        };

        if content.trim().is_empty() {
            return Ok(CandidateMap::new());
        }

        let parsed: OnDisk =
            serde_json::from_str(&content).map_err(|source| StorageError::Malformed {
                path: self.path.display().to_string(),
                source,
            })?;

        match parsed {
            OnDisk::Current(envelope) => {
                if envelope.version != STATE_FILE_VERSION {
                    return Err(StorageError::UnsupportedVersion {
                        found: envelope.version,
                        expected: STATE_FILE_VERSION,
                    });
                }
                Ok(envelope.candidates)
            }
            OnDisk::Legacy(candidates) => {
                tracing::warn!(
                    "Upgrading legacy state file {} ({} candidates)",
                    self.path.display(),
                    candidates.len()
                );
                Ok(candidates)
            }
        }
    }

    fn save(&self, candidates: &CandidateMap) -> StorageResult<()> {
        let envelope = EnvelopeRef {
            version: STATE_FILE_VERSION,
            candidates,
        };
        let json = serde_json::to_vec_pretty(&envelope)?;

        write_atomic(&self.path, &json).map_err(|e| self.io_error(e))?;

        tracing::trace!(
            "Persisted {} candidates to {}",
            candidates.len(),
            self.path.display()
        );
        Ok(())
    }
}
