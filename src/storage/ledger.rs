//! In-memory working set of candidate records
//!
//! The ledger is loaded once at run start, mutated in memory, and flushed to
//! its `StateStore` after every finalised candidate. An interruption therefore
//! loses at most the candidate that was in flight.

use crate::state::{CandidateRecord, CandidateStatus, Source};
use crate::storage::traits::{CandidateMap, StateStore};
use crate::url::Handle;
use crate::OutreachError;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;

pub struct CandidateLedger<S: StateStore> {
    store: S,
    candidates: CandidateMap,
}

impl<S: StateStore> CandidateLedger<S> {
    /// Loads the full mapping from `store`
    pub fn open(store: S) -> Result<Self, OutreachError> {
        let candidates = store.load()?;
        tracing::info!("Loaded {} candidate records", candidates.len());
        Ok(Self { store, candidates })
    }

    pub fn get(&self, handle: &Handle) -> Option<&CandidateRecord> {
        self.candidates.get(handle)
    }

    pub fn status(&self, handle: &Handle) -> Option<CandidateStatus> {
        self.candidates.get(handle).map(|r| r.status)
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn records(&self) -> &CandidateMap {
        &self.candidates
    }

    /// Records a first sighting; re-discovery of a known handle is a no-op
    ///
    /// Returns true if a new record was created. Nothing is persisted here.
    pub fn record_discovery(
        &mut self,
        handle: &Handle,
        source: Source,
        content_ref: Option<String>,
        now: DateTime<Utc>,
    ) -> bool {
        if self.candidates.contains_key(handle) {
            return false;
        }

        self.candidates.insert(
            handle.clone(),
            CandidateRecord::discovered(source, content_ref, now),
        );
        true
    }

    /// Moves a candidate to `next`, lets `update` adjust the record, then persists
    ///
    /// The transition is validated against the state machine before anything
    /// is written.
    pub fn finalize<F>(
        &mut self,
        handle: &Handle,
        next: CandidateStatus,
        now: DateTime<Utc>,
        update: F,
    ) -> Result<(), OutreachError>
    where
        F: FnOnce(&mut CandidateRecord),
    {
        let record = self
            .candidates
            .get_mut(handle)
            .ok_or_else(|| OutreachError::UnknownCandidate(handle.to_string()))?;

        record
            .apply(next, now)
            .map_err(|(from, to)| OutreachError::InvalidTransition {
                handle: handle.to_string(),
                from,
                to,
            })?;
        update(record);

        tracing::debug!("{} -> {}", handle, next);
        self.flush()
    }

    /// Persists the full mapping
    pub fn flush(&self) -> Result<(), OutreachError> {
        self.store.save(&self.candidates)?;
        Ok(())
    }

    /// Handles awaiting a send attempt (`discovered` or `failed`), oldest sighting first
    pub fn pending_sends(&self) -> Vec<Handle> {
        let mut pending: Vec<(&Handle, &CandidateRecord)> = self
            .candidates
            .iter()
            .filter(|(_, r)| !r.status.is_terminal())
            .collect();
        pending.sort_by_key(|(handle, r)| (r.discovered_at, (*handle).clone()));
        pending.into_iter().map(|(h, _)| h.clone()).collect()
    }

    /// Sent handles whose follow-up window has elapsed, oldest send first
    pub fn follow_up_due(&self, now: DateTime<Utc>, window: Duration) -> Vec<Handle> {
        let mut due: Vec<(&Handle, &CandidateRecord)> = self
            .candidates
            .iter()
            .filter(|(_, r)| r.follow_up_due(now, window))
            .collect();
        due.sort_by_key(|(handle, r)| (r.sent_at, (*handle).clone()));
        due.into_iter().map(|(h, _)| h.clone()).collect()
    }

    /// Number of records in each status
    pub fn status_counts(&self) -> HashMap<CandidateStatus, usize> {
        let mut counts = HashMap::new();
        for record in self.candidates.values() {
            *counts.entry(record.status).or_insert(0) += 1;
        }
        counts
    }
}
