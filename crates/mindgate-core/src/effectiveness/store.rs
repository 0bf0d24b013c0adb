//! Append-only outcome log.
//!
//! Shows and outcomes are only ever appended; the single mutation is the
//! session-end patch, which fills two fields once. Readers always receive a
//! cloned snapshot, never a view into a half-applied write.

use std::sync::RwLock;

use chrono::{DateTime, Utc};

use super::outcome::{InterventionOutcome, PatchStatus, ShowRecord};
use crate::error::StoreError;

/// Storage seam for the effectiveness tracker.
pub trait OutcomeStore: Send + Sync {
    /// Append a show record.
    fn record_show(&self, show: &ShowRecord) -> Result<(), StoreError>;

    /// Newest show for a session.
    fn latest_show(&self, session_id: &str) -> Result<Option<ShowRecord>, StoreError>;

    /// Up to `limit` shows, newest first.
    fn recent_shows(&self, limit: usize) -> Result<Vec<ShowRecord>, StoreError>;

    /// Append an outcome. Fails with [`StoreError::Duplicate`] when the show
    /// already has one.
    fn append_outcome(&self, outcome: &InterventionOutcome) -> Result<(), StoreError>;

    /// Fill the final-session fields of the newest unpatched outcome for the
    /// session.
    fn patch_session(
        &self,
        session_id: &str,
        final_session_ms: u64,
        ended_normally: bool,
    ) -> Result<PatchStatus, StoreError>;

    /// Outcomes recorded at or after `since` (all when `None`), oldest first.
    fn outcomes_since(
        &self,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<InterventionOutcome>, StoreError>;

    fn outcome_count(&self) -> Result<usize, StoreError>;

    /// Latencies of the newest `limit` outcomes, newest first.
    fn recent_latencies(&self, limit: usize) -> Result<Vec<u64>, StoreError>;
}

#[derive(Debug, Default)]
struct Log {
    shows: Vec<ShowRecord>,
    outcomes: Vec<InterventionOutcome>,
}

/// In-process log behind a `RwLock`.
#[derive(Debug, Default)]
pub struct MemoryOutcomeStore {
    log: RwLock<Log>,
}

impl MemoryOutcomeStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl OutcomeStore for MemoryOutcomeStore {
    fn record_show(&self, show: &ShowRecord) -> Result<(), StoreError> {
        let mut log = self.log.write().map_err(|_| StoreError::Poisoned)?;
        if log.shows.iter().any(|s| s.id == show.id) {
            return Err(StoreError::Duplicate(show.id.clone()));
        }
        log.shows.push(show.clone());
        Ok(())
    }

    fn latest_show(&self, session_id: &str) -> Result<Option<ShowRecord>, StoreError> {
        let log = self.log.read().map_err(|_| StoreError::Poisoned)?;
        Ok(log
            .shows
            .iter()
            .rev()
            .find(|s| s.session_id == session_id)
            .cloned())
    }

    fn recent_shows(&self, limit: usize) -> Result<Vec<ShowRecord>, StoreError> {
        let log = self.log.read().map_err(|_| StoreError::Poisoned)?;
        Ok(log.shows.iter().rev().take(limit).cloned().collect())
    }

    fn append_outcome(&self, outcome: &InterventionOutcome) -> Result<(), StoreError> {
        let mut log = self.log.write().map_err(|_| StoreError::Poisoned)?;
        if log
            .outcomes
            .iter()
            .any(|o| o.id == outcome.id || o.show_id == outcome.show_id)
        {
            return Err(StoreError::Duplicate(outcome.show_id.clone()));
        }
        log.outcomes.push(outcome.clone());
        Ok(())
    }

    fn patch_session(
        &self,
        session_id: &str,
        final_session_ms: u64,
        ended_normally: bool,
    ) -> Result<PatchStatus, StoreError> {
        let mut log = self.log.write().map_err(|_| StoreError::Poisoned)?;
        let mut matched = false;
        for outcome in log.outcomes.iter_mut().rev() {
            if outcome.session_id != session_id {
                continue;
            }
            matched = true;
            if !outcome.is_patched() {
                outcome.final_session_ms = Some(final_session_ms);
                outcome.ended_normally = Some(ended_normally);
                return Ok(PatchStatus::Applied);
            }
        }
        Ok(if matched {
            PatchStatus::AlreadyPatched
        } else {
            PatchStatus::NotFound
        })
    }

    fn outcomes_since(
        &self,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<InterventionOutcome>, StoreError> {
        let log = self.log.read().map_err(|_| StoreError::Poisoned)?;
        Ok(log
            .outcomes
            .iter()
            .filter(|o| since.map_or(true, |t| o.recorded_at >= t))
            .cloned()
            .collect())
    }

    fn outcome_count(&self) -> Result<usize, StoreError> {
        let log = self.log.read().map_err(|_| StoreError::Poisoned)?;
        Ok(log.outcomes.len())
    }

    fn recent_latencies(&self, limit: usize) -> Result<Vec<u64>, StoreError> {
        let log = self.log.read().map_err(|_| StoreError::Poisoned)?;
        Ok(log
            .outcomes
            .iter()
            .rev()
            .take(limit)
            .map(|o| o.latency_ms)
            .collect())
    }
}
