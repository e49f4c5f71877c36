//! Change detector.
//!
//! Compares a freshly fetched (and normalized) remote event set against the
//! snapshot store for one user and produces a classified change list, with
//! materiality filtering to suppress notification noise from metadata-only
//! touches.

pub mod policy;

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use cadence_domain::{CadenceError, CalendarEvent, ChangeRecord, EventStatus, Result};
use tracing::{debug, instrument};

use crate::ports::SnapshotRepository;
pub use policy::{contents_differ, exceeds_debounce_window};

/// UTC half-open detection window. Construction rejects inverted ranges so
/// the detector never runs over a nonsensical span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        if start > end {
            return Err(CadenceError::InvalidInput(format!(
                "time window start {start} is after end {end}"
            )));
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }
}

/// Detects added/modified/deleted events relative to the snapshot store.
///
/// The detector only reads; applying the resulting records back to the
/// store is the engine's job, after dispatch succeeds.
pub struct ChangeDetector {
    snapshots: Arc<dyn SnapshotRepository>,
}

impl ChangeDetector {
    pub fn new(snapshots: Arc<dyn SnapshotRepository>) -> Self {
        Self { snapshots }
    }

    /// Diff `fresh` (normalized remote events, in source order) against the
    /// stored snapshots for `user_id` within `window`.
    ///
    /// Added and modified records come first in fresh-list order, deleted
    /// records follow in stored-snapshot order. Callers must only invoke
    /// this with a successfully fetched list; a fetch failure must abort
    /// the pass upstream instead of arriving here as an empty list.
    #[instrument(skip(self, fresh), fields(user_id, fresh_count = fresh.len()))]
    pub async fn detect_changes(
        &self,
        user_id: &str,
        fresh: &[CalendarEvent],
        window: TimeWindow,
    ) -> Result<Vec<ChangeRecord>> {
        let stored = self
            .snapshots
            .find_by_user_and_range(user_id, window.start(), window.end())
            .await?;

        // Cancelled snapshots are history, not live state: they neither
        // match fresh events nor re-emit deletion records.
        let stored: Vec<CalendarEvent> =
            stored.into_iter().filter(|e| e.status != EventStatus::Cancelled).collect();

        let mut changes = Vec::new();
        let mut seen_ids: HashSet<&str> = HashSet::with_capacity(fresh.len());

        for incoming in fresh {
            seen_ids.insert(incoming.event_id.as_str());

            match stored.iter().find(|s| s.event_id == incoming.event_id) {
                None => changes.push(ChangeRecord::Added(incoming.clone())),
                Some(snapshot) => {
                    if let Some(record) = classify_update(snapshot, incoming) {
                        changes.push(record);
                    }
                }
            }
        }

        let added_or_modified = changes.len();

        for snapshot in &stored {
            if !seen_ids.contains(snapshot.event_id.as_str()) {
                changes.push(ChangeRecord::Deleted(snapshot.clone()));
            }
        }

        debug!(
            user_id,
            added_or_modified,
            deleted = changes.len() - added_or_modified,
            "change detection pass complete"
        );

        Ok(changes)
    }
}

/// Decide whether a stored/fresh pair constitutes a material modification.
///
/// Fast path: a remote timestamp that is not newer than the snapshot means
/// unchanged, no comparison at all. A newer timestamp must both clear the
/// debounce window and show an actual field difference before the event
/// classifies as modified.
fn classify_update(snapshot: &CalendarEvent, incoming: &CalendarEvent) -> Option<ChangeRecord> {
    if incoming.last_modified <= snapshot.last_modified {
        return None;
    }

    let delta = incoming.last_modified - snapshot.last_modified;
    if !exceeds_debounce_window(delta) {
        return None;
    }

    if !contents_differ(snapshot, incoming) {
        return None;
    }

    Some(ChangeRecord::Modified { current: incoming.clone(), previous: snapshot.clone() })
}
