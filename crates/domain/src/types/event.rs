//! Calendar event snapshot types and change records.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Confirmation status of a snapshot.
///
/// `Cancelled` is terminal: the detector soft-deletes by transitioning a
/// snapshot to `Cancelled` and never transitions it back. A re-created
/// remote event arrives with a fresh event id and becomes a new `Added`
/// record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Confirmed,
    Tentative,
    Cancelled,
}

impl EventStatus {
    /// Map a remote status string onto the local state machine.
    ///
    /// Unrecognized or absent statuses default to `Confirmed` so an event is
    /// never silently dropped for an unknown status.
    pub fn from_remote(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some(s) if s.eq_ignore_ascii_case("tentative") => Self::Tentative,
            Some(s) if s.eq_ignore_ascii_case("cancelled") => Self::Cancelled,
            Some(s) if s.eq_ignore_ascii_case("canceled") => Self::Cancelled,
            _ => Self::Confirmed,
        }
    }

    /// Stable storage representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Confirmed => "confirmed",
            Self::Tentative => "tentative",
            Self::Cancelled => "cancelled",
        }
    }

    /// Parse the storage representation back; unknown text reads as
    /// `Confirmed`, matching the remote mapping.
    pub fn from_storage(raw: &str) -> Self {
        Self::from_remote(Some(raw))
    }
}

/// Heuristic categorization tag. Derived from event text, not authoritative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Work,
    Personal,
    Free,
    Unknown,
}

impl EventType {
    /// Stable storage representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Work => "work",
            Self::Personal => "personal",
            Self::Free => "free",
            Self::Unknown => "unknown",
        }
    }

    /// Parse the storage representation back.
    pub fn from_storage(raw: &str) -> Self {
        match raw {
            "work" => Self::Work,
            "personal" => Self::Personal,
            "free" => Self::Free,
            _ => Self::Unknown,
        }
    }

    /// Human-readable label used in rendered summaries.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Work => "Work",
            Self::Personal => "Personal",
            Self::Free => "Free",
            Self::Unknown => "Other",
        }
    }
}

/// Locally persisted snapshot of one remote calendar event for one user.
///
/// At most one snapshot exists per `(user_id, event_id)`; writes are upserts.
/// `last_modified` advances only when compared content differs, never on a
/// mere re-fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub user_id: String,
    /// Remote-source stable identifier, unique per user.
    pub event_id: String,
    pub summary: String,
    pub description: Option<String>,
    pub location: Option<String>,
    /// UTC. Invariant: `start_time <= end_time`.
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// When true, the timestamps represent whole-day boundaries.
    pub all_day: bool,
    pub event_type: EventType,
    pub status: EventStatus,
    /// Attendee email identifiers; order irrelevant.
    pub attendees: BTreeSet<String>,
    /// Last content change of this snapshot.
    pub last_modified: DateTime<Utc>,
}

/// Classification of a detected change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Added,
    Modified,
    Deleted,
}

/// One detected difference between the remote event set and the snapshot
/// store. Produced fresh on each detection pass and consumed immediately by
/// the dispatcher; never persisted.
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeRecord {
    Added(CalendarEvent),
    Modified {
        current: CalendarEvent,
        previous: CalendarEvent,
    },
    Deleted(CalendarEvent),
}

impl ChangeRecord {
    pub fn kind(&self) -> ChangeKind {
        match self {
            Self::Added(_) => ChangeKind::Added,
            Self::Modified { .. } => ChangeKind::Modified,
            Self::Deleted(_) => ChangeKind::Deleted,
        }
    }

    /// The event the record is about (the current side for modifications).
    pub fn event(&self) -> &CalendarEvent {
        match self {
            Self::Added(event) | Self::Deleted(event) => event,
            Self::Modified { current, .. } => current,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_remote_status_defaults_to_confirmed() {
        assert_eq!(EventStatus::from_remote(None), EventStatus::Confirmed);
        assert_eq!(EventStatus::from_remote(Some("needsAction")), EventStatus::Confirmed);
        assert_eq!(EventStatus::from_remote(Some("")), EventStatus::Confirmed);
    }

    #[test]
    fn remote_status_mapping_is_case_insensitive() {
        assert_eq!(EventStatus::from_remote(Some("TENTATIVE")), EventStatus::Tentative);
        assert_eq!(EventStatus::from_remote(Some("Cancelled")), EventStatus::Cancelled);
        // US spelling used by some providers
        assert_eq!(EventStatus::from_remote(Some("canceled")), EventStatus::Cancelled);
    }

    #[test]
    fn status_storage_round_trip() {
        for status in [EventStatus::Confirmed, EventStatus::Tentative, EventStatus::Cancelled] {
            assert_eq!(EventStatus::from_storage(status.as_str()), status);
        }
    }

    #[test]
    fn event_type_storage_round_trip() {
        for ty in [EventType::Work, EventType::Personal, EventType::Free, EventType::Unknown] {
            assert_eq!(EventType::from_storage(ty.as_str()), ty);
        }
    }
}
