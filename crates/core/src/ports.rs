//! Port interfaces for the engine's external collaborators.
//!
//! These traits define the boundaries between core business logic
//! and infrastructure implementations. The HTTP layer, OAuth flow,
//! database driver, and outbound transport all live behind them.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cadence_domain::{CalendarEvent, RawRemoteEvent, Result, UserAutomationConfig};

/// Trait for fetching events from the remote calendar source.
///
/// An `Err` means the fetch itself failed (timeout, auth, transport) and
/// must never be conflated with `Ok(vec![])`, which is a successful fetch
/// of a genuinely empty window. The change detector relies on this
/// distinction to avoid misreading an outage as "all events deleted".
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Fetch raw events for one user within a UTC time range.
    async fn fetch_events(
        &self,
        user_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<RawRemoteEvent>>;
}

/// Trait for persisting event snapshots.
///
/// Snapshot rows are keyed by `(user_id, event_id)`; `upsert` must never
/// create a second row for an existing key.
#[async_trait]
pub trait SnapshotRepository: Send + Sync {
    /// Get snapshots for a user whose start time falls within a range,
    /// ordered by start time ascending. Cancelled snapshots are included;
    /// callers filter as needed.
    async fn find_by_user_and_range(
        &self,
        user_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<CalendarEvent>>;

    /// Insert or update the snapshot for `(event.user_id, event.event_id)`
    /// and return the stored row.
    async fn upsert(&self, event: &CalendarEvent) -> Result<CalendarEvent>;

    /// Soft-delete: transition the snapshot's status to cancelled and return
    /// the updated row. The row is never physically removed.
    async fn mark_cancelled(&self, user_id: &str, event_id: &str) -> Result<CalendarEvent>;
}

/// Trait for reading per-user automation configuration.
#[async_trait]
pub trait UserConfigSource: Send + Sync {
    /// All users whose automation is currently enabled.
    async fn get_enabled_users(&self) -> Result<Vec<UserAutomationConfig>>;

    /// Configuration for one user, or `None` when the user is unknown.
    async fn get_config(&self, user_id: &str) -> Result<Option<UserAutomationConfig>>;
}

/// Trait for the one-way outbound message channel.
#[async_trait]
pub trait MessageChannel: Send + Sync {
    /// Send a text message to a single recipient.
    ///
    /// `Ok(true)` means accepted, `Ok(false)` means ordinary delivery
    /// failure. `Err` is reserved for misconfiguration.
    async fn send(&self, recipient: &str, text: &str) -> Result<bool>;
}
