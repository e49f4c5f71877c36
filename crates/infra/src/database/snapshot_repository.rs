//! SQLite-backed implementation of the SnapshotRepository port.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use cadence_core::ports::SnapshotRepository;
use cadence_domain::{
    CadenceError, CalendarEvent, EventStatus, EventType, Result,
};
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::database::SqlitePool;
use crate::errors::InfraError;

/// SQLite implementation of the snapshot store.
///
/// One row per `(user_id, event_id)` pair; re-sightings of the same remote
/// event update the existing row in place.
pub struct SqliteSnapshotRepository {
    pool: Arc<SqlitePool>,
}

impl SqliteSnapshotRepository {
    /// Create a new snapshot repository on top of an existing pool.
    pub fn new(pool: Arc<SqlitePool>) -> Self {
        Self { pool }
    }

    /// Create the snapshot table and indexes if they do not exist yet.
    pub fn ensure_schema(&self) -> Result<()> {
        let conn = self.pool.get().map_err(InfraError::from)?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS event_snapshots (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                event_id TEXT NOT NULL,
                summary TEXT NOT NULL,
                description TEXT,
                location TEXT,
                start_ts INTEGER NOT NULL,
                end_ts INTEGER NOT NULL,
                is_all_day INTEGER NOT NULL DEFAULT 0,
                event_type TEXT NOT NULL,
                status TEXT NOT NULL,
                attendees TEXT NOT NULL DEFAULT '[]',
                last_modified_ts INTEGER NOT NULL,
                updated_at INTEGER NOT NULL,
                UNIQUE(user_id, event_id)
            );
            CREATE INDEX IF NOT EXISTS idx_event_snapshots_user_start
                ON event_snapshots(user_id, start_ts);",
        )
        .map_err(InfraError::from)?;
        Ok(())
    }

    fn load_by_key(&self, user_id: &str, event_id: &str) -> Result<Option<CalendarEvent>> {
        let conn = self.pool.get().map_err(InfraError::from)?;
        let row = conn
            .query_row(
                &format!("SELECT {COLUMNS} FROM event_snapshots WHERE user_id = ?1 AND event_id = ?2"),
                params![user_id, event_id],
                SnapshotRow::read,
            )
            .optional()
            .map_err(InfraError::from)?;
        row.map(SnapshotRow::into_event).transpose()
    }
}

const COLUMNS: &str = "user_id, event_id, summary, description, location, start_ts, end_ts, \
                       is_all_day, event_type, status, attendees, last_modified_ts";

/// Raw column values, decoded into a `CalendarEvent` after the statement
/// finishes so conversion failures surface as domain errors.
struct SnapshotRow {
    user_id: String,
    event_id: String,
    summary: String,
    description: Option<String>,
    location: Option<String>,
    start_ts: i64,
    end_ts: i64,
    is_all_day: bool,
    event_type: String,
    status: String,
    attendees: String,
    last_modified_ts: i64,
}

impl SnapshotRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            user_id: row.get(0)?,
            event_id: row.get(1)?,
            summary: row.get(2)?,
            description: row.get(3)?,
            location: row.get(4)?,
            start_ts: row.get(5)?,
            end_ts: row.get(6)?,
            is_all_day: row.get(7)?,
            event_type: row.get(8)?,
            status: row.get(9)?,
            attendees: row.get(10)?,
            last_modified_ts: row.get(11)?,
        })
    }

    fn into_event(self) -> Result<CalendarEvent> {
        let attendees: BTreeSet<String> =
            serde_json::from_str(&self.attendees).map_err(InfraError::from)?;
        Ok(CalendarEvent {
            user_id: self.user_id,
            event_id: self.event_id,
            summary: self.summary,
            description: self.description,
            location: self.location,
            start_time: timestamp_to_datetime(self.start_ts)?,
            end_time: timestamp_to_datetime(self.end_ts)?,
            all_day: self.is_all_day,
            event_type: EventType::from_storage(&self.event_type),
            status: EventStatus::from_storage(&self.status),
            attendees,
            last_modified: timestamp_to_datetime(self.last_modified_ts)?,
        })
    }
}

fn timestamp_to_datetime(ts: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp(ts, 0)
        .ok_or_else(|| CadenceError::Database(format!("invalid stored timestamp: {ts}")))
}

#[async_trait]
impl SnapshotRepository for SqliteSnapshotRepository {
    #[instrument(skip(self))]
    async fn find_by_user_and_range(
        &self,
        user_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<CalendarEvent>> {
        let conn = self.pool.get().map_err(InfraError::from)?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {COLUMNS} FROM event_snapshots
                 WHERE user_id = ?1 AND start_ts >= ?2 AND start_ts <= ?3
                 ORDER BY start_ts ASC"
            ))
            .map_err(InfraError::from)?;

        let rows = stmt
            .query_map(params![user_id, start.timestamp(), end.timestamp()], SnapshotRow::read)
            .map_err(InfraError::from)?
            .collect::<rusqlite::Result<Vec<SnapshotRow>>>()
            .map_err(InfraError::from)?;

        debug!(user_id, rows = rows.len(), "loaded snapshots for range");
        rows.into_iter().map(SnapshotRow::into_event).collect()
    }

    #[instrument(skip(self, event), fields(event_id = %event.event_id))]
    async fn upsert(&self, event: &CalendarEvent) -> Result<CalendarEvent> {
        let attendees = serde_json::to_string(&event.attendees).map_err(InfraError::from)?;
        let now = Utc::now().timestamp();

        {
            let conn = self.pool.get().map_err(InfraError::from)?;
            conn.execute(
                "INSERT INTO event_snapshots (
                    id, user_id, event_id, summary, description, location,
                    start_ts, end_ts, is_all_day, event_type, status,
                    attendees, last_modified_ts, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
                ON CONFLICT(user_id, event_id) DO UPDATE SET
                    summary = excluded.summary,
                    description = excluded.description,
                    location = excluded.location,
                    start_ts = excluded.start_ts,
                    end_ts = excluded.end_ts,
                    is_all_day = excluded.is_all_day,
                    event_type = excluded.event_type,
                    status = excluded.status,
                    attendees = excluded.attendees,
                    last_modified_ts = excluded.last_modified_ts,
                    updated_at = excluded.updated_at",
                params![
                    Uuid::now_v7().to_string(),
                    event.user_id,
                    event.event_id,
                    event.summary,
                    event.description,
                    event.location,
                    event.start_time.timestamp(),
                    event.end_time.timestamp(),
                    event.all_day,
                    event.event_type.as_str(),
                    event.status.as_str(),
                    attendees,
                    event.last_modified.timestamp(),
                    now,
                ],
            )
            .map_err(InfraError::from)?;
        }

        self.load_by_key(&event.user_id, &event.event_id)?.ok_or_else(|| {
            CadenceError::Database(format!(
                "snapshot vanished after upsert: {}/{}",
                event.user_id, event.event_id
            ))
        })
    }

    #[instrument(skip(self))]
    async fn mark_cancelled(&self, user_id: &str, event_id: &str) -> Result<CalendarEvent> {
        let affected = {
            let conn = self.pool.get().map_err(InfraError::from)?;
            conn.execute(
                "UPDATE event_snapshots SET status = ?1, updated_at = ?2
                 WHERE user_id = ?3 AND event_id = ?4",
                params![
                    EventStatus::Cancelled.as_str(),
                    Utc::now().timestamp(),
                    user_id,
                    event_id
                ],
            )
            .map_err(InfraError::from)?
        };

        if affected == 0 {
            return Err(CadenceError::NotFound(format!(
                "no snapshot for {user_id}/{event_id}"
            )));
        }

        self.load_by_key(user_id, event_id)?.ok_or_else(|| {
            CadenceError::NotFound(format!("no snapshot for {user_id}/{event_id}"))
        })
    }
}
