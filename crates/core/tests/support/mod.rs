//! In-memory mock implementations of the engine's ports.
//!
//! Designed for deterministic unit tests: every mock records its calls and
//! exposes simple knobs for failure injection.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use cadence_core::ports::{EventSource, MessageChannel, SnapshotRepository, UserConfigSource};
use cadence_domain::{
    CadenceError, CalendarEvent, EventStatus, RawRemoteEvent, Result as DomainResult,
    UserAutomationConfig,
};
use chrono::{DateTime, Utc};

/// In-memory mock for `EventSource`.
///
/// Returns the seeded raw events on every fetch. `fail_next` simulates a
/// fetch outage for exactly one call; `gate` (when set) makes the fetch
/// wait on a lock so tests can hold a cycle in flight; `delay` makes every
/// fetch hang long enough to trip the engine's fetch timeout.
#[derive(Default)]
pub struct MockEventSource {
    events: Mutex<Vec<RawRemoteEvent>>,
    fail_next: AtomicBool,
    pub fetch_calls: AtomicUsize,
    gate: Mutex<Option<Arc<tokio::sync::Mutex<()>>>>,
    delay: Mutex<Option<std::time::Duration>>,
}

impl MockEventSource {
    pub fn new(events: Vec<RawRemoteEvent>) -> Self {
        Self { events: Mutex::new(events), ..Default::default() }
    }

    pub fn fail_next_fetch(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    pub fn set_gate(&self, gate: Arc<tokio::sync::Mutex<()>>) {
        *self.gate.lock().unwrap() = Some(gate);
    }

    /// Make every fetch sleep for `delay` before responding.
    pub fn set_delay(&self, delay: std::time::Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }
}

#[async_trait]
impl EventSource for MockEventSource {
    async fn fetch_events(
        &self,
        _user_id: &str,
        _start: DateTime<Utc>,
        _end: DateTime<Utc>,
    ) -> DomainResult<Vec<RawRemoteEvent>> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);

        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            let _held = gate.lock().await;
        }

        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(CadenceError::Source("simulated fetch outage".to_string()));
        }

        Ok(self.events.lock().unwrap().clone())
    }
}

/// In-memory mock for `SnapshotRepository` with upsert-by-key semantics.
#[derive(Default, Clone)]
pub struct MockSnapshotRepository {
    rows: Arc<Mutex<Vec<CalendarEvent>>>,
}

impl MockSnapshotRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convenience helper for seeding a single snapshot.
    pub fn with_event(self, event: CalendarEvent) -> Self {
        self.rows.lock().unwrap().push(event);
        self
    }

    pub fn rows(&self) -> Vec<CalendarEvent> {
        self.rows.lock().unwrap().clone()
    }
}

#[async_trait]
impl SnapshotRepository for MockSnapshotRepository {
    async fn find_by_user_and_range(
        &self,
        user_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DomainResult<Vec<CalendarEvent>> {
        let mut rows: Vec<CalendarEvent> = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.user_id == user_id && e.start_time >= start && e.start_time <= end)
            .cloned()
            .collect();
        rows.sort_by_key(|e| e.start_time);
        Ok(rows)
    }

    async fn upsert(&self, event: &CalendarEvent) -> DomainResult<CalendarEvent> {
        let mut rows = self.rows.lock().unwrap();
        match rows
            .iter_mut()
            .find(|e| e.user_id == event.user_id && e.event_id == event.event_id)
        {
            Some(existing) => *existing = event.clone(),
            None => rows.push(event.clone()),
        }
        Ok(event.clone())
    }

    async fn mark_cancelled(&self, user_id: &str, event_id: &str) -> DomainResult<CalendarEvent> {
        let mut rows = self.rows.lock().unwrap();
        let row = rows
            .iter_mut()
            .find(|e| e.user_id == user_id && e.event_id == event_id)
            .ok_or_else(|| {
                CadenceError::NotFound(format!("no snapshot for {user_id}/{event_id}"))
            })?;
        row.status = EventStatus::Cancelled;
        Ok(row.clone())
    }
}

/// In-memory mock for `UserConfigSource`.
#[derive(Default)]
pub struct MockUserConfigSource {
    configs: Mutex<HashMap<String, UserAutomationConfig>>,
}

impl MockUserConfigSource {
    pub fn new(configs: Vec<UserAutomationConfig>) -> Self {
        Self {
            configs: Mutex::new(
                configs.into_iter().map(|c| (c.user_id.clone(), c)).collect(),
            ),
        }
    }
}

#[async_trait]
impl UserConfigSource for MockUserConfigSource {
    async fn get_enabled_users(&self) -> DomainResult<Vec<UserAutomationConfig>> {
        let mut users: Vec<UserAutomationConfig> =
            self.configs.lock().unwrap().values().filter(|c| c.enabled).cloned().collect();
        users.sort_by(|a, b| a.user_id.cmp(&b.user_id));
        Ok(users)
    }

    async fn get_config(&self, user_id: &str) -> DomainResult<Option<UserAutomationConfig>> {
        Ok(self.configs.lock().unwrap().get(user_id).cloned())
    }
}

/// In-memory mock for `MessageChannel` recording every delivered message.
#[derive(Default)]
pub struct MockMessageChannel {
    sent: Mutex<Vec<(String, String)>>,
    rejecting: Mutex<HashSet<String>>,
    fail_all: AtomicBool,
    delay: Mutex<Option<std::time::Duration>>,
}

impl MockMessageChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make sends to `recipient` return `Ok(false)`.
    pub fn reject_recipient(&self, recipient: &str) {
        self.rejecting.lock().unwrap().insert(recipient.to_string());
    }

    pub fn set_fail_all(&self, fail: bool) {
        self.fail_all.store(fail, Ordering::SeqCst);
    }

    /// Make every send sleep for `delay` before accepting, so tests can
    /// trip the dispatcher's send timeout.
    pub fn set_delay(&self, delay: std::time::Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    /// Every accepted `(recipient, text)` pair, in send order.
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl MessageChannel for MockMessageChannel {
    async fn send(&self, recipient: &str, text: &str) -> DomainResult<bool> {
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.fail_all.load(Ordering::SeqCst)
            || self.rejecting.lock().unwrap().contains(recipient)
        {
            return Ok(false);
        }
        self.sent.lock().unwrap().push((recipient.to_string(), text.to_string()));
        Ok(true)
    }
}

/// Build a confirmed timed snapshot for tests.
pub fn snapshot_event(
    user_id: &str,
    event_id: &str,
    summary: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    last_modified: DateTime<Utc>,
) -> CalendarEvent {
    CalendarEvent {
        user_id: user_id.to_string(),
        event_id: event_id.to_string(),
        summary: summary.to_string(),
        description: None,
        location: None,
        start_time: start,
        end_time: end,
        all_day: false,
        event_type: cadence_domain::EventType::Unknown,
        status: EventStatus::Confirmed,
        attendees: Default::default(),
        last_modified,
    }
}

/// Build an enabled automation config for tests.
pub fn enabled_config(user_id: &str, recipients: &[&str]) -> UserAutomationConfig {
    UserAutomationConfig {
        user_id: user_id.to_string(),
        enabled: true,
        daily_summary_time: "08:00".to_string(),
        timezone: "UTC".to_string(),
        recipients: recipients.iter().map(|r| r.to_string()).collect(),
    }
}
