//! Automation engine.
//!
//! Orchestrates one user's change-detection and daily-summary cycles
//! against the collaborator ports. Owns the per-user reentrancy guard: at
//! most one in-flight cycle per user, an overlapping firing is skipped
//! rather than queued. Exposes the synchronous trigger surface consumed by
//! the external HTTP layer.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use chrono_tz::Tz;
use cadence_domain::{
    CadenceError, CalendarEvent, ChangeRecord, Result, UserAutomationConfig,
};
use parking_lot::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::detect::{ChangeDetector, TimeWindow};
use crate::normalize::normalize_event;
use crate::notify::{DispatchOutcome, NotificationDispatcher};
use crate::ports::{EventSource, MessageChannel, SnapshotRepository, UserConfigSource};
use crate::summary::DaySummary;

/// Engine tuning knobs. These bound the engine's exposure to its external
/// collaborators; the engine never blocks indefinitely on any of them.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Upper bound on one remote fetch. Expiry is a fetch failure.
    pub fetch_timeout: Duration,
    /// Upper bound on one outbound send. Expiry is a send failure.
    pub send_timeout: Duration,
    /// Change-detection window reaches this far into the past.
    pub lookback_hours: i64,
    /// Change-detection window reaches this far into the future.
    pub lookahead_hours: i64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fetch_timeout: Duration::from_secs(60),
            send_timeout: Duration::from_secs(30),
            lookback_hours: 24,
            lookahead_hours: 24 * 7,
        }
    }
}

/// Outcome of one change-detection cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeCheckReport {
    /// The cycle did not run (overlapping cycle, unknown or disabled user).
    pub skipped: bool,
    pub events_fetched: usize,
    pub changes_detected: usize,
    pub dispatch: DispatchOutcome,
}

impl ChangeCheckReport {
    fn skipped() -> Self {
        Self {
            skipped: true,
            events_fetched: 0,
            changes_detected: 0,
            dispatch: DispatchOutcome { delivered: 0, attempted: 0 },
        }
    }
}

/// Outcome of one daily-summary cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryReport {
    pub skipped: bool,
    pub event_count: usize,
    pub dispatch: DispatchOutcome,
    /// The rendered summary text (identical to what recipients received).
    pub text: String,
}

impl SummaryReport {
    fn skipped() -> Self {
        Self {
            skipped: true,
            event_count: 0,
            dispatch: DispatchOutcome { delivered: 0, attempted: 0 },
            text: String::new(),
        }
    }
}

/// Structured result for the manual trigger surface. Callers map this 1:1
/// to a response body without interpreting internal error types.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct TriggerOutcome {
    pub success: bool,
    pub message: String,
}

/// The reconciliation-and-notification engine.
pub struct AutomationEngine {
    source: Arc<dyn EventSource>,
    snapshots: Arc<dyn SnapshotRepository>,
    users: Arc<dyn UserConfigSource>,
    dispatcher: NotificationDispatcher,
    detector: ChangeDetector,
    config: EngineConfig,
    in_flight: Mutex<HashSet<String>>,
}

impl AutomationEngine {
    pub fn new(
        source: Arc<dyn EventSource>,
        snapshots: Arc<dyn SnapshotRepository>,
        users: Arc<dyn UserConfigSource>,
        channel: Arc<dyn MessageChannel>,
    ) -> Self {
        Self::with_config(source, snapshots, users, channel, EngineConfig::default())
    }

    pub fn with_config(
        source: Arc<dyn EventSource>,
        snapshots: Arc<dyn SnapshotRepository>,
        users: Arc<dyn UserConfigSource>,
        channel: Arc<dyn MessageChannel>,
        config: EngineConfig,
    ) -> Self {
        let dispatcher = NotificationDispatcher::with_timeout(channel, config.send_timeout);
        let detector = ChangeDetector::new(Arc::clone(&snapshots));
        Self {
            source,
            snapshots,
            users,
            dispatcher,
            detector,
            config,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    /// Run one change-detection-and-notify cycle for a user.
    ///
    /// Snapshot writes happen only after the fetch succeeded, the diff is
    /// computed, and the notification was delivered to at least one
    /// recipient; a failed dispatch leaves the store untouched so the next
    /// cycle re-detects and resends (at-least-once semantics).
    #[instrument(skip(self))]
    pub async fn run_change_check(&self, user_id: &str) -> Result<ChangeCheckReport> {
        let Some(_guard) = self.try_begin(user_id) else {
            debug!(user_id, "change check skipped: cycle already in flight");
            return Ok(ChangeCheckReport::skipped());
        };

        let Some(config) = self.active_config(user_id).await? else {
            return Ok(ChangeCheckReport::skipped());
        };
        let timezone = parse_timezone(&config)?;

        let now = Utc::now();
        let window = TimeWindow::new(
            now - chrono::Duration::hours(self.config.lookback_hours),
            now + chrono::Duration::hours(self.config.lookahead_hours),
        )?;

        let fresh = self.fetch_normalized(user_id, window).await?;
        let changes = self.detector.detect_changes(user_id, &fresh, window).await?;

        if changes.is_empty() {
            debug!(user_id, events = fresh.len(), "no material changes");
            return Ok(ChangeCheckReport {
                skipped: false,
                events_fetched: fresh.len(),
                changes_detected: 0,
                dispatch: DispatchOutcome { delivered: 0, attempted: 0 },
            });
        }

        let dispatch = self
            .dispatcher
            .send_change_notification(&config.recipients, &changes, timezone)
            .await;

        if !dispatch.succeeded() {
            return Err(CadenceError::Channel(format!(
                "change notification undeliverable ({})",
                dispatch.ratio()
            )));
        }

        self.apply_changes(user_id, &changes).await?;

        info!(
            user_id,
            changes = changes.len(),
            delivered = %dispatch.ratio(),
            "change check completed"
        );

        Ok(ChangeCheckReport {
            skipped: false,
            events_fetched: fresh.len(),
            changes_detected: changes.len(),
            dispatch,
        })
    }

    /// Run one daily-summary cycle for a user: fetch today's events in the
    /// user's local day, render the report, fan it out.
    #[instrument(skip(self))]
    pub async fn run_daily_summary(&self, user_id: &str) -> Result<SummaryReport> {
        let Some(_guard) = self.try_begin(user_id) else {
            debug!(user_id, "daily summary skipped: cycle already in flight");
            return Ok(SummaryReport::skipped());
        };

        let Some(config) = self.active_config(user_id).await? else {
            return Ok(SummaryReport::skipped());
        };
        let timezone = parse_timezone(&config)?;

        let now_local = Utc::now().with_timezone(&timezone);
        let midnight = now_local
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| CadenceError::Internal("could not derive local midnight".into()))?;
        let day_start = timezone
            .from_local_datetime(&midnight)
            .earliest()
            .ok_or_else(|| {
                CadenceError::Internal(format!("nonexistent local midnight in {}", config.timezone))
            })?
            .with_timezone(&Utc);

        let window = TimeWindow::new(
            day_start,
            day_start + chrono::Duration::hours(23) + chrono::Duration::minutes(59)
                + chrono::Duration::seconds(59),
        )?;

        let mut events = self.fetch_normalized(user_id, window).await?;
        events.retain(|e| e.status != cadence_domain::EventStatus::Cancelled);
        events.sort_by_key(|e| e.start_time);

        let label = now_local.format("%A, %B %d, %Y").to_string();
        let summary = DaySummary::build(&events, day_start, timezone, &label, user_id)?;
        let text = summary.render();

        let dispatch = self.dispatcher.send_daily_summary(&config.recipients, &text).await;
        if !dispatch.succeeded() {
            return Err(CadenceError::Channel(format!(
                "daily summary undeliverable ({})",
                dispatch.ratio()
            )));
        }

        info!(user_id, events = events.len(), delivered = %dispatch.ratio(), "daily summary sent");

        Ok(SummaryReport { skipped: false, event_count: events.len(), dispatch, text })
    }

    /// Manual trigger: run the daily summary now and report a definite
    /// outcome instead of propagating errors.
    pub async fn trigger_daily_summary(&self, user_id: &str) -> TriggerOutcome {
        match self.run_daily_summary(user_id).await {
            Ok(report) if report.skipped => TriggerOutcome {
                success: false,
                message: "automation is disabled, unknown, or already running for this user"
                    .to_string(),
            },
            Ok(report) => TriggerOutcome {
                success: true,
                message: format!(
                    "daily summary sent to {} recipients ({} events)",
                    report.dispatch.ratio(),
                    report.event_count
                ),
            },
            Err(err) => TriggerOutcome { success: false, message: err.to_string() },
        }
    }

    /// Manual trigger: run a change check now with a definite outcome.
    pub async fn trigger_change_check(&self, user_id: &str) -> TriggerOutcome {
        match self.run_change_check(user_id).await {
            Ok(report) if report.skipped => TriggerOutcome {
                success: false,
                message: "automation is disabled, unknown, or already running for this user"
                    .to_string(),
            },
            Ok(report) if report.changes_detected == 0 => TriggerOutcome {
                success: true,
                message: format!("no changes detected ({} events checked)", report.events_fetched),
            },
            Ok(report) => TriggerOutcome {
                success: true,
                message: format!(
                    "{} changes notified to {} recipients",
                    report.changes_detected,
                    report.dispatch.ratio()
                ),
            },
            Err(err) => TriggerOutcome { success: false, message: err.to_string() },
        }
    }

    /// Best-effort error notice, forwarded to the dispatcher.
    pub async fn notify_error(&self, recipient: &str, message: &str) {
        self.dispatcher.send_error_notification(recipient, message).await;
    }

    /// Config is re-read at every firing; absent or disabled config is an
    /// expected steady state, not an error.
    async fn active_config(&self, user_id: &str) -> Result<Option<UserAutomationConfig>> {
        match self.users.get_config(user_id).await? {
            Some(config) if config.enabled => Ok(Some(config)),
            Some(_) => {
                debug!(user_id, "automation disabled");
                Ok(None)
            }
            None => {
                debug!(user_id, "no automation config");
                Ok(None)
            }
        }
    }

    /// Fetch raw events under the fetch timeout and normalize them. A
    /// malformed individual event is logged and skipped; it never aborts
    /// the pass.
    async fn fetch_normalized(
        &self,
        user_id: &str,
        window: TimeWindow,
    ) -> Result<Vec<CalendarEvent>> {
        let raw = tokio::time::timeout(
            self.config.fetch_timeout,
            self.source.fetch_events(user_id, window.start(), window.end()),
        )
        .await
        .map_err(|_| CadenceError::Source("remote fetch timed out".to_string()))??;

        let mut events = Vec::with_capacity(raw.len());
        for raw_event in &raw {
            match normalize_event(user_id, raw_event) {
                Ok(event) => events.push(event),
                Err(err) => {
                    warn!(user_id, event_id = %raw_event.id, error = %err, "skipping malformed event");
                }
            }
        }

        Ok(events)
    }

    /// Write a successfully notified change list back into the snapshot
    /// store. Upserts are keyed by `(user_id, event_id)`; deletions are
    /// soft transitions to cancelled.
    async fn apply_changes(&self, user_id: &str, changes: &[ChangeRecord]) -> Result<()> {
        for change in changes {
            match change {
                ChangeRecord::Added(event) | ChangeRecord::Modified { current: event, .. } => {
                    self.snapshots.upsert(event).await?;
                }
                ChangeRecord::Deleted(event) => {
                    self.snapshots.mark_cancelled(user_id, &event.event_id).await?;
                }
            }
        }
        Ok(())
    }

    fn try_begin(&self, user_id: &str) -> Option<InFlightGuard<'_>> {
        let mut in_flight = self.in_flight.lock();
        if !in_flight.insert(user_id.to_string()) {
            return None;
        }
        Some(InFlightGuard { set: &self.in_flight, user_id: user_id.to_string() })
    }
}

fn parse_timezone(config: &UserAutomationConfig) -> Result<Tz> {
    config.timezone.parse::<Tz>().map_err(|_| {
        CadenceError::Config(format!(
            "user {} has invalid timezone '{}'",
            config.user_id, config.timezone
        ))
    })
}

/// Releases the per-user reentrancy slot when a cycle finishes, including
/// on early return and error paths.
struct InFlightGuard<'a> {
    set: &'a Mutex<HashSet<String>>,
    user_id: String,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.set.lock().remove(&self.user_id);
    }
}
