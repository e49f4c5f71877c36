//! Notification dispatcher.
//!
//! Translates domain events into outbound messages and pushes them through
//! the external send capability, tolerating partial failure across multiple
//! recipients: every recipient is attempted (settle-all fan-out), and a
//! dispatch counts as successful when at least one recipient accepted.

use std::sync::Arc;
use std::time::Duration;

use chrono_tz::Tz;
use futures::future::join_all;
use cadence_domain::{ChangeRecord, EventStatus};
use tracing::{debug, instrument, warn};

use crate::ports::MessageChannel;

/// Default upper bound on a single outbound send.
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(30);

/// Collected result of one fan-out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub delivered: usize,
    pub attempted: usize,
}

impl DispatchOutcome {
    /// Success means at least one recipient accepted the message. An empty
    /// recipient list succeeds vacuously: there was nothing to deliver.
    pub fn succeeded(&self) -> bool {
        self.attempted == 0 || self.delivered > 0
    }

    /// Observability ratio, e.g. "2/3".
    pub fn ratio(&self) -> String {
        format!("{}/{}", self.delivered, self.attempted)
    }
}

/// Fan-out dispatcher over the one-way outbound message channel.
pub struct NotificationDispatcher {
    channel: Arc<dyn MessageChannel>,
    send_timeout: Duration,
}

impl NotificationDispatcher {
    pub fn new(channel: Arc<dyn MessageChannel>) -> Self {
        Self::with_timeout(channel, DEFAULT_SEND_TIMEOUT)
    }

    pub fn with_timeout(channel: Arc<dyn MessageChannel>, send_timeout: Duration) -> Self {
        Self { channel, send_timeout }
    }

    /// Send a rendered daily summary to every recipient independently.
    #[instrument(skip(self, text), fields(recipients = recipients.len()))]
    pub async fn send_daily_summary(&self, recipients: &[String], text: &str) -> DispatchOutcome {
        self.fan_out(recipients, text).await
    }

    /// Render one combined message covering all changes and fan it out.
    #[instrument(skip(self, changes), fields(recipients = recipients.len(), changes = changes.len()))]
    pub async fn send_change_notification(
        &self,
        recipients: &[String],
        changes: &[ChangeRecord],
        timezone: Tz,
    ) -> DispatchOutcome {
        let text = render_change_message(changes, timezone);
        self.fan_out(recipients, &text).await
    }

    /// Best-effort failure notice to a single recipient. Never errors:
    /// notifying about a failure must not mask the original error.
    #[instrument(skip(self, message))]
    pub async fn send_error_notification(&self, recipient: &str, message: &str) {
        let text = format!("Calendar automation problem: {message}");
        match tokio::time::timeout(self.send_timeout, self.channel.send(recipient, &text)).await {
            Ok(Ok(true)) => debug!(recipient, "error notification delivered"),
            Ok(Ok(false)) => warn!(recipient, "error notification rejected by channel"),
            Ok(Err(err)) => warn!(recipient, error = %err, "error notification failed"),
            Err(_) => warn!(recipient, "error notification timed out"),
        }
    }

    /// Attempt every recipient regardless of individual failures and
    /// collect all outcomes at a single join point. A timed-out or errored
    /// send counts as a failed recipient, nothing more.
    async fn fan_out(&self, recipients: &[String], text: &str) -> DispatchOutcome {
        let sends = recipients.iter().map(|recipient| async move {
            match tokio::time::timeout(self.send_timeout, self.channel.send(recipient, text)).await
            {
                Ok(Ok(accepted)) => {
                    if !accepted {
                        warn!(recipient, "channel rejected message");
                    }
                    accepted
                }
                Ok(Err(err)) => {
                    warn!(recipient, error = %err, "send failed");
                    false
                }
                Err(_) => {
                    warn!(recipient, timeout = ?self.send_timeout, "send timed out");
                    false
                }
            }
        });

        let results = join_all(sends).await;
        let outcome = DispatchOutcome {
            delivered: results.iter().filter(|ok| **ok).count(),
            attempted: results.len(),
        };

        debug!(ratio = %outcome.ratio(), "fan-out settled");
        outcome
    }
}

/// Render the combined change message. Each change kind carries a distinct
/// marker; additions include the start time.
pub fn render_change_message(changes: &[ChangeRecord], timezone: Tz) -> String {
    let mut out = String::from("Calendar changes detected:\n");

    for change in changes {
        match change {
            ChangeRecord::Added(event) => {
                let when = if event.all_day {
                    format!("{}, all day", event.start_time.with_timezone(&timezone).format("%b %d"))
                } else {
                    event.start_time.with_timezone(&timezone).format("%b %d %H:%M").to_string()
                };
                out.push_str(&format!("+ Added: {} ({when})\n", event.summary));
            }
            ChangeRecord::Modified { current, previous } => {
                if current.status == EventStatus::Cancelled
                    && previous.status != EventStatus::Cancelled
                {
                    out.push_str(&format!("- Cancelled: {}\n", current.summary));
                } else {
                    out.push_str(&format!("~ Updated: {}\n", current.summary));
                }
            }
            ChangeRecord::Deleted(event) => {
                out.push_str(&format!("- Removed: {}\n", event.summary));
            }
        }
    }

    out
}
