//! Summary builder.
//!
//! Renders a single day's events into a structured report plus a
//! human-readable text block. Rendering is a pure function of the input:
//! calling it twice with identical events yields byte-identical text, which
//! is what makes the preview-without-side-effects trigger safe.

pub mod free_blocks;

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use cadence_domain::{CadenceError, CalendarEvent, Result};

pub use free_blocks::{compute_free_blocks, FreeBlock};

/// Structured report for one user's calendar day.
#[derive(Debug, Clone)]
pub struct DaySummary {
    date_label: String,
    viewer_name: String,
    timezone: Tz,
    all_day: Vec<CalendarEvent>,
    timed: Vec<CalendarEvent>,
    free_blocks: Vec<FreeBlock>,
}

impl DaySummary {
    /// Build the report for one calendar day.
    ///
    /// `day_start` is local midnight expressed in UTC; the busy/free scan
    /// runs over the fixed window `[day_start, day_start + 23:59:59)`.
    /// Events are expected start-ascending (source order); they are
    /// partitioned into all-day and timed sets, with only the timed set
    /// driving the free-block computation.
    pub fn build(
        events: &[CalendarEvent],
        day_start: DateTime<Utc>,
        timezone: Tz,
        date_label: &str,
        viewer_name: &str,
    ) -> Result<Self> {
        if date_label.trim().is_empty() {
            return Err(CadenceError::InvalidInput("empty day label".to_string()));
        }

        let day_end = day_start + Duration::hours(23) + Duration::minutes(59) + Duration::seconds(59);

        let (all_day, mut timed): (Vec<_>, Vec<_>) =
            events.iter().cloned().partition(|e| e.all_day);
        timed.sort_by_key(|e| e.start_time);

        let free_blocks = compute_free_blocks(&timed, day_start, day_end);

        Ok(Self {
            date_label: date_label.to_string(),
            viewer_name: viewer_name.to_string(),
            timezone,
            all_day,
            timed,
            free_blocks,
        })
    }

    pub fn all_day_events(&self) -> &[CalendarEvent] {
        &self.all_day
    }

    pub fn timed_events(&self) -> &[CalendarEvent] {
        &self.timed
    }

    /// Every computed free block, including sub-threshold ones.
    pub fn free_blocks(&self) -> &[FreeBlock] {
        &self.free_blocks
    }

    /// Render the deterministic text block sent over the message channel.
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "Daily summary for {} - {}\n",
            self.viewer_name, self.date_label
        ));

        if self.all_day.is_empty() && self.timed.is_empty() {
            out.push_str("\nNo events scheduled. The whole day is free.\n");
            return out;
        }

        if !self.all_day.is_empty() {
            out.push_str("\nAll-day:\n");
            for event in &self.all_day {
                out.push_str(&format!("  - {}\n", event.summary));
            }
        }

        if self.timed.is_empty() {
            out.push_str(
                "\nNo timed events on the schedule; outside the all-day items the day is free.\n",
            );
            return out;
        }

        out.push_str("\nSchedule:\n");
        for event in &self.timed {
            out.push_str(&format!(
                "  {} - {}  {} [{}]\n",
                self.local_hhmm(event.start_time),
                self.local_hhmm(event.end_time),
                event.summary,
                event.event_type.label(),
            ));
        }

        let reportable: Vec<&FreeBlock> =
            self.free_blocks.iter().filter(|b| b.is_reportable()).collect();
        if !reportable.is_empty() {
            out.push_str("\nFree time:\n");
            for block in reportable {
                out.push_str(&format!(
                    "  {} - {} ({} min)\n",
                    self.local_hhmm(block.start),
                    self.local_hhmm(block.end),
                    block.duration_minutes(),
                ));
            }
        }

        out
    }

    fn local_hhmm(&self, instant: DateTime<Utc>) -> String {
        instant.with_timezone(&self.timezone).format("%H:%M").to_string()
    }
}
