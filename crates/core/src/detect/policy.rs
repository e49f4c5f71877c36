//! Materiality policy primitives.
//!
//! The detector composes these two pure predicates (currently AND) at its
//! call site, so the policy stays visible and swappable without touching
//! the detection plumbing.

use chrono::Duration;
use cadence_domain::constants::DEBOUNCE_WINDOW_MINUTES;
use cadence_domain::CalendarEvent;

/// True when a remote timestamp advance is large enough to consider the
/// event for content comparison. Sub-threshold deltas are treated as
/// metadata churn.
pub fn exceeds_debounce_window(delta: Duration) -> bool {
    delta > Duration::minutes(DEBOUNCE_WINDOW_MINUTES)
}

/// Field-level content comparison across the fields a user actually sees:
/// summary, description, location, start, end, status. Attendee churn and
/// the derived category tag are deliberately not compared.
pub fn contents_differ(a: &CalendarEvent, b: &CalendarEvent) -> bool {
    a.summary != b.summary
        || a.description != b.description
        || a.location != b.location
        || a.start_time != b.start_time
        || a.end_time != b.end_time
        || a.status != b.status
}
