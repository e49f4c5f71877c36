//! Event normalizer.
//!
//! Maps one raw remote event into the canonical `CalendarEvent` shape prior
//! to diffing and storage. Pure transform apart from the fallback to "now"
//! when the provider sends no last-modified timestamp.

use chrono::Utc;
use cadence_domain::constants::NO_TITLE_PLACEHOLDER;
use cadence_domain::{
    categorize_event, CadenceError, CalendarEvent, EventStatus, RawRemoteEvent, RemoteEventTime,
    Result,
};

/// Normalize a raw remote event into a `CalendarEvent` for `user_id`.
///
/// - `all_day` is true iff neither boundary carries a time-of-day component.
/// - A missing summary becomes a fixed placeholder; stored summaries are
///   never empty.
/// - Unrecognized remote statuses default to confirmed.
/// - `start > end` is rejected at this boundary rather than producing
///   nonsensical downstream output.
pub fn normalize_event(user_id: &str, raw: &RawRemoteEvent) -> Result<CalendarEvent> {
    let all_day = raw.start.is_date_only() && raw.end.is_date_only();

    let start_time = resolve_boundary(&raw.start, &raw.id, "start")?;
    let end_time = resolve_boundary(&raw.end, &raw.id, "end")?;

    if start_time > end_time {
        return Err(CadenceError::InvalidInput(format!(
            "event '{}' has start after end ({start_time} > {end_time})",
            raw.id
        )));
    }

    let summary = match raw.summary.as_deref().map(str::trim) {
        Some(s) if !s.is_empty() => s.to_string(),
        _ => NO_TITLE_PLACEHOLDER.to_string(),
    };

    let event_type = categorize_event(&summary, raw.description.as_deref());
    let status = EventStatus::from_remote(raw.status.as_deref());

    Ok(CalendarEvent {
        user_id: user_id.to_string(),
        event_id: raw.id.clone(),
        summary,
        description: raw.description.clone(),
        location: raw.location.clone(),
        start_time,
        end_time,
        all_day,
        event_type,
        status,
        attendees: raw.attendees.iter().cloned().collect(),
        last_modified: raw.updated.unwrap_or_else(Utc::now),
    })
}

fn resolve_boundary(
    boundary: &RemoteEventTime,
    event_id: &str,
    field: &str,
) -> Result<chrono::DateTime<Utc>> {
    if let Some(date_time) = boundary.date_time {
        return Ok(date_time);
    }

    if let Some(date) = boundary.date {
        let midnight = date.and_hms_opt(0, 0, 0).ok_or_else(|| {
            CadenceError::InvalidInput(format!(
                "event '{event_id}' {field} date '{date}' has no midnight"
            ))
        })?;
        return Ok(midnight.and_utc());
    }

    Err(CadenceError::InvalidInput(format!(
        "event '{event_id}' {field} carries neither dateTime nor date"
    )))
}
