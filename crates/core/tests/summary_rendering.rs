//! Summary builder rendering tests.

mod support;

use cadence_core::DaySummary;
use cadence_domain::CalendarEvent;
use chrono::{DateTime, Duration, TimeZone, Utc};
use chrono_tz::Tz;
use support::snapshot_event;

const TZ: Tz = chrono_tz::UTC;

fn day_start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 0, 0, 0).unwrap()
}

fn timed(id: &str, summary: &str, start_h: u32, start_m: u32, end_h: u32, end_m: u32) -> CalendarEvent {
    snapshot_event(
        "u1",
        id,
        summary,
        Utc.with_ymd_and_hms(2026, 3, 2, start_h, start_m, 0).unwrap(),
        Utc.with_ymd_and_hms(2026, 3, 2, end_h, end_m, 0).unwrap(),
        day_start() - Duration::days(1),
    )
}

fn all_day(id: &str, summary: &str) -> CalendarEvent {
    let mut event = snapshot_event(
        "u1",
        id,
        summary,
        day_start(),
        day_start() + Duration::days(1),
        day_start() - Duration::days(1),
    );
    event.all_day = true;
    event
}

#[test]
fn rendering_is_idempotent() {
    let events =
        vec![all_day("a1", "Conference"), timed("t1", "Standup", 9, 0, 9, 30)];
    let summary =
        DaySummary::build(&events, day_start(), TZ, "Monday, March 02, 2026", "alice").unwrap();

    let first = summary.render();
    let second = summary.render();
    assert_eq!(first, second);
    assert!(!first.is_empty());
}

#[test]
fn free_blocks_respect_the_fifteen_minute_floor() {
    // 09:00-10:00, 11:00-11:10, 14:00-15:00. Gaps: 60 min (qualifies),
    // 170 min (qualifies), plus the leading and trailing blocks.
    let events = vec![
        timed("t1", "A", 9, 0, 10, 0),
        timed("t2", "B", 11, 0, 11, 10),
        timed("t3", "C", 14, 0, 15, 0),
    ];
    let summary = DaySummary::build(&events, day_start(), TZ, "Monday", "alice").unwrap();
    let text = summary.render();

    assert!(text.contains("00:00 - 09:00"));
    assert!(text.contains("10:00 - 11:00 (60 min)"));
    assert!(text.contains("11:10 - 14:00"));
    assert!(text.contains("15:00 - 23:59"));
}

#[test]
fn fourteen_minute_gap_is_not_rendered_but_fifteen_is() {
    let narrow = vec![timed("t1", "A", 9, 0, 10, 0), timed("t2", "B", 10, 14, 23, 59)];
    let summary = DaySummary::build(&narrow, day_start(), TZ, "Monday", "alice").unwrap();
    assert!(!summary.render().contains("10:00 - 10:14"));
    // The block still exists in the structured data
    assert!(summary.free_blocks().iter().any(|b| b.duration_minutes() == 14));

    let exact = vec![timed("t1", "A", 9, 0, 10, 0), timed("t2", "B", 10, 15, 23, 59)];
    let summary = DaySummary::build(&exact, day_start(), TZ, "Monday", "alice").unwrap();
    assert!(summary.render().contains("10:00 - 10:15 (15 min)"));
}

#[test]
fn zero_event_day_has_its_own_wording() {
    let summary = DaySummary::build(&[], day_start(), TZ, "Monday", "alice").unwrap();
    let text = summary.render();
    assert!(text.contains("No events scheduled. The whole day is free."));
    assert!(!text.contains("Schedule:"));
}

#[test]
fn all_day_only_day_is_worded_distinctly_from_empty() {
    let events = vec![all_day("a1", "Conference")];
    let summary = DaySummary::build(&events, day_start(), TZ, "Monday", "alice").unwrap();
    let text = summary.render();

    assert!(text.contains("All-day:"));
    assert!(text.contains("- Conference"));
    assert!(text.contains("No timed events on the schedule"));
    assert!(!text.contains("No events scheduled. The whole day is free."));
}

#[test]
fn all_day_events_do_not_consume_free_time() {
    let events = vec![all_day("a1", "Conference")];
    let summary = DaySummary::build(&events, day_start(), TZ, "Monday", "alice").unwrap();

    // The whole day remains one free block; all-day items are informational
    assert_eq!(summary.free_blocks().len(), 1);
    assert_eq!(summary.timed_events().len(), 0);
    assert_eq!(summary.all_day_events().len(), 1);
}

#[test]
fn timed_events_render_with_category_labels() {
    let mut event = timed("t1", "Sprint planning", 9, 0, 10, 0);
    event.event_type = cadence_domain::EventType::Work;
    let summary = DaySummary::build(&[event], day_start(), TZ, "Monday", "alice").unwrap();
    assert!(summary.render().contains("09:00 - 10:00  Sprint planning [Work]"));
}

#[test]
fn empty_day_label_is_rejected() {
    assert!(DaySummary::build(&[], day_start(), TZ, "  ", "alice").is_err());
}
