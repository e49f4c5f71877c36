//! Busy/free partitioning of a day.

use chrono::{DateTime, Utc};
use cadence_domain::constants::MIN_FREE_BLOCK_MINUTES;
use cadence_domain::CalendarEvent;

/// A contiguous span of the day with no timed event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreeBlock {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl FreeBlock {
    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }

    /// True when the block is long enough to be worth showing to a reader.
    /// Shorter blocks still exist in the data, they are just not rendered.
    pub fn is_reportable(&self) -> bool {
        self.duration_minutes() >= MIN_FREE_BLOCK_MINUTES
    }
}

/// Compute every free block across `[day_start, day_end)` from timed events
/// sorted by start time ascending.
///
/// Cursor scan: a gap before an event's start emits a block, then the
/// cursor advances to the furthest end seen so far (overlapping events
/// never move it backwards). A trailing gap after the last event emits a
/// final block. No minimum-duration filter is applied here.
pub fn compute_free_blocks(
    timed: &[CalendarEvent],
    day_start: DateTime<Utc>,
    day_end: DateTime<Utc>,
) -> Vec<FreeBlock> {
    let mut blocks = Vec::new();
    let mut cursor = day_start;

    for event in timed {
        if cursor < event.start_time {
            blocks.push(FreeBlock { start: cursor, end: event.start_time });
        }
        cursor = cursor.max(event.end_time);
    }

    if cursor < day_end {
        blocks.push(FreeBlock { start: cursor, end: day_end });
    }

    blocks
}
