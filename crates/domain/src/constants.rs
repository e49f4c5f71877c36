//! Policy constants shared across the engine.
//!
//! The debounce window and free-block floor are fixed policy values, not
//! per-user settings. Changing them is a product decision, so they live here
//! rather than in `UserAutomationConfig`.

/// Minimum gap between a stored and a fresh remote timestamp before a change
/// is even considered for content comparison. Remote providers routinely
/// touch internal timestamps without any content change.
pub const DEBOUNCE_WINDOW_MINUTES: i64 = 5;

/// Free blocks shorter than this are computed but excluded from rendered
/// summaries.
pub const MIN_FREE_BLOCK_MINUTES: i64 = 15;

/// Cron expression for the global change-detection sweep across all enabled
/// users (every five minutes).
pub const CHANGE_POLL_CRON: &str = "0 */5 * * * *";

/// Substituted for a missing remote event summary. Stored summaries are
/// never empty.
pub const NO_TITLE_PLACEHOLDER: &str = "No Title";

/// Keywords indicating a work event. Checked before the personal set, so a
/// title matching both categorizes as work.
pub const WORK_KEYWORDS: &[&str] = &[
    "meeting",
    "standup",
    "stand-up",
    "sync",
    "review",
    "1:1",
    "one-on-one",
    "interview",
    "demo",
    "retro",
    "planning",
    "sprint",
    "client",
    "deadline",
    "presentation",
    "workshop",
];

/// Keywords indicating a personal event.
pub const PERSONAL_KEYWORDS: &[&str] = &[
    "birthday",
    "doctor",
    "dentist",
    "gym",
    "workout",
    "lunch with",
    "dinner with",
    "vacation",
    "holiday",
    "family",
    "anniversary",
    "appointment",
];
