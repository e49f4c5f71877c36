//! Event categorization heuristics.
//!
//! Scans the lowercased concatenation of summary and description against
//! ordered keyword sets. Work is checked before personal, so a title
//! matching both sets categorizes as work; no match yields `Unknown`.
//! This is a heuristic tag for display grouping, never authoritative.

use crate::constants::{PERSONAL_KEYWORDS, WORK_KEYWORDS};
use crate::types::EventType;

/// Ordered categorization rules. First matching set wins.
const RULES: &[(EventType, &[&str])] =
    &[(EventType::Work, WORK_KEYWORDS), (EventType::Personal, PERSONAL_KEYWORDS)];

/// Categorize an event from its display text.
pub fn categorize_event(summary: &str, description: Option<&str>) -> EventType {
    let mut haystack = summary.to_lowercase();
    if let Some(description) = description {
        haystack.push(' ');
        haystack.push_str(&description.to_lowercase());
    }

    for (event_type, keywords) in RULES {
        if keywords.iter().any(|keyword| haystack.contains(keyword)) {
            return *event_type;
        }
    }

    EventType::Unknown
}
