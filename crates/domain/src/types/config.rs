//! Per-user automation configuration.
//!
//! Owned by the user-configuration collaborator; the engine reads it fresh
//! at every firing instead of trusting a stale capture.

use serde::{Deserialize, Serialize};

use crate::errors::{CadenceError, Result};

/// Automation settings for one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAutomationConfig {
    pub user_id: String,
    pub enabled: bool,
    /// Local wall-clock time of the daily summary, "HH:MM".
    pub daily_summary_time: String,
    /// IANA timezone name, e.g. "Europe/Berlin".
    pub timezone: String,
    /// Outbound message recipients.
    pub recipients: Vec<String>,
}

impl UserAutomationConfig {
    /// Parse `daily_summary_time` into `(hour, minute)`.
    pub fn summary_time(&self) -> Result<(u32, u32)> {
        parse_summary_time(&self.daily_summary_time)
    }
}

/// Validate and split an "HH:MM" wall-clock string.
pub fn parse_summary_time(raw: &str) -> Result<(u32, u32)> {
    let (hour, minute) = raw.split_once(':').ok_or_else(|| {
        CadenceError::InvalidInput(format!("daily summary time '{raw}' is not HH:MM"))
    })?;

    let hour: u32 = hour
        .parse()
        .map_err(|_| CadenceError::InvalidInput(format!("invalid hour in '{raw}'")))?;
    let minute: u32 = minute
        .parse()
        .map_err(|_| CadenceError::InvalidInput(format!("invalid minute in '{raw}'")))?;

    if hour > 23 || minute > 59 {
        return Err(CadenceError::InvalidInput(format!(
            "daily summary time '{raw}' is out of range"
        )));
    }

    Ok((hour, minute))
}

/// Observational automation state for one user, as reported by the
/// scheduler's `status` operation. No side effects are implied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutomationStatus {
    pub enabled: bool,
    pub daily_summary_time: String,
    pub timezone: String,
    /// A per-user daily summary job is currently registered.
    pub job_active: bool,
    /// The global change-detection sweep is currently registered.
    pub change_detection_active: bool,
}
