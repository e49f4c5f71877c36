//! Provider-shaped representation of a remote event, prior to
//! normalization.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Remote start/end boundary. Providers send either a timed `date_time` or a
/// date-only `date`; the two are mutually exclusive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteEventTime {
    #[serde(default, rename = "dateTime")]
    pub date_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub date: Option<NaiveDate>,
}

impl RemoteEventTime {
    pub fn timed(date_time: DateTime<Utc>) -> Self {
        Self { date_time: Some(date_time), date: None }
    }

    pub fn all_day(date: NaiveDate) -> Self {
        Self { date_time: None, date: Some(date) }
    }

    /// True when this boundary carries no time-of-day component.
    pub fn is_date_only(&self) -> bool {
        self.date_time.is_none() && self.date.is_some()
    }
}

/// One raw event as returned by the remote event source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRemoteEvent {
    pub id: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    pub start: RemoteEventTime,
    pub end: RemoteEventTime,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub attendees: Vec<String>,
    /// Provider-side last-modified timestamp.
    #[serde(default)]
    pub updated: Option<DateTime<Utc>>,
}
