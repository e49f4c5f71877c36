//! Domain data types.

pub mod config;
pub mod event;
pub mod remote;

pub use config::{AutomationStatus, UserAutomationConfig};
pub use event::{CalendarEvent, ChangeKind, ChangeRecord, EventStatus, EventType};
pub use remote::{RawRemoteEvent, RemoteEventTime};
