//! Scheduling infrastructure for automated task execution
//!
//! Cron-based execution of the automation engine with explicit lifecycle
//! management: start/stop, join handles for spawned tasks, cancellation
//! token support, and timeout wrapping on all async operations.

pub mod automation_scheduler;
pub mod error;

pub use automation_scheduler::{AutomationScheduler, AutomationSchedulerConfig};
pub use error::{SchedulerError, SchedulerResult};
