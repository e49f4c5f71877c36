//! # Cadence Infrastructure
//!
//! Infrastructure implementations of core domain ports.
//!
//! This crate contains:
//! - Database implementations (SQLite snapshot store)
//! - Cron scheduling for the automation engine
//!
//! ## Architecture
//! - Implements traits defined in `cadence-core`
//! - Depends on `cadence-domain` and `cadence-core`
//! - Contains all "impure" code (I/O, timers)

pub mod database;
pub mod errors;
pub mod scheduling;

// Re-export commonly used items
pub use database::{open_pool, SqlitePool, SqliteSnapshotRepository};
pub use errors::InfraError;
pub use scheduling::{
    AutomationScheduler, AutomationSchedulerConfig, SchedulerError, SchedulerResult,
};
