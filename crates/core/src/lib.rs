//! # Cadence Core
//!
//! Pure business logic layer - no infrastructure dependencies.
//!
//! This crate contains:
//! - The reconciliation engine (normalizer, change detector, summary builder)
//! - Port/adapter interfaces (traits) for external collaborators
//! - The notification dispatcher and the automation trigger surface
//!
//! ## Architecture Principles
//! - Only depends on `cadence-domain`
//! - No database, HTTP, or transport code
//! - All external collaborators consumed via traits
//! - Pure, testable business logic

pub mod automation;
pub mod detect;
pub mod normalize;
pub mod notify;
pub mod ports;
pub mod summary;

// Re-export specific items to avoid ambiguity
pub use automation::{AutomationEngine, ChangeCheckReport, EngineConfig, SummaryReport, TriggerOutcome};
pub use detect::{ChangeDetector, TimeWindow};
pub use normalize::normalize_event;
pub use notify::{DispatchOutcome, NotificationDispatcher};
pub use ports::{EventSource, MessageChannel, SnapshotRepository, UserConfigSource};
pub use summary::{DaySummary, FreeBlock};
