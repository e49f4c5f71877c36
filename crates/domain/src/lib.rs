//! # Cadence Domain
//!
//! Business domain types and models for Cadence.
//!
//! This crate contains:
//! - Calendar event and change-record types
//! - Domain error types and Result definitions
//! - User automation configuration structures
//! - Policy constants and categorization heuristics
//!
//! ## Architecture
//! - No dependencies on other Cadence crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures

pub mod constants;
pub mod errors;
pub mod types;
pub mod utils;

// Re-export commonly used items
pub use errors::*;
pub use types::*;
// Re-export categorization utilities
pub use utils::categorizer::categorize_event;
