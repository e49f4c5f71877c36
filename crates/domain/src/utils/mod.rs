//! Domain utilities.

pub mod categorizer;
