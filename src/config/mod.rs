//! Application configuration and constants.
//!
//! This module provides:
//! - Configuration constants (timeouts, limits, policy floors)
//! - Library configuration types
//! - CLI option types and parsing

pub mod cli;
mod constants;
mod types;

// Re-export all constants
pub use constants::*;
pub use types::{Config, LogFormat, LogLevel, VendorSettings};
