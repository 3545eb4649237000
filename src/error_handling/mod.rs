//! Error handling.
//!
//! This module provides the error taxonomy of the verification engine:
//! - **Input validation**: malformed hosts and empty submissions, rejected before any network activity
//! - **Fetch**: unreachable hosts, timeouts and failed handshakes (score 0 for every vendor)
//! - **Policy**: per-vendor rejection codes carried by stored verdicts
//! - **Infrastructure**: initialization, root store and database failures
//!
//! None of the per-host errors abort a batch.

mod types;

// Re-export public API
pub use types::{
    DatabaseError, FetchError, InitializationError, InputValidationError, ParseError, PolicyError,
    RootStoreError,
};
