//! Configuration constants.
//!
//! This module defines the constants used throughout the application,
//! including timeouts, limits and default paths.

/// Maximum concurrent host verifications (semaphore limit)
pub const SEMAPHORE_LIMIT: usize = 30;
pub const DB_PATH: &str = "./chain_status.db";

// Network operation timeouts
/// TCP connection timeout in seconds (includes DNS resolution)
pub const TCP_CONNECT_TIMEOUT_SECS: u64 = 5;
/// TLS handshake timeout in seconds
pub const TLS_HANDSHAKE_TIMEOUT_SECS: u64 = 5;

/// Port used when a submission does not name one
pub const DEFAULT_TLS_PORT: u16 = 443;

/// Maximum submitted host/URL length (2048 characters), matching common browser limits
pub const MAX_HOST_INPUT_LENGTH: usize = 2048;

// Policy defaults shared by the vendor policies
/// Minimum RSA modulus size in bits
pub const MIN_RSA_KEY_BITS: u32 = 2048;
/// Minimum elliptic-curve key size in bits
pub const MIN_EC_KEY_BITS: u32 = 256;
/// Maximum leaf certificate lifetime accepted by the Chrome policy
pub const CHROME_MAX_LEAF_VALIDITY_DAYS: i64 = 398;
