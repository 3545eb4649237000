//! Error type definitions.
//!
//! This module defines all error types used throughout the application, from
//! input validation through fetching, parsing, policy evaluation and storage.

use log::SetLoggerError;
use serde::{Deserialize, Serialize};
use strum_macros::EnumIter as EnumIterMacro;
use thiserror::Error;

use crate::config::MAX_HOST_INPUT_LENGTH;

/// Error types for initialization failures.
#[derive(Error, Debug)]
#[allow(clippy::enum_variant_names)] // All variants end with "Error" by convention
pub enum InitializationError {
    /// Error initializing the logger.
    #[error("Logger initialization error: {0}")]
    LoggerError(#[from] SetLoggerError),

    /// Error building the TLS client configuration.
    #[error("TLS client initialization error: {0}")]
    TlsClientError(#[from] rustls::Error),

    /// Error loading a vendor root store.
    #[error("Root store initialization error: {0}")]
    RootStoreError(#[from] RootStoreError),
}

/// Error types for database operations.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Error creating the database file.
    #[error("Database file creation error: {0}")]
    FileCreationError(String),

    /// SQL execution error.
    #[error("SQL error: {0}")]
    SqlError(#[from] sqlx::Error),

    /// Migration error.
    #[error("Migration error: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),

    /// A stored verdict could not be encoded or decoded.
    #[error("Verdict serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// A stored score column held a value outside 0..=3.
    #[error("Invalid trust score in column {column}: {value}")]
    InvalidScore {
        /// Column the value was read from
        column: &'static str,
        /// The offending value
        value: i64,
    },

    /// A stored verdict whose `authorized` flag disagrees with its error code.
    #[error("Inconsistent verdict in column {0}: authorized must be set exactly when there is no error code")]
    InconsistentVerdict(&'static str),
}

/// Rejections raised while normalizing submitted hosts, before any network activity.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InputValidationError {
    /// Neither a host nor a batch file was supplied, or the batch held no hosts.
    #[error("Submission contains no hosts")]
    EmptySubmission,

    /// The host string was blank.
    #[error("Host is empty")]
    EmptyHost,

    /// The input exceeded the maximum accepted length.
    #[error("Input exceeds maximum length ({0} > {MAX_HOST_INPUT_LENGTH})")]
    TooLong(usize),

    /// The URL used a scheme other than http or https.
    #[error("Unsupported scheme: {0}")]
    UnsupportedScheme(String),

    /// The input could not be parsed as a host or URL.
    #[error("Invalid host or URL: {0}")]
    InvalidHost(String),
}

/// Failures retrieving a certificate chain from a live server.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// DNS resolution failed or the connection was refused.
    #[error("{host}:{port} is unreachable: {reason}")]
    Unreachable {
        /// Host that was contacted
        host: String,
        /// Port that was contacted
        port: u16,
        /// Underlying cause
        reason: String,
    },

    /// Connecting or handshaking took longer than the configured timeout.
    #[error("{stage} timeout for {host}:{port} ({secs}s)")]
    Timeout {
        /// Host that was contacted
        host: String,
        /// Port that was contacted
        port: u16,
        /// Which stage timed out ("TCP connect" or "TLS handshake")
        stage: &'static str,
        /// Timeout that elapsed, in seconds
        secs: u64,
    },

    /// The TLS handshake failed or produced no usable certificate chain.
    #[error("TLS handshake failed for {host}:{port}: {reason}")]
    HandshakeFailed {
        /// Host that was contacted
        host: String,
        /// Port that was contacted
        port: u16,
        /// Underlying cause
        reason: String,
    },
}

impl FetchError {
    /// Short machine-readable name of the failure kind.
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Unreachable { .. } => "UNREACHABLE",
            FetchError::Timeout { .. } => "TIMEOUT",
            FetchError::HandshakeFailed { .. } => "HANDSHAKE_FAILED",
        }
    }
}

/// Failures decoding certificates.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// A chain must contain at least one certificate.
    #[error("Certificate chain is empty")]
    EmptyChain,

    /// DER decoding failed.
    #[error("Failed to parse certificate at position {index}: {reason}")]
    InvalidCertificate {
        /// Position in the chain (leaf = 0)
        index: usize,
        /// Decoder message
        reason: String,
    },

    /// The certificate's notBefore is later than its notAfter.
    #[error("Certificate at position {index} has notBefore after notAfter")]
    InvalidValidity {
        /// Position in the chain (leaf = 0)
        index: usize,
    },

    /// A PEM block could not be decoded.
    #[error("Invalid PEM data: {0}")]
    InvalidPem(String),
}

/// Failures loading a vendor root store.
#[derive(Error, Debug)]
pub enum RootStoreError {
    /// The bundle file could not be read.
    #[error("Failed to read root bundle {path}: {source}")]
    Io {
        /// Path of the bundle
        path: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// A certificate in the bundle could not be parsed.
    #[error("Failed to parse root bundle: {0}")]
    Parse(#[from] ParseError),

    /// No system CA bundle was found in any of the known locations.
    #[error("No system CA bundle found")]
    NoSystemBundle,
}

/// Reasons a chain was rejected by a trust policy.
///
/// Serialized with their stable wire names (e.g. `CHAIN_BROKEN`) so stored
/// verdicts stay readable by any consumer.
#[derive(
    Error, Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIterMacro, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PolicyError {
    /// A certificate is not signed by the next one in the chain.
    #[error("certificate chain is broken")]
    ChainBroken,
    /// The chain does not end at a trusted root, or the root is distrusted.
    #[error("chain does not terminate at a trusted root")]
    UntrustedRoot,
    /// A certificate's notAfter is in the past.
    #[error("certificate has expired")]
    CertExpired,
    /// A certificate's notBefore is in the future.
    #[error("certificate is not yet valid")]
    CertNotYetValid,
    /// The leaf does not cover the requested host.
    #[error("certificate does not match the requested host")]
    HostnameMismatch,
    /// A signature algorithm or key is below the policy's strength floor.
    #[error("weak signature algorithm or key")]
    WeakAlgorithm,
    /// Another policy constraint was violated.
    #[error("policy constraint violated")]
    PolicyViolation,
}

impl PolicyError {
    /// Stable wire name of the error code.
    pub fn code(&self) -> &'static str {
        match self {
            PolicyError::ChainBroken => "CHAIN_BROKEN",
            PolicyError::UntrustedRoot => "UNTRUSTED_ROOT",
            PolicyError::CertExpired => "CERT_EXPIRED",
            PolicyError::CertNotYetValid => "CERT_NOT_YET_VALID",
            PolicyError::HostnameMismatch => "HOSTNAME_MISMATCH",
            PolicyError::WeakAlgorithm => "WEAK_ALGORITHM",
            PolicyError::PolicyViolation => "POLICY_VIOLATION",
        }
    }
}
