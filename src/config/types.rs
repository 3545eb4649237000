//! Configuration types.
//!
//! This module defines the enums and structs used for library configuration.
//! The CLI in [`super::cli`] maps onto these.

use std::path::PathBuf;

use clap::ValueEnum;

use crate::config::constants::{
    DB_PATH, SEMAPHORE_LIMIT, TCP_CONNECT_TIMEOUT_SECS, TLS_HANDSHAKE_TIMEOUT_SECS,
};

/// Logging level for the application.
///
/// Controls the verbosity of log output, from most restrictive (Error) to most
/// verbose (Trace).
#[derive(Clone, Debug, ValueEnum)]
pub enum LogLevel {
    /// Only error messages
    Error,
    /// Error and warning messages
    Warn,
    /// Error, warning, and informational messages
    Info,
    /// All messages except trace
    Debug,
    /// All messages including trace
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(l: LogLevel) -> Self {
        match l {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Log output format.
///
/// - `Plain`: Human-readable format with colors (default)
/// - `Json`: Structured JSON format for machine parsing
#[derive(Clone, Debug, ValueEnum)]
pub enum LogFormat {
    /// Human-readable format with colors (default)
    Plain,
    /// Structured JSON format for machine parsing
    Json,
}

/// Root store and distrust settings for one vendor policy.
#[derive(Debug, Clone, Default)]
pub struct VendorSettings {
    /// PEM bundle of trusted roots; the system CA bundle is used when unset
    pub roots: Option<PathBuf>,
    /// SHA-256 fingerprints of explicitly distrusted certificates
    pub distrust: Vec<String>,
}

/// Library configuration (no CLI dependencies).
///
/// # Examples
///
/// ```no_run
/// use chain_status::Config;
/// use std::path::PathBuf;
///
/// let config = Config {
///     db_path: PathBuf::from("trust.db"),
///     max_concurrency: 10,
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// Log level
    pub log_level: LogLevel,

    /// Log format
    pub log_format: LogFormat,

    /// Database path (SQLite file)
    pub db_path: PathBuf,

    /// Maximum concurrent host verifications
    pub max_concurrency: usize,

    /// TCP connect timeout in seconds
    pub connect_timeout_seconds: u64,

    /// TLS handshake timeout in seconds
    pub handshake_timeout_seconds: u64,

    /// Mozilla Firefox policy settings
    pub firefox: VendorSettings,

    /// Google Chrome policy settings
    pub chrome: VendorSettings,

    /// Microsoft Edge policy settings
    pub edge: VendorSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            log_format: LogFormat::Plain,
            db_path: PathBuf::from(DB_PATH),
            max_concurrency: SEMAPHORE_LIMIT,
            connect_timeout_seconds: TCP_CONNECT_TIMEOUT_SECS,
            handshake_timeout_seconds: TLS_HANDSHAKE_TIMEOUT_SECS,
            firefox: VendorSettings::default(),
            chrome: VendorSettings::default(),
            edge: VendorSettings::default(),
        }
    }
}
