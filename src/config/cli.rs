//! Command-line interface definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::constants::{
    DB_PATH, SEMAPHORE_LIMIT, TCP_CONNECT_TIMEOUT_SECS, TLS_HANDSHAKE_TIMEOUT_SECS,
};
use crate::config::types::{Config, LogFormat, LogLevel, VendorSettings};
use crate::policy::Vendor;

/// Checks TLS certificate chains against browser trust policies.
#[derive(Debug, Parser)]
#[command(name = "chain_status", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Log level
    #[arg(long, value_enum, default_value_t = LogLevel::Info, global = true)]
    pub log_level: LogLevel,

    /// Log format
    #[arg(long, value_enum, default_value_t = LogFormat::Plain, global = true)]
    pub log_format: LogFormat,

    /// SQLite database path
    #[arg(long, default_value = DB_PATH, global = true)]
    pub db_path: PathBuf,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Verify one or more hosts and store the results
    Check {
        /// Hosts or URLs to verify
        #[arg(required = true)]
        hosts: Vec<String>,
        #[command(flatten)]
        verify: VerifyArgs,
    },
    /// Verify every host listed in a file (one per line, `#` comments allowed)
    AddFile {
        /// File to read hosts from
        file: PathBuf,
        #[command(flatten)]
        verify: VerifyArgs,
    },
    /// Print all stored results
    List {
        /// Print records as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete all stored results
    Clear,
    /// List the roots a vendor policy trusts
    Roots {
        /// Vendor whose root store to list
        #[arg(value_enum)]
        vendor: Vendor,
        #[command(flatten)]
        stores: TrustStoreArgs,
    },
}

/// Options controlling verification runs.
#[derive(Debug, Args)]
pub struct VerifyArgs {
    /// Maximum concurrent host verifications
    #[arg(long, default_value_t = SEMAPHORE_LIMIT)]
    pub max_concurrency: usize,

    /// TCP connect timeout in seconds
    #[arg(long, default_value_t = TCP_CONNECT_TIMEOUT_SECS)]
    pub connect_timeout: u64,

    /// TLS handshake timeout in seconds
    #[arg(long, default_value_t = TLS_HANDSHAKE_TIMEOUT_SECS)]
    pub handshake_timeout: u64,

    #[command(flatten)]
    pub stores: TrustStoreArgs,
}

/// Per-vendor root bundles and distrust lists.
#[derive(Debug, Args, Default)]
pub struct TrustStoreArgs {
    /// PEM bundle of Firefox roots (defaults to the system CA bundle)
    #[arg(long)]
    pub firefox_roots: Option<PathBuf>,

    /// PEM bundle of Chrome roots (defaults to the system CA bundle)
    #[arg(long)]
    pub chrome_roots: Option<PathBuf>,

    /// PEM bundle of Edge roots (defaults to the system CA bundle)
    #[arg(long)]
    pub edge_roots: Option<PathBuf>,

    /// SHA-256 fingerprint distrusted by the Firefox policy (repeatable)
    #[arg(long = "firefox-distrust")]
    pub firefox_distrust: Vec<String>,

    /// SHA-256 fingerprint distrusted by the Chrome policy (repeatable)
    #[arg(long = "chrome-distrust")]
    pub chrome_distrust: Vec<String>,

    /// SHA-256 fingerprint distrusted by the Edge policy (repeatable)
    #[arg(long = "edge-distrust")]
    pub edge_distrust: Vec<String>,
}

impl Cli {
    /// Builds the library configuration for this invocation.
    pub fn to_config(&self) -> Config {
        let mut config = Config {
            log_level: self.log_level.clone(),
            log_format: self.log_format.clone(),
            db_path: self.db_path.clone(),
            ..Default::default()
        };

        let stores = match &self.command {
            Command::Check { verify, .. } | Command::AddFile { verify, .. } => {
                config.max_concurrency = verify.max_concurrency;
                config.connect_timeout_seconds = verify.connect_timeout;
                config.handshake_timeout_seconds = verify.handshake_timeout;
                Some(&verify.stores)
            }
            Command::Roots { stores, .. } => Some(stores),
            Command::List { .. } | Command::Clear => None,
        };

        if let Some(stores) = stores {
            config.firefox = VendorSettings {
                roots: stores.firefox_roots.clone(),
                distrust: stores.firefox_distrust.clone(),
            };
            config.chrome = VendorSettings {
                roots: stores.chrome_roots.clone(),
                distrust: stores.chrome_distrust.clone(),
            };
            config.edge = VendorSettings {
                roots: stores.edge_roots.clone(),
                distrust: stores.edge_distrust.clone(),
            };
        }

        config
    }
}
