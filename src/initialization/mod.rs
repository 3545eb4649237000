//! Application initialization and resource setup.
//!
//! This module provides functions to initialize the shared resources of a run:
//! - Logger
//! - Concurrency semaphore
//! - Vendor root stores and trust policies
//! - TLS chain fetcher
//! - Registry (database pool + migrations)

mod logger;

use std::sync::Arc;
use std::time::Duration;

use log::info;
use tokio::sync::Semaphore;

use crate::config::{Config, VendorSettings};
use crate::error_handling::{DatabaseError, InitializationError};
use crate::policy::{ChromePolicy, EdgePolicy, FirefoxPolicy, PolicySet, RootStore};
use crate::storage::Registry;
use crate::tls::TlsChainFetcher;

// Re-export public API
pub use logger::init_logger_with;

/// Initializes a semaphore for controlling concurrency.
///
/// Creates a new semaphore with the specified permit count. This semaphore
/// limits the number of hosts whose chains are fetched at the same time.
/// A count of zero is raised to one so a batch can always make progress.
pub fn init_semaphore(count: usize) -> Arc<Semaphore> {
    Arc::new(Semaphore::new(count.max(1)))
}

/// Loads the three vendor policies described by `config`.
///
/// Vendors without an explicit bundle share a single load of the system CA
/// bundle.
pub fn init_policies(config: &Config) -> Result<PolicySet, InitializationError> {
    let mut system: Option<Arc<RootStore>> = None;
    let mut load = |settings: &VendorSettings| -> Result<Arc<RootStore>, InitializationError> {
        match &settings.roots {
            Some(path) => Ok(Arc::new(RootStore::from_pem_file(path)?)),
            None => {
                if let Some(store) = &system {
                    return Ok(Arc::clone(store));
                }
                let store = Arc::new(RootStore::system()?);
                system = Some(Arc::clone(&store));
                Ok(store)
            }
        }
    };

    let firefox = FirefoxPolicy::new(load(&config.firefox)?)
        .with_distrusted(config.firefox.distrust.iter().cloned());
    let chrome = ChromePolicy::new(load(&config.chrome)?)
        .with_distrusted(config.chrome.distrust.iter().cloned());
    let edge = EdgePolicy::new(load(&config.edge)?)
        .with_distrusted(config.edge.distrust.iter().cloned());

    info!(
        "Loaded root stores: Firefox {} roots, Chrome {} roots, Edge {} roots",
        firefox.root_count(),
        chrome.root_count(),
        edge.root_count()
    );

    Ok(PolicySet::new(firefox, chrome, edge))
}

/// Builds the TLS fetcher with the configured timeouts.
pub fn init_fetcher(config: &Config) -> Result<TlsChainFetcher, InitializationError> {
    TlsChainFetcher::new(
        Duration::from_secs(config.connect_timeout_seconds),
        Duration::from_secs(config.handshake_timeout_seconds),
    )
}

/// Opens the registry at the configured database path, applying migrations.
pub async fn init_registry(config: &Config) -> Result<Registry, DatabaseError> {
    Registry::open(&config.db_path).await
}
