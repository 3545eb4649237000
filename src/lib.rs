//! chain_status library: multi-vendor TLS chain trust verification
//!
//! This library retrieves the certificate chain a TLS server presents and
//! evaluates it under three independent browser trust policies (Mozilla
//! Firefox, Google Chrome, Microsoft Edge). Each verdict is collapsed into a
//! 0..=3 trust score and persisted per host in a SQLite registry together with
//! the annotated chain.
//!
//! # Example
//!
//! ```no_run
//! use chain_status::{Config, Verifier};
//! use tokio_util::sync::CancellationToken;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config {
//!     max_concurrency: 10,
//!     ..Default::default()
//! };
//!
//! let verifier = Verifier::from_config(&config).await?;
//! let hosts = vec!["example.com".to_string(), "https://www.rust-lang.org/".to_string()];
//! let report = verifier.submit(&hosts, &CancellationToken::new()).await?;
//! println!("Stored {} hosts (errors: {})", report.inserted, report.had_errors);
//!
//! for record in verifier.registry().get_all().await? {
//!     println!("{}: trust {}", record.host, record.trust);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Requirements
//!
//! This library requires a Tokio runtime. Use `#[tokio::main]` in your application
//! or ensure you're calling library functions within an async context.

pub mod certificate;
pub mod config;
pub mod error_handling;
pub mod host;
pub mod initialization;
pub mod policy;
pub mod score;
pub mod storage;
pub mod tls;
pub mod verify;

// Re-export public API
pub use certificate::{Certificate, Chain};
pub use config::{Config, LogFormat, LogLevel};
pub use error_handling::{FetchError, InputValidationError, PolicyError};
pub use policy::{PolicySet, TrustPolicy, Vendor, VendorVerdict};
pub use score::TrustScore;
pub use storage::{Registry, UrlRecord};
pub use tls::{ChainFetcher, TlsChainFetcher};
pub use verify::{AddUrlRequest, HostFailure, SubmitReport, Verifier};
