// Shared test helpers: certificate hierarchies, canned fetchers and registries.
//
// This module provides common utilities used across multiple test files to reduce duplication.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{Datelike, Utc};
use rcgen::{BasicConstraints, CertificateParams, DnType, IsCa, KeyPair};
use sqlx::sqlite::SqlitePoolOptions;

use chain_status::certificate::parse_der;
use chain_status::policy::{ChromePolicy, EdgePolicy, FirefoxPolicy, RootStore};
use chain_status::{ChainFetcher, FetchError, PolicySet, Registry, Verifier};

/// Creates a registry on an in-memory database with migrations applied.
///
/// In-memory SQLite databases are per connection, so the pool holds exactly one.
#[allow(dead_code)] // Used by other test files
pub async fn create_test_registry() -> Registry {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create test database pool");
    Registry::with_pool(Arc::new(pool))
        .await
        .expect("Failed to run migrations")
}

/// Sets the validity window to the given day offsets from now.
fn set_validity(params: &mut CertificateParams, from_days: i64, to_days: i64) {
    let from = Utc::now() + chrono::Duration::days(from_days);
    let to = Utc::now() + chrono::Duration::days(to_days);
    params.not_before = rcgen::date_time_ymd(from.year(), from.month() as u8, from.day() as u8);
    params.not_after = rcgen::date_time_ymd(to.year(), to.month() as u8, to.day() as u8);
}

struct Issuer {
    cert: rcgen::Certificate,
    key: KeyPair,
}

fn ca_params(cn: &str) -> CertificateParams {
    let mut params = CertificateParams::new(Vec::<String>::new()).expect("CA params");
    params.distinguished_name = rcgen::DistinguishedName::new();
    params.distinguished_name.push(DnType::CommonName, cn);
    params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
    set_validity(&mut params, -365, 3650);
    params
}

/// A root and intermediate CA able to mint leaf chains.
pub struct TestPki {
    root: Issuer,
    intermediate: Issuer,
}

#[allow(dead_code)] // Used by other test files
impl TestPki {
    pub fn new() -> Self {
        let root_key = KeyPair::generate().expect("root key");
        let root_cert = ca_params("Test Root CA")
            .self_signed(&root_key)
            .expect("root cert");
        let root = Issuer {
            cert: root_cert,
            key: root_key,
        };

        let intermediate_key = KeyPair::generate().expect("intermediate key");
        let intermediate_cert = ca_params("Test Intermediate CA")
            .signed_by(&intermediate_key, &root.cert, &root.key)
            .expect("intermediate cert");

        Self {
            root,
            intermediate: Issuer {
                cert: intermediate_cert,
                key: intermediate_key,
            },
        }
    }

    /// Leaf-first DER chain (leaf, intermediate) valid from 30 days ago for 90 days.
    pub fn chain_for(&self, names: &[&str]) -> Vec<Vec<u8>> {
        self.chain_with_validity(names, -30, 60)
    }

    /// Leaf-first DER chain with the leaf valid between the given day offsets from now.
    pub fn chain_with_validity(&self, names: &[&str], from_days: i64, to_days: i64) -> Vec<Vec<u8>> {
        let leaf = self.leaf_signed_by(names, from_days, to_days, &self.intermediate);
        vec![leaf, self.intermediate.cert.der().to_vec()]
    }

    /// Leaf-first DER chain whose intermediate expired `days_ago` days ago. The leaf itself is current.
    pub fn chain_with_expired_intermediate(&self, names: &[&str], days_ago: i64) -> Vec<Vec<u8>> {
        let mut params = ca_params("Test Expired Intermediate CA");
        set_validity(&mut params, -400, -days_ago);
        let key = KeyPair::generate().expect("intermediate key");
        let intermediate = Issuer {
            cert: params
                .signed_by(&key, &self.root.cert, &self.root.key)
                .expect("intermediate cert"),
            key,
        };
        let leaf = self.leaf_signed_by(names, -30, 60, &intermediate);
        vec![leaf, intermediate.cert.der().to_vec()]
    }

    fn leaf_signed_by(&self, names: &[&str], from_days: i64, to_days: i64, issuer: &Issuer) -> Vec<u8> {
        let names: Vec<String> = names.iter().map(|n| n.to_string()).collect();
        let mut params = CertificateParams::new(names).expect("leaf params");
        params.distinguished_name = rcgen::DistinguishedName::new();
        params.distinguished_name.push(DnType::CommonName, "Test Leaf");
        set_validity(&mut params, from_days, to_days);
        let key = KeyPair::generate().expect("leaf key");
        params
            .signed_by(&key, &issuer.cert, &issuer.key)
            .expect("leaf cert")
            .der()
            .to_vec()
    }

    pub fn root_pem(&self) -> String {
        self.root.cert.pem()
    }

    pub fn root_fingerprint(&self) -> String {
        parse_der(self.root.cert.der(), 0)
            .expect("root parses")
            .fingerprint
    }

    pub fn root_store(&self) -> Arc<RootStore> {
        let root = parse_der(self.root.cert.der(), 0).expect("root parses");
        Arc::new(RootStore::from_certificates(vec![root]))
    }

    /// Firefox, Chrome and Edge policies all trusting this PKI's root.
    pub fn policies(&self) -> PolicySet {
        let roots = self.root_store();
        PolicySet::new(
            FirefoxPolicy::new(Arc::clone(&roots)),
            ChromePolicy::new(Arc::clone(&roots)),
            EdgePolicy::new(roots),
        )
    }
}

/// Fetcher serving canned chains by host. Unknown hosts are unreachable.
#[derive(Clone, Default)]
pub struct FakeFetcher {
    responses: Arc<HashMap<String, Result<Vec<Vec<u8>>, FetchError>>>,
    delay: Duration,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
    calls: Arc<AtomicUsize>,
}

#[allow(dead_code)] // Used by other test files
impl FakeFetcher {
    pub fn new(responses: Vec<(&str, Vec<Vec<u8>>)>) -> Self {
        let responses = responses
            .into_iter()
            .map(|(host, chain)| (host.to_string(), Ok(chain)))
            .collect();
        Self {
            responses: Arc::new(responses),
            ..Default::default()
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ChainFetcher for FakeFetcher {
    fn fetch(
        &self,
        host: &str,
        port: u16,
    ) -> impl Future<Output = Result<Vec<Vec<u8>>, FetchError>> + Send {
        let response = self.responses.get(host).cloned().unwrap_or_else(|| {
            Err(FetchError::Unreachable {
                host: host.to_string(),
                port,
                reason: "failed to lookup address information".to_string(),
            })
        });
        let delay = self.delay;
        let in_flight = Arc::clone(&self.in_flight);
        let max_in_flight = Arc::clone(&self.max_in_flight);
        let calls = Arc::clone(&self.calls);

        async move {
            calls.fetch_add(1, Ordering::SeqCst);
            let current = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            max_in_flight.fetch_max(current, Ordering::SeqCst);
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            in_flight.fetch_sub(1, Ordering::SeqCst);
            response
        }
    }
}

/// A verifier over `fetcher`, trusting `pki`'s root, backed by an in-memory registry.
#[allow(dead_code)] // Used by other test files
pub async fn create_test_verifier(
    pki: &TestPki,
    fetcher: FakeFetcher,
    max_concurrency: usize,
) -> Verifier<FakeFetcher> {
    Verifier::new(
        fetcher,
        pki.policies(),
        create_test_registry().await,
        max_concurrency,
    )
}
