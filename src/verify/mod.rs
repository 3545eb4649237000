//! Verification orchestrator.
//!
//! Drives a batch of host submissions through normalization, chain retrieval,
//! the three vendor evaluations and the registry upsert. Hosts run in parallel
//! under a semaphore; each host is fetched once, evaluated by every policy on
//! blocking worker threads over a shared [`Chain`], and written exactly once.

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use futures::stream::FuturesUnordered;
use futures::StreamExt;
use log::{debug, info, warn};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::certificate::Chain;
use crate::config::Config;
use crate::error_handling::{FetchError, InputValidationError};
use crate::host::{normalize_host, parse_batch, HostTarget};
use crate::initialization::{init_fetcher, init_policies, init_registry, init_semaphore};
use crate::policy::{PolicySet, RootInfo, Vendor, VendorVerdict};
use crate::storage::{Registry, UrlUpsert};
use crate::tls::{ChainFetcher, TlsChainFetcher};

/// Failure kind for submissions rejected before any network activity.
pub const INVALID_INPUT: &str = "INVALID_INPUT";
/// Failure kind for hosts whose result could not be persisted.
pub const DATABASE_ERROR: &str = "DATABASE_ERROR";

/// A per-host problem reported back to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HostFailure {
    /// The submission as given, or the normalized host key once known
    pub input: String,
    /// `INVALID_INPUT`, a fetch kind (`UNREACHABLE`, ...), a policy code, or `DATABASE_ERROR`
    pub kind: String,
    pub message: String,
}

/// Outcome of one submission batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitReport {
    /// Rows written, including hosts stored with score 0
    pub inserted: usize,
    /// True if any host was malformed, unreachable, rejected by a vendor, or not stored
    pub had_errors: bool,
    pub failures: Vec<HostFailure>,
    /// Hosts skipped or dropped because the batch was cancelled
    pub cancelled: usize,
}

/// Request shape of the `addUrl` operation. At least one field must be set.
#[derive(Debug, Clone, Default)]
pub struct AddUrlRequest {
    pub host_or_url: Option<String>,
    /// Batch file content, one host or URL per line
    pub hosts_or_urls_file: Option<String>,
}

/// Result of verifying one host.
struct HostOutcome {
    stored: bool,
    failure: Option<HostFailure>,
}

/// Resources shared by every host task of a batch.
struct Shared<F> {
    fetcher: F,
    policies: PolicySet,
    registry: Registry,
}

/// Runs host submissions through fetch, evaluation and persistence.
pub struct Verifier<F> {
    shared: Arc<Shared<F>>,
    max_concurrency: usize,
}

impl<F> Clone for Verifier<F> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            max_concurrency: self.max_concurrency,
        }
    }
}

impl Verifier<TlsChainFetcher> {
    /// Builds a verifier from configuration: loads root stores, builds the
    /// TLS fetcher and opens the registry.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let policies = init_policies(config).context("Failed to load trust policies")?;
        let fetcher = init_fetcher(config).context("Failed to initialize TLS client")?;
        let registry = init_registry(config)
            .await
            .context("Failed to initialize registry")?;
        Ok(Self::new(fetcher, policies, registry, config.max_concurrency))
    }
}

impl<F> Verifier<F>
where
    F: ChainFetcher + 'static,
{
    pub fn new(fetcher: F, policies: PolicySet, registry: Registry, max_concurrency: usize) -> Self {
        Self {
            shared: Arc::new(Shared {
                fetcher,
                policies,
                registry,
            }),
            max_concurrency,
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.shared.registry
    }

    pub fn policies(&self) -> &PolicySet {
        &self.shared.policies
    }

    /// Roots trusted by `vendor`, sorted by name.
    pub fn trust_store_info(&self, vendor: Vendor) -> Vec<RootInfo> {
        self.shared.policies.get(vendor).root_store().info()
    }

    /// Handles an `addUrl` request: a single host, batch file content, or both.
    ///
    /// # Errors
    ///
    /// Returns [`InputValidationError::EmptySubmission`] when neither input is
    /// set or together they contain no hosts.
    pub async fn add_url(
        &self,
        request: AddUrlRequest,
        cancel: &CancellationToken,
    ) -> Result<SubmitReport, InputValidationError> {
        let mut inputs = Vec::new();
        if let Some(host) = request.host_or_url {
            inputs.push(host);
        }
        if let Some(content) = request.hosts_or_urls_file {
            inputs.extend(parse_batch(&content));
        }
        self.submit(&inputs, cancel).await
    }

    /// Verifies and stores every submitted host.
    ///
    /// Submissions are normalized and deduplicated first; invalid ones are
    /// reported and never touch the network. Each remaining host gets exactly
    /// one registry upsert. Cancelling `cancel` stops new hosts from starting
    /// and drops in-flight hosts before their write; finished hosts stay stored.
    ///
    /// # Errors
    ///
    /// Returns [`InputValidationError::EmptySubmission`] for an empty batch.
    pub async fn submit(
        &self,
        inputs: &[String],
        cancel: &CancellationToken,
    ) -> Result<SubmitReport, InputValidationError> {
        if inputs.is_empty() {
            return Err(InputValidationError::EmptySubmission);
        }

        let mut report = SubmitReport::default();
        let mut seen = HashSet::new();
        let mut targets = Vec::new();
        for input in inputs {
            match normalize_host(input) {
                Ok(target) => {
                    if seen.insert(target.key()) {
                        targets.push(target);
                    } else {
                        debug!("Skipping duplicate submission {input}");
                    }
                }
                Err(e) => {
                    warn!("Skipping invalid submission {input:?}: {e}");
                    report.had_errors = true;
                    report.failures.push(HostFailure {
                        input: input.clone(),
                        kind: INVALID_INPUT.to_string(),
                        message: e.to_string(),
                    });
                }
            }
        }
        info!(
            "Verifying {} host(s) ({} invalid submission(s))",
            targets.len(),
            report.failures.len()
        );

        let semaphore = init_semaphore(self.max_concurrency);
        let mut tasks = FuturesUnordered::new();
        let total = targets.len();
        let mut started = 0usize;

        for target in targets {
            let permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                permit = Arc::clone(&semaphore).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => {
                        warn!("Semaphore closed, skipping host: {target}");
                        break;
                    }
                },
            };
            started += 1;

            let shared = Arc::clone(&self.shared);
            let cancel = cancel.clone();
            tasks.push(tokio::spawn(async move {
                let _permit = permit;
                verify_host(shared, target, cancel).await
            }));
        }
        report.cancelled += total - started;

        while let Some(joined) = tasks.next().await {
            match joined {
                Ok(Some(outcome)) => {
                    if outcome.stored {
                        report.inserted += 1;
                    }
                    if let Some(failure) = outcome.failure {
                        report.had_errors = true;
                        report.failures.push(failure);
                    }
                }
                Ok(None) => report.cancelled += 1,
                Err(e) => {
                    warn!("Host task failed: {e}");
                    report.had_errors = true;
                }
            }
        }

        if report.cancelled > 0 {
            warn!("Batch cancelled: {} host(s) not stored", report.cancelled);
        }
        info!(
            "Stored {} host(s), {} failure(s)",
            report.inserted,
            report.failures.len()
        );
        Ok(report)
    }
}

/// What fetch and evaluation produced for one host.
enum Evaluation {
    Verdicts([Option<VendorVerdict>; 3]),
    Unfetchable(FetchError),
}

async fn fetch_and_evaluate<F: ChainFetcher>(shared: &Shared<F>, target: &HostTarget) -> Evaluation {
    let ders = match shared.fetcher.fetch(&target.host, target.port).await {
        Ok(ders) => ders,
        Err(e) => return Evaluation::Unfetchable(e),
    };
    let chain = match Chain::from_der(&ders) {
        Ok(chain) => Arc::new(chain),
        Err(e) => {
            return Evaluation::Unfetchable(FetchError::HandshakeFailed {
                host: target.host.clone(),
                port: target.port,
                reason: format!("unusable certificate chain: {e}"),
            })
        }
    };

    // One instant for all three vendors
    let now = Utc::now();
    let handles: Vec<_> = shared
        .policies
        .iter()
        .map(|policy| {
            let policy = Arc::clone(policy);
            let chain = Arc::clone(&chain);
            let host = target.host.clone();
            tokio::task::spawn_blocking(move || policy.evaluate(&chain, &host, now))
        })
        .collect();

    let mut verdicts: [Option<VendorVerdict>; 3] = [None, None, None];
    for joined in futures::future::join_all(handles).await {
        match joined {
            Ok(verdict) => {
                let slot = match verdict.vendor {
                    Vendor::Firefox => 0,
                    Vendor::Chrome => 1,
                    Vendor::Edge => 2,
                };
                verdicts[slot] = Some(verdict);
            }
            Err(e) => warn!("Evaluation task for {target} failed: {e}"),
        }
    }
    Evaluation::Verdicts(verdicts)
}

fn policy_failure(key: &str, verdicts: &[Option<VendorVerdict>; 3]) -> Option<HostFailure> {
    let rejections: Vec<String> = Vendor::ALL
        .iter()
        .zip(verdicts)
        .filter_map(|(vendor, verdict)| match verdict {
            Some(v) if v.authorized => None,
            Some(v) => Some(format!(
                "{}: {}",
                vendor,
                v.error_code.map(|c| c.code()).unwrap_or("REJECTED")
            )),
            None => Some(format!("{}: not evaluated", vendor)),
        })
        .collect();
    if rejections.is_empty() {
        return None;
    }
    let kind = verdicts
        .iter()
        .flatten()
        .find_map(|v| v.error_code)
        .map(|code| code.code().to_string())
        .unwrap_or_else(|| "NOT_EVALUATED".to_string());
    Some(HostFailure {
        input: key.to_string(),
        kind,
        message: rejections.join(", "),
    })
}

/// Verifies one host. Returns `None` if cancelled before the write.
async fn verify_host<F: ChainFetcher>(
    shared: Arc<Shared<F>>,
    target: HostTarget,
    cancel: CancellationToken,
) -> Option<HostOutcome> {
    let key = target.key();
    let evaluation = tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            debug!("Dropping in-flight host {key}");
            return None;
        }
        evaluation = fetch_and_evaluate(&shared, &target) => evaluation,
    };

    let updated_at_ms = Utc::now().timestamp_millis();
    let (upsert, failure) = match evaluation {
        Evaluation::Unfetchable(e) => {
            warn!("{key}: {e}");
            let failure = HostFailure {
                input: key.clone(),
                kind: e.kind().to_string(),
                message: e.to_string(),
            };
            (
                UrlUpsert::not_evaluated(key.clone(), target.tls, updated_at_ms),
                Some(failure),
            )
        }
        Evaluation::Verdicts(verdicts) => {
            let failure = policy_failure(&key, &verdicts);
            let [firefox, chrome, edge] = verdicts;
            (
                UrlUpsert::from_verdicts(key.clone(), target.tls, firefox, chrome, edge, updated_at_ms),
                failure,
            )
        }
    };

    match shared.registry.upsert(&upsert).await {
        Ok(_) => {
            info!(
                "{key}: trust={} (firefox={}, chrome={}, edge={})",
                upsert.trust, upsert.trust_firefox, upsert.trust_chrome, upsert.trust_edge
            );
            Some(HostOutcome {
                stored: true,
                failure,
            })
        }
        Err(e) => {
            warn!("Failed to store {key}: {e}");
            Some(HostOutcome {
                stored: false,
                failure: Some(HostFailure {
                    input: key,
                    kind: DATABASE_ERROR.to_string(),
                    message: e.to_string(),
                }),
            })
        }
    }
}
