//! Chain evaluation under a single policy configuration.

use chrono::{DateTime, Utc};
use log::debug;
use x509_parser::error::X509Error;
use x509_parser::prelude::*;

use super::hostname::leaf_matches;
use super::{
    AnnotatedCertificate, PolicyConfig, RootStore, ValidationStep, Vendor, VendorVerdict,
};
use crate::certificate::{Certificate, Chain, KeyAlgorithm};
use crate::error_handling::PolicyError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SignatureCheck {
    Valid,
    Invalid,
    /// The algorithm is not implemented by the verifier. Weak algorithms are
    /// rejected later by the policy step.
    Unsupported,
}

fn check_signature(child: &Certificate, issuer: &Certificate) -> SignatureCheck {
    let (Ok((_, child)), Ok((_, issuer))) = (
        X509Certificate::from_der(child.der()),
        X509Certificate::from_der(issuer.der()),
    ) else {
        return SignatureCheck::Invalid;
    };
    match child.verify_signature(Some(issuer.public_key())) {
        Ok(()) => SignatureCheck::Valid,
        Err(X509Error::SignatureUnsupportedAlgorithm) => SignatureCheck::Unsupported,
        Err(_) => SignatureCheck::Invalid,
    }
}

fn signed_by(child: &Certificate, issuer: &Certificate) -> bool {
    child.is_issued_by_name(issuer) && check_signature(child, issuer) != SignatureCheck::Invalid
}

/// Result of walking the presented chain towards a root.
enum Linkage<'a> {
    Anchored {
        anchor: &'a Certificate,
        /// Position of the last presented certificate taking part in the chain
        top: usize,
        /// Whether `top` is itself the anchor
        presented_anchor: bool,
    },
    Broken(usize),
    Untrusted(usize),
}

fn link<'a>(certs: &'a [Certificate], roots: &'a RootStore) -> Linkage<'a> {
    for (i, cert) in certs.iter().enumerate() {
        if let Some(root) = roots.get(&cert.fingerprint) {
            return Linkage::Anchored {
                anchor: root,
                top: i,
                presented_anchor: true,
            };
        }
        if let Some(root) = roots.candidate_issuers(cert).find(|root| signed_by(cert, root)) {
            return Linkage::Anchored {
                anchor: root,
                top: i,
                presented_anchor: false,
            };
        }
        match certs.get(i + 1) {
            Some(next) if next.is_ca && signed_by(cert, next) => continue,
            Some(_) => return Linkage::Broken(i),
            // Reached a root nobody trusts
            None if cert.is_self_issued() => return Linkage::Untrusted(i),
            // Issuer missing from both the chain and the store
            None => return Linkage::Broken(i),
        }
    }
    Linkage::Broken(certs.len().saturating_sub(1))
}

fn is_weak_key(cert: &Certificate, config: &PolicyConfig) -> bool {
    match (&cert.public_key.algorithm, cert.public_key.bits) {
        (KeyAlgorithm::Rsa, Some(bits)) => bits < config.min_rsa_bits,
        (KeyAlgorithm::Ec, Some(bits)) => bits < config.min_ec_bits,
        _ => false,
    }
}

fn canonical_dns(name: &str) -> String {
    name.trim_end_matches('.').to_ascii_lowercase()
}

/// Whether `name` lies within the DNS subtree `constraint`.
fn within_subtree(name: &str, constraint: &str) -> bool {
    let name = canonical_dns(name);
    let name = name.strip_prefix("*.").unwrap_or(&name);
    let constraint = canonical_dns(constraint);
    let constraint = constraint.trim_start_matches('.');
    if constraint.is_empty() {
        return true;
    }
    name == constraint || name.ends_with(&format!(".{}", constraint))
}

fn violates_name_constraints<'a>(
    leaf: &Certificate,
    issuers: impl Iterator<Item = &'a Certificate>,
) -> bool {
    let names: Vec<&str> = leaf.dns_names().collect();
    if names.is_empty() {
        return false;
    }
    for constraints in issuers.filter_map(|cert| cert.name_constraints.as_ref()) {
        for name in &names {
            if !constraints.permitted_dns.is_empty()
                && !constraints
                    .permitted_dns
                    .iter()
                    .any(|permitted| within_subtree(name, permitted))
            {
                return true;
            }
            if constraints
                .excluded_dns
                .iter()
                .any(|excluded| within_subtree(name, excluded))
            {
                return true;
            }
        }
    }
    false
}

fn offenders(certs: &[Certificate], mut failed: impl FnMut(&Certificate) -> bool) -> Vec<usize> {
    certs
        .iter()
        .enumerate()
        .filter(|(_, cert)| failed(cert))
        .map(|(index, _)| index)
        .collect()
}

/// First failing policy rule over the certificates below the anchor, with the
/// positions it tags.
fn policy_failure(
    config: &PolicyConfig,
    below_anchor: &[Certificate],
    anchor: &Certificate,
) -> Option<(PolicyError, Vec<usize>)> {
    let weak_signature = offenders(below_anchor, |cert| {
        config.is_disallowed_signature(&cert.signature_algorithm.oid)
    });
    if !weak_signature.is_empty() {
        return Some((PolicyError::WeakAlgorithm, weak_signature));
    }

    let weak_key = offenders(below_anchor, |cert| is_weak_key(cert, config));
    if !weak_key.is_empty() {
        return Some((PolicyError::WeakAlgorithm, weak_key));
    }

    let distrusted = offenders(below_anchor, |cert| config.is_distrusted(&cert.fingerprint));
    if !distrusted.is_empty() {
        return Some((PolicyError::PolicyViolation, distrusted));
    }

    // Remaining rules apply to the leaf only
    let (leaf, issuers) = below_anchor.split_first()?;
    let leaf_violation = (config.enforce_name_constraints
        && violates_name_constraints(leaf, issuers.iter().chain(std::iter::once(anchor))))
        || config
            .max_leaf_validity_days
            .is_some_and(|max| leaf.lifetime_days() > max)
        || (config.require_server_auth_eku && leaf.server_auth_eku == Some(false));
    leaf_violation.then(|| (PolicyError::PolicyViolation, vec![0]))
}

/// Accumulates per-certificate failure tags.
struct Annotations {
    steps: Vec<Option<ValidationStep>>,
}

impl Annotations {
    fn new(len: usize) -> Self {
        Self {
            steps: vec![None; len],
        }
    }

    fn tag(&mut self, index: usize, step: ValidationStep) {
        if let Some(slot) = self.steps.get_mut(index) {
            *slot = Some(step);
        }
    }

    fn into_chain(self, chain: &Chain) -> Vec<AnnotatedCertificate> {
        chain
            .certificates()
            .iter()
            .cloned()
            .zip(self.steps)
            .map(|(certificate, failed_step)| AnnotatedCertificate {
                certificate,
                failed_step,
            })
            .collect()
    }
}

/// Runs the four validation steps and stops at the first failing one.
fn validate(
    chain: &Chain,
    host: &str,
    roots: &RootStore,
    config: &PolicyConfig,
    now: DateTime<Utc>,
    annotations: &mut Annotations,
    trust_anchor: &mut Option<String>,
) -> Result<(), PolicyError> {
    let certs = chain.certificates();

    // 1. Linkage
    let (anchor, top, presented_anchor) = match link(certs, roots) {
        Linkage::Anchored {
            anchor,
            top,
            presented_anchor,
        } => (anchor, top, presented_anchor),
        Linkage::Broken(index) => {
            annotations.tag(index, ValidationStep::Linkage);
            return Err(PolicyError::ChainBroken);
        }
        Linkage::Untrusted(index) => {
            annotations.tag(index, ValidationStep::Linkage);
            return Err(PolicyError::UntrustedRoot);
        }
    };
    *trust_anchor = Some(anchor.fingerprint.clone());
    if config.is_distrusted(&anchor.fingerprint) {
        annotations.tag(top, ValidationStep::Linkage);
        return Err(PolicyError::UntrustedRoot);
    }

    // Certificates below the anchor
    let below_anchor = if presented_anchor {
        &certs[..top]
    } else {
        &certs[..=top]
    };

    // 2. Validity, over everything the server presented
    let mut validity_error = None;
    for (index, cert) in certs.iter().enumerate() {
        let error = if now < cert.valid_from {
            PolicyError::CertNotYetValid
        } else if now > cert.valid_to {
            PolicyError::CertExpired
        } else {
            continue;
        };
        annotations.tag(index, ValidationStep::Validity);
        validity_error.get_or_insert(error);
    }
    if let Some(error) = validity_error {
        return Err(error);
    }

    // 3. Hostname
    if !leaf_matches(chain.leaf(), host, config.allow_cn_fallback) {
        annotations.tag(0, ValidationStep::Hostname);
        return Err(PolicyError::HostnameMismatch);
    }

    // 4. Policy
    if let Some((error, offending)) = policy_failure(config, below_anchor, anchor) {
        for index in offending {
            annotations.tag(index, ValidationStep::Policy);
        }
        return Err(error);
    }

    Ok(())
}

/// Evaluates `chain` for `host` under one vendor's root store and rules.
pub(crate) fn evaluate_chain(
    vendor: Vendor,
    chain: &Chain,
    host: &str,
    roots: &RootStore,
    config: &PolicyConfig,
    now: DateTime<Utc>,
) -> VendorVerdict {
    let mut annotations = Annotations::new(chain.len());
    let mut trust_anchor = None;
    let outcome = validate(
        chain,
        host,
        roots,
        config,
        now,
        &mut annotations,
        &mut trust_anchor,
    );
    let annotated = annotations.into_chain(chain);

    match outcome {
        Ok(()) => {
            debug!("{}: chain for {} authorized", vendor, host);
            VendorVerdict::authorized(vendor, annotated, trust_anchor, now)
        }
        Err(error) => {
            debug!("{}: chain for {} rejected: {}", vendor, host, error.code());
            VendorVerdict::rejected(vendor, error, annotated, trust_anchor, now)
        }
    }
}
