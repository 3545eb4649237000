//! Browser trust policies.
//!
//! A [`TrustPolicy`] is a vendor root store plus supplemental rules. Evaluating
//! a [`Chain`] under a policy yields a [`VendorVerdict`]; evaluation is a pure
//! function of the chain, the requested host, the policy and the instant `now`.
//!
//! Validation runs four steps in order and stops at the first failure:
//! 1. Chain linkage to a trusted, non-distrusted root
//! 2. Validity window of every certificate
//! 3. Hostname match against the leaf
//! 4. Policy constraints (algorithm strength, key size, distrust, name
//!    constraints, vendor-specific leaf rules)

mod evaluate;
mod hostname;
mod root_store;
mod vendors;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use strum_macros::EnumIter;

use crate::certificate::{Certificate, Chain};
use crate::error_handling::PolicyError;

pub use hostname::matches_hostname;
pub use root_store::{RootInfo, RootStore};
pub use vendors::{ChromePolicy, EdgePolicy, FirefoxPolicy, PolicyConfig};

/// Browser vendor whose trust policy is applied.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ValueEnum, EnumIter,
)]
#[serde(rename_all = "lowercase")]
pub enum Vendor {
    Firefox,
    Chrome,
    Edge,
}

impl Vendor {
    /// All vendors in evaluation order.
    pub const ALL: [Vendor; 3] = [Vendor::Firefox, Vendor::Chrome, Vendor::Edge];

    pub fn display_name(&self) -> &'static str {
        match self {
            Vendor::Firefox => "Mozilla Firefox",
            Vendor::Chrome => "Google Chrome",
            Vendor::Edge => "Microsoft Edge",
        }
    }
}

impl std::fmt::Display for Vendor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Validation step a certificate failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationStep {
    Linkage,
    Validity,
    Hostname,
    Policy,
}

/// A chain certificate together with the step it failed, if any.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotatedCertificate {
    #[serde(flatten)]
    pub certificate: Certificate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_step: Option<ValidationStep>,
}

/// Outcome of evaluating one chain under one vendor policy.
///
/// `authorized` is true exactly when `error_code` is `None`; use
/// [`VendorVerdict::authorized`] and [`VendorVerdict::rejected`] to build one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VendorVerdict {
    pub vendor: Vendor,
    pub authorized: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<PolicyError>,
    #[serde(rename = "certs")]
    pub annotated_chain: Vec<AnnotatedCertificate>,
    /// Fingerprint of the root that anchored the chain
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trust_anchor: Option<String>,
    pub evaluated_at: DateTime<Utc>,
}

impl VendorVerdict {
    pub fn authorized(
        vendor: Vendor,
        annotated_chain: Vec<AnnotatedCertificate>,
        trust_anchor: Option<String>,
        evaluated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            vendor,
            authorized: true,
            error_code: None,
            annotated_chain,
            trust_anchor,
            evaluated_at,
        }
    }

    pub fn rejected(
        vendor: Vendor,
        error_code: PolicyError,
        annotated_chain: Vec<AnnotatedCertificate>,
        trust_anchor: Option<String>,
        evaluated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            vendor,
            authorized: false,
            error_code: Some(error_code),
            annotated_chain,
            trust_anchor,
            evaluated_at,
        }
    }
}

/// Capability shared by the vendor policies.
pub trait TrustPolicy: Send + Sync + std::fmt::Debug {
    fn vendor(&self) -> Vendor;

    fn config(&self) -> &PolicyConfig;

    fn root_store(&self) -> &RootStore;

    /// Evaluates `chain` for `host` at instant `now`.
    fn evaluate(&self, chain: &Chain, host: &str, now: DateTime<Utc>) -> VendorVerdict {
        evaluate::evaluate_chain(
            self.vendor(),
            chain,
            host,
            self.root_store(),
            self.config(),
            now,
        )
    }
}

/// The fixed, ordered set of vendor policies (Firefox, Chrome, Edge).
#[derive(Debug, Clone)]
pub struct PolicySet {
    policies: [Arc<dyn TrustPolicy>; 3],
}

impl PolicySet {
    pub fn new(firefox: FirefoxPolicy, chrome: ChromePolicy, edge: EdgePolicy) -> Self {
        Self {
            policies: [Arc::new(firefox), Arc::new(chrome), Arc::new(edge)],
        }
    }

    /// Policies in evaluation order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn TrustPolicy>> {
        self.policies.iter()
    }

    pub fn get(&self, vendor: Vendor) -> &Arc<dyn TrustPolicy> {
        match vendor {
            Vendor::Firefox => &self.policies[0],
            Vendor::Chrome => &self.policies[1],
            Vendor::Edge => &self.policies[2],
        }
    }
}

/// Canonical form of a SHA-256 fingerprint: uppercase hex pairs joined by colons.
///
/// Accepts input with or without separators (`:`, spaces).
pub fn normalize_fingerprint(fingerprint: &str) -> String {
    let hex: Vec<char> = fingerprint
        .chars()
        .filter(|c| c.is_ascii_hexdigit())
        .map(|c| c.to_ascii_uppercase())
        .collect();
    hex.chunks(2)
        .map(|pair| pair.iter().collect::<String>())
        .collect::<Vec<_>>()
        .join(":")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_fingerprint() {
        assert_eq!(normalize_fingerprint("ab:cd:ef"), "AB:CD:EF");
        assert_eq!(normalize_fingerprint("abcdef"), "AB:CD:EF");
        assert_eq!(normalize_fingerprint(" AB CD EF "), "AB:CD:EF");
    }

    #[test]
    fn test_vendor_display_names() {
        assert_eq!(Vendor::Firefox.to_string(), "Mozilla Firefox");
        assert_eq!(Vendor::Chrome.to_string(), "Google Chrome");
        assert_eq!(Vendor::Edge.to_string(), "Microsoft Edge");
    }

    #[test]
    fn test_vendor_order() {
        use strum::IntoEnumIterator;
        let order: Vec<Vendor> = Vendor::iter().collect();
        assert_eq!(order, Vendor::ALL.to_vec());
    }
}
