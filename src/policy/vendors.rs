//! The three vendor policies and their rule sets.
//!
//! Each policy pairs a root store with a [`PolicyConfig`]. The defaults are
//! illustrative rule sets modelled on each vendor's public requirements, not a
//! reproduction of their root programs.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::certificate::WEAK_SIGNATURE_ALGORITHMS;
use crate::config::{CHROME_MAX_LEAF_VALIDITY_DAYS, MIN_EC_KEY_BITS, MIN_RSA_KEY_BITS};

use super::{normalize_fingerprint, RootStore, TrustPolicy, Vendor};

/// Supplemental rules applied on top of chain linkage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyConfig {
    /// Minimum RSA modulus size in bits
    pub min_rsa_bits: u32,
    /// Minimum elliptic-curve key size in bits
    pub min_ec_bits: u32,
    /// Signature algorithm OIDs rejected as weak
    pub disallowed_signature_algorithms: Vec<String>,
    /// Check leaf DNS names against CA name constraints
    pub enforce_name_constraints: bool,
    /// SHA-256 fingerprints of distrusted certificates, compared after normalization
    pub distrusted: BTreeSet<String>,
    /// Match the subject CN when the leaf has no DNS SANs
    pub allow_cn_fallback: bool,
    /// Maximum leaf lifetime in days
    pub max_leaf_validity_days: Option<i64>,
    /// Reject leaves whose EKU extension lacks serverAuth
    pub require_server_auth_eku: bool,
}

impl PolicyConfig {
    /// Strength floor shared by every vendor: 2048-bit RSA, 256-bit EC, and no
    /// MD2, MD4, MD5 or SHA-1 signatures.
    fn baseline() -> Self {
        Self {
            min_rsa_bits: MIN_RSA_KEY_BITS,
            min_ec_bits: MIN_EC_KEY_BITS,
            disallowed_signature_algorithms: WEAK_SIGNATURE_ALGORITHMS
                .iter()
                .map(|oid| oid.to_string())
                .collect(),
            enforce_name_constraints: false,
            distrusted: BTreeSet::new(),
            allow_cn_fallback: false,
            max_leaf_validity_days: None,
            require_server_auth_eku: false,
        }
    }

    /// Firefox: enforces name constraints.
    pub fn firefox() -> Self {
        Self {
            enforce_name_constraints: true,
            ..Self::baseline()
        }
    }

    /// Chrome: caps leaf lifetime at 398 days.
    pub fn chrome() -> Self {
        Self {
            max_leaf_validity_days: Some(CHROME_MAX_LEAF_VALIDITY_DAYS),
            ..Self::baseline()
        }
    }

    /// Edge: requires serverAuth when EKU is present.
    pub fn edge() -> Self {
        Self {
            require_server_auth_eku: true,
            ..Self::baseline()
        }
    }

    /// Separators and case are ignored on both sides.
    pub fn is_distrusted(&self, fingerprint: &str) -> bool {
        let fingerprint = normalize_fingerprint(fingerprint);
        self.distrusted
            .iter()
            .any(|entry| normalize_fingerprint(entry) == fingerprint)
    }

    pub fn is_disallowed_signature(&self, oid: &str) -> bool {
        self.disallowed_signature_algorithms
            .iter()
            .any(|disallowed| disallowed == oid)
    }
}

macro_rules! vendor_policy {
    ($(#[$meta:meta])* $name:ident, $vendor:expr, $defaults:path) => {
        $(#[$meta])*
        #[derive(Debug, Clone)]
        pub struct $name {
            roots: Arc<RootStore>,
            config: PolicyConfig,
        }

        impl $name {
            /// Policy with the vendor's default rules over `roots`.
            pub fn new(roots: Arc<RootStore>) -> Self {
                Self::with_config(roots, $defaults())
            }

            pub fn with_config(roots: Arc<RootStore>, config: PolicyConfig) -> Self {
                Self { roots, config }
            }

            /// Adds fingerprints to the distrust list. Separators and case are ignored.
            pub fn with_distrusted(mut self, fingerprints: impl IntoIterator<Item = String>) -> Self {
                self.config
                    .distrusted
                    .extend(fingerprints.into_iter().map(|fp| normalize_fingerprint(&fp)));
                self
            }

            pub fn root_count(&self) -> usize {
                self.roots.len()
            }
        }

        impl TrustPolicy for $name {
            fn vendor(&self) -> Vendor {
                $vendor
            }

            fn config(&self) -> &PolicyConfig {
                &self.config
            }

            fn root_store(&self) -> &RootStore {
                &self.roots
            }
        }
    };
}

vendor_policy!(
    /// Mozilla Firefox trust policy.
    FirefoxPolicy,
    Vendor::Firefox,
    PolicyConfig::firefox
);

vendor_policy!(
    /// Google Chrome trust policy.
    ChromePolicy,
    Vendor::Chrome,
    PolicyConfig::chrome
);

vendor_policy!(
    /// Microsoft Edge trust policy.
    EdgePolicy,
    Vendor::Edge,
    PolicyConfig::edge
);
