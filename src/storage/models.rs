// storage/models.rs
// Registry row types

use serde::{Deserialize, Serialize};

use crate::policy::VendorVerdict;
use crate::score::{overall, score, TrustScore};

/// A stored verification result, one per normalized host.
///
/// Serialized field names follow the read contract (`trustEdge`, `chainEdge`, ...).
/// Chain columns are `None` when the host could not be fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UrlRecord {
    pub id: i64,
    pub host: String,
    pub tls: bool,
    pub trust: TrustScore,
    pub trust_edge: TrustScore,
    pub trust_chrome: TrustScore,
    pub trust_firefox: TrustScore,
    pub chain_edge: Option<VendorVerdict>,
    pub chain_chrome: Option<VendorVerdict>,
    pub chain_firefox: Option<VendorVerdict>,
    pub updated_at_ms: i64,
}

/// Values written by one upsert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlUpsert {
    pub host: String,
    pub tls: bool,
    pub trust: TrustScore,
    pub trust_edge: TrustScore,
    pub trust_chrome: TrustScore,
    pub trust_firefox: TrustScore,
    pub chain_edge: Option<VendorVerdict>,
    pub chain_chrome: Option<VendorVerdict>,
    pub chain_firefox: Option<VendorVerdict>,
    pub updated_at_ms: i64,
}

impl UrlUpsert {
    /// Scores the three verdicts and derives the overall score.
    pub fn from_verdicts(
        host: String,
        tls: bool,
        firefox: Option<VendorVerdict>,
        chrome: Option<VendorVerdict>,
        edge: Option<VendorVerdict>,
        updated_at_ms: i64,
    ) -> Self {
        let trust_firefox = score(firefox.as_ref());
        let trust_chrome = score(chrome.as_ref());
        let trust_edge = score(edge.as_ref());
        Self {
            host,
            tls,
            trust: overall(&[trust_firefox, trust_chrome, trust_edge]),
            trust_edge,
            trust_chrome,
            trust_firefox,
            chain_edge: edge,
            chain_chrome: chrome,
            chain_firefox: firefox,
            updated_at_ms,
        }
    }

    /// A host whose chain could not be fetched: score 0 everywhere, no chains.
    pub fn not_evaluated(host: String, tls: bool, updated_at_ms: i64) -> Self {
        Self::from_verdicts(host, tls, None, None, None, updated_at_ms)
    }
}
