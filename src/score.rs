//! Trust score aggregation.
//!
//! Collapses a [`VendorVerdict`] into the 0..=3 integer stored per vendor.

use serde::{Deserialize, Serialize};

use crate::error_handling::{DatabaseError, PolicyError};
use crate::policy::VendorVerdict;

/// Trust score for one vendor: 0 not evaluated, 1 untrusted, 2 caution, 3 trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct TrustScore(u8);

impl TrustScore {
    pub const NOT_EVALUATED: TrustScore = TrustScore(0);
    pub const UNTRUSTED: TrustScore = TrustScore(1);
    pub const CAUTION: TrustScore = TrustScore(2);
    pub const TRUSTED: TrustScore = TrustScore(3);

    pub fn value(self) -> u8 {
        self.0
    }
}

impl std::fmt::Display for TrustScore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<i64> for TrustScore {
    type Error = DatabaseError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            0..=3 => Ok(TrustScore(value as u8)),
            _ => Err(DatabaseError::InvalidScore {
                column: "trust",
                value,
            }),
        }
    }
}

impl TryFrom<u8> for TrustScore {
    type Error = DatabaseError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        TrustScore::try_from(i64::from(value))
    }
}

impl From<TrustScore> for u8 {
    fn from(score: TrustScore) -> Self {
        score.0
    }
}

/// Maps a verdict to a score. A missing verdict means the host was never evaluated.
pub fn score(verdict: Option<&VendorVerdict>) -> TrustScore {
    let Some(verdict) = verdict else {
        return TrustScore::NOT_EVALUATED;
    };
    match verdict.error_code {
        None => TrustScore::TRUSTED,
        Some(PolicyError::WeakAlgorithm) | Some(PolicyError::PolicyViolation) => {
            TrustScore::CAUTION
        }
        Some(_) => TrustScore::UNTRUSTED,
    }
}

/// Overall score: the weakest vendor score.
pub fn overall(scores: &[TrustScore]) -> TrustScore {
    scores
        .iter()
        .copied()
        .min()
        .unwrap_or(TrustScore::NOT_EVALUATED)
}
