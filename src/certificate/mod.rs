//! Parsed certificate records.
//!
//! Decodes raw DER (or PEM) certificates into immutable [`Certificate`] records
//! and groups them into a leaf-first [`Chain`]. Everything here is derived from
//! the encoded bytes alone; no trust judgment is made.
//!
//! Uses `x509-parser` for decoding and `sha2` for fingerprints.

mod extract;
mod parse;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error_handling::ParseError;

pub use extract::{
    OID_DSA_WITH_SHA1, OID_ECDSA_WITH_SHA1, OID_MD2_WITH_RSA, OID_MD4_WITH_RSA, OID_MD5_WITH_RSA,
    OID_SHA1_WITH_RSA, OID_SHA1_WITH_RSA_OIW, WEAK_SIGNATURE_ALGORITHMS,
};
pub use parse::{fingerprint, parse_der, parse_pem_bundle};

/// One attribute of a distinguished name, e.g. `CN=example.com`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnAttribute {
    /// Short attribute name (`CN`, `O`, ...) or dotted OID when unknown
    #[serde(rename = "type")]
    pub kind: String,
    /// Attribute value
    pub value: String,
}

/// Structured distinguished name, attributes in encoded order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DistinguishedName {
    pub attributes: Vec<DnAttribute>,
}

impl DistinguishedName {
    /// First value of the given attribute type.
    pub fn get(&self, kind: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.kind == kind)
            .map(|a| a.value.as_str())
    }

    /// The common name, if present.
    pub fn common_name(&self) -> Option<&str> {
        self.get("CN")
    }

    /// Short human-readable label: CN, then O, then OU.
    pub fn display_name(&self) -> String {
        self.get("CN")
            .or_else(|| self.get("O"))
            .or_else(|| self.get("OU"))
            .unwrap_or("Unknown")
            .to_string()
    }
}

impl std::fmt::Display for DistinguishedName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self
            .attributes
            .iter()
            .map(|a| format!("{}={}", a.kind, a.value))
            .collect();
        f.write_str(&parts.join(", "))
    }
}

/// Family of a subject public key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyAlgorithm {
    Rsa,
    Ec,
    Ed25519,
    Ed448,
    Other(String),
}

/// Subject public key: algorithm, size and key material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKeyInfo {
    pub algorithm: KeyAlgorithm,
    /// Key size in bits, when it can be determined
    pub bits: Option<u32>,
    /// Base64 of the subjectPublicKey bit string
    pub material: String,
}

/// Signature algorithm used by the issuer to sign this certificate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureAlgorithm {
    pub name: String,
    pub oid: String,
}

/// Subject alternative name entries relevant to server authentication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum SubjectAltName {
    Dns(String),
    Ip(String),
}

/// DNS name constraints carried by a CA certificate.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NameConstraints {
    pub permitted_dns: Vec<String>,
    pub excluded_dns: Vec<String>,
}

/// A parsed X.509 certificate.
///
/// The raw DER and the encoded issuer/subject names are kept for signature and
/// linkage checks but are not serialized; `pem` carries the canonical encoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Certificate {
    pub subject: DistinguishedName,
    pub issuer: DistinguishedName,
    /// Serial number, uppercase hex
    pub serial: String,
    pub valid_from: DateTime<Utc>,
    pub valid_to: DateTime<Utc>,
    pub public_key: PublicKeyInfo,
    pub signature_algorithm: SignatureAlgorithm,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subject_alt_names: Vec<SubjectAltName>,
    pub is_ca: bool,
    /// `None` when the certificate has no extended key usage extension
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_auth_eku: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_constraints: Option<NameConstraints>,
    /// SHA-256 of the DER encoding, colon-separated uppercase hex
    pub fingerprint: String,
    pub pem: String,
    #[serde(skip)]
    pub(crate) der: Vec<u8>,
    #[serde(skip)]
    pub(crate) subject_raw: Vec<u8>,
    #[serde(skip)]
    pub(crate) issuer_raw: Vec<u8>,
}

impl Certificate {
    /// DER encoding. Empty for records decoded from storage.
    pub fn der(&self) -> &[u8] {
        &self.der
    }

    /// Whether subject and issuer names are byte-identical.
    pub fn is_self_issued(&self) -> bool {
        self.subject_raw == self.issuer_raw
    }

    /// Whether `issuer`'s subject is this certificate's issuer name.
    pub fn is_issued_by_name(&self, issuer: &Certificate) -> bool {
        self.issuer_raw == issuer.subject_raw
    }

    /// DNS names from the subject alternative name extension.
    pub fn dns_names(&self) -> impl Iterator<Item = &str> {
        self.subject_alt_names.iter().filter_map(|san| match san {
            SubjectAltName::Dns(name) => Some(name.as_str()),
            SubjectAltName::Ip(_) => None,
        })
    }

    /// IP addresses from the subject alternative name extension.
    pub fn ip_addresses(&self) -> impl Iterator<Item = &str> {
        self.subject_alt_names.iter().filter_map(|san| match san {
            SubjectAltName::Ip(ip) => Some(ip.as_str()),
            SubjectAltName::Dns(_) => None,
        })
    }

    /// Whole days between notBefore and notAfter.
    pub fn lifetime_days(&self) -> i64 {
        (self.valid_to - self.valid_from).num_days()
    }
}

/// Certificates as presented by a server, leaf first. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Chain(Vec<Certificate>);

impl Chain {
    /// Wraps already parsed certificates.
    pub fn new(certificates: Vec<Certificate>) -> Result<Self, ParseError> {
        if certificates.is_empty() {
            return Err(ParseError::EmptyChain);
        }
        Ok(Self(certificates))
    }

    /// Parses a leaf-first list of DER certificates.
    pub fn from_der<B: AsRef<[u8]>>(ders: &[B]) -> Result<Self, ParseError> {
        let certificates = ders
            .iter()
            .enumerate()
            .map(|(index, der)| parse_der(der.as_ref(), index))
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(certificates)
    }

    pub fn leaf(&self) -> &Certificate {
        &self.0[0]
    }

    pub fn certificates(&self) -> &[Certificate] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
