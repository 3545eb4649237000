//! Field extraction from parsed X.509 certificates.

use base64::Engine;
use x509_parser::extensions::{GeneralName, GeneralSubtree, ParsedExtension};
use x509_parser::prelude::*;
use x509_parser::public_key::PublicKey;

use super::{
    DistinguishedName, DnAttribute, KeyAlgorithm, NameConstraints, PublicKeyInfo,
    SignatureAlgorithm, SubjectAltName,
};

// Signature algorithm OIDs
pub const OID_MD2_WITH_RSA: &str = "1.2.840.113549.1.1.2";
pub const OID_MD4_WITH_RSA: &str = "1.2.840.113549.1.1.3";
pub const OID_MD5_WITH_RSA: &str = "1.2.840.113549.1.1.4";
pub const OID_SHA1_WITH_RSA: &str = "1.2.840.113549.1.1.5";
pub const OID_SHA1_WITH_RSA_OIW: &str = "1.3.14.3.2.29";
pub const OID_DSA_WITH_SHA1: &str = "1.2.840.10040.4.3";
pub const OID_ECDSA_WITH_SHA1: &str = "1.2.840.10045.4.1";

/// MD2, MD4, MD5 and every SHA-1 signature variant.
pub const WEAK_SIGNATURE_ALGORITHMS: &[&str] = &[
    OID_MD2_WITH_RSA,
    OID_MD4_WITH_RSA,
    OID_MD5_WITH_RSA,
    OID_SHA1_WITH_RSA,
    OID_SHA1_WITH_RSA_OIW,
    OID_DSA_WITH_SHA1,
    OID_ECDSA_WITH_SHA1,
];

/// Signature algorithm OID to display name.
const SIGNATURE_ALGORITHMS: &[(&str, &str)] = &[
    (OID_MD2_WITH_RSA, "md2WithRSAEncryption"),
    (OID_MD4_WITH_RSA, "md4WithRSAEncryption"),
    (OID_MD5_WITH_RSA, "md5WithRSAEncryption"),
    (OID_SHA1_WITH_RSA, "sha1WithRSAEncryption"),
    (OID_SHA1_WITH_RSA_OIW, "sha1WithRSASignature"),
    (OID_DSA_WITH_SHA1, "dsa-with-SHA1"),
    ("1.2.840.113549.1.1.10", "rsassa-pss"),
    ("1.2.840.113549.1.1.11", "sha256WithRSAEncryption"),
    ("1.2.840.113549.1.1.12", "sha384WithRSAEncryption"),
    ("1.2.840.113549.1.1.13", "sha512WithRSAEncryption"),
    (OID_ECDSA_WITH_SHA1, "ecdsa-with-SHA1"),
    ("1.2.840.10045.4.3.2", "ecdsa-with-SHA256"),
    ("1.2.840.10045.4.3.3", "ecdsa-with-SHA384"),
    ("1.2.840.10045.4.3.4", "ecdsa-with-SHA512"),
    ("1.3.101.112", "Ed25519"),
    ("1.3.101.113", "Ed448"),
];

/// Distinguished name attribute OID to short name.
const DN_ATTRIBUTES: &[(&str, &str)] = &[
    ("2.5.4.3", "CN"),
    ("2.5.4.5", "serialNumber"),
    ("2.5.4.6", "C"),
    ("2.5.4.7", "L"),
    ("2.5.4.8", "ST"),
    ("2.5.4.9", "street"),
    ("2.5.4.10", "O"),
    ("2.5.4.11", "OU"),
    ("2.5.4.15", "businessCategory"),
    ("2.5.4.97", "organizationIdentifier"),
    ("1.2.840.113549.1.9.1", "emailAddress"),
    ("0.9.2342.19200300.100.1.25", "DC"),
    ("1.3.6.1.4.1.311.60.2.1.3", "jurisdictionC"),
];

const OID_RSA_ENCRYPTION: &str = "1.2.840.113549.1.1.1";
const OID_EC_PUBLIC_KEY: &str = "1.2.840.10045.2.1";
const OID_ED25519: &str = "1.3.101.112";
const OID_ED448: &str = "1.3.101.113";

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02X}", b)).collect()
}

/// Converts an X.509 name into ordered short-name attributes.
pub(crate) fn extract_distinguished_name(name: &X509Name<'_>) -> DistinguishedName {
    let mut attributes = Vec::new();
    for rdn in name.iter() {
        for attr in rdn.iter() {
            let oid = attr.attr_type().to_id_string();
            let kind = DN_ATTRIBUTES
                .iter()
                .find(|(known, _)| *known == oid)
                .map(|(_, short)| short.to_string())
                .unwrap_or(oid);
            let value = match attr.as_str() {
                Ok(s) => s.to_string(),
                Err(_) => format!("#{}", hex(&attr.attr_value().data)),
            };
            attributes.push(DnAttribute { kind, value });
        }
    }
    DistinguishedName { attributes }
}

/// Extracts the subject public key family, size and material.
pub(crate) fn extract_public_key(cert: &X509Certificate<'_>) -> PublicKeyInfo {
    let spki = cert.public_key();
    let key_bytes: &[u8] = &spki.subject_public_key.data;
    let oid = spki.algorithm.algorithm.to_id_string();

    let (algorithm, bits) = match oid.as_str() {
        OID_RSA_ENCRYPTION => {
            let bits = match spki.parsed() {
                Ok(PublicKey::RSA(rsa)) => {
                    let significant = rsa.modulus.iter().skip_while(|b| **b == 0).count();
                    Some((significant * 8) as u32)
                }
                _ => None,
            };
            (KeyAlgorithm::Rsa, bits)
        }
        OID_EC_PUBLIC_KEY => {
            // Uncompressed point: 0x04 || X || Y
            let bits = match key_bytes.first().copied() {
                Some(0x04) if key_bytes.len() > 1 => Some(((key_bytes.len() - 1) / 2 * 8) as u32),
                Some(0x02) | Some(0x03) if key_bytes.len() > 1 => {
                    Some(((key_bytes.len() - 1) * 8) as u32)
                }
                _ => None,
            };
            (KeyAlgorithm::Ec, bits)
        }
        OID_ED25519 => (KeyAlgorithm::Ed25519, Some(256)),
        OID_ED448 => (KeyAlgorithm::Ed448, Some(456)),
        _ => (KeyAlgorithm::Other(oid), None),
    };

    PublicKeyInfo {
        algorithm,
        bits,
        material: base64::engine::general_purpose::STANDARD.encode(key_bytes),
    }
}

/// Maps the certificate's signature algorithm OID to a display name.
pub(crate) fn extract_signature_algorithm(cert: &X509Certificate<'_>) -> SignatureAlgorithm {
    let oid = cert.signature_algorithm.algorithm.to_id_string();
    let name = SIGNATURE_ALGORITHMS
        .iter()
        .find(|(known, _)| *known == oid)
        .map(|(_, name)| name.to_string())
        .unwrap_or_else(|| oid.clone());
    SignatureAlgorithm { name, oid }
}

/// Extension-derived fields of a certificate.
#[derive(Debug, Default)]
pub(crate) struct ExtensionFields {
    pub subject_alt_names: Vec<SubjectAltName>,
    pub is_ca: bool,
    pub server_auth_eku: Option<bool>,
    pub name_constraints: Option<NameConstraints>,
}

fn format_ip(bytes: &[u8]) -> Option<String> {
    match bytes.len() {
        4 => {
            let octets: [u8; 4] = bytes.try_into().ok()?;
            Some(std::net::Ipv4Addr::from(octets).to_string())
        }
        16 => {
            let octets: [u8; 16] = bytes.try_into().ok()?;
            Some(std::net::Ipv6Addr::from(octets).to_string())
        }
        _ => None,
    }
}

fn dns_subtrees(subtrees: &Option<Vec<GeneralSubtree<'_>>>) -> Vec<String> {
    subtrees
        .iter()
        .flatten()
        .filter_map(|subtree| match &subtree.base {
            GeneralName::DNSName(name) => Some(name.to_string()),
            _ => None,
        })
        .collect()
}

/// Extracts SANs, CA flag, serverAuth EKU and DNS name constraints.
///
/// Only DNS names and IP addresses are kept from the SAN extension; other
/// name types play no part in server authentication.
pub(crate) fn extract_extensions(cert: &X509Certificate<'_>) -> ExtensionFields {
    let mut fields = ExtensionFields::default();

    for ext in cert.extensions() {
        match ext.parsed_extension() {
            ParsedExtension::SubjectAlternativeName(san) => {
                for general_name in &san.general_names {
                    match general_name {
                        GeneralName::DNSName(name) => {
                            fields.subject_alt_names.push(SubjectAltName::Dns(name.to_string()))
                        }
                        GeneralName::IPAddress(bytes) => {
                            if let Some(ip) = format_ip(bytes) {
                                fields.subject_alt_names.push(SubjectAltName::Ip(ip));
                            }
                        }
                        _ => {}
                    }
                }
            }
            ParsedExtension::BasicConstraints(bc) => {
                fields.is_ca = bc.ca;
            }
            ParsedExtension::ExtendedKeyUsage(eku) => {
                fields.server_auth_eku = Some(eku.server_auth || eku.any);
            }
            ParsedExtension::NameConstraints(nc) => {
                fields.name_constraints = Some(NameConstraints {
                    permitted_dns: dns_subtrees(&nc.permitted_subtrees),
                    excluded_dns: dns_subtrees(&nc.excluded_subtrees),
                });
            }
            _ => {}
        }
    }

    fields
}
