//! DER/PEM decoding into [`Certificate`] records.

use base64::Engine;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use x509_parser::pem::Pem;
use x509_parser::prelude::*;

use super::extract::{
    extract_distinguished_name, extract_extensions, extract_public_key,
    extract_signature_algorithm,
};
use super::Certificate;
use crate::error_handling::ParseError;

const PEM_LINE_WIDTH: usize = 64;

/// Computes the SHA-256 fingerprint of DER bytes.
///
/// Returns a colon-separated uppercase hex string (e.g., "AB:CD:EF:...").
pub fn fingerprint(der: &[u8]) -> String {
    Sha256::digest(der)
        .iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(":")
}

/// Encodes DER bytes as a PEM `CERTIFICATE` block.
fn encode_pem(der: &[u8]) -> String {
    let encoded = base64::engine::general_purpose::STANDARD.encode(der);
    let mut pem = String::from("-----BEGIN CERTIFICATE-----\n");
    for line in encoded.as_bytes().chunks(PEM_LINE_WIDTH) {
        // base64 output is ASCII
        pem.push_str(&String::from_utf8_lossy(line));
        pem.push('\n');
    }
    pem.push_str("-----END CERTIFICATE-----\n");
    pem
}

fn to_datetime(time: ASN1Time, index: usize) -> Result<DateTime<Utc>, ParseError> {
    DateTime::from_timestamp(time.timestamp(), 0).ok_or_else(|| ParseError::InvalidCertificate {
        index,
        reason: format!("timestamp out of range: {}", time),
    })
}

/// Parses one DER certificate. `index` is its position in the enclosing chain
/// and only used for error reporting.
pub fn parse_der(der: &[u8], index: usize) -> Result<Certificate, ParseError> {
    let (rest, cert) =
        X509Certificate::from_der(der).map_err(|e| ParseError::InvalidCertificate {
            index,
            reason: e.to_string(),
        })?;
    if !rest.is_empty() {
        log::debug!(
            "Ignoring {} trailing bytes after certificate at position {}",
            rest.len(),
            index
        );
    }

    let validity = cert.validity();
    let valid_from = to_datetime(validity.not_before, index)?;
    let valid_to = to_datetime(validity.not_after, index)?;
    if valid_from > valid_to {
        return Err(ParseError::InvalidValidity { index });
    }

    let extensions = extract_extensions(&cert);
    let encoded = &der[..der.len() - rest.len()];

    Ok(Certificate {
        subject: extract_distinguished_name(cert.subject()),
        issuer: extract_distinguished_name(cert.issuer()),
        serial: cert.raw_serial_as_string().replace(':', "").to_uppercase(),
        valid_from,
        valid_to,
        public_key: extract_public_key(&cert),
        signature_algorithm: extract_signature_algorithm(&cert),
        subject_alt_names: extensions.subject_alt_names,
        is_ca: extensions.is_ca,
        server_auth_eku: extensions.server_auth_eku,
        name_constraints: extensions.name_constraints,
        fingerprint: fingerprint(encoded),
        pem: encode_pem(encoded),
        der: encoded.to_vec(),
        subject_raw: cert.subject().as_raw().to_vec(),
        issuer_raw: cert.issuer().as_raw().to_vec(),
    })
}

/// Parses every `CERTIFICATE` block of a PEM bundle. Other block types are skipped.
pub fn parse_pem_bundle(data: &[u8]) -> Result<Vec<Certificate>, ParseError> {
    let mut certificates = Vec::new();
    for block in Pem::iter_from_buffer(data) {
        let block = block.map_err(|e| ParseError::InvalidPem(e.to_string()))?;
        if block.label != "CERTIFICATE" && block.label != "TRUSTED CERTIFICATE" {
            continue;
        }
        let index = certificates.len();
        certificates.push(parse_der(&block.contents, index)?);
    }
    Ok(certificates)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn self_signed(names: &[&str]) -> rcgen::CertifiedKey {
        let names: Vec<String> = names.iter().map(|n| n.to_string()).collect();
        rcgen::generate_simple_self_signed(names).unwrap()
    }

    #[test]
    fn test_parse_der_extracts_names_and_sans() {
        let certified = self_signed(&["example.test", "www.example.test"]);
        let cert = parse_der(certified.cert.der(), 0).unwrap();

        let dns: Vec<&str> = cert.dns_names().collect();
        assert_eq!(dns, vec!["example.test", "www.example.test"]);
        assert!(cert.is_self_issued());
        assert!(cert.valid_from <= cert.valid_to);
        assert_eq!(cert.public_key.algorithm, super::super::KeyAlgorithm::Ec);
        assert_eq!(cert.public_key.bits, Some(256));
        assert_eq!(cert.signature_algorithm.name, "ecdsa-with-SHA256");
    }

    #[test]
    fn test_fingerprint_format() {
        let fp = fingerprint(b"hello");
        assert_eq!(fp.split(':').count(), 32);
        assert!(fp.chars().all(|c| c == ':' || c.is_ascii_hexdigit()));
        assert_eq!(fp, fp.to_uppercase());
    }

    #[test]
    fn test_pem_round_trip_matches_der() {
        let certified = self_signed(&["example.test"]);
        let cert = parse_der(certified.cert.der(), 0).unwrap();

        let reparsed = parse_pem_bundle(cert.pem.as_bytes()).unwrap();
        assert_eq!(reparsed.len(), 1);
        assert_eq!(reparsed[0].fingerprint, cert.fingerprint);
        assert_eq!(reparsed[0].der(), certified.cert.der().as_ref());
    }

    #[test]
    fn test_parse_pem_bundle_reads_all_blocks() {
        let a = self_signed(&["a.test"]);
        let b = self_signed(&["b.test"]);
        let bundle = format!("{}\n{}", a.cert.pem(), b.cert.pem());

        let certs = parse_pem_bundle(bundle.as_bytes()).unwrap();
        assert_eq!(certs.len(), 2);
        assert_eq!(certs[0].dns_names().next(), Some("a.test"));
        assert_eq!(certs[1].dns_names().next(), Some("b.test"));
    }

    #[test]
    fn test_parse_der_rejects_garbage() {
        let err = parse_der(&[0x30, 0x03, 0x01, 0x02, 0x03], 2).unwrap_err();
        assert!(matches!(err, ParseError::InvalidCertificate { index: 2, .. }));
    }
}
