//! Vendor root stores.
//!
//! A [`RootStore`] is the set of certificates a policy accepts as chain
//! anchors. Stores are loaded from PEM bundles, either an explicit file or the
//! system CA bundle, and are immutable once built.

use std::collections::HashMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::Serialize;

use crate::certificate::{parse_pem_bundle, Certificate};
use crate::error_handling::RootStoreError;

/// Well-known CA bundle file paths, in order of preference.
const KNOWN_CA_BUNDLE_PATHS: &[&str] = &[
    "/etc/ssl/certs/ca-certificates.crt", // Debian/Ubuntu
    "/etc/pki/tls/certs/ca-bundle.crt",   // RHEL/CentOS/Fedora
    "/etc/ssl/ca-bundle.pem",             // openSUSE
    "/etc/ssl/cert.pem",                  // macOS, Alpine
];

/// Summary of one trusted root, as listed by `getTrustStoreInfo`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RootInfo {
    pub name: String,
    pub fingerprint: String,
    pub valid_from: DateTime<Utc>,
    pub valid_to: DateTime<Utc>,
}

/// A set of trusted root certificates indexed by fingerprint and subject.
#[derive(Default)]
pub struct RootStore {
    roots: Vec<Certificate>,
    by_fingerprint: HashMap<String, usize>,
    by_subject: HashMap<Vec<u8>, Vec<usize>>,
}

impl std::fmt::Debug for RootStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RootStore")
            .field("count", &self.roots.len())
            .finish()
    }
}

impl RootStore {
    /// Create an empty root store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store from parsed certificates, dropping duplicates.
    pub fn from_certificates(certificates: impl IntoIterator<Item = Certificate>) -> Self {
        let mut store = Self::new();
        for cert in certificates {
            store.add(cert);
        }
        store
    }

    /// Builds a store from a PEM bundle.
    pub fn from_pem(data: &[u8]) -> Result<Self, RootStoreError> {
        Ok(Self::from_certificates(parse_pem_bundle(data)?))
    }

    /// Loads a PEM bundle from disk.
    pub fn from_pem_file(path: &Path) -> Result<Self, RootStoreError> {
        let data = std::fs::read(path).map_err(|source| RootStoreError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let store = Self::from_pem(&data)?;
        info!("Loaded {} roots from {}", store.len(), path.display());
        Ok(store)
    }

    /// Loads the system CA bundle.
    ///
    /// Honors `SSL_CERT_FILE` first, then the well-known bundle locations.
    pub fn system() -> Result<Self, RootStoreError> {
        if let Ok(path) = std::env::var("SSL_CERT_FILE") {
            let path = Path::new(&path);
            if path.is_file() {
                return Self::from_pem_file(path);
            }
            debug!("SSL_CERT_FILE {} is not a file, ignoring", path.display());
        }
        for candidate in KNOWN_CA_BUNDLE_PATHS {
            let path = Path::new(candidate);
            if path.is_file() {
                return Self::from_pem_file(path);
            }
        }
        Err(RootStoreError::NoSystemBundle)
    }

    /// Adds a root. Returns false if it was already present.
    pub fn add(&mut self, cert: Certificate) -> bool {
        if self.by_fingerprint.contains_key(&cert.fingerprint) {
            return false;
        }
        let index = self.roots.len();
        self.by_fingerprint.insert(cert.fingerprint.clone(), index);
        self.by_subject
            .entry(cert.subject_raw.clone())
            .or_default()
            .push(index);
        self.roots.push(cert);
        true
    }

    pub fn len(&self) -> usize {
        self.roots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Looks up a root by its SHA-256 fingerprint.
    pub fn get(&self, fingerprint: &str) -> Option<&Certificate> {
        self.by_fingerprint
            .get(fingerprint)
            .and_then(|&index| self.roots.get(index))
    }

    /// Roots whose subject equals the issuer name of `cert`, in load order.
    pub fn candidate_issuers<'a>(
        &'a self,
        cert: &Certificate,
    ) -> impl Iterator<Item = &'a Certificate> + 'a {
        self.by_subject
            .get(&cert.issuer_raw)
            .into_iter()
            .flatten()
            .filter_map(|&index| self.roots.get(index))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Certificate> {
        self.roots.iter()
    }

    /// Listing of the store sorted by name, then fingerprint.
    pub fn info(&self) -> Vec<RootInfo> {
        let mut info: Vec<RootInfo> = self
            .roots
            .iter()
            .map(|root| RootInfo {
                name: root.subject.display_name(),
                fingerprint: root.fingerprint.clone(),
                valid_from: root.valid_from,
                valid_to: root.valid_to,
            })
            .collect();
        info.sort_by(|a, b| {
            a.name
                .cmp(&b.name)
                .then_with(|| a.fingerprint.cmp(&b.fingerprint))
        });
        info
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::certificate::parse_der;

    fn root(cn: &str) -> (rcgen::Certificate, Certificate) {
        let mut params = rcgen::CertificateParams::new(Vec::<String>::new()).unwrap();
        params.distinguished_name = rcgen::DistinguishedName::new();
        params.distinguished_name.push(rcgen::DnType::CommonName, cn);
        params.is_ca = rcgen::IsCa::Ca(rcgen::BasicConstraints::Unconstrained);
        let key = rcgen::KeyPair::generate().unwrap();
        let cert = params.self_signed(&key).unwrap();
        let parsed = parse_der(cert.der(), 0).unwrap();
        (cert, parsed)
    }

    #[test]
    fn test_add_deduplicates_by_fingerprint() {
        let (_, parsed) = root("Dup Root");
        let mut store = RootStore::new();
        assert!(store.add(parsed.clone()));
        assert!(!store.add(parsed));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_get_and_candidate_issuers() {
        let (_, parsed) = root("Lookup Root");
        let store = RootStore::from_certificates(vec![parsed.clone()]);

        assert!(store.get(&parsed.fingerprint).is_some());
        assert!(store.get("00:11").is_none());
        // Self-issued: its own issuer name is its subject
        let candidates: Vec<_> = store.candidate_issuers(&parsed).collect();
        assert_eq!(candidates.len(), 1);
    }

    #[test]
    fn test_info_sorted_by_name() {
        let (_, b) = root("B Root");
        let (_, a) = root("A Root");
        let store = RootStore::from_certificates(vec![b, a]);
        let names: Vec<String> = store.info().into_iter().map(|i| i.name).collect();
        assert_eq!(names, vec!["A Root", "B Root"]);
    }

    #[test]
    fn test_from_pem_file() {
        let (cert, _) = root("File Root");
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("roots.pem");
        std::fs::write(&path, cert.pem()).unwrap();

        let store = RootStore::from_pem_file(&path).unwrap();
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_from_pem_file_missing() {
        let err = RootStore::from_pem_file(Path::new("/nonexistent/roots.pem")).unwrap_err();
        assert!(matches!(err, RootStoreError::Io { .. }));
    }
}
