//! Host submission normalization.
//!
//! Turns raw submissions (a bare host, `host:port`, or an `http(s)://` URL) into
//! a [`HostTarget`], and splits batch file content into candidate lines.

use log::warn;

use crate::config::{DEFAULT_TLS_PORT, MAX_HOST_INPUT_LENGTH};
use crate::error_handling::InputValidationError;

/// A normalized submission: where to fetch the chain from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HostTarget {
    /// Lowercase host name or IP address, without brackets or trailing dot
    pub host: String,
    pub port: u16,
    /// Whether HTTPS was requested. `http://` submissions are still fetched over TLS.
    pub tls: bool,
}

impl HostTarget {
    /// Registry key: the host, plus `:port` when the port is not 443.
    pub fn key(&self) -> String {
        if self.port == DEFAULT_TLS_PORT {
            return self.host.clone();
        }
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

impl std::fmt::Display for HostTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.key())
    }
}

/// Validates and normalizes a host or URL.
///
/// Adds an `https://` prefix if no scheme is given, then parses the result as a
/// URL and keeps only the host and an explicit port. Path, query and
/// credentials are discarded.
///
/// # Errors
///
/// Returns an [`InputValidationError`] for blank or overlong input, schemes
/// other than http/https, and anything that does not parse to a host.
pub fn normalize_host(raw: &str) -> Result<HostTarget, InputValidationError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(InputValidationError::EmptyHost);
    }
    if raw.len() > MAX_HOST_INPUT_LENGTH {
        warn!(
            "Skipping input exceeding maximum length ({} > {}): {}...",
            raw.len(),
            MAX_HOST_INPUT_LENGTH,
            raw.chars().take(50).collect::<String>()
        );
        return Err(InputValidationError::TooLong(raw.len()));
    }

    let (normalized, tls) = match raw.split_once("://") {
        Some((scheme, _)) => match scheme.to_ascii_lowercase().as_str() {
            "https" => (raw.to_string(), true),
            "http" => (raw.to_string(), false),
            _ => return Err(InputValidationError::UnsupportedScheme(scheme.to_string())),
        },
        None => (format!("https://{raw}"), true),
    };

    let parsed =
        url::Url::parse(&normalized).map_err(|_| InputValidationError::InvalidHost(raw.to_string()))?;

    let host = match parsed.host() {
        Some(url::Host::Domain(domain)) => domain.trim_end_matches('.').to_ascii_lowercase(),
        Some(url::Host::Ipv4(ip)) => ip.to_string(),
        Some(url::Host::Ipv6(ip)) => ip.to_string(),
        None => return Err(InputValidationError::InvalidHost(raw.to_string())),
    };
    if host.is_empty() || host.starts_with('.') || host.contains("..") {
        return Err(InputValidationError::InvalidHost(raw.to_string()));
    }

    Ok(HostTarget {
        host,
        port: parsed.port().unwrap_or(DEFAULT_TLS_PORT),
        tls,
    })
}

/// Splits batch file content into submissions.
///
/// Blank lines and lines starting with `#` are skipped.
pub fn parse_batch(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}
