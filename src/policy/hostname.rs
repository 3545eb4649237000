//! Hostname matching against leaf certificate names.
//!
//! Wildcards are honored only as a whole leftmost `*.` label. A wildcard covers
//! exactly one label, never the bare apex, and never a single-label suffix.

use std::net::IpAddr;

use crate::certificate::Certificate;

fn canonical(name: &str) -> String {
    name.trim_end_matches('.').to_ascii_lowercase()
}

/// Whether a certificate DNS name `pattern` covers `host`.
pub fn matches_hostname(pattern: &str, host: &str) -> bool {
    let pattern = canonical(pattern);
    let host = canonical(host);
    if pattern.is_empty() || host.is_empty() {
        return false;
    }

    match pattern.strip_prefix("*.") {
        Some(suffix) => {
            if suffix.contains('*') || !suffix.contains('.') {
                return false;
            }
            match host.split_once('.') {
                Some((label, rest)) => !label.is_empty() && rest == suffix,
                None => false,
            }
        }
        None => !pattern.contains('*') && pattern == host,
    }
}

/// Whether the leaf certificate covers `host`.
///
/// IP hosts are compared against SAN IP addresses. DNS hosts are compared
/// against SAN DNS names, falling back to the subject CN only when
/// `allow_cn_fallback` is set and the leaf carries no DNS names.
pub(crate) fn leaf_matches(leaf: &Certificate, host: &str, allow_cn_fallback: bool) -> bool {
    let host = host.trim_start_matches('[').trim_end_matches(']');
    if let Ok(ip) = host.parse::<IpAddr>() {
        return leaf
            .ip_addresses()
            .filter_map(|candidate| candidate.parse::<IpAddr>().ok())
            .any(|candidate| candidate == ip);
    }

    let mut dns_names = leaf.dns_names().peekable();
    if dns_names.peek().is_none() {
        return allow_cn_fallback
            && leaf
                .subject
                .common_name()
                .is_some_and(|cn| matches_hostname(cn, host));
    }
    dns_names.any(|name| matches_hostname(name, host))
}
