//! Client IP pseudonymisation.
//!
//! Raw addresses are never stored: IPv4 is truncated to its `/24` network and
//! the result is hashed with a deployment salt.

use std::net::IpAddr;

use sha2::{Digest, Sha256};

/// Truncate an IPv4 address to its `/24` network. IPv6 is returned in
/// canonical form. Empty or unparsable input yields `None`.
#[must_use]
pub fn mask_ip(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    match raw.parse::<IpAddr>().ok()? {
        IpAddr::V4(v4) => {
            let [a, b, c, _] = v4.octets();
            Some(format!("{a}.{b}.{c}.0/24"))
        }
        IpAddr::V6(v6) => Some(v6.to_string()),
    }
}

/// SHA-256 hex digest of `salt:value`. Empty input yields `None`.
#[must_use]
pub fn hash_value(salt: &str, value: &str) -> Option<String> {
    if value.is_empty() {
        return None;
    }
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(b":");
    hasher.update(value.as_bytes());
    Some(hex::encode(hasher.finalize()))
}

/// Pick the client address (first `X-Forwarded-For` hop wins), mask it and
/// hash it.
#[must_use]
pub fn client_ip_hash(salt: &str, forwarded_for: Option<&str>, remote: Option<&str>) -> Option<String> {
    let ip = forwarded_for
        .and_then(|h| h.split(',').next())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .or(remote)
        .unwrap_or_default();
    mask_ip(ip).and_then(|masked| hash_value(salt, &masked))
}
