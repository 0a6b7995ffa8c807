//! Peer endpoint string helpers.
//!
//! The WebUI reports swarm peers keyed by `ip:port` strings. IPv6
//! addresses arrive bracket-delimited (`[addr]:port`) and IPv4 peers
//! behind a dual-stack listener arrive in the IPv4-mapped-IPv6 form
//! (`::ffff:a.b.c.d:port`). The ban list wants the bare address, so
//! every endpoint must reduce to one canonical key.

/// Reduce a peer endpoint (`ip:port`) to its bare address.
///
/// Strips the port, removes IPv6 brackets, and reduces
/// IPv4-mapped-IPv6 addresses to their embedded IPv4 form, so that
/// the same logical address always maps to the same registry key.
///
/// # Examples
/// ```
/// use leechguard::utils::addr::normalize_peer_address;
///
/// assert_eq!(normalize_peer_address("192.0.2.5:6881"), "192.0.2.5");
/// assert_eq!(normalize_peer_address("[2001:db8::1]:6881"), "2001:db8::1");
/// assert_eq!(normalize_peer_address("::ffff:192.0.2.5:6881"), "192.0.2.5");
/// ```
pub fn normalize_peer_address(endpoint: &str) -> String {
    // Bracketed IPv6: the address is everything inside the brackets
    if let Some(inner) = endpoint.strip_prefix('[') {
        if let Some(end) = inner.find(']') {
            return strip_mapped_prefix(&inner[..end]).to_string();
        }
    }

    // Unbracketed IPv4-mapped-IPv6: drop the marker, then the port
    if let Some(mapped) = endpoint.strip_prefix("::ffff:") {
        return strip_port(mapped).to_string();
    }

    strip_port(endpoint).to_string()
}

/// Extract the port component of a peer endpoint, if present.
pub fn peer_port(endpoint: &str) -> Option<u16> {
    endpoint.rsplit(':').next().and_then(|p| p.parse().ok())
}

/// Remove everything from the last `:` onwards (the port separator).
fn strip_port(addr: &str) -> &str {
    match addr.rfind(':') {
        Some(idx) => &addr[..idx],
        None => addr,
    }
}

fn strip_mapped_prefix(addr: &str) -> &str {
    addr.strip_prefix("::ffff:").unwrap_or(addr)
}
