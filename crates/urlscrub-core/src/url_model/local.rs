//! Local/private host classification.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// Host names that always point at the local machine.
const LOCAL_HOSTNAMES: [&str; 4] = [
    "localhost",
    "localhost.localdomain",
    "ip6-localhost",
    "ip6-loopback",
];

/// True if `host` (as stored in `UrlValue::host`) is a local or private address.
pub fn is_local_host(host: &str) -> bool {
    let bare = host
        .strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(host);
    match bare.parse::<IpAddr>() {
        Ok(IpAddr::V4(addr)) => is_private_v4(addr),
        Ok(IpAddr::V6(addr)) => is_private_v6(addr),
        Err(_) => LOCAL_HOSTNAMES.contains(&bare.to_ascii_lowercase().as_str()),
    }
}

fn is_private_v4(addr: Ipv4Addr) -> bool {
    let [a, b, _, _] = addr.octets();
    addr.is_private()
        || addr.is_loopback()
        || addr.is_link_local()
        || addr.is_broadcast()
        || addr.is_documentation()
        // 0.0.0.0/8 ("this network")
        || a == 0
        // 198.18.0.0/15 benchmarking
        || (a == 198 && (b & 0xfe) == 18)
        // 240.0.0.0/4 reserved
        || a >= 240
}

fn is_private_v6(addr: Ipv6Addr) -> bool {
    if let Some(v4) = addr.to_ipv4_mapped() {
        return is_private_v4(v4);
    }
    let first = addr.segments()[0];
    addr.is_loopback()
        || addr.is_unspecified()
        // fc00::/7 unique local
        || (first & 0xfe00) == 0xfc00
        // fe80::/10 link local
        || (first & 0xffc0) == 0xfe80
        // 2001:db8::/32 documentation
        || (first == 0x2001 && addr.segments()[1] == 0x0db8)
}
