//! Address family partitioning.

use std::net::IpAddr;

use tracing::debug;

/// Split addresses into IPv4 and IPv6 lists.
///
/// Input order is preserved within each list. Entries that are not valid IP
/// literals are dropped. The original strings are returned untouched.
pub fn filter_by_family<S: AsRef<str>>(addresses: &[S]) -> (Vec<String>, Vec<String>) {
    let mut ipv4s = Vec::new();
    let mut ipv6s = Vec::new();

    for addr in addresses.iter().map(AsRef::as_ref) {
        match addr.parse::<IpAddr>() {
            Ok(IpAddr::V4(_)) => ipv4s.push(addr.to_string()),
            Ok(IpAddr::V6(_)) => ipv6s.push(addr.to_string()),
            Err(_) => debug!(address = %addr, "Dropping unparsable address"),
        }
    }

    (ipv4s, ipv6s)
}
