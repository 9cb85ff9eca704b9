//! Node address selection.
//!
//! Computes the `node-ip` and `node-external-ip` values of one node from the
//! cluster stack and the driver's address snapshot. Existing `node-ip` entries
//! are kept in place and new candidates are appended after them, so running
//! the selection again with the same snapshot changes nothing.
//!
//! External addresses are only published when the cluster's primary family
//! has at least one of them; a dual-stack node with only a secondary-family
//! external address gets no `node-external-ip` at all.

use tracing::debug;

use crate::config::NodeConfig;
use crate::family::filter_by_family;
use crate::machine::RawNodeAddresses;
use crate::stack::{IpFamily, StackMode};

/// What a selection pass changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SelectionOutcome {
    /// Number of addresses appended to `node-ip`.
    pub node_ip_added: usize,
    /// Whether `node-external-ip` was overwritten with a different value.
    pub external_updated: bool,
}

impl SelectionOutcome {
    pub fn changed(&self) -> bool {
        self.node_ip_added > 0 || self.external_updated
    }
}

/// Update `config.node_ip` and `config.node_external_ip` for a node.
///
/// Pod driver nodes are left untouched. When `config.cloud_provider_name` is
/// set, `node-external-ip` is left to the cloud provider.
pub fn update_node_addresses(
    config: &mut NodeConfig,
    raw: &RawNodeAddresses,
    stack: StackMode,
) -> SelectionOutcome {
    let mut outcome = SelectionOutcome::default();

    if raw.is_pod_driver() {
        debug!(driver = %raw.driver_name, "Skipping address selection for pod driver");
        return outcome;
    }

    let candidates = node_ip_candidates(raw, stack);
    for candidate in candidates {
        if !config.node_ip.contains(&candidate) {
            config.node_ip.push(candidate);
            outcome.node_ip_added += 1;
        }
    }

    if config.has_cloud_provider() {
        debug!(
            cloud_provider = %config.cloud_provider_name,
            "Leaving node-external-ip to cloud provider"
        );
        return outcome;
    }

    let external = external_ips(raw, &config.node_ip, stack);
    if !external.is_empty() && external != config.node_external_ip {
        config.node_external_ip = external;
        outcome.external_updated = true;
    }

    outcome
}

/// Internal addresses of the active stack's families, IPv4 first.
fn node_ip_candidates(raw: &RawNodeAddresses, stack: StackMode) -> Vec<String> {
    // Drivers that only know a public address report it as external.
    let internal = if raw.internal_addresses.is_empty() {
        &raw.external_addresses
    } else {
        &raw.internal_addresses
    };
    let (internal_v4, internal_v6) = filter_by_family(internal);

    let with_dedicated_v6 = |mut v6: Vec<String>| {
        if let Some(addr) = raw.dedicated_ipv6()
            && !v6.iter().any(|a| a == addr)
        {
            v6.push(addr.to_string());
        }
        v6
    };

    match stack {
        StackMode::Ipv4 => internal_v4,
        StackMode::Ipv6 => with_dedicated_v6(internal_v6),
        StackMode::DualStack { .. } => {
            let mut candidates = internal_v4;
            candidates.extend(with_dedicated_v6(internal_v6));
            candidates
        }
    }
}

/// External addresses not already published as node IPs, primary family first.
fn external_ips(raw: &RawNodeAddresses, node_ip: &[String], stack: StackMode) -> Vec<String> {
    let mut remaining: Vec<&str> = Vec::new();
    for addr in raw.external_addresses.iter().map(String::as_str) {
        if !node_ip.iter().any(|ip| ip == addr) && !remaining.contains(&addr) {
            remaining.push(addr);
        }
    }
    let (external_v4, external_v6) = filter_by_family(&remaining);

    let (primary, secondary) = match stack.primary() {
        IpFamily::Ipv4 => (external_v4, external_v6),
        IpFamily::Ipv6 => (external_v6, external_v4),
    };

    if !stack.is_dual_stack() || primary.is_empty() {
        return primary;
    }

    let mut result = primary;
    result.extend(secondary);
    result
}
