//! Driver-reported machine addresses.

use std::net::Ipv6Addr;

use serde::{Deserialize, Serialize};

/// Driver name of pod-backed virtual nodes. These have no routable node address.
pub const POD_DRIVER: &str = "pod";

/// Kind of a machine status address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MachineAddressType {
    Hostname,
    #[serde(rename = "InternalIP")]
    InternalIp,
    #[serde(rename = "ExternalIP")]
    ExternalIp,
    #[serde(rename = "InternalDNS")]
    InternalDns,
    #[serde(rename = "ExternalDNS")]
    ExternalDns,
}

/// Typed address entry as reported in a machine's status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineAddress {
    #[serde(rename = "type")]
    pub address_type: MachineAddressType,
    pub address: String,
}

impl MachineAddress {
    pub fn new(address_type: MachineAddressType, address: impl Into<String>) -> Self {
        Self {
            address_type,
            address: address.into(),
        }
    }
}

/// Point-in-time snapshot of the addresses a driver reports for one node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawNodeAddresses {
    #[serde(default)]
    pub internal_addresses: Vec<String>,
    #[serde(default)]
    pub external_addresses: Vec<String>,
    /// IPv6 address reported outside the internal list by some drivers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipv6_address: Option<String>,
    #[serde(default)]
    pub driver_name: String,
}

impl RawNodeAddresses {
    pub fn new(driver_name: impl Into<String>) -> Self {
        Self {
            driver_name: driver_name.into(),
            ..Default::default()
        }
    }

    pub fn internal<I, S>(mut self, addresses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.internal_addresses = addresses.into_iter().map(Into::into).collect();
        self
    }

    pub fn external<I, S>(mut self, addresses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.external_addresses = addresses.into_iter().map(Into::into).collect();
        self
    }

    pub fn ipv6(mut self, address: impl Into<String>) -> Self {
        self.ipv6_address = Some(address.into());
        self
    }

    /// Build a snapshot from a machine's status addresses.
    ///
    /// Hostname and DNS entries are ignored. Repeated addresses within the
    /// internal or external list keep their first position.
    pub fn from_machine_addresses(
        driver_name: impl Into<String>,
        addresses: &[MachineAddress],
    ) -> Self {
        let mut raw = Self::new(driver_name);
        for entry in addresses {
            let list = match entry.address_type {
                MachineAddressType::InternalIp => &mut raw.internal_addresses,
                MachineAddressType::ExternalIp => &mut raw.external_addresses,
                _ => continue,
            };
            let address = entry.address.trim();
            if !address.is_empty() && !list.iter().any(|a| a == address) {
                list.push(address.to_string());
            }
        }
        raw
    }

    pub fn is_pod_driver(&self) -> bool {
        self.driver_name == POD_DRIVER
    }

    /// The dedicated IPv6 address, if one was reported and is an IPv6 literal.
    pub fn dedicated_ipv6(&self) -> Option<&str> {
        self.ipv6_address
            .as_deref()
            .map(str::trim)
            .filter(|a| a.parse::<Ipv6Addr>().is_ok())
    }
}
