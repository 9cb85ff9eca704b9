//! Cluster network stack detection.
//!
//! The cluster's `cluster-cidr` value holds zero, one or two comma separated
//! CIDR blocks. One block selects a single-stack cluster of that family, two
//! blocks of different families select dual-stack with the first block's
//! family as primary.

use std::fmt;

use ipnet::IpNet;
use thiserror::Error;

/// IP address family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IpFamily {
    Ipv4,
    Ipv6,
}

impl IpFamily {
    pub fn as_str(&self) -> &'static str {
        match self {
            IpFamily::Ipv4 => "ipv4",
            IpFamily::Ipv6 => "ipv6",
        }
    }

    fn of(net: &IpNet) -> IpFamily {
        match net {
            IpNet::V4(_) => IpFamily::Ipv4,
            IpNet::V6(_) => IpFamily::Ipv6,
        }
    }
}

impl fmt::Display for IpFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Addressing mode of a cluster.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum StackMode {
    #[default]
    Ipv4,
    Ipv6,
    DualStack { primary: IpFamily },
}

impl StackMode {
    /// Single-stack mode for the given family.
    pub fn single(family: IpFamily) -> Self {
        match family {
            IpFamily::Ipv4 => StackMode::Ipv4,
            IpFamily::Ipv6 => StackMode::Ipv6,
        }
    }

    /// The primary family. For single-stack modes this is the only family.
    pub fn primary(&self) -> IpFamily {
        match self {
            StackMode::Ipv4 => IpFamily::Ipv4,
            StackMode::Ipv6 => IpFamily::Ipv6,
            StackMode::DualStack { primary } => *primary,
        }
    }

    pub fn is_dual_stack(&self) -> bool {
        matches!(self, StackMode::DualStack { .. })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StackMode::Ipv4 => "ipv4",
            StackMode::Ipv6 => "ipv6",
            StackMode::DualStack { .. } => "dual-stack",
        }
    }
}

impl fmt::Display for StackMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stack detection errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StackError {
    #[error("Invalid cluster CIDR: {0}")]
    InvalidCidr(String),

    #[error("Dual-stack cluster CIDR requires one IPv4 and one IPv6 block, got two {0} blocks")]
    DuplicateFamily(IpFamily),

    #[error("Cluster CIDR must contain one or two blocks, got {0}")]
    UnsupportedCidrCount(usize),
}

pub type Result<T> = std::result::Result<T, StackError>;

/// Detect the cluster stack from a `cluster-cidr` value.
///
/// An absent or blank value selects single-stack IPv4.
pub fn detect_stack(cluster_cidr: Option<&str>) -> Result<StackMode> {
    let value = cluster_cidr.map(str::trim).unwrap_or_default();
    if value.is_empty() {
        return Ok(StackMode::Ipv4);
    }

    let tokens: Vec<&str> = value
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect();
    if tokens.is_empty() || tokens.len() > 2 {
        return Err(StackError::UnsupportedCidrCount(tokens.len()));
    }

    let families = tokens
        .iter()
        .map(|t| {
            t.parse::<IpNet>()
                .map(|net| IpFamily::of(&net))
                .map_err(|_| StackError::InvalidCidr(t.to_string()))
        })
        .collect::<Result<Vec<_>>>()?;

    match families.as_slice() {
        [family] => Ok(StackMode::single(*family)),
        [first, second] if first == second => Err(StackError::DuplicateFamily(*first)),
        [first, _] => Ok(StackMode::DualStack { primary: *first }),
        _ => Err(StackError::UnsupportedCidrCount(families.len())),
    }
}
