//! nodeaddr: kubelet node address resolution
//!
//! Decides which addresses a provisioned node publishes as `node-ip` and
//! `node-external-ip`, based on the cluster's `cluster-cidr` stack and the
//! addresses its infrastructure driver reports.

pub mod config;
pub mod family;
pub mod machine;
pub mod reconciler;
pub mod select;
pub mod stack;

pub use config::{ClusterConfig, NodeConfig};
pub use machine::{MachineAddress, MachineAddressType, POD_DRIVER, RawNodeAddresses};
pub use reconciler::{ConfigStore, InMemoryStore, NodeAddressReconciler, Reconciler};
pub use select::{SelectionOutcome, update_node_addresses};
pub use stack::{IpFamily, StackError, StackMode, detect_stack};
