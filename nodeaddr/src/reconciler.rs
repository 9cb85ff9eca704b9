//! Node address reconciliation.
//!
//! The reconciler reads the cluster configuration and a node's stored
//! configuration from a [`ConfigStore`], applies address selection for the
//! driver snapshot it is handed, and writes the node configuration back when
//! something changed.

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, error, info};

use crate::config::{ClusterConfig, NodeConfig};
use crate::machine::RawNodeAddresses;
use crate::select::update_node_addresses;
use crate::stack::{StackError, StackMode};

/// Configuration store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Node not found: {0}")]
    NodeNotFound(String),

    #[error("Storage error: {0}")]
    Backend(String),
}

/// Reconciliation errors.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("Cluster stack error: {0}")]
    Stack(#[from] StackError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, ReconcileError>;

/// Trait for resource reconcilers.
#[async_trait]
pub trait Reconciler: Send + Sync {
    /// Desired or observed input for one resource.
    type Spec;
    /// The status type to report back.
    type Status;

    /// Reconcile the resource - compare desired vs actual state and take action.
    async fn reconcile(&self, id: &str, spec: &Self::Spec) -> Result<Self::Status>;

    /// Handle resource deletion (finalization).
    async fn finalize(&self, id: &str) -> Result<()>;
}

/// Access to cluster and node configuration.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    async fn cluster_config(&self) -> std::result::Result<ClusterConfig, StoreError>;

    /// Stored configuration of a node, `None` if the node has none yet.
    async fn node_config(&self, node: &str) -> std::result::Result<Option<NodeConfig>, StoreError>;

    async fn save_node_config(
        &self,
        node: &str,
        config: NodeConfig,
    ) -> std::result::Result<(), StoreError>;

    async fn remove_node_config(&self, node: &str) -> std::result::Result<(), StoreError>;
}

/// In-memory [`ConfigStore`].
#[derive(Default)]
pub struct InMemoryStore {
    cluster: RwLock<ClusterConfig>,
    nodes: RwLock<HashMap<String, NodeConfig>>,
}

impl InMemoryStore {
    pub fn new(cluster: ClusterConfig) -> Self {
        Self {
            cluster: RwLock::new(cluster),
            nodes: RwLock::new(HashMap::new()),
        }
    }

    pub async fn set_cluster_config(&self, cluster: ClusterConfig) {
        *self.cluster.write().await = cluster;
    }

    pub async fn insert_node_config(&self, node: impl Into<String>, config: NodeConfig) {
        self.nodes.write().await.insert(node.into(), config);
    }
}

#[async_trait]
impl ConfigStore for InMemoryStore {
    async fn cluster_config(&self) -> std::result::Result<ClusterConfig, StoreError> {
        Ok(self.cluster.read().await.clone())
    }

    async fn node_config(&self, node: &str) -> std::result::Result<Option<NodeConfig>, StoreError> {
        Ok(self.nodes.read().await.get(node).cloned())
    }

    async fn save_node_config(
        &self,
        node: &str,
        config: NodeConfig,
    ) -> std::result::Result<(), StoreError> {
        self.nodes.write().await.insert(node.to_string(), config);
        Ok(())
    }

    async fn remove_node_config(&self, node: &str) -> std::result::Result<(), StoreError> {
        match self.nodes.write().await.remove(node) {
            Some(_) => Ok(()),
            None => Err(StoreError::NodeNotFound(node.to_string())),
        }
    }
}

/// Result of reconciling one node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeAddressStatus {
    pub stack: StackMode,
    pub node_ip: Vec<String>,
    pub node_external_ip: Vec<String>,
    /// Whether the stored configuration was updated.
    pub changed: bool,
}

/// Reconciles `node-ip` / `node-external-ip` of nodes against driver snapshots.
pub struct NodeAddressReconciler<S> {
    store: S,
}

impl<S: ConfigStore> NodeAddressReconciler<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

#[async_trait]
impl<S: ConfigStore> Reconciler for NodeAddressReconciler<S> {
    type Spec = RawNodeAddresses;
    type Status = NodeAddressStatus;

    async fn reconcile(&self, id: &str, spec: &Self::Spec) -> Result<Self::Status> {
        let cluster = self.store.cluster_config().await?;
        let stack = cluster.stack().inspect_err(|e| {
            error!(
                node = %id,
                cidr = ?cluster.cluster_cidr,
                "Cannot determine cluster stack: {}", e
            );
        })?;

        info!(
            node = %id,
            driver = %spec.driver_name,
            stack = %stack,
            primary = %stack.primary(),
            "Reconciling node addresses"
        );

        let mut config = self.store.node_config(id).await?.unwrap_or_default();

        // The cluster-wide cloud provider applies for this pass only; the
        // node's own value is what gets stored.
        let node_cloud_provider = config.cloud_provider_name.clone();
        if !config.has_cloud_provider() {
            config.cloud_provider_name = cluster.cloud_provider_name.clone();
        }
        let outcome = update_node_addresses(&mut config, spec, stack);
        config.cloud_provider_name = node_cloud_provider;
        let status = NodeAddressStatus {
            stack,
            node_ip: config.node_ip.clone(),
            node_external_ip: config.node_external_ip.clone(),
            changed: outcome.changed(),
        };

        if outcome.changed() {
            info!(
                node = %id,
                node_ip = ?status.node_ip,
                node_external_ip = ?status.node_external_ip,
                "Node addresses updated"
            );
            self.store.save_node_config(id, config).await?;
        } else {
            debug!(node = %id, "Node addresses up to date");
        }

        Ok(status)
    }

    async fn finalize(&self, id: &str) -> Result<()> {
        info!(node = %id, "Removing node configuration");
        match self.store.remove_node_config(id).await {
            Ok(()) | Err(StoreError::NodeNotFound(_)) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
