//! Cluster and node configuration documents.
//!
//! Both documents are string-keyed maps in the configuration store. Only the
//! keys this crate reads or writes get typed fields; everything else is kept
//! in `extra` so a load/save cycle never loses operator settings.

use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::stack::{self, StackMode};

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Cluster-wide settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ClusterConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_cidr: Option<String>,

    /// Non-empty when an external cloud provider manages node addressing.
    #[serde(default, deserialize_with = "string_or_null")]
    pub cloud_provider_name: String,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ClusterConfig {
    pub fn with_cluster_cidr(cidr: impl Into<String>) -> Self {
        Self {
            cluster_cidr: Some(cidr.into()),
            ..Default::default()
        }
    }

    /// Detect the network stack from `cluster-cidr`.
    pub fn stack(&self) -> stack::Result<StackMode> {
        stack::detect_stack(self.cluster_cidr.as_deref())
    }
}

/// Per-node settings rendered into the kubelet configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct NodeConfig {
    #[serde(default, deserialize_with = "string_or_list")]
    pub node_ip: Vec<String>,

    #[serde(default, deserialize_with = "string_or_list")]
    pub node_external_ip: Vec<String>,

    #[serde(default, deserialize_with = "string_or_null")]
    pub cloud_provider_name: String,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl NodeConfig {
    /// Whether an external cloud provider manages external addressing.
    pub fn has_cloud_provider(&self) -> bool {
        !self.cloud_provider_name.trim().is_empty()
    }

    /// Load a node configuration from a JSON file.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let data = tokio::fs::read(path).await?;
        Ok(serde_json::from_slice(&data)?)
    }

    /// Write the configuration as pretty printed JSON.
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut data = serde_json::to_vec_pretty(self)?;
        data.push(b'\n');
        tokio::fs::write(path, data).await?;
        Ok(())
    }
}

/// Accepts a list of strings, a single string, or null.
///
/// A blank scalar yields an empty list.
fn string_or_list<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrList {
        List(Vec<String>),
        One(String),
    }

    Ok(
        match Option::<StringOrList>::deserialize(deserializer)? {
            Some(StringOrList::List(list)) => list,
            Some(StringOrList::One(s)) if s.trim().is_empty() => Vec::new(),
            Some(StringOrList::One(s)) => vec![s],
            None => Vec::new(),
        },
    )
}

fn string_or_null<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}
