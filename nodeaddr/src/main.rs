use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use nodeaddr::{
    ClusterConfig, ConfigStore, InMemoryStore, NodeAddressReconciler, NodeConfig,
    RawNodeAddresses, Reconciler, detect_stack,
};

#[derive(Parser)]
#[command(name = "nodeaddr")]
#[command(about = "Resolve kubelet node-ip and node-external-ip values", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the network stack selected by a cluster CIDR value
    Stack {
        /// Comma separated cluster CIDR blocks
        #[arg(long, default_value = "")]
        cluster_cidr: String,
    },
    /// Compute node addresses for one node and print the resulting config
    Resolve {
        /// Node config JSON file to start from
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Write the result back to --config
        #[arg(long, requires = "config")]
        write: bool,

        /// Comma separated cluster CIDR blocks
        #[arg(long, default_value = "")]
        cluster_cidr: String,

        /// Cluster-wide cloud provider name
        #[arg(long, default_value = "")]
        cloud_provider: String,

        /// Infrastructure driver name
        #[arg(long, default_value = "")]
        driver: String,

        /// Internal addresses reported by the driver
        #[arg(long, value_delimiter = ',')]
        internal: Vec<String>,

        /// External addresses reported by the driver
        #[arg(long, value_delimiter = ',')]
        external: Vec<String>,

        /// IPv6 address reported outside the internal list
        #[arg(long)]
        ipv6: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("nodeaddr=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Stack { cluster_cidr } => {
            let stack = detect_stack(Some(cluster_cidr.as_str()))?;
            println!("stack={} primary={}", stack, stack.primary());
        }
        Commands::Resolve {
            config,
            write,
            cluster_cidr,
            cloud_provider,
            driver,
            internal,
            external,
            ipv6,
        } => {
            let node_config = match &config {
                Some(path) => NodeConfig::load(path)
                    .await
                    .with_context(|| format!("Failed to load {}", path.display()))?,
                None => NodeConfig::default(),
            };

            let cluster = ClusterConfig {
                cluster_cidr: Some(cluster_cidr),
                cloud_provider_name: cloud_provider,
                ..Default::default()
            };
            let store = InMemoryStore::new(cluster);
            store.insert_node_config("node", node_config.clone()).await;

            let mut raw = RawNodeAddresses::new(driver)
                .internal(internal)
                .external(external);
            raw.ipv6_address = ipv6;

            let reconciler = NodeAddressReconciler::new(store);
            let status = reconciler.reconcile("node", &raw).await?;
            let result = reconciler
                .store()
                .node_config("node")
                .await?
                .unwrap_or(node_config);

            println!("{}", serde_json::to_string_pretty(&result)?);

            if write && let Some(path) = &config {
                if status.changed {
                    result.save(path).await?;
                    info!(path = %path.display(), "Wrote node config");
                } else {
                    info!(path = %path.display(), "Node config unchanged");
                }
            }
        }
    }

    Ok(())
}
