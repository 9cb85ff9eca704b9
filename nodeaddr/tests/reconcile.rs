//! End-to-end reconciliation tests against the in-memory store.

use std::sync::Arc;

use nodeaddr::{
    ClusterConfig, ConfigStore, InMemoryStore, IpFamily, MachineAddress, MachineAddressType,
    NodeAddressReconciler, NodeConfig, POD_DRIVER, RawNodeAddresses, Reconciler, StackMode,
};
use serde_json::json;

fn cluster(value: serde_json::Value) -> ClusterConfig {
    serde_json::from_value(value).unwrap()
}

#[tokio::test]
async fn test_machine_status_to_kubelet_config() {
    let store = InMemoryStore::new(cluster(json!({
        "cluster-cidr": "10.42.0.0/16,2001:cafe:42:0::/56",
        "service-cidr": "10.43.0.0/16,2001:cafe:43:0::/112",
    })));
    store
        .insert_node_config(
            "worker-1",
            serde_json::from_value::<NodeConfig>(json!({
                "node-ip": "192.168.10.4",
                "node-label": ["zone=a"],
            }))
            .unwrap(),
        )
        .await;

    let status_addresses = vec![
        MachineAddress::new(MachineAddressType::Hostname, "worker-1"),
        MachineAddress::new(MachineAddressType::InternalIp, "10.0.0.5"),
        MachineAddress::new(MachineAddressType::InternalIp, "2001:db8::5"),
        MachineAddress::new(MachineAddressType::ExternalIp, "1.2.3.4"),
        MachineAddress::new(MachineAddressType::ExternalIp, "2001:db8::5"),
        MachineAddress::new(MachineAddressType::ExternalIp, "2001:db8:ffff::1"),
    ];
    let raw = RawNodeAddresses::from_machine_addresses("vsphere", &status_addresses);

    let reconciler = NodeAddressReconciler::new(store);
    let status = reconciler.reconcile("worker-1", &raw).await.unwrap();
    assert_eq!(
        status.stack,
        StackMode::DualStack {
            primary: IpFamily::Ipv4
        }
    );

    let stored = reconciler
        .store()
        .node_config("worker-1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        serde_json::to_value(&stored).unwrap(),
        json!({
            "node-ip": ["192.168.10.4", "10.0.0.5", "2001:db8::5"],
            "node-external-ip": ["1.2.3.4", "2001:db8:ffff::1"],
            "cloud-provider-name": "",
            "node-label": ["zone=a"],
        })
    );
}

#[tokio::test]
async fn test_stack_change_appends_new_family() {
    let store = InMemoryStore::new(ClusterConfig::with_cluster_cidr("10.42.0.0/16"));
    let reconciler = NodeAddressReconciler::new(store);
    let raw = RawNodeAddresses::new("amazonec2")
        .internal(["10.0.0.5"])
        .external(["1.2.3.4", "2001:db8::ffff"])
        .ipv6("2001:db8::1");

    let status = reconciler.reconcile("node-1", &raw).await.unwrap();
    assert_eq!(status.node_ip, vec!["10.0.0.5"]);
    assert_eq!(status.node_external_ip, vec!["1.2.3.4"]);

    reconciler
        .store()
        .set_cluster_config(ClusterConfig::with_cluster_cidr(
            "10.42.0.0/16,2001:cafe:42:0::/56",
        ))
        .await;

    let status = reconciler.reconcile("node-1", &raw).await.unwrap();
    assert!(status.changed);
    assert_eq!(status.node_ip, vec!["10.0.0.5", "2001:db8::1"]);
    assert_eq!(status.node_external_ip, vec!["1.2.3.4", "2001:db8::ffff"]);
}

#[tokio::test]
async fn test_pod_driver_node_gets_no_addresses() {
    let store = InMemoryStore::new(ClusterConfig::with_cluster_cidr(
        "10.42.0.0/16,2001:cafe:42:0::/56",
    ));
    let reconciler = NodeAddressReconciler::new(store);
    let raw = RawNodeAddresses::new(POD_DRIVER)
        .internal(["10.10.10.5"])
        .external(["172.16.1.5"]);

    let status = reconciler.reconcile("pod-node", &raw).await.unwrap();
    assert!(!status.changed);
    assert!(status.node_ip.is_empty());
    assert!(status.node_external_ip.is_empty());
    assert!(
        reconciler
            .store()
            .node_config("pod-node")
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn test_nodes_reconcile_concurrently() {
    let store = InMemoryStore::new(ClusterConfig::with_cluster_cidr("10.42.0.0/16"));
    let reconciler = Arc::new(NodeAddressReconciler::new(store));

    let mut handles = Vec::new();
    for i in 0..16u8 {
        let reconciler = Arc::clone(&reconciler);
        handles.push(tokio::spawn(async move {
            let raw = RawNodeAddresses::new("digitalocean")
                .internal([format!("10.0.0.{i}")])
                .external([format!("203.0.113.{i}")]);
            reconciler.reconcile(&format!("node-{i}"), &raw).await
        }));
    }
    for handle in handles {
        assert!(handle.await.unwrap().unwrap().changed);
    }

    for i in 0..16u8 {
        let config = reconciler
            .store()
            .node_config(&format!("node-{i}"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(config.node_ip, vec![format!("10.0.0.{i}")]);
        assert_eq!(config.node_external_ip, vec![format!("203.0.113.{i}")]);
    }
}

#[tokio::test]
async fn test_config_file_round_trip_through_reconcile() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("worker.json");
    tokio::fs::write(
        &path,
        r#"{"node-ip": ["10.0.0.5"], "cloud-provider-name": "aws", "kubelet-arg": ["v=2"]}"#,
    )
    .await
    .unwrap();

    let store = InMemoryStore::new(ClusterConfig::default());
    store
        .insert_node_config("worker", NodeConfig::load(&path).await.unwrap())
        .await;
    let reconciler = NodeAddressReconciler::new(store);

    let raw = RawNodeAddresses::new("amazonec2")
        .internal(["10.0.0.5", "10.0.0.6"])
        .external(["54.1.2.3"]);
    let status = reconciler.reconcile("worker", &raw).await.unwrap();
    assert!(status.changed);

    let updated = reconciler
        .store()
        .node_config("worker")
        .await
        .unwrap()
        .unwrap();
    updated.save(&path).await.unwrap();

    let reloaded = NodeConfig::load(&path).await.unwrap();
    assert_eq!(reloaded.node_ip, vec!["10.0.0.5", "10.0.0.6"]);
    assert!(reloaded.node_external_ip.is_empty());
    assert_eq!(reloaded.cloud_provider_name, "aws");
    assert_eq!(reloaded.extra.get("kubelet-arg"), Some(&json!(["v=2"])));
}
