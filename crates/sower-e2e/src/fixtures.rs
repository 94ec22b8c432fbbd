//! Shared request fixtures for tests and examples.

use std::net::{IpAddr, Ipv4Addr};

use sower_proto::{CloudConfigPayload, UserDataRequest};

/// Builds a user-data request for a small test machine.
#[must_use]
pub fn sample_request() -> UserDataRequest {
    UserDataRequest {
        machine_spec: serde_json::json!({
            "name": "worker-0",
            "versions": { "kubelet": "1.29.4" },
        }),
        kubeconfig: "apiVersion: v1\nkind: Config\nclusters: []\n".to_owned(),
        cloud_config: CloudConfigPayload {
            provider: "fake".to_owned(),
            content: "[Global]\nzone = \"eu-west-1\"\n".to_owned(),
        },
        dns_ips: vec![IpAddr::V4(Ipv4Addr::new(10, 10, 10, 10))],
        external_cloud_provider: false,
    }
}
