//! Request and response payloads for the plugin remote operations.
//!
//! The user-data payloads are caller-owned data the manager forwards
//! without inspection; only the plugin interprets them.

use std::net::IpAddr;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Identity-check request. Carries no payload.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct PingRequest {}

/// Identity-check response.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct PingResponse {
    /// Path of the executable the answering plugin was started from.
    pub executable: PathBuf,
}

/// Opaque cloud-provider configuration forwarded to the plugin.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct CloudConfigPayload {
    /// Name of the cloud provider the configuration targets.
    pub provider: String,
    /// Rendered cloud-config content.
    pub content: String,
}

/// User-data generation request.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct UserDataRequest {
    /// Machine specification as provided by the reconciliation layer.
    pub machine_spec: serde_json::Value,
    /// Kubeconfig the booted machine joins the cluster with.
    pub kubeconfig: String,
    /// Cloud-provider configuration payload.
    pub cloud_config: CloudConfigPayload,
    /// Cluster DNS server addresses.
    pub dns_ips: Vec<IpAddr>,
    /// Whether an external cloud-controller-manager manages the machine.
    pub external_cloud_provider: bool,
}

/// User-data generation response.
///
/// An empty `err` field means success. A non-empty `err` is an
/// application-level failure (for example an unsupported machine
/// configuration), distinct from a transport failure.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct UserDataResponse {
    /// Generated bootstrap document. Empty on failure.
    pub user_data: String,
    /// Application-level failure message. Empty on success.
    pub err: String,
}

impl UserDataResponse {
    /// Builds a successful response carrying `user_data`.
    #[must_use]
    pub fn data(user_data: impl Into<String>) -> Self {
        Self {
            user_data: user_data.into(),
            err: String::new(),
        }
    }

    /// Builds a failed response carrying `message`.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            user_data: String::new(),
            err: message.into(),
        }
    }

    /// Returns `true` when the response reports success.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.err.is_empty()
    }
}
