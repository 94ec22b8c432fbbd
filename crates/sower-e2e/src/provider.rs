//! A minimal Ubuntu user-data provider for end-to-end tests.

use std::fmt::Write as _;

use serde_json::Value;

use sower_plugin::{ProviderError, UserDataProvider};
use sower_proto::UserDataRequest;

/// Renders a small cloud-init document for test machines.
///
/// The rendering is intentionally shallow; it exists so the end-to-end
/// tests exercise a plugin that actually consumes every request field,
/// not to model a production image.
#[derive(Debug, Default)]
pub struct UbuntuProvider;

impl UserDataProvider for UbuntuProvider {
    fn user_data(&self, request: &UserDataRequest) -> Result<String, ProviderError> {
        if request.machine_spec.is_null() {
            return Err(ProviderError::new("machine spec is empty"));
        }

        let mut doc = String::from("#cloud-config\n");
        if let Some(name) = request.machine_spec.get("name").and_then(Value::as_str) {
            let _ = writeln!(doc, "hostname: {name}");
        }
        doc.push_str("manage_etc_hosts: true\n");

        doc.push_str("write_files:\n");
        push_file(&mut doc, "/etc/kubernetes/kubeconfig", &request.kubeconfig);
        push_file(
            &mut doc,
            "/etc/kubernetes/cloud-config",
            &request.cloud_config.content,
        );

        if !request.dns_ips.is_empty() {
            let servers: Vec<String> = request
                .dns_ips
                .iter()
                .map(std::string::ToString::to_string)
                .collect();
            let _ = writeln!(doc, "resolv_conf:\n  nameservers: [{}]", servers.join(", "));
        }
        if request.external_cloud_provider {
            let _ = writeln!(
                doc,
                "# kubelet runs with --cloud-provider=external ({})",
                request.cloud_config.provider
            );
        }
        Ok(doc)
    }
}

fn push_file(doc: &mut String, path: &str, content: &str) {
    let _ = writeln!(doc, "- path: {path}");
    doc.push_str("  content: |\n");
    for line in content.lines() {
        let _ = writeln!(doc, "    {line}");
    }
}
