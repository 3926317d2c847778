//! Parsers for the orchestrator metadata attached to container records.
//!
//! The runtime stores two JSON payloads of interest: the scheduler's
//! container/sandbox metadata extension (identity, sandbox linkage, network
//! IP, declared ports, environment) and the OCI-style runtime spec (process
//! environment). Field names follow the payloads as the orchestrator writes
//! them.

use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

use registrar_common::Result;

use crate::runtime::PORTS_ANNOTATION;

/// Orchestrator metadata extension of a container or sandbox.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ContainerMetadata {
    #[serde(rename = "Version")]
    pub version: String,
    #[serde(rename = "Metadata")]
    pub metadata: MetadataBody,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MetadataBody {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "SandBoxID", alias = "SandboxID")]
    pub sandbox_id: String,
    /// Network namespace IP; only populated on sandbox metadata.
    #[serde(rename = "IP")]
    pub ip: String,
    #[serde(rename = "LogPath")]
    pub log_path: String,
    #[serde(rename = "Config")]
    pub config: MetadataConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MetadataConfig {
    #[serde(rename = "HostName")]
    pub hostname: String,
    #[serde(rename = "Labels")]
    pub labels: HashMap<String, String>,
    #[serde(rename = "Annotations")]
    pub annotations: HashMap<String, String>,
    #[serde(rename = "Envs")]
    pub envs: Vec<EnvEntry>,
}

/// One declared environment variable from the scheduler config.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EnvEntry {
    #[serde(rename = "Key")]
    pub key: String,
    #[serde(rename = "Value")]
    pub value: String,
}

/// One entry of the declared-ports annotation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PortMapping {
    pub name: String,
    pub host_port: i32,
    pub container_port: i32,
    pub protocol: String,
}

impl ContainerMetadata {
    /// Parse the metadata extension payload.
    pub fn from_value(value: &Value) -> Result<Self> {
        Ok(serde_json::from_value(value.clone())?)
    }

    /// Parse the declared port mappings out of the ports annotation.
    ///
    /// An absent or empty annotation yields no mappings; a malformed one is
    /// an error the caller downgrades to "no ports".
    pub fn port_mappings(&self) -> Result<Vec<PortMapping>> {
        let Some(ports_json) = self.metadata.config.annotations.get(PORTS_ANNOTATION) else {
            return Ok(Vec::new());
        };
        if ports_json.is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(ports_json)?)
    }
}

/// OCI-style runtime spec, reduced to what the bridge reads.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ContainerSpec {
    pub oci_version: String,
    pub process: SpecProcess,
    pub annotations: HashMap<String, String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SpecProcess {
    pub env: Vec<String>,
    pub args: Vec<String>,
}

impl ContainerSpec {
    /// Parse the runtime spec payload.
    pub fn from_value(value: &Value) -> Result<Self> {
        Ok(serde_json::from_value(value.clone())?)
    }

    /// Look up one `KEY=value` entry of the process environment.
    pub fn env(&self, key: &str) -> Option<&str> {
        self.process.env.iter().find_map(|entry| {
            let (k, v) = entry.split_once('=')?;
            (k == key).then_some(v)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_container_metadata() {
        let value = json!({
            "Version": "v1",
            "Metadata": {
                "ID": "c1",
                "Name": "web",
                "SandBoxID": "sb1",
                "Config": {
                    "Annotations": {
                        "io.kubernetes.container.ports":
                            r#"[{"name":"http","containerPort":8080,"protocol":"TCP"}]"#
                    },
                    "Envs": [{"Key": "SERVICE_NAME", "Value": "webapp"}]
                }
            }
        });

        let meta = ContainerMetadata::from_value(&value).unwrap();
        assert_eq!(meta.metadata.name, "web");
        assert_eq!(meta.metadata.sandbox_id, "sb1");
        assert_eq!(meta.metadata.config.envs[0].key, "SERVICE_NAME");

        let mappings = meta.port_mappings().unwrap();
        assert_eq!(mappings.len(), 1);
        assert_eq!(mappings[0].container_port, 8080);
        assert_eq!(mappings[0].protocol, "TCP");
    }

    #[test]
    fn test_missing_ports_annotation_is_empty() {
        let meta = ContainerMetadata::default();
        assert!(meta.port_mappings().unwrap().is_empty());
    }

    #[test]
    fn test_malformed_ports_annotation_is_error() {
        let value = json!({
            "Metadata": {
                "Config": {
                    "Annotations": {"io.kubernetes.container.ports": "not json"}
                }
            }
        });
        let meta = ContainerMetadata::from_value(&value).unwrap();
        assert!(meta.port_mappings().is_err());
    }

    #[test]
    fn test_spec_env_lookup() {
        let value = json!({
            "ociVersion": "1.0.2",
            "process": {"env": ["PATH=/bin", "HOSTNAME=web-host", "EMPTY="]}
        });
        let spec = ContainerSpec::from_value(&value).unwrap();
        assert_eq!(spec.env("HOSTNAME"), Some("web-host"));
        assert_eq!(spec.env("EMPTY"), Some(""));
        assert_eq!(spec.env("MISSING"), None);
    }
}
