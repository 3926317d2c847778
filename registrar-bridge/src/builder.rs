//! Service construction from port mappings and environment metadata.

use std::collections::{HashMap, HashSet};

use registrar_common::{BridgeConfig, Service, ServicePort};

use crate::metadata::EnvEntry;

/// Reserved prefix for service metadata environment variables.
pub const SERVICE_ENV_PREFIX: &str = "SERVICE_";

/// Collect service metadata from the container's declared environment.
///
/// Keys are the `SERVICE_` suffix, lower-cased. A leading numeric segment
/// followed by `_` scopes the attribute to that port: it applies only when
/// building that port's service, and once a port-scoped value has fired for
/// a key, later non-scoped values for the same key are ignored.
///
/// Returns the attribute map and the set of keys that were set port-scoped.
pub fn service_metadata(
    envs: &[EnvEntry],
    port: &str,
) -> (HashMap<String, String>, HashSet<String>) {
    let mut metadata = HashMap::new();
    let mut from_port = HashSet::new();

    for entry in envs {
        let Some(suffix) = entry.key.strip_prefix(SERVICE_ENV_PREFIX) else {
            continue;
        };
        let key = suffix.to_lowercase();
        if from_port.contains(&key) {
            continue;
        }
        match key.split_once('_') {
            Some((qualifier, rest)) if qualifier.parse::<u32>().is_ok() => {
                if qualifier != port {
                    continue;
                }
                metadata.insert(rest.to_string(), entry.value.clone());
                from_port.insert(rest.to_string());
            }
            _ => {
                metadata.insert(key, entry.value.clone());
            }
        }
    }

    (metadata, from_port)
}

/// Build one service descriptor from a declared port mapping.
///
/// Returns `None` to signal "do not register": opted out, no name attribute,
/// or an unusable port number. Never an error; callers log the skip.
pub fn build_service(
    envs: &[EnvEntry],
    port: &ServicePort,
    is_group: bool,
    hostname: &str,
    config: &BridgeConfig,
) -> Option<Service> {
    let (mut metadata, from_port) = service_metadata(envs, &port.exposed_port);

    if metadata.get("ignore").is_some_and(|v| !v.is_empty()) {
        return None;
    }

    let Some(mut name) = metadata.get("name").cloned().filter(|n| !n.is_empty()) else {
        tracing::info!(container = %port.container_id, "Service name not set, skipping");
        return None;
    };
    if is_group && !from_port.contains("name") {
        name = format!("{}-{}", name, port.exposed_port);
    }

    let port_number: u16 = match port.exposed_port.parse() {
        Ok(n) => n,
        Err(e) => {
            tracing::warn!(
                container = %port.container_id,
                port = %port.exposed_port,
                error = %e,
                "Unusable exposed port"
            );
            return None;
        }
    };

    let tags_attr = metadata.get("tags").cloned().unwrap_or_default();
    let id_attr = metadata.get("id").cloned().unwrap_or_default();
    // id/tags/name are structural, not free-form metadata
    for key in ["id", "tags", "name"] {
        metadata.remove(key);
    }

    let mut id = format!("{}:{}:{}", hostname, port.container_name, port.exposed_port);
    let mut tags = combine_tags(&[&tags_attr, &config.force_tags]);
    if port.port_type == "udp" {
        tags.push("udp".to_string());
        id.push_str(":udp");
    }
    if !id_attr.is_empty() {
        id = id_attr;
    }

    Some(Service {
        id,
        name,
        port: port_number,
        ip: port.exposed_ip.clone(),
        tags,
        attrs: metadata,
        ttl: config.refresh_ttl,
        agent_id: String::new(),
        origin: port.clone(),
    })
}

/// Union comma-separated tag lists, preserving order.
fn combine_tags(parts: &[&str]) -> Vec<String> {
    parts
        .iter()
        .flat_map(|part| part.split(','))
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envs(pairs: &[(&str, &str)]) -> Vec<EnvEntry> {
        pairs
            .iter()
            .map(|(k, v)| EnvEntry {
                key: k.to_string(),
                value: v.to_string(),
            })
            .collect()
    }

    fn tcp_port(exposed: &str) -> ServicePort {
        ServicePort {
            exposed_port: exposed.to_string(),
            exposed_ip: "10.0.0.5".to_string(),
            port_type: "tcp".to_string(),
            container_hostname: String::new(),
            container_id: "c1".to_string(),
            container_name: "web".to_string(),
        }
    }

    #[test]
    fn test_port_scoped_value_wins_either_order() {
        let scoped_first = envs(&[("SERVICE_8080_X", "scoped"), ("SERVICE_X", "global")]);
        let (metadata, from_port) = service_metadata(&scoped_first, "8080");
        assert_eq!(metadata["x"], "scoped");
        assert!(from_port.contains("x"));

        let global_first = envs(&[("SERVICE_X", "global"), ("SERVICE_8080_X", "scoped")]);
        let (metadata, _) = service_metadata(&global_first, "8080");
        assert_eq!(metadata["x"], "scoped");
    }

    #[test]
    fn test_scoped_value_for_other_port_is_skipped() {
        let entries = envs(&[("SERVICE_9090_X", "scoped"), ("SERVICE_X", "global")]);
        let (metadata, from_port) = service_metadata(&entries, "8080");
        assert_eq!(metadata["x"], "global");
        assert!(from_port.is_empty());
    }

    #[test]
    fn test_name_required() {
        assert!(build_service(&[], &tcp_port("8080"), false, "host1", &BridgeConfig::default()).is_none());
    }

    #[test]
    fn test_default_id_and_plain_name() {
        let entries = envs(&[("SERVICE_NAME", "webapp")]);
        let service = build_service(
            &entries,
            &tcp_port("8080"),
            false,
            "host1",
            &BridgeConfig::default(),
        )
        .unwrap();
        assert_eq!(service.id, "host1:web:8080");
        assert_eq!(service.name, "webapp");
        assert_eq!(service.port, 8080);
        assert_eq!(service.ip, "10.0.0.5");
    }

    #[test]
    fn test_group_appends_port_unless_name_scoped() {
        let entries = envs(&[("SERVICE_NAME", "webapp")]);
        let service = build_service(
            &entries,
            &tcp_port("8080"),
            true,
            "host1",
            &BridgeConfig::default(),
        )
        .unwrap();
        assert_eq!(service.name, "webapp-8080");

        let entries = envs(&[("SERVICE_8080_NAME", "admin"), ("SERVICE_NAME", "webapp")]);
        let service = build_service(
            &entries,
            &tcp_port("8080"),
            true,
            "host1",
            &BridgeConfig::default(),
        )
        .unwrap();
        assert_eq!(service.name, "admin");
    }

    #[test]
    fn test_udp_gets_id_suffix_and_trailing_tag() {
        let entries = envs(&[("SERVICE_NAME", "dns"), ("SERVICE_TAGS", "core")]);
        let mut port = tcp_port("53");
        port.port_type = "udp".to_string();
        let config = BridgeConfig {
            force_tags: "forced".to_string(),
            ..Default::default()
        };
        let service = build_service(&entries, &port, false, "host1", &config).unwrap();
        assert_eq!(service.id, "host1:web:53:udp");
        assert_eq!(service.tags, vec!["core", "forced", "udp"]);
    }

    #[test]
    fn test_explicit_id_overrides_convention() {
        let entries = envs(&[("SERVICE_NAME", "webapp"), ("SERVICE_ID", "custom-id")]);
        let service = build_service(
            &entries,
            &tcp_port("8080"),
            false,
            "host1",
            &BridgeConfig::default(),
        )
        .unwrap();
        assert_eq!(service.id, "custom-id");
    }

    #[test]
    fn test_structural_keys_stripped_from_attrs() {
        let entries = envs(&[
            ("SERVICE_NAME", "webapp"),
            ("SERVICE_TAGS", "a,b"),
            ("SERVICE_ID", "custom"),
            ("SERVICE_REGION", "east"),
        ]);
        let service = build_service(
            &entries,
            &tcp_port("8080"),
            false,
            "host1",
            &BridgeConfig::default(),
        )
        .unwrap();
        assert_eq!(service.attrs.len(), 1);
        assert_eq!(service.attrs["region"], "east");
    }

    #[test]
    fn test_ignore_attribute_suppresses() {
        let entries = envs(&[("SERVICE_NAME", "webapp"), ("SERVICE_IGNORE", "yes")]);
        assert!(
            build_service(
                &entries,
                &tcp_port("8080"),
                false,
                "host1",
                &BridgeConfig::default()
            )
            .is_none()
        );
    }

    #[test]
    fn test_non_numeric_port_is_skipped() {
        let entries = envs(&[("SERVICE_NAME", "webapp")]);
        assert!(
            build_service(
                &entries,
                &tcp_port("http"),
                false,
                "host1",
                &BridgeConfig::default()
            )
            .is_none()
        );
    }
}
