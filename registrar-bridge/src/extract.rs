//! Metadata extraction: raw container records to normalized bundles.

use std::collections::HashMap;

use registrar_common::{Error, Result, ServicePort};

use crate::metadata::{ContainerMetadata, ContainerSpec};
use crate::runtime::{
    APPLICATION_KIND, CONTAINER_KIND_LABEL, CONTAINER_METADATA_EXTENSION, ContainerRecord,
    POD_UID_LABEL, PORTS_ANNOTATION, RuntimeClient, SANDBOX_METADATA_EXTENSION,
};

/// Environment variable that opts a container out of registration entirely.
pub const SERVICE_IGNORE_ENV: &str = "SERVICE_IGNORE";

/// Normalized bundle for one scheduled application container.
///
/// Built fresh on every add; never cached.
#[derive(Debug, Clone)]
pub struct ScheduledContainer {
    pub id: String,
    pub name: String,
    pub record: ContainerRecord,
    pub metadata: ContainerMetadata,
    pub spec: ContainerSpec,
    pub sandbox_record: ContainerRecord,
    pub sandbox_metadata: ContainerMetadata,
}

/// Fetch and normalize one container's scheduling metadata.
///
/// Returns `Ok(None)` for containers the bridge must silently skip: ids that
/// no longer exist, containers the orchestrator did not schedule, and
/// sandboxes. Any fetch or parse failure on a required field is an error.
pub async fn scheduled_container(
    runtime: &dyn RuntimeClient,
    container_id: &str,
) -> Result<Option<ScheduledContainer>> {
    let Some(record) = runtime.get_container(container_id).await? else {
        return Ok(None);
    };

    if record
        .labels
        .get(POD_UID_LABEL)
        .is_none_or(|uid| uid.is_empty())
    {
        return Ok(None);
    }

    if record.labels.get(CONTAINER_KIND_LABEL).map(String::as_str) != Some(APPLICATION_KIND) {
        return Ok(None);
    }

    let Some(metadata_value) = record.extensions.get(CONTAINER_METADATA_EXTENSION) else {
        return Ok(None);
    };
    let metadata = ContainerMetadata::from_value(metadata_value)
        .map_err(|e| Error::metadata(container_id, format!("unreadable container metadata: {e}")))?;

    let sandbox_id = metadata.metadata.sandbox_id.clone();
    if sandbox_id.is_empty() {
        return Err(Error::metadata(container_id, "metadata names no sandbox"));
    }

    let Some(sandbox_record) = runtime.get_container(&sandbox_id).await? else {
        return Err(Error::metadata(
            container_id,
            format!("sandbox {sandbox_id} not found"),
        ));
    };
    let sandbox_metadata = sandbox_record
        .extensions
        .get(SANDBOX_METADATA_EXTENSION)
        .ok_or_else(|| Error::metadata(container_id, "sandbox metadata missing"))
        .and_then(|value| {
            ContainerMetadata::from_value(value).map_err(|e| {
                Error::metadata(container_id, format!("unreadable sandbox metadata: {e}"))
            })
        })?;

    let spec = ContainerSpec::from_value(&record.spec)
        .map_err(|e| Error::metadata(container_id, format!("unreadable container spec: {e}")))?;

    let name = metadata.metadata.name.clone();
    Ok(Some(ScheduledContainer {
        id: container_id.to_string(),
        name,
        record,
        metadata,
        spec,
        sandbox_record,
        sandbox_metadata,
    }))
}

/// Extract the declared port mappings of a container as service ports,
/// keyed by stringified port number.
///
/// Yields nothing when the container opted out via the ignore marker or
/// declares no ports. A malformed ports annotation is logged and downgraded
/// to "no ports".
pub fn container_ports(container: &ScheduledContainer) -> HashMap<String, ServicePort> {
    let mut ports = HashMap::new();

    if container
        .spec
        .env(SERVICE_IGNORE_ENV)
        .is_some_and(|v| !v.is_empty())
    {
        tracing::info!(container = %container.id, "Ignored: opt-out marker set");
        return ports;
    }

    let annotations = &container.metadata.metadata.config.annotations;
    if annotations
        .get(PORTS_ANNOTATION)
        .is_none_or(|v| v.is_empty())
    {
        return ports;
    }

    let mappings = match container.metadata.port_mappings() {
        Ok(mappings) => mappings,
        Err(e) => {
            tracing::warn!(container = %container.id, error = %e, "Unparseable ports annotation");
            return ports;
        }
    };

    for mapping in mappings {
        let port = ServicePort {
            exposed_port: mapping.container_port.to_string(),
            exposed_ip: container.sandbox_metadata.metadata.ip.clone(),
            port_type: mapping.protocol.to_lowercase(),
            container_hostname: container.spec.env("HOSTNAME").unwrap_or_default().to_string(),
            container_id: container.id.clone(),
            container_name: container.name.clone(),
        };
        ports.insert(port.exposed_port.clone(), port);
    }

    ports
}
