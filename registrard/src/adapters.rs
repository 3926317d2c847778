//! Registry adapter selection.
//!
//! The scheme of the registry URI picks the backend. Only the `noop` dry-run
//! adapter ships in-tree; real backends plug in here.

use std::sync::Arc;

use async_trait::async_trait;

use registrar_bridge::RegistryAdapter;
use registrar_common::{Error, Result, Service};

/// Resolve a registry URI to an adapter.
pub fn lookup(uri: &str) -> Result<Arc<dyn RegistryAdapter>> {
    let scheme = uri.split_once("://").map_or("", |(scheme, _)| scheme);
    match scheme {
        "noop" => Ok(Arc::new(NoopRegistry)),
        _ => Err(Error::config(format!(
            "unrecognized registry adapter: {uri}"
        ))),
    }
}

/// Dry-run adapter: accepts every operation and owns no remote state.
///
/// Useful for exercising the whole pipeline against a real event stream
/// before pointing the daemon at a production registry.
pub struct NoopRegistry;

#[async_trait]
impl RegistryAdapter for NoopRegistry {
    async fn register_agent_node(&self, data_center_id: &str, host_ip: &str) -> Result<String> {
        tracing::info!(data_center = %data_center_id, ip = %host_ip, "Would register agent node");
        Ok("noop".to_string())
    }

    async fn ping(&self, _agent_id: &str) -> Result<()> {
        Ok(())
    }

    async fn register(&self, service: &Service) -> Result<()> {
        tracing::info!(
            service = %service.id,
            name = %service.name,
            ip = %service.ip,
            port = service.port,
            "Would register"
        );
        Ok(())
    }

    async fn deregister(&self, service: &Service) -> Result<()> {
        tracing::info!(service = %service.id, "Would deregister");
        Ok(())
    }

    async fn refresh(&self, service: &Service) -> Result<()> {
        tracing::debug!(service = %service.id, "Would refresh");
        Ok(())
    }

    async fn services(&self, _agent_id: &str) -> Result<Vec<Service>> {
        Ok(Vec::new())
    }
}
