//! Capability interface to the external service registry.

use async_trait::async_trait;

use registrar_common::{Result, Service};

/// Registry backend adapter consumed by the bridge engine.
///
/// Implementations are expected to be safe for concurrent use and to apply
/// their own network timeouts; the bridge holds its state lock across these
/// calls and must never block indefinitely in them.
#[async_trait]
pub trait RegistryAdapter: Send + Sync {
    /// Register this daemon as an agent node and return its agent id.
    async fn register_agent_node(&self, data_center_id: &str, host_ip: &str) -> Result<String>;

    /// Verify connectivity and identity with the registry.
    async fn ping(&self, agent_id: &str) -> Result<()>;

    /// Register one service.
    async fn register(&self, service: &Service) -> Result<()>;

    /// Deregister one service.
    async fn deregister(&self, service: &Service) -> Result<()>;

    /// Send a TTL heartbeat for one service.
    async fn refresh(&self, service: &Service) -> Result<()>;

    /// List the services owned by the given agent.
    async fn services(&self, agent_id: &str) -> Result<Vec<Service>>;
}
