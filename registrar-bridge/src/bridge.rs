//! The bridge state manager: container ids to registered services.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use tokio::sync::Mutex;

use registrar_common::{BridgeConfig, DeadContainer, DeregisterPolicy, Result, Service};

use crate::adapter::RegistryAdapter;
use crate::builder;
use crate::extract;
use crate::runtime::{ProcessStatus, RuntimeClient};

/// Mutable bridge state. Both maps share one lock; a container id lives in
/// at most one of them at any time.
#[derive(Default)]
pub(crate) struct BridgeState {
    pub(crate) services: HashMap<String, Vec<Service>>,
    pub(crate) dead_containers: HashMap<String, DeadContainer>,
}

/// Point-in-time view of the bridge state, for status reporting and tests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BridgeSnapshot {
    /// Live service ids per container.
    pub live: HashMap<String, Vec<String>>,
    /// Remaining grace seconds per dead container.
    pub dead: HashMap<String, i64>,
}

/// The concurrent state manager mapping containers to registered services.
///
/// All mutations serialize through one exclusive lock held for the full
/// operation, including the registry calls it makes. Event handlers and the
/// periodic timers may therefore run concurrently against the same bridge.
pub struct Bridge {
    pub(crate) registry: Arc<dyn RegistryAdapter>,
    pub(crate) runtime: Arc<dyn RuntimeClient>,
    pub(crate) config: BridgeConfig,
    pub(crate) hostname: String,
    agent_id: OnceLock<String>,
    pub(crate) state: Mutex<BridgeState>,
}

impl Bridge {
    /// Create a bridge over the given runtime and registry.
    ///
    /// `hostname` is resolved once by the caller and embedded into every
    /// minted service ID.
    pub fn new(
        runtime: Arc<dyn RuntimeClient>,
        registry: Arc<dyn RegistryAdapter>,
        config: BridgeConfig,
        hostname: impl Into<String>,
    ) -> Self {
        Self {
            runtime,
            registry,
            config,
            hostname: hostname.into(),
            agent_id: OnceLock::new(),
            state: Mutex::new(BridgeState::default()),
        }
    }

    /// The agent id obtained at the first successful handshake, or "" before.
    pub fn agent_id(&self) -> &str {
        self.agent_id.get().map(String::as_str).unwrap_or("")
    }

    /// Verify registry connectivity and obtain this daemon's agent identity.
    ///
    /// The agent id is assigned once and stays immutable for the process
    /// lifetime; later pings only verify connectivity.
    pub async fn ping(&self) -> Result<()> {
        self.registry.ping(self.agent_id()).await?;
        let agent_id = self
            .registry
            .register_agent_node(&self.config.data_center_id, &self.config.host_ip)
            .await?;
        let _ = self.agent_id.set(agent_id);
        Ok(())
    }

    /// Register the services of a started container.
    ///
    /// Idempotent: a duplicate start event for a live container is a no-op,
    /// and a container returning from the dead-grace set gets its prior
    /// services back without touching the registry.
    pub async fn add(&self, container_id: &str) {
        let mut state = self.state.lock().await;
        self.add_locked(&mut state, container_id, false).await;
    }

    /// Remove a container, always deregistering its services.
    pub async fn remove(&self, container_id: &str) {
        let mut state = self.state.lock().await;
        self.remove_locked(&mut state, container_id, true).await;
    }

    /// Remove an exited container, consulting the deregistration policy.
    pub async fn remove_on_exit(&self, container_id: &str) {
        let deregister = self.should_remove(container_id).await;
        let mut state = self.state.lock().await;
        self.remove_locked(&mut state, container_id, deregister).await;
    }

    /// Decay dead-container grace periods and heartbeat every live service.
    pub async fn refresh(&self) {
        let mut state = self.state.lock().await;

        let interval = self.config.refresh_interval as i64;
        state.dead_containers.retain(|container_id, dead| {
            dead.ttl -= interval;
            if dead.ttl < 0 {
                // abandoned, the registry expires the services via TTL
                tracing::debug!(container = %container_id, "Grace period expired");
                false
            } else {
                true
            }
        });

        for (container_id, services) in &state.services {
            for service in services {
                match self.registry.refresh(service).await {
                    Err(e) => {
                        tracing::warn!(service = %service.id, error = %e, "Refresh failed");
                    }
                    Ok(()) => {
                        tracing::debug!(container = %container_id, service = %service.id, "Refreshed");
                    }
                }
            }
        }
    }

    /// Take a consistent snapshot of the live and dead maps.
    pub async fn snapshot(&self) -> BridgeSnapshot {
        let state = self.state.lock().await;
        BridgeSnapshot {
            live: state
                .services
                .iter()
                .map(|(id, services)| {
                    (
                        id.clone(),
                        services.iter().map(|s| s.id.clone()).collect(),
                    )
                })
                .collect(),
            dead: state
                .dead_containers
                .iter()
                .map(|(id, dead)| (id.clone(), dead.ttl))
                .collect(),
        }
    }

    pub(crate) async fn add_locked(
        &self,
        state: &mut BridgeState,
        container_id: &str,
        quiet: bool,
    ) {
        if let Some(dead) = state.dead_containers.remove(container_id) {
            state
                .services
                .insert(container_id.to_string(), dead.services);
        }

        if state.services.contains_key(container_id) {
            tracing::debug!(container = %container_id, "Already registered, ignoring");
            return;
        }

        let container = match extract::scheduled_container(self.runtime.as_ref(), container_id)
            .await
        {
            Ok(Some(container)) => container,
            Ok(None) => {
                tracing::debug!(container = %container_id, "Not a scheduled application container");
                return;
            }
            Err(e) => {
                tracing::warn!(container = %container_id, error = %e, "Metadata extraction failed");
                return;
            }
        };

        let ports = extract::container_ports(&container);
        if ports.is_empty() {
            if !quiet {
                tracing::info!(container = %container_id, "Ignored: no published ports");
            }
            return;
        }

        let is_group = ports.len() > 1;
        let envs = &container.metadata.metadata.config.envs;
        for port in ports.values() {
            let Some(service) =
                builder::build_service(envs, port, is_group, &self.hostname, &self.config)
            else {
                if !quiet {
                    tracing::info!(
                        container = %container.id,
                        port = %port.exposed_port,
                        "Ignored service on port"
                    );
                }
                continue;
            };

            // Partial success is the committed state: a failed port does not
            // roll back its siblings.
            if let Err(e) = self.registry.register(&service).await {
                tracing::warn!(service = %service.id, error = %e, "Register failed");
                continue;
            }
            tracing::info!(container = %container.id, service = %service.id, "Added");
            state
                .services
                .entry(container.id.clone())
                .or_default()
                .push(service);
        }
    }

    pub(crate) async fn remove_locked(
        &self,
        state: &mut BridgeState,
        container_id: &str,
        deregister: bool,
    ) {
        let live = state.services.remove(container_id).unwrap_or_default();

        if deregister {
            self.deregister_all(container_id, &live).await;
            if let Some(dead) = state.dead_containers.remove(container_id) {
                self.deregister_all(container_id, &dead.services).await;
            }
        } else if self.config.refresh_ttl != 0 && !live.is_empty() {
            // stop refreshing these, but let the registry TTL them out
            state.dead_containers.insert(
                container_id.to_string(),
                DeadContainer {
                    ttl: self.config.refresh_ttl as i64,
                    services: live,
                },
            );
        }
    }

    async fn deregister_all(&self, container_id: &str, services: &[Service]) {
        for service in services {
            match self.registry.deregister(service).await {
                Err(e) => {
                    tracing::warn!(service = %service.id, error = %e, "Deregister failed");
                }
                Ok(()) => {
                    tracing::info!(container = %container_id, service = %service.id, "Removed");
                }
            }
        }
    }

    async fn should_remove(&self, container_id: &str) -> bool {
        if self.config.deregister == DeregisterPolicy::Always {
            return true;
        }
        match self.runtime.get_status(container_id).await {
            Ok(ProcessStatus::Running) => false,
            Ok(_) => true,
            // can't tell, keep the services until we can
            Err(_) => false,
        }
    }
}
