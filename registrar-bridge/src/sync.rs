//! Reconciliation engine: full resync between local state, the runtime's
//! live container list, and the external registry.

use std::collections::HashSet;
use std::sync::Arc;

use registrar_common::{Result, ServiceId};

use crate::bridge::Bridge;
use crate::runtime::ProcessStatus;

impl Bridge {
    /// Run one full reconciliation pass.
    ///
    /// In quiet mode (periodic resync) a failed container listing is logged
    /// and the pass is skipped; in non-quiet mode (startup) it is returned as
    /// an error and the caller treats it as fatal.
    ///
    /// Holds the state lock for the whole pass, so it never interleaves with
    /// concurrent add/remove handlers. Stale-container removals are spawned
    /// and run after the pass releases the lock.
    pub async fn sync(self: Arc<Self>, quiet: bool) -> Result<()> {
        let mut state = self.state.lock().await;

        let container_ids = match self.runtime.list_containers().await {
            Ok(ids) => ids,
            Err(e) if quiet => {
                tracing::warn!(error = %e, "Failed to list containers, skipping sync");
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        tracing::debug!(containers = container_ids.len(), "Syncing");

        for container_id in &container_ids {
            match state.services.get(container_id).cloned() {
                // Discovered outside the event stream, register it now.
                None => self.add_locked(&mut state, container_id, quiet).await,
                // Already tracked: re-register to repair registry-side loss,
                // e.g. after a backend restart.
                Some(services) => {
                    for service in &services {
                        if let Err(e) = self.registry.register(service).await {
                            tracing::warn!(service = %service.id, error = %e, "Sync register failed");
                        }
                    }
                }
            }
        }

        if !self.config.cleanup {
            return Ok(());
        }

        // A tracked container that is no longer running vanished without a
        // delivered delete event; route it through the normal exit path.
        let mut running = HashSet::new();
        for container_id in &container_ids {
            if matches!(
                self.runtime.get_status(container_id).await,
                Ok(ProcessStatus::Running)
            ) {
                running.insert(container_id.as_str());
            }
        }
        for container_id in state.services.keys() {
            if !running.contains(container_id.as_str()) {
                tracing::info!(container = %container_id, "Stale, scheduling removal");
                let bridge = Arc::clone(&self);
                let container_id = container_id.clone();
                tokio::spawn(async move {
                    bridge.remove_on_exit(&container_id).await;
                });
            }
        }

        tracing::debug!("Cleaning up dangling services");
        let registered = match self.registry.services(self.agent_id()).await {
            Ok(services) => services,
            Err(e) => {
                tracing::warn!(error = %e, "Cleanup failed");
                return Ok(());
            }
        };

        'outer: for ext_service in &registered {
            let Some(parsed) = ServiceId::parse(&ext_service.id) else {
                // not minted by a registrar daemon, leave it alone
                continue;
            };
            if parsed.hostname != self.hostname {
                // owned by a daemon on a different host sharing the registry
                continue;
            }
            for services in state.services.values() {
                for service in services {
                    if service.name == ext_service.name
                        && service.origin.container_name == parsed.container_name
                    {
                        continue 'outer;
                    }
                }
            }

            tracing::info!(service = %ext_service.id, "Dangling");
            match self.registry.deregister(ext_service).await {
                Err(e) => {
                    tracing::warn!(service = %ext_service.id, error = %e, "Deregister failed");
                }
                Ok(()) => {
                    tracing::info!(service = %ext_service.id, "Removed");
                }
            }
        }

        Ok(())
    }
}
