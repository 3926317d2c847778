//! Capability interface to the container runtime.
//!
//! The bridge never speaks the runtime's wire protocol itself; it consumes
//! this trait and leaves transport, timeouts, and reconnection to the
//! implementation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::mpsc;

use registrar_common::{Error, Result};

/// Label carrying the orchestrator pod uid. Absent on containers the
/// orchestrator did not schedule.
pub const POD_UID_LABEL: &str = "io.kubernetes.pod.uid";

/// Label distinguishing application containers from sandboxes.
pub const CONTAINER_KIND_LABEL: &str = "io.cri-containerd.kind";

/// Kind label value for an application container (sandboxes carry "sandbox").
pub const APPLICATION_KIND: &str = "container";

/// Extension holding the orchestrator's container metadata payload.
pub const CONTAINER_METADATA_EXTENSION: &str = "io.cri-containerd.container.metadata";

/// Extension holding the sandbox metadata payload (network namespace IP).
pub const SANDBOX_METADATA_EXTENSION: &str = "io.cri-containerd.sandbox.metadata";

/// Annotation listing the container's declared port mappings.
pub const PORTS_ANNOTATION: &str = "io.kubernetes.container.ports";

/// Event topic delivered when a container task starts.
pub const TASK_START_TOPIC: &str = "/tasks/start";

/// Event topic delivered when a container task is deleted.
pub const TASK_DELETE_TOPIC: &str = "/tasks/delete";

/// Raw container record as fetched from the runtime.
///
/// Labels and extensions are kept opaque here; [`crate::metadata`] parses the
/// orchestrator payloads out of them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContainerRecord {
    pub id: String,
    #[serde(default)]
    pub labels: HashMap<String, String>,
    #[serde(default)]
    pub extensions: HashMap<String, Value>,
    /// OCI-style runtime spec, parsed lazily.
    #[serde(default)]
    pub spec: Value,
}

/// Process status of a container task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessStatus {
    Created,
    Running,
    Stopped,
    Paused,
    Unknown,
}

/// One lifecycle notification from the runtime's event subscription.
#[derive(Debug, Clone)]
pub struct EventEnvelope {
    pub topic: String,
    pub payload: Value,
}

/// Payload of a task-start or task-delete event.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskEvent {
    pub container_id: String,
}

/// Event subscription handle: a stream of envelopes plus a stream of
/// delivery errors, torn down together when the subscription drops.
pub struct EventStream {
    pub events: mpsc::Receiver<EventEnvelope>,
    pub errors: mpsc::Receiver<Error>,
}

/// Capability interface consumed by the bridge engine.
#[async_trait]
pub trait RuntimeClient: Send + Sync {
    /// List the ids of all containers currently known to the runtime.
    async fn list_containers(&self) -> Result<Vec<String>>;

    /// Fetch one container record.
    ///
    /// `Ok(None)` means the container no longer exists; callers skip it
    /// silently rather than treating it as a failure.
    async fn get_container(&self, container_id: &str) -> Result<Option<ContainerRecord>>;

    /// Fetch the process status of a container's task.
    async fn get_status(&self, container_id: &str) -> Result<ProcessStatus>;

    /// Subscribe to lifecycle events.
    async fn subscribe(&self) -> Result<EventStream>;
}
