//! Fixture-backed runtime client for dry runs.
//!
//! Serves container records from a JSON file and emits one task-start event
//! per record, so the full extraction/registration pipeline can be exercised
//! without a container runtime attached.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::mpsc;

use registrar_bridge::runtime::TASK_START_TOPIC;
use registrar_bridge::{ContainerRecord, EventEnvelope, EventStream, ProcessStatus, RuntimeClient};
use registrar_common::{Error, Result};

pub struct FixtureRuntime {
    records: HashMap<String, ContainerRecord>,
    order: Vec<String>,
}

impl FixtureRuntime {
    /// Load container records from a JSON file (a top-level array).
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!(
                "Failed to read fixture file '{}': {}",
                path.display(),
                e
            ))
        })?;
        let records: Vec<ContainerRecord> = serde_json::from_str(&content)?;
        Ok(Self::from_records(records))
    }

    pub fn from_records(records: Vec<ContainerRecord>) -> Self {
        let order: Vec<String> = records.iter().map(|r| r.id.clone()).collect();
        let records = records.into_iter().map(|r| (r.id.clone(), r)).collect();
        Self { records, order }
    }
}

#[async_trait]
impl RuntimeClient for FixtureRuntime {
    async fn list_containers(&self) -> Result<Vec<String>> {
        Ok(self.order.clone())
    }

    async fn get_container(&self, container_id: &str) -> Result<Option<ContainerRecord>> {
        Ok(self.records.get(container_id).cloned())
    }

    async fn get_status(&self, container_id: &str) -> Result<ProcessStatus> {
        if self.records.contains_key(container_id) {
            Ok(ProcessStatus::Running)
        } else {
            Err(Error::runtime(format!("no task for {container_id}")))
        }
    }

    async fn subscribe(&self) -> Result<EventStream> {
        let (event_tx, events) = mpsc::channel(16);
        let (_error_tx, errors) = mpsc::channel::<Error>(16);
        let ids = self.order.clone();
        tokio::spawn(async move {
            for id in ids {
                let envelope = EventEnvelope {
                    topic: TASK_START_TOPIC.to_string(),
                    payload: json!({"container_id": id}),
                };
                if event_tx.send(envelope).await.is_err() {
                    return;
                }
            }
            // keep the subscription open so the daemon idles instead of
            // treating the stream as torn down
            std::future::pending::<()>().await;
        });
        std::mem::forget(_error_tx);
        Ok(EventStream { events, errors })
    }
}
