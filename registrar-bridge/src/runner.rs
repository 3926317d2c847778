//! Daemon control loop: event dispatch and periodic timers.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::interval;
use tokio_util::sync::CancellationToken;

use crate::bridge::Bridge;
use crate::runtime::{EventEnvelope, EventStream, TASK_DELETE_TOPIC, TASK_START_TOPIC, TaskEvent};

/// Timer settings for the control loop. Zero disables a timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunnerOptions {
    /// Seconds between TTL refresh passes.
    pub refresh_interval: u64,
    /// Seconds between quiet resync passes.
    pub resync_interval: u64,
}

/// Read lifecycle events sequentially and hand each to its own task.
///
/// Handlers run concurrently with each other and with the timers; the
/// bridge's internal lock is the only ordering between them, so delete and
/// start handlers may complete out of delivery order. Cancelling the token
/// stops the loop and the timers together; handlers already in flight are
/// left to drain.
pub async fn run(
    bridge: Arc<Bridge>,
    mut stream: EventStream,
    options: RunnerOptions,
    shutdown: CancellationToken,
) {
    if options.refresh_interval > 0 {
        let bridge = Arc::clone(&bridge);
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            let mut ticker = interval(Duration::from_secs(options.refresh_interval));
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = ticker.tick() => bridge.refresh().await,
                }
            }
        });
    }

    if options.resync_interval > 0 {
        let bridge = Arc::clone(&bridge);
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            let mut ticker = interval(Duration::from_secs(options.resync_interval));
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        if let Err(e) = bridge.clone().sync(true).await {
                            tracing::warn!(error = %e, "Resync failed");
                        }
                    }
                }
            }
        });
    }

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                tracing::info!("Event loop cancelled");
                break;
            }
            error = stream.errors.recv() => {
                match error {
                    Some(e) => tracing::warn!(error = %e, "Event delivery error"),
                    None => {
                        tracing::warn!("Event error channel closed");
                        break;
                    }
                }
            }
            envelope = stream.events.recv() => {
                match envelope {
                    Some(envelope) => dispatch(&bridge, envelope),
                    None => {
                        tracing::warn!("Event stream closed");
                        break;
                    }
                }
            }
        }
    }
}

/// Route one envelope to its handler on a fresh task.
fn dispatch(bridge: &Arc<Bridge>, envelope: EventEnvelope) {
    let EventEnvelope { topic, payload } = envelope;
    match topic.as_str() {
        TASK_START_TOPIC => {
            let bridge = Arc::clone(bridge);
            tokio::spawn(async move {
                match serde_json::from_value::<TaskEvent>(payload) {
                    Ok(event) => {
                        tracing::info!(container = %event.container_id, "Task started");
                        bridge.add(&event.container_id).await;
                    }
                    Err(e) => tracing::warn!(error = %e, "Unreadable task-start event"),
                }
            });
        }
        TASK_DELETE_TOPIC => {
            let bridge = Arc::clone(bridge);
            tokio::spawn(async move {
                match serde_json::from_value::<TaskEvent>(payload) {
                    Ok(event) => {
                        tracing::info!(container = %event.container_id, "Task deleted");
                        bridge.remove(&event.container_id).await;
                    }
                    Err(e) => tracing::warn!(error = %e, "Unreadable task-delete event"),
                }
            });
        }
        topic => {
            // pass-through topics are logged, nothing else
            tracing::debug!(topic = %topic, payload = %payload, "Event");
        }
    }
}
