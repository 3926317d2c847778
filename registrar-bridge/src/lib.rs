//! Registrar Bridge Engine
//!
//! The concurrent core of the registrar daemon: it watches container
//! lifecycle events, derives service descriptors from scheduling metadata,
//! and keeps an external service registry synchronized with the host's live
//! container state.
//!
//! # Overview
//!
//! - [`Bridge`] - lock-guarded state manager with add/remove/refresh/ping
//!   operations and the reconciliation [`Bridge::sync`] pass
//! - [`RegistryAdapter`] / [`RuntimeClient`] - capability interfaces to the
//!   external registry backend and container runtime
//! - [`extract`] - raw container records to normalized bundles and ports
//! - [`builder`] - port mappings plus environment overrides to services
//! - [`runner`] - event dispatch loop and periodic refresh/resync timers

pub mod adapter;
pub mod bridge;
pub mod builder;
pub mod extract;
pub mod metadata;
pub mod runner;
pub mod runtime;
mod sync;

pub use adapter::RegistryAdapter;
pub use bridge::{Bridge, BridgeSnapshot};
pub use extract::{ScheduledContainer, container_ports, scheduled_container};
pub use runner::{RunnerOptions, run};
pub use runtime::{
    ContainerRecord, EventEnvelope, EventStream, ProcessStatus, RuntimeClient, TaskEvent,
};
