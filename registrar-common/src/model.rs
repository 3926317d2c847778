//! Data model for registered services.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Structural convention for service IDs minted by this daemon:
/// `hostname:containerName:port[:udp]`. Other agents sharing the registry
/// read this too, so it is effectively a wire format.
static SERVICE_ID_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(.+?):([a-zA-Z0-9][a-zA-Z0-9_.-]+):[0-9]+(?::udp)?$").unwrap());

/// One declared port mapping for a container, before service construction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServicePort {
    /// Exposed port number, stringified (it keys the port map).
    pub exposed_port: String,
    /// IP of the sandbox network namespace the port is reachable on.
    pub exposed_ip: String,
    /// Protocol, lower-cased ("tcp" or "udp").
    pub port_type: String,
    /// Value of the container's HOSTNAME environment variable, if any.
    pub container_hostname: String,
    /// Owning container id.
    pub container_id: String,
    /// Owning container name.
    pub container_name: String,
}

/// One registered network-reachable endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    /// Registry key; follows the structural ID convention unless overridden.
    pub id: String,
    /// Logical service name.
    pub name: String,
    /// Exposed port number.
    pub port: u16,
    /// Advertised IP.
    pub ip: String,
    /// Ordered tag list.
    pub tags: Vec<String>,
    /// Free-form metadata.
    pub attrs: HashMap<String, String>,
    /// TTL in seconds; 0 means no expiry.
    pub ttl: u64,
    /// Owning registry-agent identifier.
    pub agent_id: String,
    /// The port mapping this service was derived from.
    pub origin: ServicePort,
}

/// Grace-period holder for the services of an exited container.
///
/// Exists only while TTL-based expiry is configured and the container was
/// removed without immediate deregistration. The remaining TTL is signed so
/// an entry decremented to exactly zero survives until the next refresh tick.
#[derive(Debug, Clone)]
pub struct DeadContainer {
    /// Remaining grace seconds.
    pub ttl: i64,
    /// Services that belonged to the container.
    pub services: Vec<Service>,
}

/// A service ID parsed against the structural convention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceId<'a> {
    /// Hostname of the daemon that minted the ID.
    pub hostname: &'a str,
    /// Name of the container the service was derived from.
    pub container_name: &'a str,
}

impl<'a> ServiceId<'a> {
    /// Parse an ID against the convention.
    ///
    /// `None` means the ID was not minted by a registrar daemon and must be
    /// left alone during cleanup. Never an error.
    pub fn parse(id: &'a str) -> Option<Self> {
        let captures = SERVICE_ID_PATTERN.captures(id)?;
        Some(Self {
            hostname: captures.get(1)?.as_str(),
            container_name: captures.get(2)?.as_str(),
        })
    }
}
