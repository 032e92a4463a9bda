//! Resolved port bindings and the per-container binding table
//!
//! A [`PortBinding`] only exists once its host port has been reserved.
//! The [`BindingTable`] records them per container and is the single
//! deletion path on teardown.

pub mod format;
pub mod table;

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::net::Ipv4Addr;

use crate::port::AllocationKey;
use crate::portspec::{ExposedPort, PortProtocol};

pub use format::{format_binding_line, format_host_address, render_query, render_summary};
pub use table::BindingTable;

/// One container port reachable through one host IP:port
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortBinding {
    pub container_port: u16,
    pub protocol: PortProtocol,
    pub host_ip: Ipv4Addr,
    pub host_port: u16,
}

impl PortBinding {
    pub fn new(container_port: u16, protocol: PortProtocol, host_ip: Ipv4Addr, host_port: u16) -> Self {
        PortBinding {
            container_port,
            protocol,
            host_ip,
            host_port,
        }
    }

    /// Allocator key backing this binding
    pub fn key(&self) -> AllocationKey {
        AllocationKey::new(self.protocol, self.host_ip, self.host_port)
    }

    /// Container side of this binding
    pub fn exposed(&self) -> ExposedPort {
        ExposedPort::new(self.container_port, self.protocol)
    }
}

// Display order: (containerPort, protocol, hostPort), host IP last as a tiebreak
impl Ord for PortBinding {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.container_port, self.protocol, self.host_port, self.host_ip).cmp(&(
            other.container_port,
            other.protocol,
            other.host_port,
            other.host_ip,
        ))
    }
}

impl PartialOrd for PortBinding {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for PortBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_binding_line(self))
    }
}
