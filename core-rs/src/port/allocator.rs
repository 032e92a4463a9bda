/**
 * allocator.rs
 * Host port ownership and allocation
 *
 * Ownership is keyed by (protocol, hostIP, hostPort) and maps to the
 * owning container id. TCP and UDP never conflict with each other.
 *
 * Allocation strategy:
 * - Single port: claim the exact key or fail with AlreadyAllocated
 * - Range: live ascending scan for the first free key, claimed under
 *   the same lock as the scan. No cursor is kept, so a range frees up
 *   again as soon as its ports are released.
 *
 * Example (three containers publishing 9090-9092:80):
 * - web-1 → 9090
 * - web-2 → 9091
 * - web-3 → 9092
 * - web-4 → RangeExhausted
 */

use std::collections::HashMap;
use std::fmt;
use std::net::Ipv4Addr;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::debug;

use crate::errors::PublishError;
use crate::port::PortRange;
use crate::portspec::PortProtocol;

/// Identity of one host-side port
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AllocationKey {
    pub protocol: PortProtocol,
    pub host_ip: Ipv4Addr,
    pub host_port: u16,
}

impl AllocationKey {
    pub fn new(protocol: PortProtocol, host_ip: Ipv4Addr, host_port: u16) -> Self {
        AllocationKey {
            protocol,
            host_ip,
            host_port,
        }
    }
}

impl fmt::Display for AllocationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}/{}", self.host_ip, self.host_port, self.protocol)
    }
}

/// Ownership store: key → owning container id
///
/// Holds at most one owner per key. Build one with entries to seed an
/// allocator, or use `Default` for an empty store.
#[derive(Debug, Default, Clone)]
pub struct AllocationState {
    owners: HashMap<AllocationKey, String>,
}

impl AllocationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn owner(&self, key: &AllocationKey) -> Option<&str> {
        self.owners.get(key).map(String::as_str)
    }

    pub fn is_allocated(&self, key: &AllocationKey) -> bool {
        self.owners.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.owners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }

    /// Claim `key` for `owner`, refusing if anyone (including `owner`) holds it
    fn claim(&mut self, key: AllocationKey, owner: &str) -> Result<(), PublishError> {
        if let Some(current) = self.owners.get(&key) {
            return Err(PublishError::AlreadyAllocated {
                protocol: key.protocol,
                host_ip: key.host_ip,
                host_port: key.host_port,
                owner: current.clone(),
            });
        }
        self.owners.insert(key, owner.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &AllocationKey) -> Option<String> {
        self.owners.remove(key)
    }
}

/// Host Port Allocator - the single lock domain for port ownership
#[derive(Debug, Default)]
pub struct HostPortAllocator {
    state: Mutex<AllocationState>,
}

impl HostPortAllocator {
    /// Create an allocator with an empty ownership store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an allocator over an existing ownership store
    pub fn with_state(state: AllocationState) -> Self {
        HostPortAllocator {
            state: Mutex::new(state),
        }
    }

    // Every mutation completes before the guard drops, so a poisoned
    // lock still guards a consistent map.
    fn state(&self) -> MutexGuard<'_, AllocationState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Reserve one exact host port for `owner`
    ///
    /// # Errors
    /// Returns `AlreadyAllocated` if the key is held by any container,
    /// including `owner` itself
    pub fn reserve(
        &self,
        owner: &str,
        protocol: PortProtocol,
        host_ip: Ipv4Addr,
        host_port: u16,
    ) -> Result<AllocationKey, PublishError> {
        let key = AllocationKey::new(protocol, host_ip, host_port);
        self.state().claim(key, owner)?;
        debug!(owner, %key, "reserved host port");
        Ok(key)
    }

    /// Reserve the first free host port of `range` for `owner`
    ///
    /// Scans in ascending order and never looks outside the range.
    ///
    /// # Errors
    /// Returns `RangeExhausted` if every port of the range is held
    pub fn reserve_range(
        &self,
        owner: &str,
        protocol: PortProtocol,
        host_ip: Ipv4Addr,
        range: PortRange,
    ) -> Result<u16, PublishError> {
        let mut state = self.state();

        let free = range
            .iter()
            .map(|port| AllocationKey::new(protocol, host_ip, port))
            .find(|key| !state.is_allocated(key));

        match free {
            Some(key) => {
                state.claim(key, owner)?;
                debug!(owner, %key, %range, "reserved host port from range");
                Ok(key.host_port)
            }
            None => Err(PublishError::RangeExhausted {
                protocol,
                host_ip,
                start: range.start,
                end: range.end,
            }),
        }
    }

    /// Release a host port
    ///
    /// Releasing a key nobody holds is a no-op.
    ///
    /// # Returns
    /// true if the key was held
    pub fn release(&self, protocol: PortProtocol, host_ip: Ipv4Addr, host_port: u16) -> bool {
        let key = AllocationKey::new(protocol, host_ip, host_port);
        match self.state().remove(&key) {
            Some(owner) => {
                debug!(owner = owner.as_str(), %key, "released host port");
                true
            }
            None => false,
        }
    }

    /// Current owner of a host port
    pub fn owner_of(
        &self,
        protocol: PortProtocol,
        host_ip: Ipv4Addr,
        host_port: u16,
    ) -> Option<String> {
        let key = AllocationKey::new(protocol, host_ip, host_port);
        self.state().owner(&key).map(str::to_string)
    }

    /// Number of held host ports
    pub fn allocated_count(&self) -> usize {
        self.state().len()
    }

    /// All held keys with their owners, sorted by key
    pub fn allocations(&self) -> Vec<(AllocationKey, String)> {
        let state = self.state();
        let mut entries: Vec<(AllocationKey, String)> = state
            .owners
            .iter()
            .map(|(key, owner)| (*key, owner.clone()))
            .collect();
        entries.sort();
        entries
    }
}
