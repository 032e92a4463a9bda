/**
 * table.rs
 * Per-container record of published port bindings
 *
 * Each container entry holds:
 * - Exposed ports: container ports declared reachable (published or not)
 * - Pending bindings: reserved, waiting on the network binder
 * - Active bindings: confirmed by the binder, visible to queries
 *
 * Lookups only ever return active bindings, sorted by
 * (containerPort, protocol, hostPort). `remove_all` is the only way an
 * entry leaves the table and hands back everything it held.
 */

use std::collections::{BTreeSet, HashMap};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::binding::PortBinding;
use crate::portspec::{ExposedPort, PortProtocol};

#[derive(Debug, Default, Clone)]
struct ContainerEntry {
    exposed: BTreeSet<ExposedPort>,
    pending: Vec<PortBinding>,
    active: Vec<PortBinding>,
}

/// Binding Table - container id → bindings
#[derive(Debug, Default)]
pub struct BindingTable {
    entries: RwLock<HashMap<String, ContainerEntry>>,
}

impl BindingTable {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, ContainerEntry>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, ContainerEntry>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record a reserved binding as pending for `container_id`
    pub fn record(&self, container_id: &str, binding: PortBinding) {
        self.write()
            .entry(container_id.to_string())
            .or_default()
            .pending
            .push(binding);
    }

    /// Mark every pending binding of `container_id` active
    ///
    /// # Returns
    /// The bindings that became active
    pub fn activate(&self, container_id: &str) -> Vec<PortBinding> {
        let mut entries = self.write();
        let Some(entry) = entries.get_mut(container_id) else {
            return Vec::new();
        };

        let activated = std::mem::take(&mut entry.pending);
        entry.active.extend(activated.iter().copied());
        entry.active.sort();
        activated
    }

    /// Drop the given pending bindings of `container_id`
    ///
    /// Pending bindings not listed in `bindings` stay untouched.
    ///
    /// # Returns
    /// The bindings actually dropped
    pub fn discard_pending(&self, container_id: &str, bindings: &[PortBinding]) -> Vec<PortBinding> {
        let mut entries = self.write();
        let Some(entry) = entries.get_mut(container_id) else {
            return Vec::new();
        };

        let (discarded, kept): (Vec<PortBinding>, Vec<PortBinding>) = entry
            .pending
            .drain(..)
            .partition(|pending| bindings.contains(pending));
        entry.pending = kept;
        if entry.pending.is_empty() && entry.active.is_empty() && entry.exposed.is_empty() {
            entries.remove(container_id);
        }
        discarded
    }

    /// Declare container ports as exposed for `container_id`
    pub fn expose<I>(&self, container_id: &str, ports: I)
    where
        I: IntoIterator<Item = ExposedPort>,
    {
        self.write()
            .entry(container_id.to_string())
            .or_default()
            .exposed
            .extend(ports);
    }

    /// Active bindings of `container_id`, in display order
    pub fn lookup(&self, container_id: &str) -> Vec<PortBinding> {
        self.read()
            .get(container_id)
            .map(|entry| entry.active.clone())
            .unwrap_or_default()
    }

    /// Active bindings of one container port
    pub fn lookup_by_container_port(
        &self,
        container_id: &str,
        container_port: u16,
        protocol: PortProtocol,
    ) -> Vec<PortBinding> {
        self.read()
            .get(container_id)
            .map(|entry| {
                entry
                    .active
                    .iter()
                    .filter(|b| b.container_port == container_port && b.protocol == protocol)
                    .copied()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Exposed ports of `container_id`, including every actively published one
    pub fn exposed_ports(&self, container_id: &str) -> Vec<ExposedPort> {
        self.read()
            .get(container_id)
            .map(|entry| {
                entry
                    .exposed
                    .iter()
                    .copied()
                    .chain(entry.active.iter().map(PortBinding::exposed))
                    .collect::<BTreeSet<_>>()
                    .into_iter()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Remove `container_id` and return every binding it held, pending included
    pub fn remove_all(&self, container_id: &str) -> Vec<PortBinding> {
        match self.write().remove(container_id) {
            Some(entry) => {
                let mut removed = entry.active;
                removed.extend(entry.pending);
                removed.sort();
                removed
            }
            None => Vec::new(),
        }
    }

    pub fn contains(&self, container_id: &str) -> bool {
        self.read().contains_key(container_id)
    }

    /// Container ids with an entry, sorted
    pub fn containers(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.read().keys().cloned().collect();
        ids.sort();
        ids
    }
}
