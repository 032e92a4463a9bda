/**
 * coordinator.rs
 * Publish and teardown orchestration
 *
 * Publish: Parsed → Reserved → Bound → Active
 * - Every spec is parsed before any port is touched
 * - Host ports are reserved spec by spec; the first failure releases
 *   everything reserved so far
 * - Reserved bindings are recorded as pending, then handed to the
 *   network binder outside the allocator and table locks
 * - Only binder-confirmed bindings become active and visible to queries
 *
 * Publish and teardown of one container hold that container's lock, so a
 * teardown never sees, or releases, another request's pending bindings.
 *
 * Teardown: remove from table → release host ports → unbind
 * Allocator bookkeeping never waits on, or fails because of, unbind.
 */

use std::collections::BTreeSet;
use std::net::Ipv4Addr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::binding::{render_query, render_summary, BindingTable, PortBinding};
use crate::config::PublisherConfig;
use crate::errors::{PublishError, Result};
use crate::port::{HostPortAllocator, PortRange};
use crate::portspec::{ExposedPort, PortSpec, PortSpecParser, SpecMapping};
use crate::publish::binder::NetworkBinder;
use crate::publish::container_lock::ContainerLocks;
use crate::publish::reservation::Reservation;
use crate::storage::{ContainerSnapshot, StateSnapshot};

/// Publish request stages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishPhase {
    Parsed,
    Reserved,
    Bound,
    Active,
    Failed,
    RolledBack,
}

/// Everything a container asks to publish when it is created
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishRequest {
    /// `-p` specs
    #[serde(default)]
    pub specs: Vec<String>,
    /// `--expose` declarations
    #[serde(default)]
    pub exposed: Vec<String>,
    /// `-P`: give every exposed port without an explicit spec a host port
    #[serde(default)]
    pub publish_all: bool,
}

impl PublishRequest {
    pub fn new<S: AsRef<str>>(specs: &[S]) -> Self {
        PublishRequest {
            specs: specs.iter().map(|s| s.as_ref().to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn with_exposed<S: AsRef<str>>(mut self, exposed: &[S]) -> Self {
        self.exposed = exposed.iter().map(|s| s.as_ref().to_string()).collect();
        self
    }

    pub fn with_publish_all(mut self, publish_all: bool) -> Self {
        self.publish_all = publish_all;
        self
    }
}

/// Publishing Coordinator - owns the publish/teardown transaction boundary
pub struct PublishingCoordinator {
    allocator: Arc<HostPortAllocator>,
    table: Arc<BindingTable>,
    binder: Arc<dyn NetworkBinder>,
    locks: ContainerLocks,
    default_host_ip: Ipv4Addr,
    ephemeral_range: PortRange,
}

impl PublishingCoordinator {
    /// Create a coordinator with default configuration and fresh state
    pub fn new(binder: Arc<dyn NetworkBinder>) -> Self {
        Self::from_config(&PublisherConfig::default(), binder)
    }

    /// Create a coordinator with fresh state
    pub fn from_config(config: &PublisherConfig, binder: Arc<dyn NetworkBinder>) -> Self {
        Self::with_parts(
            Arc::new(HostPortAllocator::new()),
            Arc::new(BindingTable::new()),
            binder,
            config,
        )
    }

    /// Create a coordinator over an existing allocator and binding table
    pub fn with_parts(
        allocator: Arc<HostPortAllocator>,
        table: Arc<BindingTable>,
        binder: Arc<dyn NetworkBinder>,
        config: &PublisherConfig,
    ) -> Self {
        PublishingCoordinator {
            allocator,
            table,
            binder,
            locks: ContainerLocks::new(),
            default_host_ip: config.spec.default_host_ip,
            ephemeral_range: config.spec.ephemeral_range,
        }
    }

    pub fn allocator(&self) -> &Arc<HostPortAllocator> {
        &self.allocator
    }

    pub fn table(&self) -> &Arc<BindingTable> {
        &self.table
    }

    /// Publish `specs` for `container_id`
    ///
    /// All-or-nothing: on error no host port of this request stays reserved.
    ///
    /// # Errors
    /// `InvalidSpec`, `AlreadyAllocated`, `RangeExhausted` or `BindError`
    pub fn publish<S: AsRef<str>>(&self, container_id: &str, specs: &[S]) -> Result<Vec<PortBinding>> {
        self.publish_request(container_id, &PublishRequest::new(specs))
    }

    /// Publish a full request (specs, exposed ports, publish-all)
    ///
    /// # Returns
    /// The newly active bindings, in display order
    pub fn publish_request(
        &self,
        container_id: &str,
        request: &PublishRequest,
    ) -> Result<Vec<PortBinding>> {
        self.locks
            .with(container_id, || self.publish_locked(container_id, request))
    }

    fn publish_locked(&self, container_id: &str, request: &PublishRequest) -> Result<Vec<PortBinding>> {
        let (specs, exposed) = match self.parse_request(request) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(container_id, error = %e, phase = ?PublishPhase::Failed, "publish rejected");
                return Err(e);
            }
        };
        Self::transition(container_id, PublishPhase::Parsed);

        let mut reservation = Reservation::new(&self.allocator, container_id);
        let reserved = self
            .reserve_specs(container_id, &specs, &mut reservation)
            .and_then(|()| {
                if request.publish_all {
                    self.reserve_unpublished(container_id, &exposed, &mut reservation)
                } else {
                    Ok(())
                }
            });
        if let Err(e) = reserved {
            warn!(container_id, error = %e, phase = ?PublishPhase::RolledBack, "publish failed");
            return Err(e);
        }
        Self::transition(container_id, PublishPhase::Reserved);

        for binding in reservation.bindings() {
            self.table.record(container_id, *binding);
        }
        if let Err(e) = self.bind_all(container_id, reservation.bindings()) {
            self.table.discard_pending(container_id, reservation.bindings());
            warn!(container_id, error = %e, phase = ?PublishPhase::RolledBack, "publish failed");
            return Err(e);
        }
        Self::transition(container_id, PublishPhase::Bound);

        let mut bindings = reservation.commit();
        self.table.activate(container_id);
        self.table.expose(container_id, exposed);
        Self::transition(container_id, PublishPhase::Active);

        bindings.sort();
        info!(container_id, count = bindings.len(), "published ports");
        Ok(bindings)
    }

    /// Release every binding of `container_id`
    ///
    /// Safe to call repeatedly and on containers without published ports.
    /// Waits for an in-flight publish of the same container to finish.
    ///
    /// # Returns
    /// The released bindings
    pub fn teardown(&self, container_id: &str) -> Vec<PortBinding> {
        self.locks
            .with(container_id, || self.teardown_locked(container_id))
    }

    fn teardown_locked(&self, container_id: &str) -> Vec<PortBinding> {
        let removed = self.table.remove_all(container_id);

        for binding in &removed {
            self.allocator
                .release(binding.protocol, binding.host_ip, binding.host_port);
        }

        for binding in &removed {
            if let Err(e) = self.binder.unbind(binding) {
                warn!(container_id, %binding, error = %e, "unbind failed, host port already released");
            }
        }

        if !removed.is_empty() {
            info!(container_id, count = removed.len(), "released ports");
        }
        removed
    }

    /// Query output lines for `container_id`
    ///
    /// Unfiltered: `80/tcp -> 0.0.0.0:9876` per binding.
    /// Filtered to one container port: `0.0.0.0:9876` per binding.
    pub fn query(&self, container_id: &str, filter: Option<ExposedPort>) -> Result<Vec<String>> {
        let bindings = self.query_bindings(container_id, filter)?;
        Ok(render_query(&bindings, filter.is_some()))
    }

    /// Active bindings for `container_id`, optionally for one container port
    ///
    /// # Errors
    /// `ContainerNotFound` if nothing was ever published for `container_id`
    pub fn query_bindings(
        &self,
        container_id: &str,
        filter: Option<ExposedPort>,
    ) -> Result<Vec<PortBinding>> {
        if !self.table.contains(container_id) {
            return Err(PublishError::ContainerNotFound(container_id.to_string()));
        }

        Ok(match filter {
            Some(port) => self
                .table
                .lookup_by_container_port(container_id, port.port, port.protocol),
            None => self.table.lookup(container_id),
        })
    }

    /// One-line port summary: `0.0.0.0:9876->80/tcp, 443/tcp`
    pub fn summary(&self, container_id: &str) -> Result<String> {
        if !self.table.contains(container_id) {
            return Err(PublishError::ContainerNotFound(container_id.to_string()));
        }

        Ok(render_summary(
            &self.table.exposed_ports(container_id),
            &self.table.lookup(container_id),
        ))
    }

    /// Known container ids, sorted
    pub fn containers(&self) -> Vec<String> {
        self.table.containers()
    }

    /// Capture active state
    pub fn snapshot(&self) -> StateSnapshot {
        let containers = self
            .table
            .containers()
            .into_iter()
            .map(|id| ContainerSnapshot {
                exposed: self.table.exposed_ports(&id),
                bindings: self.table.lookup(&id),
                id,
            })
            .collect();
        StateSnapshot::new(containers)
    }

    /// Re-reserve and re-record a saved state
    ///
    /// Does not call the network binder. On a conflicting entry nothing of
    /// the snapshot is kept.
    ///
    /// # Returns
    /// Number of restored bindings
    pub fn restore(&self, snapshot: &StateSnapshot) -> Result<usize> {
        let mut reservations = Vec::with_capacity(snapshot.containers.len());

        for container in &snapshot.containers {
            let mut reservation = Reservation::new(&self.allocator, &container.id);
            for binding in &container.bindings {
                self.allocator.reserve(
                    &container.id,
                    binding.protocol,
                    binding.host_ip,
                    binding.host_port,
                )?;
                reservation.push(*binding);
            }
            reservations.push((container, reservation));
        }

        let mut restored = 0;
        for (container, reservation) in reservations {
            for binding in reservation.commit() {
                self.table.record(&container.id, binding);
                restored += 1;
            }
            self.table.activate(&container.id);
            self.table.expose(&container.id, container.exposed.iter().copied());
        }

        info!(
            containers = snapshot.containers.len(),
            bindings = restored,
            "restored published state"
        );
        Ok(restored)
    }

    fn parse_request(&self, request: &PublishRequest) -> Result<(Vec<PortSpec>, BTreeSet<ExposedPort>)> {
        let specs = PortSpecParser::parse_all(&request.specs, self.default_host_ip)?;

        let mut exposed = BTreeSet::new();
        for declaration in &request.exposed {
            exposed.extend(PortSpecParser::parse_exposed(declaration)?);
        }
        for spec in &specs {
            exposed.extend(spec.exposed_ports());
        }

        Ok((specs, exposed))
    }

    fn reserve_specs(
        &self,
        container_id: &str,
        specs: &[PortSpec],
        reservation: &mut Reservation<'_>,
    ) -> Result<()> {
        for spec in specs {
            match spec.mapping() {
                SpecMapping::FanOut => {
                    let host_port = self.allocator.reserve_range(
                        container_id,
                        spec.protocol,
                        spec.host_ip,
                        spec.host_range,
                    )?;
                    reservation.push(PortBinding::new(
                        spec.container_range.start,
                        spec.protocol,
                        spec.host_ip,
                        host_port,
                    ));
                }
                SpecMapping::Single | SpecMapping::ElementWise => {
                    for (host_port, container_port) in spec.fixed_pairs() {
                        self.allocator
                            .reserve(container_id, spec.protocol, spec.host_ip, host_port)?;
                        reservation.push(PortBinding::new(
                            container_port,
                            spec.protocol,
                            spec.host_ip,
                            host_port,
                        ));
                    }
                }
            }
        }
        Ok(())
    }

    /// Give each exposed port without a binding one host port from the ephemeral range
    fn reserve_unpublished(
        &self,
        container_id: &str,
        exposed: &BTreeSet<ExposedPort>,
        reservation: &mut Reservation<'_>,
    ) -> Result<()> {
        let published: BTreeSet<ExposedPort> = reservation
            .bindings()
            .iter()
            .chain(self.table.lookup(container_id).iter())
            .map(PortBinding::exposed)
            .collect();

        for port in exposed.difference(&published) {
            let host_port = self.allocator.reserve_range(
                container_id,
                port.protocol,
                self.default_host_ip,
                self.ephemeral_range,
            )?;
            reservation.push(PortBinding::new(
                port.port,
                port.protocol,
                self.default_host_ip,
                host_port,
            ));
        }
        Ok(())
    }

    /// Bind each binding in order; on failure unbind the ones already bound
    fn bind_all(&self, container_id: &str, bindings: &[PortBinding]) -> Result<()> {
        for (index, binding) in bindings.iter().enumerate() {
            if let Err(e) = self.binder.bind(container_id, binding) {
                for bound in &bindings[..index] {
                    if let Err(unbind_err) = self.binder.unbind(bound) {
                        warn!(container_id, binding = %bound, error = %unbind_err, "unbind during rollback failed");
                    }
                }
                return Err(match e {
                    PublishError::BindError(_) => e,
                    other => PublishError::BindError(other.to_string()),
                });
            }
        }
        Ok(())
    }

    fn transition(container_id: &str, phase: PublishPhase) {
        debug!(container_id, ?phase, "publish phase");
    }
}
