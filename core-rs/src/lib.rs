//! # portpub - Host Port Publishing Engine
//!
//! Parses port-publish specifications, allocates host ports without
//! collision, records the resulting container-port → host-port bindings,
//! and releases them when a container goes away.
//!
//! ## Core Principle
//!
//! **One owner per host port**: a `(protocol, hostIP, hostPort)` key is held
//! by at most one live container. TCP and UDP are independent.
//!
//! ## Key Features
//!
//! - Single ports, host ranges, range-to-range mappings
//! - First-free allocation from a declared host range, reusable after release
//! - All-or-nothing publish with rollback on any failure
//! - Deterministic query output for `port` / `ps` style callers
//!
//! ## Architecture
//!
//! ```text
//!  "-p 9090-9092:80"
//!        │
//!  ┌─────▼──────────┐   ┌──────────────────┐
//!  │ PortSpecParser │   │ HostPortAllocator│
//!  └─────┬──────────┘   └────────▲─────────┘
//!        │   ┌───────────────────┴──┐   ┌──────────────┐
//!        └──►│ PublishingCoordinator├──►│ NetworkBinder│
//!            └───────────┬──────────┘   └──────────────┘
//!                 ┌──────▼───────┐
//!                 │ BindingTable │
//!                 └──────────────┘
//! ```

pub mod binding;
pub mod config;
pub mod daemon;
pub mod errors;
pub mod port;
pub mod portspec;
pub mod publish;
pub mod storage;

pub use binding::{BindingTable, PortBinding};
pub use config::{PublisherConfig, PublisherSpec};
pub use daemon::{DaemonStats, LifecycleDaemon, LifecycleEvent};
pub use errors::{ErrorKind, PublishError};
pub use port::{AllocationKey, AllocationState, HostPortAllocator, PortRange};
pub use portspec::{ExposedPort, PortProtocol, PortSpec, PortSpecParser, SpecMapping};
pub use publish::{
    LoggingBinder, NetworkBinder, PublishPhase, PublishRequest, PublishingCoordinator, Reservation,
};
pub use storage::{ContainerSnapshot, StateSnapshot, StateStore};

/// Version of the state snapshot and config format
pub const VERSION: &str = "0.4.2";
