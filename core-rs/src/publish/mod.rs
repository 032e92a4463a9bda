//! Publish module - parse → reserve → record → bind, and teardown
//!
//! The [`PublishingCoordinator`] is the entry point for container
//! lifecycle events; the [`NetworkBinder`] is the seam to whatever makes
//! ports reachable on the host.

pub mod binder;
pub mod container_lock;
pub mod coordinator;
pub mod reservation;

pub use binder::{LoggingBinder, NetworkBinder};
pub use container_lock::ContainerLocks;
pub use coordinator::{PublishPhase, PublishRequest, PublishingCoordinator};
pub use reservation::Reservation;
