//! In-flight reservations of one publish request
//!
//! A [`Reservation`] owns every host port claimed for a request until it
//! is committed. Dropping it uncommitted, whether through an early `?`
//! return or an unwinding panic, releases all of them.

use tracing::warn;

use crate::binding::PortBinding;
use crate::port::HostPortAllocator;

pub struct Reservation<'a> {
    allocator: &'a HostPortAllocator,
    owner: String,
    bindings: Vec<PortBinding>,
    committed: bool,
}

impl<'a> Reservation<'a> {
    pub fn new(allocator: &'a HostPortAllocator, owner: &str) -> Self {
        Reservation {
            allocator,
            owner: owner.to_string(),
            bindings: Vec::new(),
            committed: false,
        }
    }

    /// Track a binding whose host port is already reserved
    pub fn push(&mut self, binding: PortBinding) {
        self.bindings.push(binding);
    }

    pub fn bindings(&self) -> &[PortBinding] {
        &self.bindings
    }

    /// Keep the reservations; the caller now owns their release
    pub fn commit(mut self) -> Vec<PortBinding> {
        self.committed = true;
        std::mem::take(&mut self.bindings)
    }
}

impl Drop for Reservation<'_> {
    fn drop(&mut self) {
        if self.committed || self.bindings.is_empty() {
            return;
        }

        warn!(
            owner = self.owner.as_str(),
            count = self.bindings.len(),
            "rolling back host port reservations"
        );
        for binding in self.bindings.drain(..) {
            self.allocator
                .release(binding.protocol, binding.host_ip, binding.host_port);
        }
    }
}
