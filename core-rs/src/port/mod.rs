/**
 * port module
 * Host port ranges and ownership-tracked allocation
 */

pub mod allocator;
pub mod range;

pub use allocator::{AllocationKey, AllocationState, HostPortAllocator};
pub use range::PortRange;
