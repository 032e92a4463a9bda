//! Storage module - persisted publish state
//!
//! Keeps published bindings across restarts of the managing process.

pub mod snapshot;

pub use snapshot::{ContainerSnapshot, StateSnapshot, StateStore};
