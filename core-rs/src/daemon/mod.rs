// Daemon Module - Long-running front ends for the publishing coordinator
//
// The lifecycle daemon turns container lifecycle events into
// publish/teardown calls, so a runtime can wire its event stream
// straight into port publishing.

pub mod lifecycle;

pub use lifecycle::{DaemonStats, LifecycleDaemon, LifecycleEvent};
