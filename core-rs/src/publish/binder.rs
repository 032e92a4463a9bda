//! Network binder interface
//!
//! The binder is what actually makes a published port reachable (socket
//! proxy, NAT rule, ...). The coordinator only sequences calls to it and
//! never holds an allocation lock while doing so.

use tracing::info;

use crate::binding::PortBinding;
use crate::errors::Result;

/// External collaborator that installs and removes network state
///
/// # Example Implementation
///
/// ```rust,ignore
/// pub struct NatBinder { ... }
///
/// impl NetworkBinder for NatBinder {
///     fn bind(&self, container_id: &str, binding: &PortBinding) -> Result<()> {
///         // Install DNAT host_ip:host_port -> container:container_port
///     }
///
///     fn unbind(&self, binding: &PortBinding) -> Result<()> {
///         // Remove the rule for host_ip:host_port
///     }
/// }
/// ```
pub trait NetworkBinder: Send + Sync {
    /// Make `binding` reachable, targeting `container_id`
    ///
    /// Failures should be reported as `PublishError::BindError`.
    fn bind(&self, container_id: &str, binding: &PortBinding) -> Result<()>;

    /// Remove network state for `binding`
    fn unbind(&self, binding: &PortBinding) -> Result<()>;
}

/// Binder that only records calls through `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingBinder;

impl NetworkBinder for LoggingBinder {
    fn bind(&self, container_id: &str, binding: &PortBinding) -> Result<()> {
        info!(container_id, %binding, "bind");
        Ok(())
    }

    fn unbind(&self, binding: &PortBinding) -> Result<()> {
        info!(%binding, "unbind");
        Ok(())
    }
}
