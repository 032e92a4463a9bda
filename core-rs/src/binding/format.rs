//! Text rendering for `port` and `ps` style output
//!
//! Query lines are consumed verbatim by callers:
//! - all bindings: `<containerPort>/<protocol> -> <hostIP>:<hostPort>`
//! - one container port: `<hostIP>:<hostPort>`

use std::collections::BTreeSet;

use crate::binding::PortBinding;
use crate::portspec::ExposedPort;

/// `80/tcp -> 0.0.0.0:9876`
pub fn format_binding_line(binding: &PortBinding) -> String {
    format!(
        "{}/{} -> {}",
        binding.container_port,
        binding.protocol,
        format_host_address(binding)
    )
}

/// `0.0.0.0:9876`
pub fn format_host_address(binding: &PortBinding) -> String {
    format!("{}:{}", binding.host_ip, binding.host_port)
}

/// Render query output, one line per binding, in the given order
///
/// `filtered` selects the bare host address form used when the query
/// names a single container port.
pub fn render_query(bindings: &[PortBinding], filtered: bool) -> Vec<String> {
    bindings
        .iter()
        .map(|b| {
            if filtered {
                format_host_address(b)
            } else {
                format_binding_line(b)
            }
        })
        .collect()
}

/// Render the one-line port summary of a container
///
/// Published ports read `0.0.0.0:9876->80/tcp`; exposed ports without a
/// binding read `443/tcp`. Entries are joined by `", "`.
pub fn render_summary(exposed: &[ExposedPort], bindings: &[PortBinding]) -> String {
    let mut sorted: Vec<PortBinding> = bindings.to_vec();
    sorted.sort();

    let published: BTreeSet<ExposedPort> = sorted.iter().map(PortBinding::exposed).collect();
    let unpublished = exposed
        .iter()
        .filter(|port| !published.contains(port))
        .collect::<BTreeSet<_>>();

    let mut entries: Vec<(ExposedPort, Option<u16>, String)> = sorted
        .iter()
        .map(|b| {
            (
                b.exposed(),
                Some(b.host_port),
                format!("{}->{}", format_host_address(b), b.exposed()),
            )
        })
        .collect();
    entries.extend(
        unpublished
            .into_iter()
            .map(|port| (*port, None, port.to_string())),
    );
    entries.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));

    entries
        .into_iter()
        .map(|(_, _, text)| text)
        .collect::<Vec<_>>()
        .join(", ")
}
