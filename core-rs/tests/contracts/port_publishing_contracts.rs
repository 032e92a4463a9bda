//! Port Publishing Contract Tests
//!
//! These tests verify INVARIANTS that MUST NEVER BREAK regardless of implementation.
//! Callers read `port` output verbatim and rely on all-or-nothing publishing,
//! so each test documents WHY the behavior is fixed.

use std::sync::Arc;

use portpub_core::{
    ErrorKind, ExposedPort, LoggingBinder, PortProtocol, PublishingCoordinator,
};

fn coordinator() -> PublishingCoordinator {
    PublishingCoordinator::new(Arc::new(LoggingBinder))
}

fn sorted(mut lines: Vec<String>) -> Vec<String> {
    lines.sort();
    lines
}

fn tcp(port: u16) -> Option<ExposedPort> {
    Some(ExposedPort::new(port, PortProtocol::Tcp))
}

/// WHY: Filtered query output is bare `hostIP:hostPort`
/// REASON: Scripts feed `port <id> 80` straight into connection strings
/// BREAKS: Every caller parsing the filtered form
#[test]
fn single_port_publish_query_format() {
    let coordinator = coordinator();
    coordinator.publish("first", &["9876:80"]).unwrap();

    assert_eq!(coordinator.query("first", tcp(80)).unwrap(), vec!["0.0.0.0:9876"]);
    assert_eq!(
        coordinator.query("first", None).unwrap(),
        vec!["80/tcp -> 0.0.0.0:9876"]
    );
}

/// WHY: Several -p entries each produce exactly one binding
/// REASON: K requests must come back as K bindings, no more, no less
/// BREAKS: Round-trip expectations of the `port` listing
#[test]
fn three_ports_round_trip() {
    let coordinator = coordinator();
    coordinator
        .publish("three", &["9876:80", "9877:81", "9878:82"])
        .unwrap();

    assert_eq!(coordinator.query("three", tcp(80)).unwrap(), vec!["0.0.0.0:9876"]);
    assert_eq!(
        sorted(coordinator.query("three", None).unwrap()),
        vec![
            "80/tcp -> 0.0.0.0:9876",
            "81/tcp -> 0.0.0.0:9877",
            "82/tcp -> 0.0.0.0:9878",
        ]
    );
}

/// WHY: One container port may be reachable through several host ports
/// REASON: `-p 9876:80 -p 9999:80` is a legitimate many-to-one mapping
/// BREAKS: Filtered queries that must list every host binding of a port
#[test]
fn many_host_ports_to_one_container_port() {
    let coordinator = coordinator();
    coordinator
        .publish("multi", &["9876:80", "9999:80", "9877:81", "9878:82"])
        .unwrap();

    assert_eq!(
        sorted(coordinator.query("multi", tcp(80)).unwrap()),
        vec!["0.0.0.0:9876", "0.0.0.0:9999"]
    );
    assert_eq!(
        sorted(coordinator.query("multi", None).unwrap()),
        vec![
            "80/tcp -> 0.0.0.0:9876",
            "80/tcp -> 0.0.0.0:9999",
            "81/tcp -> 0.0.0.0:9877",
            "82/tcp -> 0.0.0.0:9878",
        ]
    );
}

fn exhaust_range(coordinator: &PublishingCoordinator) {
    let ids = ["range-0", "range-1", "range-2"];
    for (i, id) in ids.iter().enumerate() {
        coordinator.publish(id, &["9090-9092:80"]).unwrap();
        assert_eq!(
            coordinator.query(id, None).unwrap(),
            vec![format!("80/tcp -> 0.0.0.0:{}", 9090 + i)]
        );
    }

    let err = coordinator.publish("range-3", &["9090-9092:80"]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RangeExhausted);

    for id in ids {
        coordinator.teardown(id);
    }
}

/// WHY: A host range is shared by successive containers, one slot each
/// REASON: 9090-9092:80 three times yields 9090, 9091, 9092; a fourth fails
/// BREAKS: Fan-out publishing and exhaustion detection
#[test]
fn host_range_fan_out_and_exhaustion() {
    let coordinator = coordinator();
    exhaust_range(&coordinator);
    assert_eq!(coordinator.allocator().allocated_count(), 0);
}

/// WHY: A released range must be fully reusable
/// REASON: Allocation is a live scan, not a cursor that only moves forward
/// BREAKS: Long-running hosts would permanently lose port ranges
#[test]
fn host_range_reusable_after_release() {
    let coordinator = coordinator();
    exhaust_range(&coordinator);
    exhaust_range(&coordinator);
}

/// WHY: Malformed ranges are rejected before any side effect
/// REASON: A bad spec must never leave a reserved host port behind
/// BREAKS: Allocation state consistency
#[test]
fn invalid_ranges_rejected_without_allocation() {
    let coordinator = coordinator();
    for invalid in ["9090-9089:80", "9090-:80", "-9090:80"] {
        let err = coordinator.publish("invalid", &[invalid]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidSpec, "spec {}", invalid);
    }
    assert_eq!(coordinator.allocator().allocated_count(), 0);
    assert!(coordinator.containers().is_empty());
}

/// WHY: Equal-width ranges map element by element, in order
/// REASON: 9800-9803:80-83 means 80↔9800, 81↔9801, 82↔9802, 83↔9803
/// BREAKS: Range-to-range publishing
#[test]
fn host_range_to_container_range() {
    let coordinator = coordinator();
    coordinator.publish("ranged", &["9800-9803:80-83"]).unwrap();

    assert_eq!(
        sorted(coordinator.query("ranged", None).unwrap()),
        vec![
            "80/tcp -> 0.0.0.0:9800",
            "81/tcp -> 0.0.0.0:9801",
            "82/tcp -> 0.0.0.0:9802",
            "83/tcp -> 0.0.0.0:9803",
        ]
    );
}

/// WHY: TCP and UDP never compete for the same host port
/// REASON: Allocation keys include the protocol
/// BREAKS: Services publishing DNS-style tcp+udp pairs
#[test]
fn mixed_protocols_share_host_range() {
    let coordinator = coordinator();
    coordinator
        .publish("mixed", &["8000-8080:80", "8000-8080:80/udp"])
        .unwrap();

    assert_eq!(
        sorted(coordinator.query("mixed", None).unwrap()),
        vec!["80/tcp -> 0.0.0.0:8000", "80/udp -> 0.0.0.0:8000"]
    );
}

/// WHY: A publish either fully succeeds or leaves nothing behind
/// REASON: A container must never run with a partial set of published ports
/// BREAKS: Port leaks that only show up as later AlreadyAllocated errors
#[test]
fn failed_publish_leaves_no_partial_state() {
    let coordinator = coordinator();
    coordinator.publish("holder", &["9092:80"]).unwrap();

    let err = coordinator
        .publish("victim", &["9090:80", "9091:81", "9092:82"])
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AlreadyAllocated);

    assert!(coordinator.query("victim", None).is_err());
    assert_eq!(coordinator.allocator().allocated_count(), 1);
    assert!(coordinator.publish("next", &["9090:80", "9091:81"]).is_ok());
}

/// WHY: Released host ports are immediately free for other containers
/// REASON: Teardown is the only path that frees ports and must be complete
/// BREAKS: Container restarts on the same published port
#[test]
fn teardown_frees_ports_for_reuse() {
    let coordinator = coordinator();
    coordinator.publish("old", &["9876:80"]).unwrap();

    let err = coordinator.publish("new", &["9876:80"]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AlreadyAllocated);

    coordinator.teardown("old");
    coordinator.publish("new", &["9876:80"]).unwrap();
    assert_eq!(coordinator.query("new", tcp(80)).unwrap(), vec!["0.0.0.0:9876"]);
}
