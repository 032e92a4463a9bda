//! Integration tests for the lifecycle daemon
//!
//! Drives a `LifecycleDaemon` through its event channel the way a container
//! runtime would and checks the resulting publishing state:
//! - Created events publish, Removed events tear down
//! - Failed publishes are reported and leave nothing behind
//! - Events are processed in order
//! - Shutdown via the watch channel

use portpub_core::{
    ErrorKind, LifecycleDaemon, LifecycleEvent, LoggingBinder, NetworkBinder, PortBinding,
    PublishError, PublishRequest, PublishingCoordinator,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio_test::{assert_err, assert_ok};

// ==================== Test Helper Functions ====================

/// Binder that refuses one host port and remembers what is bound
#[derive(Default)]
struct FlakyBinder {
    refuse: Option<u16>,
    bound: Mutex<Vec<PortBinding>>,
}

impl NetworkBinder for FlakyBinder {
    fn bind(&self, _container_id: &str, binding: &PortBinding) -> portpub_core::errors::Result<()> {
        if self.refuse == Some(binding.host_port) {
            return Err(PublishError::BindError(format!(
                "address {} in use",
                binding.host_port
            )));
        }
        self.bound.lock().unwrap().push(*binding);
        Ok(())
    }

    fn unbind(&self, binding: &PortBinding) -> portpub_core::errors::Result<()> {
        self.bound.lock().unwrap().retain(|b| b != binding);
        Ok(())
    }
}

struct Harness {
    coordinator: Arc<PublishingCoordinator>,
    events: mpsc::Sender<LifecycleEvent>,
    shutdown: watch::Sender<bool>,
    daemon: tokio::task::JoinHandle<portpub_core::DaemonStats>,
}

fn start(binder: Arc<dyn NetworkBinder>) -> Harness {
    let coordinator = Arc::new(PublishingCoordinator::new(binder));
    let (events, rx) = mpsc::channel(16);
    let (shutdown, shutdown_rx) = watch::channel(false);
    let daemon = tokio::spawn(LifecycleDaemon::new(Arc::clone(&coordinator)).run(rx, shutdown_rx));

    Harness {
        coordinator,
        events,
        shutdown,
        daemon,
    }
}

async fn created(
    events: &mpsc::Sender<LifecycleEvent>,
    id: &str,
    specs: &[&str],
) -> portpub_core::errors::Result<Vec<PortBinding>> {
    let (reply, response) = oneshot::channel();
    events
        .send(LifecycleEvent::Created {
            container_id: id.to_string(),
            request: PublishRequest::new(specs),
            reply: Some(reply),
        })
        .await
        .unwrap();
    response.await.unwrap()
}

async fn removed(events: &mpsc::Sender<LifecycleEvent>, id: &str) -> Vec<PortBinding> {
    let (reply, response) = oneshot::channel();
    events
        .send(LifecycleEvent::Removed {
            container_id: id.to_string(),
            reply: Some(reply),
        })
        .await
        .unwrap();
    response.await.unwrap()
}

// ==================== Tests ====================

#[tokio::test]
async fn test_range_reused_through_daemon() {
    let harness = start(Arc::new(LoggingBinder));

    for (i, id) in ["a", "b", "c"].iter().enumerate() {
        let bindings = assert_ok!(created(&harness.events, id, &["9090-9092:80"]).await);
        assert_eq!(bindings[0].host_port, 9090 + i as u16);
    }

    let err = assert_err!(created(&harness.events, "d", &["9090-9092:80"]).await);
    assert_eq!(err.kind(), ErrorKind::RangeExhausted);

    assert_eq!(removed(&harness.events, "b").await.len(), 1);
    let bindings = assert_ok!(created(&harness.events, "d", &["9090-9092:80"]).await);
    assert_eq!(bindings[0].host_port, 9091);

    harness.shutdown.send(true).unwrap();
    let stats = harness.daemon.await.unwrap();
    assert_eq!(stats.published, 4);
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.torn_down, 1);
}

#[tokio::test]
async fn test_bind_failure_reported_and_rolled_back() {
    let binder = Arc::new(FlakyBinder {
        refuse: Some(9878),
        ..Default::default()
    });
    let harness = start(binder.clone());

    let err = assert_err!(
        created(&harness.events, "web", &["9876:80", "9877:81", "9878:82"]).await
    );
    assert_eq!(err.kind(), ErrorKind::BindError);

    assert!(binder.bound.lock().unwrap().is_empty());
    assert_eq!(harness.coordinator.allocator().allocated_count(), 0);
    assert!(harness.coordinator.query("web", None).is_err());

    // Same ports minus the refused one go through
    assert_ok!(created(&harness.events, "web", &["9876:80", "9877:81"]).await);
    assert_eq!(binder.bound.lock().unwrap().len(), 2);

    drop(harness.events);
    let stats = harness.daemon.await.unwrap();
    assert_eq!(stats.published, 1);
    assert_eq!(stats.failed, 1);
}

#[tokio::test]
async fn test_events_without_reply_are_processed_in_order() {
    let harness = start(Arc::new(LoggingBinder));

    harness
        .events
        .send(LifecycleEvent::Created {
            container_id: "web".to_string(),
            request: PublishRequest::new(&["9876:80"]),
            reply: None,
        })
        .await
        .unwrap();
    harness
        .events
        .send(LifecycleEvent::Removed {
            container_id: "web".to_string(),
            reply: None,
        })
        .await
        .unwrap();

    // Closing the channel lets the daemon drain and stop
    drop(harness.events);
    let stats = tokio::time::timeout(Duration::from_secs(5), harness.daemon)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(stats.published, 1);
    assert_eq!(stats.torn_down, 1);
    assert_eq!(harness.coordinator.allocator().allocated_count(), 0);
    assert!(harness.coordinator.containers().is_empty());
}

#[tokio::test]
async fn test_removing_unknown_container_is_harmless() {
    let harness = start(Arc::new(LoggingBinder));

    assert!(removed(&harness.events, "ghost").await.is_empty());

    harness.shutdown.send(true).unwrap();
    let stats = harness.daemon.await.unwrap();
    assert_eq!(stats.torn_down, 1);
}

#[tokio::test]
async fn test_dropped_shutdown_sender_stops_daemon() {
    let harness = start(Arc::new(LoggingBinder));
    let _events = harness.events;

    drop(harness.shutdown);
    let stats = tokio::time::timeout(Duration::from_secs(5), harness.daemon)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stats, portpub_core::DaemonStats::default());
}
