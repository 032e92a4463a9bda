// LifecycleDaemon - Drives publishing from container lifecycle events
//
// Responsibilities:
// - Receive "created" / "removed" events from the container lifecycle manager
// - Publish the container's ports on creation
// - Tear them down on removal
// - Report each outcome on the event's reply channel, if any
//
// Events are handled one at a time, in arrival order, so a container's
// removal never overtakes its creation. Coordinator calls run on the
// blocking pool because the network binder may block.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};
use tracing::{error, info, warn};

use crate::binding::PortBinding;
use crate::errors::Result;
use crate::publish::{PublishRequest, PublishingCoordinator};

/// Event emitted by the container lifecycle manager
#[derive(Debug)]
pub enum LifecycleEvent {
    Created {
        container_id: String,
        request: PublishRequest,
        reply: Option<oneshot::Sender<Result<Vec<PortBinding>>>>,
    },
    Removed {
        container_id: String,
        reply: Option<oneshot::Sender<Vec<PortBinding>>>,
    },
}

/// Counters reported when the daemon stops
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DaemonStats {
    pub published: usize,
    /// Publishes that returned an error, plus publish or teardown tasks that panicked
    pub failed: usize,
    pub torn_down: usize,
}

pub struct LifecycleDaemon {
    coordinator: Arc<PublishingCoordinator>,
}

impl LifecycleDaemon {
    pub fn new(coordinator: Arc<PublishingCoordinator>) -> Self {
        LifecycleDaemon { coordinator }
    }

    /// Process events until the channel closes or `shutdown` turns true
    ///
    /// A dropped shutdown sender counts as a shutdown request.
    pub async fn run(
        self,
        mut events: mpsc::Receiver<LifecycleEvent>,
        mut shutdown: watch::Receiver<bool>,
    ) -> DaemonStats {
        let mut stats = DaemonStats::default();
        info!("[Lifecycle] Ready - waiting for container events");

        loop {
            if *shutdown.borrow() {
                info!("[Lifecycle] Shutdown signal received, exiting");
                break;
            }

            tokio::select! {
                biased;
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        info!("[Lifecycle] Shutdown sender dropped, exiting");
                        break;
                    }
                }
                event = events.recv() => match event {
                    Some(event) => self.handle(event, &mut stats).await,
                    None => {
                        info!("[Lifecycle] Event channel closed, exiting");
                        break;
                    }
                },
            }
        }

        info!(
            published = stats.published,
            failed = stats.failed,
            torn_down = stats.torn_down,
            "[Lifecycle] Stopped"
        );
        stats
    }

    async fn handle(&self, event: LifecycleEvent, stats: &mut DaemonStats) {
        match event {
            LifecycleEvent::Created {
                container_id,
                request,
                reply,
            } => {
                let coordinator = Arc::clone(&self.coordinator);
                let id = container_id.clone();
                let outcome = tokio::task::spawn_blocking(move || {
                    coordinator.publish_request(&id, &request)
                })
                .await;

                match outcome {
                    Ok(result) => {
                        match &result {
                            Ok(_) => stats.published += 1,
                            Err(e) => {
                                stats.failed += 1;
                                warn!(container_id = container_id.as_str(), error = %e, "[Lifecycle] Publish failed");
                            }
                        }
                        if let Some(reply) = reply {
                            // Receiver may have given up waiting
                            let _ = reply.send(result);
                        }
                    }
                    Err(join_err) => {
                        stats.failed += 1;
                        error!(container_id = container_id.as_str(), error = %join_err, "[Lifecycle] Publish task aborted");
                    }
                }
            }
            LifecycleEvent::Removed {
                container_id,
                reply,
            } => {
                let coordinator = Arc::clone(&self.coordinator);
                let id = container_id.clone();
                let outcome =
                    tokio::task::spawn_blocking(move || coordinator.teardown(&id)).await;

                match outcome {
                    Ok(released) => {
                        stats.torn_down += 1;
                        if let Some(reply) = reply {
                            let _ = reply.send(released);
                        }
                    }
                    Err(join_err) => {
                        stats.failed += 1;
                        error!(container_id = container_id.as_str(), error = %join_err, "[Lifecycle] Teardown task aborted");
                    }
                }
            }
        }
    }
}
