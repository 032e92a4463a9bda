/**
 * snapshot.rs
 * Persisted publish state (JSON format)
 *
 * Format:
 * ```json
 * {
 *   "savedAt": "2026-10-19T12:00:00Z",
 *   "containers": [
 *     {
 *       "id": "web",
 *       "exposed": [{ "port": 443, "protocol": "tcp" }],
 *       "bindings": [
 *         { "containerPort": 80, "protocol": "tcp", "hostIp": "0.0.0.0", "hostPort": 9876 }
 *       ]
 *     }
 *   ]
 * }
 * ```
 */

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::binding::PortBinding;
use crate::errors::{PublishError, Result};
use crate::portspec::ExposedPort;

/// Published state of one container
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerSnapshot {
    pub id: String,
    #[serde(default)]
    pub exposed: Vec<ExposedPort>,
    #[serde(default)]
    pub bindings: Vec<PortBinding>,
}

/// Published state of every container
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateSnapshot {
    pub saved_at: DateTime<Utc>,
    #[serde(default)]
    pub containers: Vec<ContainerSnapshot>,
}

impl StateSnapshot {
    pub fn new(containers: Vec<ContainerSnapshot>) -> Self {
        StateSnapshot {
            saved_at: Utc::now(),
            containers,
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }
}

/// State Store - reads and writes the snapshot file
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        StateStore {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the snapshot
    ///
    /// Returns an empty snapshot if the file doesn't exist
    pub fn load(&self) -> Result<StateSnapshot> {
        if !self.path.exists() {
            return Ok(StateSnapshot::empty());
        }

        let content = fs::read_to_string(&self.path)?;
        let snapshot: StateSnapshot = serde_json::from_str(&content).map_err(|e| {
            PublishError::ParseError(format!(
                "Invalid state file {}: {}",
                self.path.display(),
                e
            ))
        })?;

        debug!(
            path = %self.path.display(),
            containers = snapshot.containers.len(),
            "loaded state snapshot"
        );
        Ok(snapshot)
    }

    /// Save the snapshot, replacing the file atomically
    pub fn save(&self, snapshot: &StateSnapshot) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let json = serde_json::to_string_pretty(snapshot)?;
        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, json)?;
        fs::rename(&tmp_path, &self.path)?;

        debug!(
            path = %self.path.display(),
            containers = snapshot.containers.len(),
            "saved state snapshot"
        );
        Ok(())
    }
}
