/**
 * config.rs
 * Parser for publisher configuration files (YAML format)
 *
 * Format:
 * ```yaml
 * apiVersion: portpub/v1
 * kind: Publisher
 * spec:
 *   defaultHostIp: 0.0.0.0
 *   ephemeralRange:
 *     start: 49153
 *     end: 65535
 *   stateFile: /var/lib/portpub/state.json
 * ```
 */

use serde::{Deserialize, Serialize};
use std::fs;
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};

use crate::errors::{PublishError, Result};
use crate::port::PortRange;

pub const API_VERSION: &str = "portpub/v1";
pub const KIND: &str = "Publisher";

/// Default range for publish-all host ports
pub const DEFAULT_EPHEMERAL_RANGE: PortRange = PortRange {
    start: 49153,
    end: 65535,
};

/// Publisher configuration file structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PublisherConfig {
    pub api_version: String,
    pub kind: String,
    #[serde(default)]
    pub spec: PublisherSpec,
}

/// Publisher settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PublisherSpec {
    /// Host IP used when a spec names none
    #[serde(default = "default_host_ip")]
    pub default_host_ip: Ipv4Addr,
    /// Host ports handed out by publish-all
    #[serde(default = "default_ephemeral_range")]
    pub ephemeral_range: PortRange,
    /// Where the CLI keeps published state between runs
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub state_file: Option<PathBuf>,
}

fn default_host_ip() -> Ipv4Addr {
    Ipv4Addr::UNSPECIFIED
}

fn default_ephemeral_range() -> PortRange {
    DEFAULT_EPHEMERAL_RANGE
}

impl Default for PublisherSpec {
    fn default() -> Self {
        PublisherSpec {
            default_host_ip: default_host_ip(),
            ephemeral_range: default_ephemeral_range(),
            state_file: None,
        }
    }
}

impl Default for PublisherConfig {
    fn default() -> Self {
        PublisherConfig {
            api_version: API_VERSION.to_string(),
            kind: KIND.to_string(),
            spec: PublisherSpec::default(),
        }
    }
}

impl PublisherConfig {
    /// Load configuration from specified path
    ///
    /// # Errors
    /// - `FileNotFound` if the file does not exist
    /// - `ParseError` if the YAML is malformed
    /// - `ValidationError` if a field is out of bounds
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(PublishError::FileNotFound(
                path.to_string_lossy().to_string(),
            ));
        }

        let content = fs::read_to_string(path)?;

        let config: PublisherConfig = serde_yaml::from_str(&content).map_err(|e| {
            PublishError::ParseError(format!("Invalid publisher config YAML: {}", e))
        })?;

        config.validate()?;

        Ok(config)
    }

    /// Load from `path` when given, otherwise use defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Save configuration as YAML
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        fs::write(path, yaml)?;
        Ok(())
    }

    /// Validate configuration structure
    ///
    /// Ensures:
    /// - apiVersion is "portpub/v1"
    /// - kind is "Publisher"
    /// - the ephemeral range is non-empty and excludes port 0
    pub fn validate(&self) -> Result<()> {
        if self.api_version != API_VERSION {
            return Err(PublishError::ValidationError(format!(
                "Invalid apiVersion: expected '{}', got '{}'",
                API_VERSION, self.api_version
            )));
        }

        if self.kind != KIND {
            return Err(PublishError::ValidationError(format!(
                "Invalid kind: expected '{}', got '{}'",
                KIND, self.kind
            )));
        }

        let range = self.spec.ephemeral_range;
        PortRange::new(range.start, range.end).map_err(|e| {
            PublishError::ValidationError(format!("Invalid ephemeralRange: {}", e))
        })?;

        Ok(())
    }
}
