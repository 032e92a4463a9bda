/**
 * range.rs
 * Inclusive host/container port ranges
 *
 * A single port is a range whose start equals its end.
 * Ranges never contain port 0 and never run backwards; both are
 * rejected at construction time.
 */

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::PublishError;

/// Inclusive port range `[start, end]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PortRange {
    pub start: u16,
    pub end: u16,
}

impl PortRange {
    /// Create a validated range
    ///
    /// # Errors
    /// Returns `InvalidSpec` if either bound is 0 or `end < start`
    pub fn new(start: u16, end: u16) -> Result<Self, PublishError> {
        if start == 0 || end == 0 {
            return Err(PublishError::InvalidSpec(format!(
                "port 0 is not allowed in range {}-{}",
                start, end
            )));
        }
        if end < start {
            return Err(PublishError::InvalidSpec(format!(
                "range end {} is below range start {}",
                end, start
            )));
        }
        Ok(PortRange { start, end })
    }

    /// Range holding exactly one port
    pub fn single(port: u16) -> Self {
        PortRange {
            start: port,
            end: port,
        }
    }

    /// Check if port is within this range
    pub fn contains(&self, port: u16) -> bool {
        port >= self.start && port <= self.end
    }

    /// Number of ports in the range
    pub fn len(&self) -> usize {
        usize::from(self.end - self.start) + 1
    }

    pub fn is_single(&self) -> bool {
        self.start == self.end
    }

    /// Ports in ascending order
    pub fn iter(&self) -> impl Iterator<Item = u16> {
        self.start..=self.end
    }
}

impl fmt::Display for PortRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_single() {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}-{}", self.start, self.end)
        }
    }
}
