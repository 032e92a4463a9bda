//! Typed publish specifications
//!
//! Everything downstream of the parser works on these types; raw
//! `-p`/`--expose` strings are only inspected in [`parser`].

pub mod parser;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use crate::errors::PublishError;
use crate::port::PortRange;

pub use parser::PortSpecParser;

/// Transport protocol, part of every port identity
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum PortProtocol {
    #[default]
    Tcp,
    Udp,
}

impl PortProtocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            PortProtocol::Tcp => "tcp",
            PortProtocol::Udp => "udp",
        }
    }
}

impl fmt::Display for PortProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PortProtocol {
    type Err = PublishError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("tcp") {
            Ok(PortProtocol::Tcp)
        } else if s.eq_ignore_ascii_case("udp") {
            Ok(PortProtocol::Udp)
        } else {
            Err(PublishError::InvalidSpec(format!(
                "unsupported protocol '{}', expected tcp or udp",
                s
            )))
        }
    }
}

/// How a spec's host side relates to its container side
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecMapping {
    /// One host port to one container port
    Single,
    /// Host range serving one container port; each publish claims one slot
    FanOut,
    /// Equal-width ranges, `host.start + i <-> container.start + i`
    ElementWise,
}

/// A parsed `-p` request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortSpec {
    pub host_ip: Ipv4Addr,
    pub host_range: PortRange,
    pub container_range: PortRange,
    pub protocol: PortProtocol,
}

impl PortSpec {
    pub fn mapping(&self) -> SpecMapping {
        match (self.host_range.is_single(), self.container_range.is_single()) {
            (true, true) => SpecMapping::Single,
            (false, true) => SpecMapping::FanOut,
            _ => SpecMapping::ElementWise,
        }
    }

    /// Container ports this spec exposes
    pub fn exposed_ports(&self) -> impl Iterator<Item = ExposedPort> + '_ {
        self.container_range.iter().map(move |port| ExposedPort {
            port,
            protocol: self.protocol,
        })
    }

    /// `(hostPort, containerPort)` pairs for fixed mappings, in ascending order
    ///
    /// Empty for fan-out specs, whose host port is only known after allocation.
    pub fn fixed_pairs(&self) -> Vec<(u16, u16)> {
        match self.mapping() {
            SpecMapping::FanOut => Vec::new(),
            _ => self
                .host_range
                .iter()
                .zip(self.container_range.iter())
                .collect(),
        }
    }
}

impl fmt::Display for PortSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}/{}",
            self.host_ip, self.host_range, self.container_range, self.protocol
        )
    }
}

impl FromStr for PortSpec {
    type Err = PublishError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PortSpecParser::parse(s)
    }
}

/// Container port declared as reachable (`--expose`), published or not
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct ExposedPort {
    pub port: u16,
    pub protocol: PortProtocol,
}

impl ExposedPort {
    pub fn new(port: u16, protocol: PortProtocol) -> Self {
        ExposedPort { port, protocol }
    }
}

impl fmt::Display for ExposedPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.port, self.protocol)
    }
}

/// Single port only: `80` or `80/udp`
impl FromStr for ExposedPort {
    type Err = PublishError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match PortSpecParser::parse_exposed(s)?.as_slice() {
            [port] => Ok(*port),
            _ => Err(PublishError::InvalidSpec(format!(
                "expected a single container port, got '{}'",
                s
            ))),
        }
    }
}
