//! Parser for `-p` publish specifications and `--expose` declarations
//!
//! Grammar:
//!
//! ```text
//! [hostIP:]hostPort[-hostPortEnd]:containerPort[-containerPortEnd][/protocol]
//! ```

use once_cell::sync::Lazy;
use regex::Regex;
use std::net::Ipv4Addr;

use crate::errors::{PublishError, Result};
use crate::port::PortRange;
use crate::portspec::{ExposedPort, PortProtocol, PortSpec};

// Groups: (hostIP?)(host)(container)(protocol?)
static PUBLISH_SPEC_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:(?P<ip>[^:]+):)?(?P<host>[^:]*):(?P<container>[^:/]*)(?:/(?P<proto>.*))?$")
        .expect("publish spec pattern is valid")
});

/// Parser for textual port specifications
pub struct PortSpecParser;

impl PortSpecParser {
    /// Parse a publish spec, defaulting the host IP to `0.0.0.0`
    ///
    /// # Examples
    ///
    /// ```
    /// use portpub_core::{PortProtocol, PortSpecParser};
    ///
    /// let spec = PortSpecParser::parse("9090-9092:80/udp").unwrap();
    /// assert_eq!(spec.host_range.start, 9090);
    /// assert_eq!(spec.host_range.end, 9092);
    /// assert_eq!(spec.container_range.start, 80);
    /// assert_eq!(spec.protocol, PortProtocol::Udp);
    ///
    /// assert!(PortSpecParser::parse("9090-:80").is_err());
    /// ```
    pub fn parse(spec: &str) -> Result<PortSpec> {
        Self::parse_with_default_ip(spec, Ipv4Addr::UNSPECIFIED)
    }

    /// Parse a publish spec, using `default_ip` when no host IP is given
    pub fn parse_with_default_ip(spec: &str, default_ip: Ipv4Addr) -> Result<PortSpec> {
        let trimmed = spec.trim();
        if trimmed.is_empty() {
            return Err(PublishError::InvalidSpec(
                "port specification must be a non-empty string".to_string(),
            ));
        }

        let caps = PUBLISH_SPEC_RE.captures(trimmed).ok_or_else(|| {
            PublishError::InvalidSpec(format!(
                "'{}' does not match [hostIP:]hostPort[-end]:containerPort[-end][/protocol]",
                trimmed
            ))
        })?;

        let host_ip = match caps.name("ip") {
            Some(m) => m.as_str().parse::<Ipv4Addr>().map_err(|_| {
                PublishError::InvalidSpec(format!(
                    "invalid host IP '{}' in '{}'",
                    m.as_str(),
                    trimmed
                ))
            })?,
            None => default_ip,
        };

        let host_text = caps.name("host").map_or("", |m| m.as_str());
        let container_text = caps.name("container").map_or("", |m| m.as_str());

        let host_range = Self::parse_range(host_text, "host", trimmed)?;
        let container_range = Self::parse_range(container_text, "container", trimmed)?;

        let protocol = match caps.name("proto") {
            Some(m) => m.as_str().parse::<PortProtocol>()?,
            None => PortProtocol::Tcp,
        };

        // A container range must line up one-to-one with the host range
        if !container_range.is_single() && container_range.len() != host_range.len() {
            return Err(PublishError::InvalidSpec(format!(
                "host range {} ({} ports) does not match container range {} ({} ports) in '{}'",
                host_range,
                host_range.len(),
                container_range,
                container_range.len(),
                trimmed
            )));
        }

        Ok(PortSpec {
            host_ip,
            host_range,
            container_range,
            protocol,
        })
    }

    /// Parse every spec of a request, failing on the first malformed one
    pub fn parse_all<S: AsRef<str>>(specs: &[S], default_ip: Ipv4Addr) -> Result<Vec<PortSpec>> {
        specs
            .iter()
            .map(|s| Self::parse_with_default_ip(s.as_ref(), default_ip))
            .collect()
    }

    /// Parse an `--expose` declaration: `port[-end][/protocol]`
    ///
    /// # Examples
    ///
    /// ```
    /// use portpub_core::PortSpecParser;
    ///
    /// let ports = PortSpecParser::parse_exposed("8000-8002/udp").unwrap();
    /// assert_eq!(ports.len(), 3);
    /// assert_eq!(ports[2].to_string(), "8002/udp");
    /// ```
    pub fn parse_exposed(expose: &str) -> Result<Vec<ExposedPort>> {
        let trimmed = expose.trim();
        let (port_text, protocol) = match trimmed.split_once('/') {
            Some((ports, proto)) => (ports, proto.parse::<PortProtocol>()?),
            None => (trimmed, PortProtocol::Tcp),
        };

        let range = Self::parse_range(port_text, "exposed", trimmed)?;
        Ok(range
            .iter()
            .map(|port| ExposedPort { port, protocol })
            .collect())
    }

    /// Parse `start[-end]` into a validated range
    fn parse_range(text: &str, side: &str, spec: &str) -> Result<PortRange> {
        match text.split_once('-') {
            None => {
                let port = Self::parse_port(text, side, spec)?;
                PortRange::new(port, port)
            }
            Some((start, end)) => {
                if start.is_empty() {
                    return Err(PublishError::InvalidSpec(format!(
                        "{} port range is missing its start in '{}'",
                        side, spec
                    )));
                }
                if end.is_empty() {
                    return Err(PublishError::InvalidSpec(format!(
                        "{} port range is missing its end in '{}'",
                        side, spec
                    )));
                }
                let start = Self::parse_port(start, side, spec)?;
                let end = Self::parse_port(end, side, spec)?;
                PortRange::new(start, end).map_err(|e| match e {
                    PublishError::InvalidSpec(msg) => {
                        PublishError::InvalidSpec(format!("{} {} in '{}'", side, msg, spec))
                    }
                    other => other,
                })
            }
        }
    }

    fn parse_port(text: &str, side: &str, spec: &str) -> Result<u16> {
        if text.is_empty() {
            return Err(PublishError::InvalidSpec(format!(
                "missing {} port in '{}'",
                side, spec
            )));
        }
        if !text.bytes().all(|b| b.is_ascii_digit()) {
            return Err(PublishError::InvalidSpec(format!(
                "invalid {} port '{}' in '{}'",
                side, text, spec
            )));
        }
        match text.parse::<u16>() {
            Ok(0) | Err(_) => Err(PublishError::InvalidSpec(format!(
                "{} port '{}' is out of range 1-65535 in '{}'",
                side, text, spec
            ))),
            Ok(port) => Ok(port),
        }
    }
}
