//! Error types for portpub

use std::net::Ipv4Addr;

use thiserror::Error;

use crate::portspec::PortProtocol;

/// Coarse error category, stable across message wording changes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidSpec,
    AlreadyAllocated,
    RangeExhausted,
    BindError,
    Other,
}

#[derive(Error, Debug)]
pub enum PublishError {
    #[error("Invalid port specification: {0}")]
    InvalidSpec(String),

    #[error("Host port {host_ip}:{host_port}/{protocol} is already allocated to {owner}")]
    AlreadyAllocated {
        protocol: PortProtocol,
        host_ip: Ipv4Addr,
        host_port: u16,
        owner: String,
    },

    #[error("No free host port in range {host_ip}:{start}-{end}/{protocol}")]
    RangeExhausted {
        protocol: PortProtocol,
        host_ip: Ipv4Addr,
        start: u16,
        end: u16,
    },

    #[error("Bind error: {0}")]
    BindError(String),

    #[error("Container not found: {0}")]
    ContainerNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Regex error: {0}")]
    RegexError(String),
}

impl PublishError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PublishError::InvalidSpec(_) => ErrorKind::InvalidSpec,
            PublishError::AlreadyAllocated { .. } => ErrorKind::AlreadyAllocated,
            PublishError::RangeExhausted { .. } => ErrorKind::RangeExhausted,
            PublishError::BindError(_) => ErrorKind::BindError,
            _ => ErrorKind::Other,
        }
    }
}

impl From<regex::Error> for PublishError {
    fn from(err: regex::Error) -> Self {
        PublishError::RegexError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PublishError>;
