// Copyright (c) 2025 - Cowboy AI, Inc.
//! Error types for the publish pipeline
//!
//! Client errors ([`DeployError::Unauthenticated`], [`DeployError::Forbidden`],
//! [`DeployError::InvalidRequest`]) are raised before any side effect.
//! Everything else is an operational failure of one pipeline stage.
//! [`ProxyError`] never reaches a request; the deferred activation reports it
//! through the notifier.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::domain::HostnameError;

/// Errors raised while replacing a staged site directory
#[derive(Debug, Error)]
pub enum StagingError {
    /// Outer gzip layer is corrupt or truncated
    #[error("Failed to decompress payload: {0}")]
    Decompress(#[source] io::Error),

    /// Decompressed bytes are not a valid zip container
    #[error("Invalid archive: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// Filesystem operation failed
    #[error("Filesystem error at {path}: {source}")]
    Filesystem {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Blocking staging task did not complete
    #[error("Staging task failed: {0}")]
    Task(String),
}

impl StagingError {
    pub(crate) fn fs(path: impl Into<PathBuf>, source: io::Error) -> Self {
        StagingError::Filesystem {
            path: path.into(),
            source,
        }
    }
}

/// Errors raised while reconciling the DNS A record
#[derive(Debug, Error)]
pub enum DnsError {
    /// The provider has no zone for the hostname's suffix
    #[error("Zone not found for the given domain: {0}")]
    ZoneNotFound(String),

    /// Provider call failed: transport, timeout, non-2xx or `success: false`
    #[error("DNS provider error: {0}")]
    Provider(String),
}

/// Errors raised while reconciling the reverse-proxy vhost
#[derive(Debug, Error)]
pub enum ProxyError {
    /// Reading or appending the shared config file failed
    #[error("Proxy config error at {path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Reload subprocess could not be spawned or exited non-zero
    #[error("Proxy reload failed: {0}")]
    Reload(String),
}

/// Errors loading the service configuration
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required environment variable {0}")]
    Missing(&'static str),

    #[error("Invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}

/// Errors surfaced by a publish request
#[derive(Debug, Error)]
pub enum DeployError {
    /// No credential header
    #[error("Authentication required")]
    Unauthenticated,

    /// Credential hash mismatch
    #[error("Invalid authentication")]
    Forbidden,

    /// Hostname or config header rejected
    #[error("{0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Staging(#[from] StagingError),

    #[error(transparent)]
    Dns(#[from] DnsError),
}

impl DeployError {
    /// Whether the caller is at fault (no side effects were performed)
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            DeployError::Unauthenticated | DeployError::Forbidden | DeployError::InvalidRequest(_)
        )
    }
}

impl From<HostnameError> for DeployError {
    fn from(err: HostnameError) -> Self {
        DeployError::InvalidRequest(err.to_string())
    }
}

/// Result type for staging operations
pub type StagingResult<T> = Result<T, StagingError>;

/// Result type for DNS reconciliation
pub type DnsResult<T> = Result<T, DnsError>;

/// Result type for proxy reconciliation
pub type ProxyResult<T> = Result<T, ProxyError>;

/// Result type for publish requests
pub type DeployResult<T> = Result<T, DeployError>;

impl From<reqwest::Error> for DnsError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            DnsError::Provider(format!("request timed out: {}", err))
        } else {
            DnsError::Provider(err.to_string())
        }
    }
}
