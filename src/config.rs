// Copyright (c) 2025 - Cowboy AI, Inc.
//! Service configuration loaded from environment variables

use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::time::Duration;

use crate::adapters::caddy::DEFAULT_CADDY_BIN;
use crate::adapters::cloudflare::{CloudflareConfig, CLOUDFLARE_API_URL};
use crate::auth::ApiKeyHash;
use crate::errors::ConfigError;

/// Default listening port
pub const DEFAULT_PORT: u16 = 10203;

/// Default delay between responding and activating the proxy route
pub const DEFAULT_ACTIVATION_DELAY: Duration = Duration::from_secs(10 * 60);

/// Default alerting endpoint
pub const DEFAULT_REPORT_URL: &str = "https://report.liz-lovelace.com/submit?channel=161";

/// Default request body limit (150 MiB)
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 150 * 1024 * 1024;

/// Publish host configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// DNS provider connection
    pub cloudflare: CloudflareConfig,
    /// Address new A records point at
    pub target_ip: Ipv4Addr,
    /// Digest of the shared secret
    pub api_key_hash: ApiKeyHash,
    /// Root of the staged site directories
    pub websites_path: PathBuf,
    /// Shared reverse-proxy config file
    pub caddyfile_path: PathBuf,
    /// Proxy binary invoked for reloads
    pub caddy_bin: String,
    /// Listening port
    pub port: u16,
    /// Delay before the proxy route is activated
    pub activation_delay: Duration,
    /// Where pending activations are persisted, if anywhere
    pub pending_activations_path: Option<PathBuf>,
    /// Alerting endpoint; `None` disables delivery
    pub report_url: Option<String>,
    /// Request body limit in bytes
    pub max_upload_bytes: usize,
}

impl ServerConfig {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |var: &'static str| -> Result<String, ConfigError> {
            lookup(var)
                .filter(|value| !value.is_empty())
                .ok_or(ConfigError::Missing(var))
        };

        let cloudflare = CloudflareConfig {
            base_url: lookup("CLOUDFLARE_API_URL")
                .unwrap_or_else(|| CLOUDFLARE_API_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            email: required("CLOUDFLARE_EMAIL")?,
            api_token: required("CLOUDFLARE_API_KEY")?,
            timeout_secs: parse_or(&lookup, "DNS_TIMEOUT_SECS", 30)?,
        };

        let target_ip = required("LIZCEL_IP")?
            .parse::<Ipv4Addr>()
            .map_err(|e| ConfigError::Invalid {
                var: "LIZCEL_IP",
                reason: e.to_string(),
            })?;

        let api_key_hash = ApiKeyHash::from_hex(&required("LIZCEL_API_KEY_HASH")?)?;

        let report_url = match lookup("REPORT_URL") {
            Some(url) if url.is_empty() => None,
            Some(url) => Some(url),
            None => Some(DEFAULT_REPORT_URL.to_string()),
        };

        Ok(Self {
            cloudflare,
            target_ip,
            api_key_hash,
            websites_path: PathBuf::from(required("WEBSITES_PATH")?),
            caddyfile_path: PathBuf::from(required("CADDYFILE_PATH")?),
            caddy_bin: lookup("CADDY_BIN").unwrap_or_else(|| DEFAULT_CADDY_BIN.to_string()),
            port: parse_or(&lookup, "PORT", DEFAULT_PORT)?,
            activation_delay: Duration::from_secs(parse_or(
                &lookup,
                "PROXY_ACTIVATION_DELAY_SECS",
                DEFAULT_ACTIVATION_DELAY.as_secs(),
            )?),
            pending_activations_path: lookup("PENDING_ACTIVATIONS_PATH")
                .filter(|path| !path.is_empty())
                .map(PathBuf::from),
            report_url,
            max_upload_bytes: parse_or(&lookup, "MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?,
        })
    }
}

fn parse_or<F, T>(lookup: &F, var: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(var) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            var,
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}
