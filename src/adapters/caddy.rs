// Copyright (c) 2025 - Cowboy AI, Inc.

//! Caddy reload adapter
//!
//! Runs `<caddy> reload --config <path>` as a subprocess. Spawn failures and
//! non-zero exits become [`ProxyError::Reload`] carrying stderr.

use async_trait::async_trait;
use std::path::Path;
use tokio::process::Command;
use tracing::debug;

use crate::errors::{ProxyError, ProxyResult};
use crate::proxy::ProxyReloader;

/// Default binary looked up on `PATH`
pub const DEFAULT_CADDY_BIN: &str = "caddy";

/// Reloads a running Caddy instance
#[derive(Debug, Clone)]
pub struct CaddyReloader {
    binary: String,
}

impl CaddyReloader {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl Default for CaddyReloader {
    fn default() -> Self {
        Self::new(DEFAULT_CADDY_BIN)
    }
}

#[async_trait]
impl ProxyReloader for CaddyReloader {
    async fn reload(&self, config_path: &Path) -> ProxyResult<()> {
        debug!("{} reload --config {}", self.binary, config_path.display());

        let output = Command::new(&self.binary)
            .arg("reload")
            .arg("--config")
            .arg(config_path)
            .output()
            .await
            .map_err(|e| ProxyError::Reload(format!("failed to run {}: {}", self.binary, e)))?;

        if output.status.success() {
            Ok(())
        } else {
            Err(ProxyError::Reload(format!(
                "{} exited with {}: {}",
                self.binary,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )))
        }
    }
}
