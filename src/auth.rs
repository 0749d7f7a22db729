// Copyright (c) 2025 - Cowboy AI, Inc.
//! Shared-secret authentication
//!
//! Clients send the secret in the `X-Lizcel-Auth` header. The service only
//! knows its SHA-256 hex digest and compares digests in constant time.

use constant_time_eq::constant_time_eq;
use sha2::{Digest, Sha256};
use std::fmt;

use crate::errors::{ConfigError, DeployError};

/// Request header carrying the shared secret
pub const AUTH_HEADER: &str = "X-Lizcel-Auth";

/// Expected SHA-256 digest of the shared secret
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKeyHash([u8; 32]);

impl ApiKeyHash {
    /// Parse a 64-character hex digest
    pub fn from_hex(hex_digest: &str) -> Result<Self, ConfigError> {
        let invalid = |reason: String| ConfigError::Invalid {
            var: "LIZCEL_API_KEY_HASH",
            reason,
        };

        let bytes = hex::decode(hex_digest.trim()).map_err(|e| invalid(e.to_string()))?;
        let digest: [u8; 32] = bytes
            .try_into()
            .map_err(|b: Vec<u8>| invalid(format!("expected 32 bytes, got {}", b.len())))?;

        Ok(Self(digest))
    }

    /// Digest of a plaintext secret
    pub fn of_secret(secret: &str) -> Self {
        Self(Sha256::digest(secret.as_bytes()).into())
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Check a presented credential
    ///
    /// Missing header → [`DeployError::Unauthenticated`], digest mismatch →
    /// [`DeployError::Forbidden`].
    pub fn verify(&self, presented: Option<&str>) -> Result<(), DeployError> {
        let presented = match presented {
            Some(secret) if !secret.is_empty() => secret,
            _ => return Err(DeployError::Unauthenticated),
        };

        let digest = Self::of_secret(presented);
        if constant_time_eq(&digest.0, &self.0) {
            Ok(())
        } else {
            Err(DeployError::Forbidden)
        }
    }
}

impl fmt::Debug for ApiKeyHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ApiKeyHash({}…)", &self.to_hex()[..8])
    }
}
