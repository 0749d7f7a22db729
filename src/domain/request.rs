// Copyright (c) 2025 - Cowboy AI, Inc.
//! Publish request value objects

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use super::hostname::Hostname;
use crate::errors::DeployError;

/// JSON object carried in the `config` request header
///
/// Only `domain` is required; unknown fields are ignored so newer clients can
/// send extra settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishConfig {
    pub domain: Vec<String>,
}

impl PublishConfig {
    /// Parse the raw header value
    ///
    /// A missing header is treated like `{}` and therefore fails on the
    /// absent `domain` field.
    pub fn from_header(raw: Option<&str>) -> Result<Self, DeployError> {
        serde_json::from_str(raw.unwrap_or("{}"))
            .map_err(|e| DeployError::InvalidRequest(format!("Invalid config header: {}", e)))
    }

    /// Validate the declared domain into a [`Hostname`]
    pub fn hostname(&self) -> Result<Hostname, DeployError> {
        Ok(Hostname::new(self.domain.iter().cloned())?)
    }
}

/// An authenticated, validated unit of work
///
/// Lives only for the duration of one publish call.
#[derive(Debug, Clone)]
pub struct DeploymentRequest {
    pub hostname: Hostname,
    pub payload: Bytes,
}

impl DeploymentRequest {
    pub fn new(hostname: Hostname, payload: impl Into<Bytes>) -> Self {
        Self {
            hostname,
            payload: payload.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config_header() {
        let config = PublishConfig::from_header(Some(r#"{"domain":["abc","example","com"]}"#))
            .unwrap();
        assert_eq!(config.domain, vec!["abc", "example", "com"]);
        assert_eq!(config.hostname().unwrap().dotted(), "abc.example.com");
    }

    #[test]
    fn test_unknown_fields_ignored() {
        let config =
            PublishConfig::from_header(Some(r#"{"domain":["example","com"],"dist":"build"}"#))
                .unwrap();
        assert_eq!(config.domain.len(), 2);
    }

    #[test]
    fn test_missing_header_is_invalid_request() {
        let err = PublishConfig::from_header(None).unwrap_err();
        assert!(matches!(err, DeployError::InvalidRequest(_)));
    }

    #[test]
    fn test_malformed_json_is_invalid_request() {
        let err = PublishConfig::from_header(Some("domain=abc")).unwrap_err();
        assert!(matches!(err, DeployError::InvalidRequest(_)));
    }

    #[test]
    fn test_bad_domain_is_invalid_request() {
        let config = PublishConfig::from_header(Some(r#"{"domain":["a","b","c","d"]}"#)).unwrap();
        assert!(matches!(
            config.hostname(),
            Err(DeployError::InvalidRequest(_))
        ));
    }
}
