// Copyright (c) 2025 - Cowboy AI, Inc.

//! Cloudflare DNS provider adapter
//!
//! Implements [`DnsProvider`] against the Cloudflare v4 REST API:
//!
//! ```text
//! find_zone_id(name)     = GET  /zones?name={name}
//! list_a_records(zone)   = GET  /zones/{zone}/dns_records   (type A kept client-side)
//! create_record(zone, r) = POST /zones/{zone}/dns_records   {type, name, content, ttl, proxied}
//! ```
//!
//! Every response is the Cloudflare envelope `{success, errors, result}`.
//! A non-2xx status, an unparseable body or `success: false` is a
//! [`DnsError::Provider`]. The client carries an explicit request timeout.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error};

use crate::dns::{DnsProvider, DnsRecord, NewARecord};
use crate::errors::{DnsError, DnsResult};

/// Default Cloudflare API base URL
pub const CLOUDFLARE_API_URL: &str = "https://api.cloudflare.com/client/v4";

/// Configuration for the Cloudflare connection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloudflareConfig {
    /// API base URL, without trailing slash
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Account email sent as `X-Auth-Email`
    pub email: String,

    /// API token sent as a bearer token
    pub api_token: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    CLOUDFLARE_API_URL.to_string()
}

fn default_timeout() -> u64 {
    30
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    success: bool,
    #[serde(default)]
    errors: Vec<serde_json::Value>,
    result: Option<T>,
}

#[derive(Debug, Deserialize)]
struct Zone {
    id: String,
}

/// Cloudflare implementation of [`DnsProvider`]
#[derive(Debug, Clone)]
pub struct CloudflareProvider {
    config: CloudflareConfig,
    client: Client,
}

impl CloudflareProvider {
    /// Build the HTTP client with auth headers and timeout
    pub fn new(config: CloudflareConfig) -> DnsResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "X-Auth-Email",
            HeaderValue::from_str(&config.email)
                .map_err(|e| DnsError::Provider(format!("Invalid account email: {}", e)))?,
        );
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", config.api_token))
                .map_err(|e| DnsError::Provider(format!("Invalid API token: {}", e)))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| DnsError::Provider(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    fn records_url(&self, zone_id: &str) -> String {
        format!(
            "{}/zones/{}/dns_records",
            self.config.base_url,
            urlencoding::encode(zone_id)
        )
    }

    /// Check status, decode the envelope and unwrap `result`
    async fn unwrap_envelope<T: DeserializeOwned>(
        response: Response,
        failure: &str,
    ) -> DnsResult<T> {
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            error!("Error response: {}", body);
            return Err(DnsError::Provider(format!(
                "HTTP error! status: {}",
                status.as_u16()
            )));
        }

        let envelope: Envelope<T> = serde_json::from_str(&body)
            .map_err(|e| DnsError::Provider(format!("Malformed provider response: {}", e)))?;

        match envelope {
            Envelope {
                success: true,
                result: Some(result),
                ..
            } => Ok(result),
            Envelope { errors, .. } => {
                error!("{}: {:?}", failure, errors);
                Err(DnsError::Provider(failure.to_string()))
            }
        }
    }
}

#[async_trait]
impl DnsProvider for CloudflareProvider {
    async fn find_zone_id(&self, zone_name: &str) -> DnsResult<Option<String>> {
        let url = format!(
            "{}/zones?name={}",
            self.config.base_url,
            urlencoding::encode(zone_name)
        );
        let response = self.client.get(&url).send().await?;
        let zones: Vec<Zone> = Self::unwrap_envelope(response, "Failed to look up zone").await?;

        Ok(zones.into_iter().next().map(|zone| zone.id))
    }

    async fn list_a_records(&self, zone_id: &str) -> DnsResult<Vec<DnsRecord>> {
        let response = self.client.get(self.records_url(zone_id)).send().await?;
        let records: Vec<DnsRecord> =
            Self::unwrap_envelope(response, "Failed to fetch DNS records").await?;

        let a_records: Vec<DnsRecord> = records
            .into_iter()
            .filter(|record| record.record_type == "A")
            .collect();
        debug!("Zone {} has {} A record(s)", zone_id, a_records.len());
        Ok(a_records)
    }

    async fn create_record(&self, zone_id: &str, record: &NewARecord) -> DnsResult<DnsRecord> {
        let response = self
            .client
            .post(self.records_url(zone_id))
            .json(record)
            .send()
            .await?;

        Self::unwrap_envelope(response, "Failed to add DNS record").await
    }

    fn name(&self) -> &str {
        "cloudflare"
    }
}
