// Copyright (c) 2025 - Cowboy AI, Inc.

//! DNS Reconciler - ensure one A record per published hostname
//!
//! The reconciler brings the provider toward "an A record exists for
//! `fullHostname`" and nothing more:
//!
//! ```text
//! zone_name ──lookup──> zone id ──list──> A records
//!                                            │
//!                     name == fullHostname? ─┤
//!                          yes → report existing content (no-op)
//!                          no  → create {A, fullHostname, target_ip, ttl=auto, proxied=false}
//! ```
//!
//! An existing record is authoritative. It is never updated, duplicated or
//! deleted, so redeploying never clobbers a manually adjusted record.
//!
//! The provider itself sits behind [`DnsProvider`] so the HTTP client in
//! [`crate::adapters::cloudflare`] can be swapped in tests.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;
use std::sync::Arc;
use tracing::{debug, info};

use crate::domain::Hostname;
use crate::errors::{DnsError, DnsResult};
use crate::notify::{Notifier, Report};

/// Provider TTL value meaning "automatic"
pub const AUTO_TTL: u32 = 1;

/// A DNS record as listed by the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub record_type: String,
    pub name: String,
    pub content: String,
    #[serde(default)]
    pub proxied: bool,
    #[serde(default = "default_ttl")]
    pub ttl: u32,
}

fn default_ttl() -> u32 {
    AUTO_TTL
}

/// Body of a record creation call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewARecord {
    #[serde(rename = "type")]
    pub record_type: String,
    pub name: String,
    pub content: String,
    pub ttl: u32,
    pub proxied: bool,
}

impl NewARecord {
    /// Unproxied A record with automatic TTL
    pub fn new(name: impl Into<String>, address: Ipv4Addr) -> Self {
        Self {
            record_type: "A".to_string(),
            name: name.into(),
            content: address.to_string(),
            ttl: AUTO_TTL,
            proxied: false,
        }
    }
}

/// Authoritative DNS provider
///
/// Implementations map transport failures, non-2xx statuses and explicit
/// `success: false` bodies to [`DnsError::Provider`].
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// Resolve a registrable domain to the provider's zone id, `None` if the
    /// provider knows no such zone
    async fn find_zone_id(&self, zone_name: &str) -> DnsResult<Option<String>>;

    /// All A records of a zone
    async fn list_a_records(&self, zone_id: &str) -> DnsResult<Vec<DnsRecord>>;

    /// Create a record in a zone
    async fn create_record(&self, zone_id: &str, record: &NewARecord) -> DnsResult<DnsRecord>;

    /// Provider name for logs
    fn name(&self) -> &str;
}

/// Outcome of [`DnsReconciler::ensure_record`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DnsOutcome {
    /// A record named after the hostname was already present
    AlreadyExists { hostname: String, content: String },
    /// A new record was created
    Added { hostname: String },
}

impl fmt::Display for DnsOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DnsOutcome::AlreadyExists { hostname, content } => write!(
                f,
                "Domain {} already exists, it's pointing to {}",
                hostname, content
            ),
            DnsOutcome::Added { hostname } => write!(f, "Domain {} added", hostname),
        }
    }
}

/// Ensures exactly one A record exists for a hostname
#[derive(Clone)]
pub struct DnsReconciler {
    provider: Arc<dyn DnsProvider>,
    target_ip: Ipv4Addr,
    notifier: Notifier,
}

impl DnsReconciler {
    pub fn new(provider: Arc<dyn DnsProvider>, target_ip: Ipv4Addr, notifier: Notifier) -> Self {
        Self {
            provider,
            target_ip,
            notifier,
        }
    }

    /// Address new records point at
    pub fn target_ip(&self) -> Ipv4Addr {
        self.target_ip
    }

    /// Reconcile the A record for `hostname`
    pub async fn ensure_record(&self, hostname: &Hostname) -> DnsResult<DnsOutcome> {
        let zone_name = hostname.zone_name();
        let full_hostname = hostname.dotted();

        debug!(
            "Fetching zone id for {} from {}",
            zone_name,
            self.provider.name()
        );
        let zone_id = self
            .provider
            .find_zone_id(&zone_name)
            .await?
            .ok_or_else(|| DnsError::ZoneNotFound(zone_name.clone()))?;

        debug!("Fetching DNS records (type A only) for zone {}", zone_id);
        let records = self.provider.list_a_records(&zone_id).await?;

        // Exact, case-sensitive name match
        if let Some(existing) = records.iter().find(|record| record.name == full_hostname) {
            info!(
                "A record for {} already exists -> {}",
                full_hostname, existing.content
            );
            return Ok(DnsOutcome::AlreadyExists {
                hostname: full_hostname,
                content: existing.content.clone(),
            });
        }

        let message = format!(
            "Adding type A record for {} that points to {}",
            full_hostname, self.target_ip
        );
        info!("{}", message);
        self.notifier.report(Report::message(message));

        self.provider
            .create_record(&zone_id, &NewARecord::new(&full_hostname, self.target_ip))
            .await?;

        info!("Successfully added type A record for {}", full_hostname);
        Ok(DnsOutcome::Added {
            hostname: full_hostname,
        })
    }
}
