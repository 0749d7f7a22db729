// Copyright (c) 2025 - Cowboy AI, Inc.
//! Static site publish host
//!
//! Accepts a compressed site bundle over HTTP, stages it under a per-hostname
//! directory, makes sure the hostname has a DNS A record pointing at this
//! host, and later adds a static-file vhost to the reverse proxy.
//!
//! ```text
//! POST /push ─> api ─> service::DeploymentService
//!                         ├─ auth        (shared-secret digest)
//!                         ├─ staging     (gzip(zip) → websites/<dir>)
//!                         ├─ dns         (DnsProvider: Cloudflare)
//!                         └─ scheduler ─> proxy (ProxyReloader: Caddy)
//!                                  failures ─> notify
//! ```

pub mod adapters;
pub mod api;
pub mod auth;
pub mod config;
pub mod dns;
pub mod domain;
pub mod errors;
pub mod notify;
pub mod proxy;
pub mod scheduler;
pub mod service;
pub mod staging;
pub mod state_machine;

// Re-export commonly used types
pub use api::create_router;
pub use auth::ApiKeyHash;
pub use config::ServerConfig;
pub use domain::{Hostname, HostnameError, PublishConfig};
pub use errors::{DeployError, DeployResult, DnsError, ProxyError, StagingError};
pub use notify::{Notifier, Report};
pub use service::{DeploymentService, PublishCall, PublishOutcome, PublishService};
