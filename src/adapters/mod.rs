// Copyright (c) 2025 - Cowboy AI, Inc.

//! External collaborator adapters
//!
//! Concrete implementations of the [`crate::dns::DnsProvider`] and
//! [`crate::proxy::ProxyReloader`] seams.

pub mod caddy;
pub mod cloudflare;

pub use caddy::CaddyReloader;
pub use cloudflare::{CloudflareConfig, CloudflareProvider};
