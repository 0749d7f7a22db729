// Copyright (c) 2025 - Cowboy AI, Inc.
//! Publish Domain Models
//!
//! Value objects that a publish request is validated into before any side
//! effect runs.
//!
//! # Value Objects with Invariants
//!
//! - [`Hostname`] - 2 or 3 labels restricted to `[A-Za-z0-9-]`
//! - [`PublishConfig`] - the JSON `config` header sent by the publishing client
//! - [`DeploymentRequest`] - a validated hostname plus the raw bundle bytes

pub mod hostname;
pub mod request;

pub use hostname::{Hostname, HostnameError};
pub use request::{DeploymentRequest, PublishConfig};
