// Copyright (c) 2025 - Cowboy AI, Inc.
//! Service Layer for Site Publishing
//!
//! The application service that turns one inbound publish call into the
//! ordered side effects of the pipeline.
//!
//! # Architecture
//!
//! ```text
//! HTTP handler (api)
//!     ↓
//! PublishService (this module)
//!     ↓
//! ApiKeyHash → Hostname → ContentStager → DnsReconciler
//!                                             ↓
//!                              ActivationScheduler → ProxyReconciler (deferred)
//! ```

pub mod deployment;

pub use deployment::{DeploymentService, PublishCall, PublishOutcome, PublishService};
