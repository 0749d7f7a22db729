// Copyright (c) 2025 - Cowboy AI, Inc.
//! Deployment Orchestrator
//!
//! Sequences one publish request:
//!
//! ```text
//! credential ─verify─> config header ─validate─> stage bundle ─> reconcile DNS
//!                                                                    │
//!                                   response ◄───────────────────────┤
//!                                                                    ↓
//!                                          schedule proxy activation (delay)
//! ```
//!
//! # Transaction Semantics
//!
//! - Authentication and validation failures happen before any side effect.
//! - A staging failure aborts the request; DNS is not attempted.
//! - A DNS failure aborts the request after staging (the staged files stay).
//! - The proxy activation runs detached after the response; its failures go
//!   to the notifier only.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::auth::ApiKeyHash;
use crate::dns::{DnsOutcome, DnsReconciler};
use crate::domain::{DeploymentRequest, Hostname, PublishConfig};
use crate::errors::{DeployError, DeployResult};
use crate::scheduler::ActivationScheduler;
use crate::staging::{ContentStager, StagedSite};
use crate::state_machine::{DeploymentStage, DeploymentStep, StateMachineWithHistory};

type Lifecycle = StateMachineWithHistory<DeploymentStage>;

/// Inbound publish call, as received from the transport
#[derive(Debug, Clone, Default)]
pub struct PublishCall {
    /// `X-Lizcel-Auth` header value
    pub credential: Option<String>,
    /// `config` header value
    pub config: Option<String>,
    /// Raw request body
    pub payload: Bytes,
}

/// Result of a successful publish
#[derive(Debug)]
pub struct PublishOutcome {
    pub hostname: Hostname,
    pub staged: StagedSite,
    pub dns: DnsOutcome,
    pub activation_delay: Duration,
    /// Handle of the detached proxy activation, resolving to its final stage
    pub activation: JoinHandle<DeploymentStage>,
}

impl PublishOutcome {
    /// Plain-text body returned to the publishing client
    pub fn message(&self) -> String {
        format!(
            "DNS says: {}\nOK. In {}, I'll configure caddy.\nURL: {}",
            self.dns,
            describe_delay(self.activation_delay),
            self.hostname.url()
        )
    }
}

fn describe_delay(delay: Duration) -> String {
    let secs = delay.as_secs();
    match secs {
        60 => "1 minute".to_string(),
        s if s >= 60 && s % 60 == 0 => format!("{} minutes", s / 60),
        1 => "1 second".to_string(),
        s => format!("{} seconds", s),
    }
}

/// Publish service interface
#[async_trait]
pub trait PublishService: Send + Sync {
    /// Run the publish pipeline for one inbound call
    async fn publish(&self, call: PublishCall) -> DeployResult<PublishOutcome>;
}

/// The production publish pipeline
pub struct DeploymentService {
    api_key_hash: ApiKeyHash,
    stager: Arc<ContentStager>,
    dns: DnsReconciler,
    scheduler: ActivationScheduler,
    activation_delay: Duration,
}

impl DeploymentService {
    pub fn new(
        api_key_hash: ApiKeyHash,
        stager: Arc<ContentStager>,
        dns: DnsReconciler,
        scheduler: ActivationScheduler,
        activation_delay: Duration,
    ) -> Self {
        Self {
            api_key_hash,
            stager,
            dns,
            scheduler,
            activation_delay,
        }
    }

    fn validate(call: &PublishCall) -> DeployResult<Hostname> {
        PublishConfig::from_header(call.config.as_deref())?.hostname()
    }
}

fn advance(lifecycle: &mut Lifecycle, step: DeploymentStep) {
    if let Err(e) = lifecycle.transition_with_history(step, Utc::now()) {
        error!("Deployment lifecycle out of order: {}", e);
    }
}

fn fail(lifecycle: &mut Lifecycle, err: DeployError) -> DeployError {
    let reached = *lifecycle.current_state();
    advance(lifecycle, DeploymentStep::Fail);

    if err.is_client_error() {
        warn!("Publish rejected at {}: {}", reached, err);
    } else {
        error!("Publish failed at {}: {}", reached, err);
    }
    err
}

#[async_trait]
impl PublishService for DeploymentService {
    async fn publish(&self, call: PublishCall) -> DeployResult<PublishOutcome> {
        let mut lifecycle = Lifecycle::new(DeploymentStage::Received);

        // Rejected credentials never leave Received
        if let Err(e) = self.api_key_hash.verify(call.credential.as_deref()) {
            warn!("Publish rejected: {}", e);
            return Err(e);
        }
        advance(&mut lifecycle, DeploymentStep::Authenticate);

        let hostname = Self::validate(&call).map_err(|e| fail(&mut lifecycle, e))?;
        let request = DeploymentRequest::new(hostname, call.payload);
        advance(&mut lifecycle, DeploymentStep::Validate);
        info!("Publishing {}", request.hostname);

        let staged = self
            .stager
            .stage(request.payload, &request.hostname.dir_name())
            .await
            .map_err(|e| fail(&mut lifecycle, e.into()))?;
        advance(&mut lifecycle, DeploymentStep::Stage);

        let dns = self
            .dns
            .ensure_record(&request.hostname)
            .await
            .map_err(|e| fail(&mut lifecycle, e.into()))?;
        advance(&mut lifecycle, DeploymentStep::ReconcileDns);
        advance(&mut lifecycle, DeploymentStep::Respond);

        let activation = self
            .scheduler
            .schedule(request.hostname.clone(), self.activation_delay)
            .await;
        advance(&mut lifecycle, DeploymentStep::ScheduleProxy);

        debug!(
            "{} reached {} after {} step(s)",
            request.hostname,
            lifecycle.current_state(),
            lifecycle.history().len()
        );

        Ok(PublishOutcome {
            hostname: request.hostname,
            staged,
            dns,
            activation_delay: self.activation_delay,
            activation,
        })
    }
}
