// Copyright (c) 2025 - Cowboy AI, Inc.

//! Deferred proxy activation
//!
//! After a publish responds, the proxy route is activated once, after a fixed
//! delay, on a task detached from the request. The activation is one-shot:
//! a failure is reported through the [`Notifier`] and never retried.
//!
//! Without a [`PendingStore`] a scheduled activation lives only as long as the
//! process. With one, every scheduled activation is written to a JSON file
//! keyed by hostname and due time; [`ActivationScheduler::resume`] re-arms the
//! stored entries on startup (overdue ones fire immediately) and an entry is
//! removed once its activation ran.
//!
//! Each activation picks the publish lifecycle up at `ProxyScheduled`; its
//! task resolves to the stage it ended in (`ProxyReconciled` on success).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::fs;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::domain::Hostname;
use crate::notify::{Notifier, Report};
use crate::proxy::{ProxyReconciler, RouteOutcome};
use crate::state_machine::{DeploymentStage, DeploymentStep, StateMachineWithHistory};

/// A scheduled proxy activation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingActivation {
    pub hostname: Hostname,
    pub due_at: DateTime<Utc>,
}

impl PendingActivation {
    fn remaining(&self, now: DateTime<Utc>) -> Duration {
        (self.due_at - now).to_std().unwrap_or(Duration::ZERO)
    }
}

/// JSON file of pending activations
#[derive(Debug)]
pub struct PendingStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl PendingStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// All stored activations; a missing file is an empty store
    pub async fn load(&self) -> io::Result<Vec<PendingActivation>> {
        let _guard = self.lock.lock().await;
        self.read().await
    }

    pub async fn add(&self, activation: &PendingActivation) -> io::Result<()> {
        let _guard = self.lock.lock().await;
        let mut pending = self.read().await?;
        pending.push(activation.clone());
        self.write(&pending).await
    }

    pub async fn remove(&self, activation: &PendingActivation) -> io::Result<()> {
        let _guard = self.lock.lock().await;
        let mut pending = self.read().await?;
        if let Some(index) = pending.iter().position(|p| p == activation) {
            pending.remove(index);
        }
        self.write(&pending).await
    }

    async fn read(&self) -> io::Result<Vec<PendingActivation>> {
        match fs::read(&self.path).await {
            Ok(raw) => serde_json::from_slice(&raw)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }

    async fn write(&self, pending: &[PendingActivation]) -> io::Result<()> {
        let raw = serde_json::to_vec_pretty(pending)?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, raw).await?;
        fs::rename(&tmp, &self.path).await
    }
}

/// Runs proxy activations after a delay
#[derive(Clone)]
pub struct ActivationScheduler {
    proxy: Arc<ProxyReconciler>,
    notifier: Notifier,
    store: Option<Arc<PendingStore>>,
}

impl ActivationScheduler {
    pub fn new(proxy: Arc<ProxyReconciler>, notifier: Notifier) -> Self {
        Self {
            proxy,
            notifier,
            store: None,
        }
    }

    /// Persist pending activations so they survive a restart
    pub fn with_store(mut self, store: PendingStore) -> Self {
        self.store = Some(Arc::new(store));
        self
    }

    /// Schedule one activation of `hostname` after `delay`
    pub async fn schedule(&self, hostname: Hostname, delay: Duration) -> JoinHandle<DeploymentStage> {
        let due_at = Utc::now()
            + chrono::Duration::from_std(delay).unwrap_or_else(|_| chrono::Duration::zero());
        let activation = PendingActivation { hostname, due_at };

        if let Some(store) = &self.store {
            if let Err(e) = store.add(&activation).await {
                warn!(
                    "Failed to persist pending activation for {}: {}",
                    activation.hostname, e
                );
            }
        }

        info!(
            "Proxy activation for {} scheduled in {:?}",
            activation.hostname, delay
        );
        self.spawn(activation, delay)
    }

    /// Re-arm activations persisted by a previous process
    pub async fn resume(&self) -> Vec<JoinHandle<DeploymentStage>> {
        let Some(store) = &self.store else {
            return Vec::new();
        };

        let pending = match store.load().await {
            Ok(pending) => pending,
            Err(e) => {
                self.notifier.report(
                    Report::error(e).with_message("Failed to load pending proxy activations"),
                );
                return Vec::new();
            }
        };

        let now = Utc::now();
        info!("Resuming {} pending proxy activation(s)", pending.len());
        pending
            .into_iter()
            .map(|activation| {
                let delay = activation.remaining(now);
                self.spawn(activation, delay)
            })
            .collect()
    }

    fn spawn(&self, activation: PendingActivation, delay: Duration) -> JoinHandle<DeploymentStage> {
        let scheduler = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            scheduler.activate(&activation).await
        })
    }

    async fn activate(&self, activation: &PendingActivation) -> DeploymentStage {
        let hostname = &activation.hostname;
        let mut lifecycle = StateMachineWithHistory::new(DeploymentStage::ProxyScheduled);
        debug!("Proxy activation for {} fired", hostname);

        match self.proxy.ensure_route(hostname).await {
            Ok(outcome) => {
                if let Err(e) =
                    lifecycle.transition_with_history(DeploymentStep::ReconcileProxy, Utc::now())
                {
                    warn!("Deployment lifecycle out of order: {}", e);
                }
                let note = match outcome {
                    RouteOutcome::Added => "",
                    RouteOutcome::AlreadyConfigured => " (route already present)",
                };
                info!("{} is {}{}", hostname, lifecycle.current_state(), note);
            }
            Err(e) => {
                // Terminal for this activation, never retried
                self.notifier.report(
                    Report::error(e)
                        .with_message(format!("Proxy activation for {} failed", hostname)),
                );
            }
        }

        if let Some(store) = &self.store {
            if let Err(e) = store.remove(activation).await {
                warn!("Failed to clear pending activation for {}: {}", hostname, e);
            }
        }

        *lifecycle.current_state()
    }
}
