// Copyright (c) 2025 - Cowboy AI, Inc.
//! Publish Request Lifecycle
//!
//! # States
//!
//! ```text
//! Received → Authenticated → Validated → Staged → DnsReconciled → Responded
//!                 │              │          │                        │
//!                 └──────────────┴──────────┴──→ Failed              ↓ (deferred)
//!                                                            ProxyScheduled → ProxyReconciled
//! ```
//!
//! - A request rejected for missing or wrong credentials never leaves
//!   `Received`.
//! - `Failed` is entered from `Authenticated` (validation), `Validated`
//!   (staging) or `Staged` (DNS) and is terminal.
//! - `ProxyReconciled` is terminal; a failed activation is reported, not
//!   modelled as a retryable state.

use std::fmt;

use super::{StateMachine, TransitionError, TransitionResult};

/// Where a publish request currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeploymentStage {
    Received,
    Authenticated,
    Validated,
    Staged,
    DnsReconciled,
    Responded,
    ProxyScheduled,
    ProxyReconciled,
    Failed,
}

impl DeploymentStage {
    pub fn is_terminal(&self) -> bool {
        matches!(self, DeploymentStage::ProxyReconciled | DeploymentStage::Failed)
    }
}

impl fmt::Display for DeploymentStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Pipeline step (FSM input)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeploymentStep {
    Authenticate,
    Validate,
    Stage,
    ReconcileDns,
    Respond,
    ScheduleProxy,
    ReconcileProxy,
    Fail,
}

impl StateMachine for DeploymentStage {
    type Input = DeploymentStep;
    type Output = ();

    fn transition(&self, input: &Self::Input) -> TransitionResult<(Self, Self::Output)> {
        use DeploymentStage::*;
        use DeploymentStep::*;

        let next = match (self, input) {
            (Received, Authenticate) => Authenticated,
            (Authenticated, Validate) => Validated,
            (Validated, Stage) => Staged,
            (Staged, ReconcileDns) => DnsReconciled,
            (DnsReconciled, Respond) => Responded,
            (Responded, ScheduleProxy) => ProxyScheduled,
            (ProxyScheduled, ReconcileProxy) => ProxyReconciled,

            (Authenticated | Validated | Staged, Fail) => Failed,

            (state, _) if state.is_terminal() => {
                return Err(TransitionError::Terminal(state.to_string()))
            }
            (state, step) => {
                return Err(TransitionError::InvalidTransition {
                    from: state.to_string(),
                    to: format!("{:?}", step),
                })
            }
        };

        Ok((next, ()))
    }
}
