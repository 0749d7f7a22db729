// Copyright (c) 2025 - Cowboy AI, Inc.
//! Operator notifications
//!
//! Best-effort alert emission. [`Notifier::report`] never blocks and never
//! fails: reports are logged locally, then queued to a background worker that
//! POSTs `{reportString, reportType}` to the alerting endpoint. Delivery
//! failures are logged and dropped.
//!
//! # Report kinds
//!
//! | Fields present     | `reportType`   |
//! |--------------------|----------------|
//! | message only       | `info`         |
//! | error (+ message)  | `runtimeError` |
//! | user message (+..) | `userMessage`  |

use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Category of an operator report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReportType {
    Info,
    RuntimeError,
    UserMessage,
}

/// A report under construction
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Report {
    message: Option<String>,
    error: Option<String>,
    user_message: Option<String>,
}

impl Report {
    /// Informational report
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Default::default()
        }
    }

    /// Runtime error report
    pub fn error(error: impl fmt::Display) -> Self {
        Self {
            error: Some(error.to_string()),
            ..Default::default()
        }
    }

    /// Message written for an end user
    pub fn user_message(user_message: impl Into<String>) -> Self {
        Self {
            user_message: Some(user_message.into()),
            ..Default::default()
        }
    }

    /// Prefix the report with context
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Flatten into the wire payload
    pub fn render(&self) -> ReportPayload {
        let mut report_string = String::new();
        let mut report_type = ReportType::Info;

        if let Some(message) = &self.message {
            report_string.push_str(message);
            report_string.push_str("\n\n");
        }

        if let Some(error) = &self.error {
            report_string.push_str(error);
            report_type = ReportType::RuntimeError;
        }

        if let Some(user_message) = &self.user_message {
            report_string.push_str(user_message);
            report_type = ReportType::UserMessage;
        }

        ReportPayload {
            report_string,
            report_type,
        }
    }
}

/// JSON body sent to the alerting endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportPayload {
    pub report_string: String,
    pub report_type: ReportType,
}

enum Envelope {
    Report(ReportPayload),
    Flush(oneshot::Sender<()>),
}

/// Fire-and-forget operator notifier
///
/// Cheap to clone; all clones share one delivery worker.
#[derive(Clone)]
pub struct Notifier {
    endpoint: Option<String>,
    tx: Option<mpsc::UnboundedSender<Envelope>>,
    worker: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl fmt::Debug for Notifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Notifier")
            .field("enabled", &self.tx.is_some())
            .finish()
    }
}

impl Notifier {
    /// Start a notifier delivering to `endpoint`
    ///
    /// Must be called inside a Tokio runtime.
    pub fn new(endpoint: impl Into<String>, client: Client) -> Self {
        let endpoint = endpoint.into();
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = tokio::spawn(deliver(endpoint.clone(), client, rx));

        Self {
            endpoint: Some(endpoint),
            tx: Some(tx),
            worker: Arc::new(Mutex::new(Some(worker))),
        }
    }

    /// A notifier that only logs locally
    pub fn disabled() -> Self {
        Self {
            endpoint: None,
            tx: None,
            worker: Arc::new(Mutex::new(None)),
        }
    }

    /// Log and enqueue a report. Never blocks, never fails.
    pub fn report(&self, report: Report) {
        let payload = report.render();
        log_locally(&payload);

        if let Some(tx) = &self.tx {
            if tx.send(Envelope::Report(payload)).is_err() {
                warn!("Notifier worker is gone, report dropped");
            }
        }
    }

    /// Log and deliver a report right away, waiting at most `timeout`
    ///
    /// Bypasses the worker, for callers that cannot rely on the runtime
    /// staying alive (a panic hook). The POST runs on its own thread, so this
    /// may be called from inside the runtime. Returns whether the endpoint
    /// accepted the report.
    pub fn report_blocking(&self, report: Report, timeout: Duration) -> bool {
        let payload = report.render();
        log_locally(&payload);

        let Some(endpoint) = self.endpoint.clone() else {
            return false;
        };

        let (done_tx, done_rx) = std::sync::mpsc::channel();
        std::thread::spawn(move || {
            let sent = reqwest::blocking::Client::builder()
                .timeout(timeout)
                .build()
                .and_then(|client| client.post(&endpoint).json(&payload).send());
            let _ = done_tx.send(sent.map(|response| response.status()));
        });

        match done_rx.recv_timeout(timeout) {
            Ok(Ok(status)) if status.is_success() => true,
            Ok(Ok(status)) => {
                warn!("Report endpoint returned {}", status);
                false
            }
            Ok(Err(e)) => {
                warn!("ERROR WHILE SUBMITTING REPORT: {}", e);
                false
            }
            Err(_) => {
                warn!("Report delivery timed out after {:?}", timeout);
                false
            }
        }
    }

    /// Drain queued reports, waiting at most `timeout`, then stop the worker
    pub async fn shutdown(&self, timeout: Duration) {
        let Some(tx) = &self.tx else {
            return;
        };

        let (done_tx, done_rx) = oneshot::channel();
        if tx.send(Envelope::Flush(done_tx)).is_err() {
            return;
        }

        match tokio::time::timeout(timeout, done_rx).await {
            Ok(_) => debug!("Notifier flushed"),
            Err(_) => warn!("Notifier flush timed out after {:?}", timeout),
        }

        if let Some(worker) = self.worker.lock().await.take() {
            worker.abort();
        }
    }
}

fn log_locally(payload: &ReportPayload) {
    match payload.report_type {
        ReportType::RuntimeError => error!("{}", payload.report_string),
        ReportType::UserMessage | ReportType::Info => info!("{}", payload.report_string),
    }
}

async fn deliver(endpoint: String, client: Client, mut rx: mpsc::UnboundedReceiver<Envelope>) {
    while let Some(envelope) = rx.recv().await {
        match envelope {
            Envelope::Report(payload) => match client.post(&endpoint).json(&payload).send().await {
                Ok(response) if response.status().is_success() => {
                    debug!("Report delivered ({:?})", payload.report_type);
                }
                Ok(response) => {
                    warn!("Report endpoint returned {}", response.status());
                }
                Err(e) => {
                    warn!("ERROR WHILE SUBMITTING REPORT: {}", e);
                }
            },
            Envelope::Flush(done) => {
                let _ = done.send(());
                break;
            }
        }
    }
}
