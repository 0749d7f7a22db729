// Copyright (c) 2025 - Cowboy AI, Inc.
//! Lizcel publish server
//!
//! Serves `POST /push` and wires the publish pipeline to Cloudflare DNS and
//! a Caddy reverse proxy.
//!
//! Run with: cargo run --bin lizcel-server
//!
//! Required environment (a `.env` file is honoured):
//! - CLOUDFLARE_EMAIL, CLOUDFLARE_API_KEY
//! - LIZCEL_IP, LIZCEL_API_KEY_HASH
//! - WEBSITES_PATH, CADDYFILE_PATH

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use lizcel_host::{
    adapters::{CaddyReloader, CloudflareProvider},
    config::ServerConfig,
    create_router,
    dns::DnsReconciler,
    notify::{Notifier, Report},
    proxy::ProxyReconciler,
    scheduler::{ActivationScheduler, PendingStore},
    staging::ContentStager,
    DeploymentService,
};

/// Upper bound on draining queued reports before exit
const NOTIFIER_FLUSH_TIMEOUT: Duration = Duration::from_secs(5);

/// Upper bound on delivering a panic report
const PANIC_REPORT_TIMEOUT: Duration = Duration::from_secs(3);

/// Timeout for a single report delivery
const REPORT_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> Result<()> {
    // Missing .env is fine
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("Starting lizcel publish server");

    let config = ServerConfig::from_env().context("Failed to load configuration")?;
    info!("Configuration loaded:");
    info!("  - Port: {}", config.port);
    info!("  - Target IP: {}", config.target_ip);
    info!("  - Websites: {}", config.websites_path.display());
    info!("  - Caddyfile: {}", config.caddyfile_path.display());
    info!("  - Activation delay: {:?}", config.activation_delay);

    let notifier = match &config.report_url {
        Some(url) => {
            let client = reqwest::Client::builder()
                .timeout(REPORT_TIMEOUT)
                .build()
                .context("Failed to build report client")?;
            Notifier::new(url.clone(), client)
        }
        None => {
            warn!("REPORT_URL is empty, reports are logged only");
            Notifier::disabled()
        }
    };

    install_panic_hook(notifier.clone());

    let result = run(config, notifier.clone()).await;
    if let Err(e) = &result {
        notifier.report(Report::error(format!("{:#}", e)).with_message("Fatal server error"));
    }

    notifier.shutdown(NOTIFIER_FLUSH_TIMEOUT).await;

    if result.is_err() {
        std::process::exit(1);
    }
    info!("Server stopped");
    Ok(())
}

async fn run(config: ServerConfig, notifier: Notifier) -> Result<()> {
    let provider = CloudflareProvider::new(config.cloudflare.clone())
        .context("Failed to build DNS provider client")?;
    let dns = DnsReconciler::new(Arc::new(provider), config.target_ip, notifier.clone());

    let proxy = Arc::new(ProxyReconciler::new(
        &config.caddyfile_path,
        &config.websites_path,
        Box::new(CaddyReloader::new(config.caddy_bin.clone())),
    ));

    let mut scheduler = ActivationScheduler::new(proxy, notifier.clone());
    if let Some(path) = &config.pending_activations_path {
        info!("Persisting pending activations to {}", path.display());
        scheduler = scheduler.with_store(PendingStore::new(path));
    }
    // Resumed activations run detached
    drop(scheduler.resume().await);

    let service = DeploymentService::new(
        config.api_key_hash.clone(),
        Arc::new(ContentStager::new(&config.websites_path)),
        dns,
        scheduler,
        config.activation_delay,
    );

    let app = create_router(Arc::new(service), config.max_upload_bytes);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    info!("Shutting down");
    Ok(())
}

/// Reports are delivered before the hook returns; the worker may not outlive
/// an unwinding runtime.
fn install_panic_hook(notifier: Notifier) {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        notifier.report_blocking(
            Report::error(panic_info).with_message("Unhandled panic"),
            PANIC_REPORT_TIMEOUT,
        );
        default_hook(panic_info);
    }));
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received terminate signal, shutting down"),
    }
}
