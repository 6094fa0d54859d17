//! Change-Watch Controller
//!
//! Watches the configured cluster resource kinds and sends a notification
//! to every configured sink when an object is created, updated or deleted.
//!
//! Replayed creates from the initial listing and updates that only touch
//! ignored fields are suppressed.

mod backoff;
mod cache;
mod change;
mod classifier;
mod controller;
mod diff;
mod dispatcher;
mod error;
mod metrics;
mod normalizer;
mod queue;
mod watcher;
mod worker;

#[cfg(test)]
mod test_utils;



use crate::error::ControllerError;
use controller::Controller;
use metrics::ChangeMetrics;
use std::sync::Arc;
use tokio::signal::unix::{signal, SignalKind};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use watch_config::Config;

#[tokio::main]
async fn main() -> Result<(), ControllerError> {
    // kube and reqwest both link rustls; pick the provider explicitly
    let _ = rustls::crypto::ring::default_provider().install_default();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting Change-Watch Controller");

    let config = Config::load()?;
    info!("Configuration:");
    info!("  Namespace: {}", config.namespace_filter().as_deref().unwrap_or("all namespaces"));
    info!("  Instance: {}", config.instance_name);
    info!("  Metrics address: {}", config.metrics_address());

    let cancel = CancellationToken::new();
    let metrics = Arc::new(ChangeMetrics::new()?);

    let metrics_server = {
        let addr = config.metrics_address().to_string();
        let state = Arc::clone(&metrics);
        let shutdown = cancel.clone();
        tokio::spawn(async move {
            if let Err(e) = metrics::serve(addr, state, shutdown).await {
                error!("Metrics server failed: {}", e);
            }
        })
    };

    tokio::spawn(shutdown_on_signal(cancel.clone()));
    let controller = Controller::new(&config, metrics, cancel.clone()).await?;

    controller.run().await;
    cancel.cancel();

    if let Err(e) = metrics_server.await {
        error!("Metrics server panicked: {}", e);
    }

    info!("Exiting");
    Ok(())
}

/// Cancels `cancel` on SIGINT, SIGTERM or Ctrl+C.
async fn shutdown_on_signal(cancel: CancellationToken) -> Result<(), ControllerError> {
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    tokio::select! {
        _ = sigint.recv() => info!("SIGINT detected"),
        _ = sigterm.recv() => info!("SIGTERM detected"),
        _ = tokio::signal::ctrl_c() => info!("Ctrl+C detected"),
    }
    cancel.cancel();
    Ok(())
}
