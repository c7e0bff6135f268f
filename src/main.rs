//! pod-ca-trust - mutating admission webhook injecting a CA into Pods.
//!
//! This is the main entry point that:
//! - Initializes structured logging
//! - Creates the Kubernetes client
//! - Either bootstraps the webhook's TLS material (`--tls-init`) and exits,
//!   or serves admission reviews alongside the health server

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use kube::Client;
use tokio::signal;
use tracing::{error, info};

use pod_ca_trust::bootstrap::run_bootstrap;
use pod_ca_trust::health::{HealthState, run_health_server};
use pod_ca_trust::{BootstrapConfig, WebhookConfig, build_webhook_state, run_webhook_server};

/// Grace period for in-flight admissions to complete during shutdown
const SHUTDOWN_GRACE_PERIOD_SECS: u64 = 2;

/// Mutating admission webhook that mounts a cluster CA into every Pod
#[derive(Parser, Debug)]
#[command(name = "pod-ca-trust", version, about, long_about = None)]
struct Cli {
    /// Generate the webhook TLS secret, publish the CA bundle and exit
    #[arg(long)]
    tls_init: bool,
}

#[tokio::main]
#[allow(clippy::exit)]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if let Err(e) = rustls::crypto::aws_lc_rs::default_provider().install_default() {
        eprintln!("Failed to install rustls crypto provider: {:?}", e);
        std::process::exit(1);
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("pod_ca_trust=info".parse()?)
                .add_directive("kube=info".parse()?),
        )
        .json()
        .init();

    if cli.tls_init {
        let config = match BootstrapConfig::from_env() {
            Ok(config) => config,
            Err(e) => {
                error!(error = %e, "Invalid configuration");
                std::process::exit(1);
            }
        };
        info!(
            namespace = %config.namespace,
            secret = %config.secret_name,
            webhook = %config.webhook_name,
            "Starting TLS bootstrap"
        );

        let client = Client::try_default().await?;
        if let Err(e) = run_bootstrap(client, &config).await {
            error!(error = %e, "TLS bootstrap failed");
            std::process::exit(1);
        }
        info!("TLS bootstrap complete");
        return Ok(());
    }

    let config = match WebhookConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            std::process::exit(1);
        }
    };

    info!("Starting pod-ca-trust webhook");

    let ca_bundle = match tokio::fs::read(&config.ca_cert_path).await {
        Ok(bytes) => bytes,
        Err(e) => {
            error!(
                path = %config.ca_cert_path.display(),
                error = %e,
                "Failed to read CA certificate"
            );
            std::process::exit(1);
        }
    };

    let client = Client::try_default().await?;
    info!("Connected to Kubernetes cluster");

    let health_state = Arc::new(HealthState::new());

    // Probes should answer before the webhook listener is up
    let health_handle = {
        let health_state = health_state.clone();
        let addr = config.health_listen;
        tokio::spawn(async move {
            if let Err(e) = run_health_server(health_state, addr).await {
                error!("Health server error: {}", e);
            }
        })
    };

    let webhook_state = build_webhook_state(client, &config, ca_bundle, Some(health_state.clone()));
    let webhook_handle = {
        let addr = config.listen;
        let cert_path = config.tls_cert_path.clone();
        let key_path = config.tls_key_path.clone();
        tokio::spawn(async move {
            run_webhook_server(webhook_state, addr, &cert_path, &key_path).await
        })
    };

    tokio::select! {
        result = webhook_handle => {
            match result {
                Ok(Ok(())) => info!("Webhook server stopped"),
                Ok(Err(e)) => {
                    error!(error = %e, "Webhook server failed");
                    std::process::exit(1);
                }
                Err(e) => {
                    error!("Webhook server task panicked: {}", e);
                    std::process::exit(1);
                }
            }
        }
        result = health_handle => {
            if let Err(e) = result {
                error!("Health server task panicked: {}", e);
            }
        }
        _ = shutdown_signal() => {
            info!("Received shutdown signal, initiating graceful shutdown...");

            health_state.set_ready(false).await;
            info!("Marked webhook as not ready");

            tokio::time::sleep(Duration::from_secs(SHUTDOWN_GRACE_PERIOD_SECS)).await;
            info!("Grace period complete, shutting down");
        }
    }

    info!("Webhook stopped");
    Ok(())
}

/// Wait for shutdown signal (SIGTERM or SIGINT)
///
/// Signal handler setup failures are fatal.
#[allow(clippy::expect_used)]
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
