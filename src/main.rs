//! # Sealed Secret Rotator
//!
//! A one-shot CLI that rotates the encryption key protecting a cluster's
//! SealedSecret resources.
//!
//! ## Overview
//!
//! 1. **Key discovery** - fetches the active public sealing certificate via
//!    `kubeseal --fetch-cert`
//! 2. **Catalog snapshot** - lists every SealedSecret with a single API call
//! 3. **Bounded fan-out** - re-encrypts up to `--workers` secrets at a time,
//!    each through its own fetch / stage / re-encrypt / publish state machine
//! 4. **Failure isolation** - a broken secret is logged and counted in the
//!    run summary, never fatal to its siblings
//!
//! The process exits non-zero only when the run could not start (no key, no
//! catalog) or when every secret in a non-empty catalog failed.

use anyhow::{Context, Result};
use clap::Parser;
use kube::Client;
use sealed_secret_rotator::cli::Cli;
use sealed_secret_rotator::cluster::kube::KubeClusterStore;
use sealed_secret_rotator::config::RotationConfig;
use sealed_secret_rotator::kubeseal::Kubeseal;
use sealed_secret_rotator::rotation::Orchestrator;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = RotationConfig::from(cli);

    let log_path = init_logging(&config)?;

    // Configure rustls crypto provider before anything touches the cluster
    // Required for rustls 0.23+ when no default provider is set via features
    // We use ring as the crypto provider
    rustls::crypto::ring::default_provider()
        .install_default()
        .unwrap_or_else(|_| panic!("Failed to install rustls crypto provider"));

    info!("Starting Sealed Secret Rotator v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Build info: datetime={}, git_hash={}",
        env!("BUILD_DATETIME"),
        env!("BUILD_GIT_HASH")
    );
    info!("Logging to {:?}", log_path);
    if config.dry_run {
        info!("Dry-run mode: nothing will be published");
    }
    if let Some(ref namespace) = config.namespace {
        info!("Restricting the run to namespace {}", namespace);
    }

    // Resolve kubeseal before touching the cluster so a misconfigured host
    // fails without side effects
    let seal = Arc::new(Kubeseal::locate(config.kubeseal_bin.clone())?);

    let client = Client::try_default()
        .await
        .context("Failed to create Kubernetes client")?;
    let store = Arc::new(KubeClusterStore::new(client, config.namespace.clone()));

    let orchestrator = Orchestrator::new(config, store, seal);
    let summary = match orchestrator.run().await {
        Ok(summary) => summary,
        Err(e) => {
            error!("Rotation aborted: {}", e);
            std::process::exit(1);
        }
    };

    if summary.all_failed() {
        error!("All {} SealedSecrets failed to reseal", summary.total());
        std::process::exit(1);
    }

    Ok(())
}

/// Build the console + per-run file subscriber and install it.
///
/// The entry point owns the logging lifecycle; library code only emits
/// events. Returns the log file path for the startup banner.
fn init_logging(config: &RotationConfig) -> Result<PathBuf> {
    std::fs::create_dir_all(&config.log_dir).context(format!(
        "Failed to create log directory: {:?}",
        config.log_dir
    ))?;
    let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    let log_path = config.log_dir.join(format!("reseal-{}.log", stamp));
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .context(format!("Failed to open log file: {:?}", log_path))?;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| "sealed_secret_rotator=info".into());

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(file)
                .with_ansi(false),
        )
        .init();

    Ok(log_path)
}
