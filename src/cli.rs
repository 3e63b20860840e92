//! # CLI
//!
//! Command-line surface for the rotator.
//!
//! ## Usage
//!
//! ```bash
//! # Rotate every SealedSecret in the cluster
//! sealed-secret-rotator
//!
//! # Rotate one namespace with a wider pool
//! sealed-secret-rotator --namespace payments --workers 10
//!
//! # Prove the fleet re-encrypts without publishing anything
//! sealed-secret-rotator --dry-run
//! ```

use crate::config::{RotationConfig, DEFAULT_LOG_DIR, DEFAULT_WORKERS};
use clap::Parser;
use std::path::PathBuf;

/// Re-encrypt every SealedSecret in the cluster under the currently active
/// sealing certificate.
#[derive(Parser, Debug)]
#[command(name = "sealed-secret-rotator", version, about)]
pub struct Cli {
    /// Number of secrets re-encrypted concurrently
    #[arg(short, long, default_value_t = DEFAULT_WORKERS)]
    pub workers: usize,

    /// Restrict the run to one namespace (default: all namespaces)
    #[arg(short, long)]
    pub namespace: Option<String>,

    /// Fetch, stage and re-encrypt, but do not publish anything
    #[arg(long)]
    pub dry_run: bool,

    /// Path to the kubeseal binary (default: resolved from PATH)
    #[arg(long)]
    pub kubeseal_bin: Option<PathBuf>,

    /// Directory the per-run log file is written into
    #[arg(long, default_value = DEFAULT_LOG_DIR)]
    pub log_dir: PathBuf,

    /// Keep the run workspace (certificate and staged manifests) for debugging
    #[arg(long)]
    pub keep_workdir: bool,
}

impl From<Cli> for RotationConfig {
    fn from(cli: Cli) -> Self {
        Self {
            workers: cli.workers,
            namespace: cli.namespace,
            dry_run: cli.dry_run,
            kubeseal_bin: cli.kubeseal_bin,
            log_dir: cli.log_dir,
            keep_workdir: cli.keep_workdir,
        }
    }
}
