//! # Configuration
//!
//! Validated knobs for one rotation run, decoupled from the CLI surface.

use std::path::PathBuf;

/// Default width of the reseal worker pool.
pub const DEFAULT_WORKERS: usize = 5;

/// Default directory for per-run log files.
pub const DEFAULT_LOG_DIR: &str = "reseal-logs";

/// Knobs for one rotation run.
#[derive(Debug, Clone)]
pub struct RotationConfig {
    /// Width of the reseal worker pool.
    pub workers: usize,
    /// Restrict the catalog to one namespace; `None` means all namespaces.
    pub namespace: Option<String>,
    /// Run the pipeline but skip the publish gate.
    pub dry_run: bool,
    /// Explicit kubeseal binary; `None` resolves from PATH.
    pub kubeseal_bin: Option<PathBuf>,
    /// Directory the per-run log file is written into.
    pub log_dir: PathBuf,
    /// Retain the run workspace instead of removing it after the run.
    pub keep_workdir: bool,
}

impl Default for RotationConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            namespace: None,
            dry_run: false,
            kubeseal_bin: None,
            log_dir: PathBuf::from(DEFAULT_LOG_DIR),
            keep_workdir: false,
        }
    }
}

impl RotationConfig {
    /// Pool width actually used: a configured 0 is clamped to 1.
    #[must_use]
    pub fn effective_workers(&self) -> usize {
        self.workers.max(1)
    }
}
