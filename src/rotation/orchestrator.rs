//! # Orchestrator
//!
//! Drives a rotation run end to end: workspace, key, catalog snapshot,
//! bounded fan-out over the workers, explicit join, summary.

use crate::cluster::{ClusterStore, SecretRef};
use crate::config::RotationConfig;
use crate::error::RotationError;
use crate::kubeseal::SealTool;
use crate::rotation::catalog;
use crate::rotation::keysource;
use crate::rotation::worker::{ResealOutcome, ResealWorker};
use crate::rotation::workspace::RunWorkspace;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tracing::info;

/// Aggregate result of one rotation run.
///
/// Holds every `(secret, outcome)` pair so callers can verify that each
/// catalog entry was processed exactly once.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    succeeded: usize,
    failed_fetch: usize,
    failed_reencrypt: usize,
    failed_publish: usize,
    outcomes: Vec<(SecretRef, ResealOutcome)>,
}

impl RunSummary {
    fn record(&mut self, secret: SecretRef, outcome: ResealOutcome) {
        match outcome {
            ResealOutcome::Succeeded => self.succeeded += 1,
            ResealOutcome::FailedFetch => self.failed_fetch += 1,
            ResealOutcome::FailedReencrypt => self.failed_reencrypt += 1,
            ResealOutcome::FailedPublish => self.failed_publish += 1,
        }
        self.outcomes.push((secret, outcome));
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.succeeded
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.failed_fetch + self.failed_reencrypt + self.failed_publish
    }

    #[must_use]
    pub fn failed_fetch(&self) -> usize {
        self.failed_fetch
    }

    #[must_use]
    pub fn failed_reencrypt(&self) -> usize {
        self.failed_reencrypt
    }

    #[must_use]
    pub fn failed_publish(&self) -> usize {
        self.failed_publish
    }

    /// Completion-ordered `(secret, outcome)` pairs.
    #[must_use]
    pub fn outcomes(&self) -> &[(SecretRef, ResealOutcome)] {
        &self.outcomes
    }

    /// True when a non-empty run produced not a single success.
    #[must_use]
    pub fn all_failed(&self) -> bool {
        !self.outcomes.is_empty() && self.succeeded == 0
    }
}

/// Pipeline driver for one rotation run.
pub struct Orchestrator {
    config: RotationConfig,
    store: Arc<dyn ClusterStore>,
    seal: Arc<dyn SealTool>,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    #[must_use]
    pub fn new(
        config: RotationConfig,
        store: Arc<dyn ClusterStore>,
        seal: Arc<dyn SealTool>,
    ) -> Self {
        Self {
            config,
            store,
            seal,
        }
    }

    /// Run the full pipeline.
    ///
    /// Fatal errors ([`RotationError`]) abort before any secret has been
    /// published. Per-secret failures never fail the run; they are visible
    /// in the returned [`RunSummary`]. The call returns only after every
    /// dispatched secret has completed.
    pub async fn run(&self) -> Result<RunSummary, RotationError> {
        let workspace = RunWorkspace::create()
            .await
            .map_err(RotationError::KeyFetch)?;
        let workspace = Arc::new(workspace);

        let certificate =
            match keysource::fetch_active_certificate(self.seal.as_ref(), &workspace).await {
                Ok(certificate) => certificate,
                Err(e) => {
                    self.finish_workspace(&workspace).await;
                    return Err(e);
                }
            };

        let snapshot = match catalog::take_snapshot(self.store.as_ref()).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                self.finish_workspace(&workspace).await;
                return Err(e);
            }
        };

        if snapshot.is_empty() {
            info!("No SealedSecrets found.");
            self.finish_workspace(&workspace).await;
            return Ok(RunSummary::default());
        }

        info!(
            "Found {} SealedSecrets. Starting reseal process...",
            snapshot.len()
        );

        let width = self.config.effective_workers();
        let worker = ResealWorker::new(
            Arc::clone(&self.store),
            Arc::clone(&self.seal),
            Arc::clone(&workspace),
            self.config.dry_run,
        );
        let certificate = Arc::new(certificate);

        // Bounded fan-out with an explicit join: at most `width` secrets in
        // flight, and collect() does not return until every dispatched
        // secret has reported an outcome.
        let results: Vec<(SecretRef, ResealOutcome)> = stream::iter(snapshot.into_secrets())
            .map(|secret| {
                let worker = worker.clone();
                let certificate = Arc::clone(&certificate);
                async move {
                    let outcome = worker.reseal(&secret, &certificate).await;
                    (secret, outcome)
                }
            })
            .buffer_unordered(width)
            .collect()
            .await;

        let mut summary = RunSummary::default();
        for (secret, outcome) in results {
            summary.record(secret, outcome);
        }

        info!("Reseal process completed.");
        info!(
            "Reseal summary: {} succeeded, {} failed ({} fetch, {} re-encrypt, {} publish)",
            summary.succeeded(),
            summary.failed(),
            summary.failed_fetch(),
            summary.failed_reencrypt(),
            summary.failed_publish()
        );

        self.finish_workspace(&workspace).await;
        Ok(summary)
    }

    async fn finish_workspace(&self, workspace: &RunWorkspace) {
        if self.config.keep_workdir {
            info!(
                "Keeping run workspace for inspection: {:?}",
                workspace.root()
            );
        } else {
            workspace.cleanup().await;
        }
    }
}
