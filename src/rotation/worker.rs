//! # Reseal Worker
//!
//! The per-secret state machine: fetch, stage, re-encrypt, publish.
//!
//! Each gate is strictly sequential and fails fast for its own secret only.
//! The worker is infallible at its signature: every internal failure is
//! caught, logged with the failing stage, and reported as a
//! [`ResealOutcome`] so one broken secret never takes its siblings down.

use crate::cluster::{ClusterStore, SecretRef};
use crate::kubeseal::SealTool;
use crate::rotation::keysource::Certificate;
use crate::rotation::workspace::RunWorkspace;
use std::sync::Arc;
use tracing::{error, info, info_span, Instrument};

/// Terminal result for one secret in one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResealOutcome {
    /// Fetched, re-encrypted and published (or re-encrypted under dry-run).
    Succeeded,
    /// The current manifest could not be read from the cluster.
    FailedFetch,
    /// Staging or the re-encryption primitive failed.
    FailedReencrypt,
    /// The re-encrypted manifest could not be applied back to the cluster.
    FailedPublish,
}

impl ResealOutcome {
    /// Stable tag used in logs and summaries.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ResealOutcome::Succeeded => "succeeded",
            ResealOutcome::FailedFetch => "failed-fetch",
            ResealOutcome::FailedReencrypt => "failed-reencrypt",
            ResealOutcome::FailedPublish => "failed-publish",
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, ResealOutcome::Succeeded)
    }
}

/// Drives the reseal state machine for single secrets.
///
/// All collaborators are shared handles; cloning is cheap and every catalog
/// entry is processed by an independent clone.
#[derive(Clone)]
pub struct ResealWorker {
    store: Arc<dyn ClusterStore>,
    seal: Arc<dyn SealTool>,
    workspace: Arc<RunWorkspace>,
    dry_run: bool,
}

impl std::fmt::Debug for ResealWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResealWorker")
            .field("dry_run", &self.dry_run)
            .finish_non_exhaustive()
    }
}

impl ResealWorker {
    #[must_use]
    pub fn new(
        store: Arc<dyn ClusterStore>,
        seal: Arc<dyn SealTool>,
        workspace: Arc<RunWorkspace>,
        dry_run: bool,
    ) -> Self {
        Self {
            store,
            seal,
            workspace,
            dry_run,
        }
    }

    /// Run the full state machine for one secret.
    pub async fn reseal(&self, secret: &SecretRef, certificate: &Certificate) -> ResealOutcome {
        let span = info_span!(
            "reseal",
            secret.namespace = %secret.namespace,
            secret.name = %secret.name
        );
        self.reseal_inner(secret, certificate).instrument(span).await
    }

    async fn reseal_inner(&self, secret: &SecretRef, certificate: &Certificate) -> ResealOutcome {
        info!("Processing {}...", secret);

        // Fetch: single-item read of the live manifest
        let manifest = match self.store.fetch_manifest(secret).await {
            Ok(manifest) if !manifest.trim().is_empty() => manifest,
            Ok(_) => {
                error!(
                    "Failed to fetch YAML for {}: cluster returned an empty manifest",
                    secret
                );
                return ResealOutcome::FailedFetch;
            }
            Err(e) => {
                error!("Failed to fetch YAML for {}: {:#}", secret, e);
                return ResealOutcome::FailedFetch;
            }
        };

        // Stage: materialize the manifest for the kubeseal invocation
        let staged = match self.workspace.stage_sealed_manifest(secret, &manifest).await {
            Ok(path) => path,
            Err(e) => {
                error!("Failed to reseal {}: {:#}", secret, e);
                return ResealOutcome::FailedReencrypt;
            }
        };

        // Re-encrypt: opaque transform under the active certificate
        let resealed = match self.seal.reencrypt(&staged, certificate.path()).await {
            Ok(output) => output,
            Err(e) => {
                error!("Failed to reseal {}: {:#}", secret, e);
                return ResealOutcome::FailedReencrypt;
            }
        };
        if let Err(e) = self
            .workspace
            .stage_resealed_manifest(secret, &resealed)
            .await
        {
            error!("Failed to reseal {}: {:#}", secret, e);
            return ResealOutcome::FailedReencrypt;
        }

        // Publish: upsert the re-encrypted manifest
        if self.dry_run {
            info!("Dry-run: skipping publish for {}", secret);
            return ResealOutcome::Succeeded;
        }
        if let Err(e) = self.store.apply_manifest(&resealed).await {
            error!(
                "Failed to apply updated SealedSecret for {}: {:#}",
                secret, e
            );
            return ResealOutcome::FailedPublish;
        }

        info!("Successfully resealed and updated {}", secret);
        ResealOutcome::Succeeded
    }
}
