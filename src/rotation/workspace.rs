//! # Run Workspace
//!
//! Run-scoped scratch directory for rotation artifacts.
//!
//! Every run gets a fresh uuid-suffixed directory under the system temp dir,
//! holding the fetched certificate plus the staged and re-encrypted manifest
//! for each secret. Staged files live under a per-namespace subdirectory so
//! no two secrets in a snapshot can ever share a path. The workspace is
//! working storage only; removal after the run is best-effort.

use crate::cluster::SecretRef;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// File name the active certificate is persisted under.
pub const CERT_FILE_NAME: &str = "sealedsecrets-public-cert.pem";

/// Run-unique scratch directory.
#[derive(Debug)]
pub struct RunWorkspace {
    root: PathBuf,
}

impl RunWorkspace {
    /// Create a fresh workspace under the system temp directory.
    pub async fn create() -> Result<Self> {
        let root = std::env::temp_dir().join(format!(
            "sealed-secret-rotator-{}",
            uuid::Uuid::new_v4()
        ));
        tokio::fs::create_dir_all(&root)
            .await
            .context("Failed to create run workspace directory")?;
        debug!("Created run workspace: {:?}", root);
        Ok(Self { root })
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Persist the active certificate, returning the path workers pass to
    /// kubeseal.
    pub async fn persist_certificate(&self, pem: &str) -> Result<PathBuf> {
        let path = self.root.join(CERT_FILE_NAME);
        tokio::fs::write(&path, pem)
            .await
            .context(format!("Failed to persist certificate to {:?}", path))?;
        Ok(path)
    }

    /// Stage the fetched (still old-key) manifest for `secret`.
    pub async fn stage_sealed_manifest(&self, secret: &SecretRef, manifest: &str) -> Result<PathBuf> {
        let path = self.manifest_path(secret, "sealed");
        self.write_manifest(&path, manifest).await?;
        Ok(path)
    }

    /// Persist the re-encrypted manifest for `secret`.
    pub async fn stage_resealed_manifest(
        &self,
        secret: &SecretRef,
        manifest: &str,
    ) -> Result<PathBuf> {
        let path = self.manifest_path(secret, "resealed");
        self.write_manifest(&path, manifest).await?;
        Ok(path)
    }

    /// Best-effort removal of the whole workspace.
    pub async fn cleanup(&self) {
        if let Err(e) = tokio::fs::remove_dir_all(&self.root).await {
            warn!("Failed to remove run workspace {:?}: {}", self.root, e);
        } else {
            debug!("Removed run workspace: {:?}", self.root);
        }
    }

    fn manifest_path(&self, secret: &SecretRef, suffix: &str) -> PathBuf {
        self.root
            .join(&secret.namespace)
            .join(format!("{}-{}.yaml", secret.name, suffix))
    }

    async fn write_manifest(&self, path: &Path, manifest: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .context(format!("Failed to create staging directory {:?}", parent))?;
        }
        tokio::fs::write(path, manifest)
            .await
            .context(format!("Failed to write workspace file: {:?}", path))
    }
}
