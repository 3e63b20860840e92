//! # Secret Catalog
//!
//! Point-in-time enumeration of the SealedSecrets to rotate.

use crate::cluster::{ClusterStore, SecretRef};
use crate::error::RotationError;
use tracing::info;

/// The catalog captured by a single enumeration call.
///
/// Secrets created or deleted after the snapshot are not reflected; a run
/// rotates exactly what it saw here.
#[derive(Debug, Clone)]
pub struct CatalogSnapshot {
    secrets: Vec<SecretRef>,
}

impl CatalogSnapshot {
    #[must_use]
    pub fn len(&self) -> usize {
        self.secrets.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.secrets.is_empty()
    }

    #[must_use]
    pub fn secrets(&self) -> &[SecretRef] {
        &self.secrets
    }

    #[must_use]
    pub fn into_secrets(self) -> Vec<SecretRef> {
        self.secrets
    }
}

/// Capture the catalog with a single list call.
///
/// An empty cluster is a valid, empty snapshot. A failed listing aborts the
/// run: without the complete catalog a partial rotation would silently skip
/// secrets.
pub async fn take_snapshot(store: &dyn ClusterStore) -> Result<CatalogSnapshot, RotationError> {
    info!("Listing all SealedSecrets in the cluster...");
    let secrets = store
        .list_sealed_secrets()
        .await
        .map_err(RotationError::List)?;
    Ok(CatalogSnapshot { secrets })
}
