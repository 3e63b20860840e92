//! # Key Source
//!
//! Obtains the active public sealing certificate, once per run.

use crate::error::RotationError;
use crate::kubeseal::SealTool;
use crate::rotation::workspace::RunWorkspace;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tracing::info;

/// The active public sealing certificate for one run.
///
/// The PEM is an opaque blob to this tool: it is persisted and handed to
/// kubeseal, never parsed, and no logic branches on its contents. The
/// fingerprint exists purely for observability. Created once, read-only
/// afterwards, shared across all workers.
#[derive(Clone)]
pub struct Certificate {
    pem: String,
    fingerprint: String,
    path: PathBuf,
}

impl std::fmt::Debug for Certificate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Certificate")
            .field("fingerprint", &self.fingerprint)
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl Certificate {
    #[must_use]
    pub fn pem(&self) -> &str {
        &self.pem
    }

    /// Full SHA-256 content fingerprint, lowercase hex.
    #[must_use]
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// First 16 hex characters of the fingerprint, the form used in logs.
    #[must_use]
    pub fn short_fingerprint(&self) -> &str {
        &self.fingerprint[..16]
    }

    /// Where the PEM was persisted inside the run workspace.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// SHA-256 content fingerprint of the certificate text.
fn certificate_fingerprint(pem: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(pem.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Fetch the active certificate and persist it into the workspace.
///
/// Exactly one fetch per run. Any failure here aborts the run before any
/// secret is touched; a blank certificate counts as a failed fetch.
pub async fn fetch_active_certificate(
    seal: &dyn SealTool,
    workspace: &RunWorkspace,
) -> Result<Certificate, RotationError> {
    info!("Fetching current public key from the SealedSecrets controller...");
    let pem = seal
        .fetch_certificate()
        .await
        .map_err(RotationError::KeyFetch)?;
    if pem.trim().is_empty() {
        return Err(RotationError::KeyFetch(anyhow::anyhow!(
            "kubeseal returned an empty certificate"
        )));
    }

    let fingerprint = certificate_fingerprint(&pem);
    let path = workspace
        .persist_certificate(&pem)
        .await
        .map_err(RotationError::KeyFetch)?;

    let certificate = Certificate {
        pem,
        fingerprint,
        path,
    };
    info!("Public key hash: {}...", certificate.short_fingerprint());
    Ok(certificate)
}
