//! # kubeseal Invocation
//!
//! Typed interface over the kubeseal binary.
//!
//! The pipeline needs exactly two primitives from kubeseal: fetch the active
//! public sealing certificate, and re-encrypt one sealed manifest under a
//! given certificate. Both run as argument-vector subprocesses with piped
//! stdio; no shell is ever involved, and the ciphertext flowing through is
//! never interpreted here.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Seal tool trait for the certificate-fetch and re-encryption primitives
#[async_trait]
pub trait SealTool: Send + Sync {
    /// Fetch the currently active public sealing certificate as PEM text.
    async fn fetch_certificate(&self) -> Result<String>;

    /// Re-encrypt a staged SealedSecret manifest under the certificate at
    /// `cert_path`, returning the re-encrypted manifest text.
    async fn reencrypt(&self, manifest_path: &Path, cert_path: &Path) -> Result<String>;
}

/// The real kubeseal binary.
#[derive(Debug, Clone)]
pub struct Kubeseal {
    binary: PathBuf,
}

impl Kubeseal {
    /// Resolve the kubeseal binary once, at startup.
    ///
    /// An explicit override is trusted as given; otherwise the binary is
    /// looked up on PATH. Resolving up front means a misconfigured host
    /// fails before anything touches the cluster.
    pub fn locate(override_path: Option<PathBuf>) -> Result<Self> {
        let binary = match override_path {
            Some(path) => path,
            None => which::which("kubeseal").map_err(|e| {
                anyhow!(
                    "kubeseal binary not found in PATH: {}. Please install kubeseal: brew install kubeseal (macOS) or see https://github.com/bitnami-labs/sealed-secrets",
                    e
                )
            })?,
        };
        debug!("Using kubeseal binary at: {:?}", binary);
        Ok(Self { binary })
    }

    #[must_use]
    pub fn binary_path(&self) -> &Path {
        &self.binary
    }
}

#[async_trait]
impl SealTool for Kubeseal {
    async fn fetch_certificate(&self) -> Result<String> {
        let output = tokio::process::Command::new(&self.binary)
            .arg("--fetch-cert")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .context("Failed to run kubeseal --fetch-cert")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!(
                "kubeseal --fetch-cert failed (exit code: {:?}): {}",
                output.status.code(),
                summarize_stderr(&stderr)
            ));
        }

        String::from_utf8(output.stdout).context("kubeseal --fetch-cert output is not valid UTF-8")
    }

    async fn reencrypt(&self, manifest_path: &Path, cert_path: &Path) -> Result<String> {
        let manifest = tokio::fs::read(manifest_path).await.context(format!(
            "Failed to read staged manifest: {:?}",
            manifest_path
        ))?;

        let mut cmd = tokio::process::Command::new(&self.binary);
        cmd.arg("--re-encrypt")
            .arg("--cert")
            .arg(cert_path)
            .arg("-o")
            .arg("yaml")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = cmd.spawn().context("Failed to spawn kubeseal --re-encrypt")?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(&manifest)
                .await
                .context("Failed to write staged manifest to kubeseal stdin")?;
            stdin
                .shutdown()
                .await
                .context("Failed to close kubeseal stdin")?;
        }

        let output = child
            .wait_with_output()
            .await
            .context("Failed to wait for kubeseal --re-encrypt")?;

        if output.status.success() {
            String::from_utf8(output.stdout)
                .context("kubeseal --re-encrypt output is not valid UTF-8")
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(anyhow!(
                "kubeseal --re-encrypt failed (exit code: {:?}): {}",
                output.status.code(),
                summarize_stderr(&stderr)
            ))
        }
    }
}

/// Keep subprocess stderr readable in error chains; kubeseal can dump long
/// usage text on bad invocations. The cut is by character count, never
/// inside a code point.
fn summarize_stderr(stderr: &str) -> String {
    let trimmed = stderr.trim();
    match trimmed.char_indices().nth(500) {
        Some((end, _)) => format!("{}... (truncated)", &trimmed[..end]),
        None => trimmed.to_string(),
    }
}
