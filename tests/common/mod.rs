//! Common test utilities for the rotation pipeline tests.
//!
//! Scripted in-memory fakes for the two external seams (`ClusterStore` and
//! `SealTool`) plus call counters and a log-capture writer the pipeline
//! properties assert against.

#![allow(dead_code, reason = "each test binary uses a subset of these helpers")]

use anyhow::Result;
use async_trait::async_trait;
use sealed_secret_rotator::cluster::{ClusterStore, SecretRef};
use sealed_secret_rotator::kubeseal::SealTool;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing_subscriber::fmt::MakeWriter;

/// Certificate PEM every fake seal tool vends by default.
pub const TEST_CERT: &str =
    "-----BEGIN CERTIFICATE-----\nMIIBtestcert\n-----END CERTIFICATE-----\n";

/// Marker the fake re-encryption rewrites, standing in for old-key
/// ciphertext.
pub const OLD_CIPHER: &str = "AgBoldCipher";

/// Marker the fake re-encryption rewrites [`OLD_CIPHER`] into.
pub const NEW_CIPHER: &str = "AgBresealedCipher";

/// Canned SealedSecret manifest for `secret`, sealed under the old key.
pub fn manifest_for(secret: &SecretRef) -> String {
    format!(
        "apiVersion: bitnami.com/v1alpha1\nkind: SealedSecret\nmetadata:\n  name: {}\n  namespace: {}\nspec:\n  encryptedData:\n    password: {}\n",
        secret.name, secret.namespace, OLD_CIPHER
    )
}

/// Namespace/name a manifest addresses, the way the real store derives it.
pub fn manifest_identity(manifest: &str) -> Result<SecretRef> {
    let value: serde_yaml::Value = serde_yaml::from_str(manifest)?;
    let metadata = value
        .get("metadata")
        .ok_or_else(|| anyhow::anyhow!("manifest has no metadata"))?;
    let namespace = metadata
        .get("namespace")
        .and_then(|v| v.as_str())
        .ok_or_else(|| anyhow::anyhow!("manifest has no metadata.namespace"))?;
    let name = metadata
        .get("name")
        .and_then(|v| v.as_str())
        .ok_or_else(|| anyhow::anyhow!("manifest has no metadata.name"))?;
    Ok(SecretRef::new(namespace, name))
}

/// In-memory cluster store with scripted failures.
///
/// Applies update the stored manifests, so repeated runs observe upsert
/// semantics just like the real store.
#[derive(Debug, Default)]
pub struct FakeClusterStore {
    order: Vec<SecretRef>,
    manifests: Mutex<HashMap<SecretRef, String>>,
    fail_list: bool,
    fail_fetch: HashSet<SecretRef>,
    empty_fetch: HashSet<SecretRef>,
    fail_apply: HashSet<SecretRef>,
    list_calls: AtomicUsize,
    fetch_calls: AtomicUsize,
    applied: Mutex<Vec<(SecretRef, String)>>,
}

impl FakeClusterStore {
    /// Store seeded with a canned manifest per secret.
    pub fn with_secrets(refs: &[SecretRef]) -> Self {
        let manifests = refs
            .iter()
            .map(|secret| (secret.clone(), manifest_for(secret)))
            .collect();
        Self {
            order: refs.to_vec(),
            manifests: Mutex::new(manifests),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn fail_listing(mut self) -> Self {
        self.fail_list = true;
        self
    }

    #[must_use]
    pub fn fail_fetch_of(mut self, secret: &SecretRef) -> Self {
        self.fail_fetch.insert(secret.clone());
        self
    }

    #[must_use]
    pub fn empty_fetch_of(mut self, secret: &SecretRef) -> Self {
        self.empty_fetch.insert(secret.clone());
        self
    }

    #[must_use]
    pub fn fail_apply_of(mut self, secret: &SecretRef) -> Self {
        self.fail_apply.insert(secret.clone());
        self
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    /// Every `(secret, manifest)` pair successfully applied, in order.
    pub fn applied(&self) -> Vec<(SecretRef, String)> {
        self.applied.lock().unwrap().clone()
    }

    /// Current stored manifest for `secret`.
    pub fn manifest_of(&self, secret: &SecretRef) -> Option<String> {
        self.manifests.lock().unwrap().get(secret).cloned()
    }
}

#[async_trait]
impl ClusterStore for FakeClusterStore {
    async fn list_sealed_secrets(&self) -> Result<Vec<SecretRef>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_list {
            anyhow::bail!("scripted list failure");
        }
        Ok(self.order.clone())
    }

    async fn fetch_manifest(&self, secret: &SecretRef) -> Result<String> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_fetch.contains(secret) {
            anyhow::bail!("scripted fetch failure for {secret}");
        }
        if self.empty_fetch.contains(secret) {
            return Ok(String::new());
        }
        self.manifests
            .lock()
            .unwrap()
            .get(secret)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("no manifest stored for {secret}"))
    }

    async fn apply_manifest(&self, manifest: &str) -> Result<()> {
        let secret = manifest_identity(manifest)?;
        if self.fail_apply.contains(&secret) {
            anyhow::bail!("scripted apply failure for {secret}");
        }
        self.applied
            .lock()
            .unwrap()
            .push((secret.clone(), manifest.to_string()));
        self.manifests
            .lock()
            .unwrap()
            .insert(secret, manifest.to_string());
        Ok(())
    }
}

/// In-memory seal tool with scripted failures and a concurrency high-water
/// mark.
///
/// `reencrypt` reads the staged file like the real binary would, verifies
/// the certificate it was handed is the one the run persisted, and rewrites
/// [`OLD_CIPHER`] to [`NEW_CIPHER`].
#[derive(Debug)]
pub struct FakeSealTool {
    cert_pem: String,
    fail_fetch_cert: bool,
    fail_reencrypt: HashSet<SecretRef>,
    delay: Option<Duration>,
    fetch_cert_calls: AtomicUsize,
    reencrypt_calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FakeSealTool {
    pub fn new() -> Self {
        Self {
            cert_pem: TEST_CERT.to_string(),
            fail_fetch_cert: false,
            fail_reencrypt: HashSet::new(),
            delay: None,
            fetch_cert_calls: AtomicUsize::new(0),
            reencrypt_calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub fn failing_fetch_cert(mut self) -> Self {
        self.fail_fetch_cert = true;
        self
    }

    #[must_use]
    pub fn fail_reencrypt_of(mut self, secret: &SecretRef) -> Self {
        self.fail_reencrypt.insert(secret.clone());
        self
    }

    /// Hold each re-encryption open long enough for overlap to be
    /// observable.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn fetch_cert_calls(&self) -> usize {
        self.fetch_cert_calls.load(Ordering::SeqCst)
    }

    pub fn reencrypt_calls(&self) -> usize {
        self.reencrypt_calls.load(Ordering::SeqCst)
    }

    /// Highest number of re-encryptions that were ever in flight at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

impl Default for FakeSealTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SealTool for FakeSealTool {
    async fn fetch_certificate(&self) -> Result<String> {
        self.fetch_cert_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_fetch_cert {
            anyhow::bail!("scripted fetch-cert failure");
        }
        Ok(self.cert_pem.clone())
    }

    async fn reencrypt(&self, manifest_path: &Path, cert_path: &Path) -> Result<String> {
        self.reencrypt_calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let result = self.reencrypt_inner(manifest_path, cert_path).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

impl FakeSealTool {
    async fn reencrypt_inner(&self, manifest_path: &Path, cert_path: &Path) -> Result<String> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let persisted_cert = tokio::fs::read_to_string(cert_path).await?;
        if persisted_cert != self.cert_pem {
            anyhow::bail!("re-encryption was handed a certificate this tool never vended");
        }

        let staged = tokio::fs::read_to_string(manifest_path).await?;
        let secret = manifest_identity(&staged)?;
        if self.fail_reencrypt.contains(&secret) {
            anyhow::bail!("scripted re-encryption failure for {secret}");
        }
        Ok(staged.replace(OLD_CIPHER, NEW_CIPHER))
    }
}

/// Captures formatted log output for assertions.
#[derive(Clone, Debug, Default)]
pub struct CapturedLogs {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl CapturedLogs {
    #[must_use]
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.buffer.lock().unwrap()).into_owned()
    }
}

impl std::io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.buffer.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedLogs;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
