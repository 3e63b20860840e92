//! # Cluster Object Store
//!
//! Access to SealedSecret resources in the cluster.
//!
//! The rotation pipeline only ever needs three operations against the
//! cluster: enumerate the SealedSecrets, read one manifest, and write one
//! manifest back. [`ClusterStore`] is that seam; the production
//! implementation talks to the Kubernetes API, tests substitute fakes.

use anyhow::Result;
use async_trait::async_trait;
use std::fmt;

/// Identity of one SealedSecret resource in the cluster.
///
/// Unique within a catalog snapshot and immutable once listed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SecretRef {
    pub namespace: String,
    pub name: String,
}

impl SecretRef {
    #[must_use]
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for SecretRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Store trait for SealedSecret resources
#[async_trait]
pub trait ClusterStore: Send + Sync {
    /// List every SealedSecret visible to this store as a single
    /// point-in-time call. An empty cluster returns an empty vector, not an
    /// error.
    async fn list_sealed_secrets(&self) -> Result<Vec<SecretRef>>;

    /// Fetch the current manifest for one SealedSecret as YAML text.
    async fn fetch_manifest(&self, secret: &SecretRef) -> Result<String>;

    /// Apply a SealedSecret manifest back to the cluster with upsert
    /// semantics: the resource addressed by the manifest's namespace/name is
    /// created or replaced in place.
    async fn apply_manifest(&self, manifest: &str) -> Result<()>;
}

// Kubernetes-backed implementation
pub mod kube;
