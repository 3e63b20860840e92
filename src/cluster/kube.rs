//! # Kubernetes Store
//!
//! [`ClusterStore`] implementation backed by the Kubernetes API.
//!
//! SealedSecret is consumed as a [`DynamicObject`] rather than a typed CRD:
//! the pipeline never interprets the encrypted payload, it only moves whole
//! manifests between the cluster and the kubeseal binary.

use crate::cluster::{ClusterStore, SecretRef};
use anyhow::{Context, Result};
use async_trait::async_trait;
use kube::api::{Api, ApiResource, ListParams, Patch, PatchParams};
use kube::core::{DynamicObject, GroupVersionKind};
use kube::Client;
use tracing::{debug, warn};

const SEALED_SECRET_GROUP: &str = "bitnami.com";
const SEALED_SECRET_VERSION: &str = "v1alpha1";
const SEALED_SECRET_KIND: &str = "SealedSecret";

/// Field manager recorded by server-side apply for every manifest this tool
/// publishes.
const FIELD_MANAGER: &str = "sealed-secret-rotator";

/// The `bitnami.com/v1alpha1 SealedSecret` API resource.
fn sealed_secret_resource() -> ApiResource {
    ApiResource::from_gvk(&GroupVersionKind {
        group: SEALED_SECRET_GROUP.to_string(),
        version: SEALED_SECRET_VERSION.to_string(),
        kind: SEALED_SECRET_KIND.to_string(),
    })
}

/// Kubernetes-backed SealedSecret store.
///
/// Scoped to one namespace when constructed with `Some(namespace)`, otherwise
/// cluster-wide.
#[derive(Clone)]
pub struct KubeClusterStore {
    client: Client,
    resource: ApiResource,
    namespace: Option<String>,
}

impl std::fmt::Debug for KubeClusterStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeClusterStore")
            .field("namespace", &self.namespace)
            .finish_non_exhaustive()
    }
}

impl KubeClusterStore {
    #[must_use]
    pub fn new(client: Client, namespace: Option<String>) -> Self {
        Self {
            client,
            resource: sealed_secret_resource(),
            namespace,
        }
    }

    /// API handle matching the store's scope (one namespace or all).
    fn scoped_api(&self) -> Api<DynamicObject> {
        match &self.namespace {
            Some(namespace) => {
                Api::namespaced_with(self.client.clone(), namespace, &self.resource)
            }
            None => Api::all_with(self.client.clone(), &self.resource),
        }
    }

    /// API handle for one concrete namespace.
    fn namespaced_api(&self, namespace: &str) -> Api<DynamicObject> {
        Api::namespaced_with(self.client.clone(), namespace, &self.resource)
    }
}

#[async_trait]
impl ClusterStore for KubeClusterStore {
    async fn list_sealed_secrets(&self) -> Result<Vec<SecretRef>> {
        let api = self.scoped_api();
        let list = api
            .list(&ListParams::default())
            .await
            .context("Failed to list SealedSecret resources")?;

        let mut refs = Vec::with_capacity(list.items.len());
        for item in list.items {
            let namespace = item.metadata.namespace.as_deref().unwrap_or("default");
            let name = item.metadata.name.as_deref().unwrap_or("");
            if name.is_empty() {
                warn!(
                    "Skipping listed SealedSecret without a name in namespace {}",
                    namespace
                );
                continue;
            }
            refs.push(SecretRef::new(namespace, name));
        }
        Ok(refs)
    }

    async fn fetch_manifest(&self, secret: &SecretRef) -> Result<String> {
        let api = self.namespaced_api(&secret.namespace);
        let object = api
            .get(&secret.name)
            .await
            .context(format!("Failed to get SealedSecret: {}", secret))?;
        debug!("Fetched manifest for {}", secret);
        serde_yaml::to_string(&object)
            .context(format!("Failed to serialize SealedSecret: {}", secret))
    }

    async fn apply_manifest(&self, manifest: &str) -> Result<()> {
        let mut object: DynamicObject = serde_yaml::from_str(manifest)
            .context("Failed to parse manifest as a SealedSecret object")?;
        sanitize_for_apply(&mut object);

        let (namespace, name) = manifest_identity(&object)?;
        let api = self.namespaced_api(&namespace);
        let patch_params = PatchParams::apply(FIELD_MANAGER).force();
        api.patch(&name, &patch_params, &Patch::Apply(&object))
            .await
            .context(format!(
                "Failed to apply SealedSecret: {}/{}",
                namespace, name
            ))?;
        debug!("Applied manifest for {}/{}", namespace, name);
        Ok(())
    }
}

/// Namespace and name a manifest addresses, required for apply.
fn manifest_identity(object: &DynamicObject) -> Result<(String, String)> {
    let namespace = object
        .metadata
        .namespace
        .clone()
        .context("Manifest has no metadata.namespace")?;
    let name = object
        .metadata
        .name
        .clone()
        .context("Manifest has no metadata.name")?;
    Ok((namespace, name))
}

/// Strip server-managed metadata so the manifest is acceptable to
/// server-side apply.
///
/// A fetched manifest carries resourceVersion, uid, managedFields and status
/// from the live object; re-submitting those makes the apiserver either
/// reject the patch or fight over field ownership. kubeseal passes them
/// through untouched, so they are cleared here, right before publishing.
fn sanitize_for_apply(object: &mut DynamicObject) {
    object.metadata.managed_fields = None;
    object.metadata.resource_version = None;
    object.metadata.uid = None;
    object.metadata.creation_timestamp = None;
    object.metadata.generation = None;
    if let Some(data) = object.data.as_object_mut() {
        data.remove("status");
    }
}
