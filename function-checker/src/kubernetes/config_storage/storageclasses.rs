//! StorageClass operations
//!
//! Existence checks and default storage class lookup.

use k8s_openapi::api::storage::v1::StorageClass;
use kube::api::{Api, ListParams};

use crate::kubernetes::client::K8sClient;
use crate::kubernetes::error::{K8sError, K8sResult};

/// Annotation marking the cluster default storage class
pub const DEFAULT_CLASS_ANNOTATION: &str = "storageclass.kubernetes.io/is-default-class";
/// Pre-GA spelling of the same annotation, still honoured by kubectl
pub const BETA_DEFAULT_CLASS_ANNOTATION: &str = "storageclass.beta.kubernetes.io/is-default-class";

/// Check whether a StorageClass exists
pub async fn storage_class_exists(client: &K8sClient, name: &str) -> K8sResult<bool> {
    let scs: Api<StorageClass> = Api::all(client.inner().clone());

    match scs.get(name).await {
        Ok(_) => Ok(true),
        Err(e) => {
            let err = K8sError::from(e);
            if err.is_not_found() {
                Ok(false)
            } else {
                Err(err)
            }
        }
    }
}

/// Find the StorageClass annotated as cluster default
pub async fn find_default_storage_class(client: &K8sClient) -> K8sResult<Option<String>> {
    let scs: Api<StorageClass> = Api::all(client.inner().clone());
    let list = scs.list(&ListParams::default()).await?;

    Ok(list
        .items
        .iter()
        .find(|sc| is_default_storage_class(sc))
        .and_then(|sc| sc.metadata.name.clone()))
}

/// Whether a StorageClass carries the default-class annotation set to "true"
pub fn is_default_storage_class(sc: &StorageClass) -> bool {
    sc.metadata
        .annotations
        .as_ref()
        .map(|a| {
            [DEFAULT_CLASS_ANNOTATION, BETA_DEFAULT_CLASS_ANNOTATION]
                .iter()
                .any(|key| a.get(*key).map(|v| v == "true").unwrap_or(false))
        })
        .unwrap_or(false)
}
