//! Namespace operations

use k8s_openapi::api::core::v1::Namespace;
use kube::api::Api;

use crate::kubernetes::client::K8sClient;
use crate::kubernetes::error::{K8sError, K8sResult};

/// Check whether a namespace exists
///
/// A 404 maps to `Ok(false)`; any other API failure is returned as is.
pub async fn namespace_exists(client: &K8sClient, name: &str) -> K8sResult<bool> {
    let namespaces: Api<Namespace> = Api::all(client.inner().clone());

    match namespaces.get(name).await {
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
